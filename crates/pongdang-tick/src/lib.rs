//! Movement sequencer for the circular turtle-race board.
//!
//! When the server announces a new position for a mover, the client walks
//! the piece there one tile at a time:
//!
//! ```text
//! from=20, to=2, board=24:  21 ─ 22 ─ 23 ─ 0 ─ 1 ─ 2 ─→ landed(2)
//!                           └──────── step_interval each ───────┘
//! ```
//!
//! [`animate`] runs one such walk and returns a [`MoveHandle`].
//! [`MotionGroup`] tracks the walks of several movers and cancels them as a
//! unit, so nothing fires against a session that has moved on.
//!
//! # Integration
//!
//! ```ignore
//! let mut group = MotionGroup::new(MotionConfig::default());
//! group.start(user_id, prev, next, |pos| draw(pos), |pos| settle(pos));
//! // on teardown, or when a new snapshot supersedes everything:
//! group.cancel_all();
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Board geometry and animation pace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionConfig {
    /// Delay before each visual step.
    pub step_interval: Duration,
    /// Number of tiles on the circular board.
    pub board_size: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            step_interval: Duration::from_millis(300),
            board_size: Self::DEFAULT_BOARD_SIZE,
        }
    }
}

impl MotionConfig {
    pub const DEFAULT_BOARD_SIZE: u32 = 24;
    pub const MIN_STEP_INTERVAL: Duration = Duration::from_millis(1);

    /// A config with the given pace and the default board.
    pub fn with_interval(step_interval: Duration) -> Self {
        Self {
            step_interval,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_board_size(mut self, board_size: u32) -> Self {
        self.board_size = board_size;
        self
    }

    /// Fixes out-of-range values.
    ///
    /// - `board_size == 0` falls back to [`Self::DEFAULT_BOARD_SIZE`].
    /// - `step_interval` is raised to [`Self::MIN_STEP_INTERVAL`].
    pub fn validated(mut self) -> Self {
        if self.board_size == 0 {
            warn!(default = Self::DEFAULT_BOARD_SIZE, "board_size is 0, using default");
            self.board_size = Self::DEFAULT_BOARD_SIZE;
        }
        if self.step_interval < Self::MIN_STEP_INTERVAL {
            self.step_interval = Self::MIN_STEP_INTERVAL;
        }
        self
    }
}

/// Forward distance from `prev` to `next` on a circular board.
///
/// `(next - prev + size) % size`, with both positions first reduced onto
/// the board. A board of size 0 has no distance.
pub fn steps_for(prev: u32, next: u32, board_size: u32) -> u32 {
    if board_size == 0 {
        return 0;
    }
    let size = u64::from(board_size);
    let prev = u64::from(prev) % size;
    let next = u64::from(next) % size;
    // Fits: the result is below `board_size`.
    ((next + size - prev) % size) as u32
}

// ---------------------------------------------------------------------------
// Single move
// ---------------------------------------------------------------------------

/// Handle to one in-flight walk.
///
/// Dropping the handle cancels the walk; call [`detach`](Self::detach) to
/// let it finish unobserved.
#[derive(Debug)]
pub struct MoveHandle {
    task: Option<JoinHandle<()>>,
    cancelled: Arc<AtomicBool>,
    steps: u32,
}

impl MoveHandle {
    fn landed_immediately() -> Self {
        Self {
            task: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            steps: 0,
        }
    }

    /// Number of steps this walk schedules.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Stops the walk. No step or landed callback fires afterwards.
    /// Calling it again is harmless.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Whether the walk is over, landed or cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the walk to end. Returns `true` if it landed.
    pub async fn join(mut self) -> bool {
        let landed = match self.task.take() {
            Some(task) => task.await.is_ok(),
            None => true,
        };
        landed && !self.is_cancelled()
    }

    /// Lets the walk run to completion without a handle.
    pub fn detach(mut self) {
        self.task.take();
    }
}

impl Drop for MoveHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel();
        }
    }
}

/// Walks `steps` tiles forward from `from`.
///
/// `on_step` receives each intermediate and the final position, one call
/// per `step_interval`. `on_landed` receives the final position after the
/// last step. With `steps == 0` nothing is scheduled and `on_landed` runs
/// before this function returns.
///
/// Must be called from within a Tokio runtime unless `steps == 0`.
pub fn animate<S, L>(
    from: u32,
    steps: u32,
    config: &MotionConfig,
    mut on_step: S,
    on_landed: L,
) -> MoveHandle
where
    S: FnMut(u32) + Send + 'static,
    L: FnOnce(u32) + Send + 'static,
{
    let config = config.clone().validated();
    let size = config.board_size;
    let from = from % size;

    if steps == 0 {
        trace!(position = from, "no distance, landed immediately");
        on_landed(from);
        return MoveHandle::landed_immediately();
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    let interval = config.step_interval;

    let task = tokio::spawn(async move {
        let start = Instant::now();
        let mut position = from;
        for step in 1..=steps {
            time::sleep_until(start + interval * step).await;
            if flag.load(Ordering::Acquire) {
                return;
            }
            position = (position + 1) % size;
            trace!(step, position, "step");
            on_step(position);
        }
        if !flag.load(Ordering::Acquire) {
            trace!(position, "landed");
            on_landed(position);
        }
    });

    MoveHandle {
        task: Some(task),
        cancelled,
        steps,
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// Tracks the walks of several movers.
///
/// At most one walk per mover is in flight: starting another cancels the
/// previous one. Dropping the group cancels everything.
#[derive(Debug)]
pub struct MotionGroup<K: Eq + Hash> {
    config: MotionConfig,
    moves: HashMap<K, MoveHandle>,
}

impl<K> MotionGroup<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config: config.validated(),
            moves: HashMap::new(),
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Walks `mover` from `prev` to `next`, replacing any walk it has in
    /// flight. Returns the number of steps scheduled.
    pub fn start<S, L>(&mut self, mover: K, prev: u32, next: u32, on_step: S, on_landed: L) -> u32
    where
        S: FnMut(u32) + Send + 'static,
        L: FnOnce(u32) + Send + 'static,
    {
        if let Some(previous) = self.moves.remove(&mover) {
            if !previous.is_finished() {
                debug!(?mover, "superseding in-flight move");
            }
            previous.cancel();
        }

        let steps = steps_for(prev, next, self.config.board_size);
        let handle = animate(prev, steps, &self.config, on_step, on_landed);
        if steps > 0 {
            self.moves.insert(mover, handle);
        }
        steps
    }

    /// Cancels `mover`'s walk. Returns whether one was in flight.
    pub fn cancel(&mut self, mover: &K) -> bool {
        match self.moves.remove(mover) {
            Some(handle) => {
                let running = !handle.is_finished();
                handle.cancel();
                running
            }
            None => false,
        }
    }

    /// Cancels every walk in the group.
    pub fn cancel_all(&mut self) {
        let count = self.moves.len();
        for (_, handle) in self.moves.drain() {
            handle.cancel();
        }
        if count > 0 {
            debug!(count, "cancelled all moves");
        }
    }

    pub fn is_moving(&self, mover: &K) -> bool {
        self.moves.get(mover).is_some_and(|h| !h.is_finished())
    }

    /// Number of walks still running.
    pub fn in_flight(&mut self) -> usize {
        self.moves.retain(|_, handle| !handle.is_finished());
        self.moves.len()
    }
}

impl<K: Eq + Hash> Drop for MotionGroup<K> {
    fn drop(&mut self) {
        for handle in self.moves.values() {
            handle.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_for_wraps_around() {
        assert_eq!(steps_for(20, 2, 24), 6);
    }

    #[test]
    fn test_steps_for_forward_no_wrap() {
        assert_eq!(steps_for(2, 20, 24), 18);
    }

    #[test]
    fn test_steps_for_same_tile_is_zero() {
        assert_eq!(steps_for(5, 5, 24), 0);
    }

    #[test]
    fn test_steps_for_positions_off_board_are_reduced() {
        assert_eq!(steps_for(25, 3, 24), 2);
        assert_eq!(steps_for(0, 0, 0), 0);
    }

    #[test]
    fn test_validated_fixes_zero_values() {
        let cfg = MotionConfig::with_interval(Duration::ZERO)
            .with_board_size(0)
            .validated();
        assert_eq!(cfg.board_size, MotionConfig::DEFAULT_BOARD_SIZE);
        assert_eq!(cfg.step_interval, MotionConfig::MIN_STEP_INTERVAL);
    }

    #[test]
    fn test_animate_zero_steps_lands_synchronously() {
        use std::sync::Mutex;

        let landed = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&landed);
        let handle = animate(5, 0, &MotionConfig::default(), |_| {}, move |pos| {
            *sink.lock().unwrap() = Some(pos);
        });
        assert_eq!(*landed.lock().unwrap(), Some(5));
        assert!(handle.is_finished());
        assert_eq!(handle.steps(), 0);
    }
}
