//! Inbound frame decoding.
//!
//! [`decode_value`] and [`decode_str`] turn one frame body into an
//! [`Inbound`]. They never fail: anything unusable becomes
//! [`GameEvent::Unknown`] so a bad frame can not take the subscription down.
//! [`Decoder`] wraps them and reports every unknown frame to a
//! [`DiagnosticSink`].
//!
//! Frames are usually `{ "type": ..., "data": { ... } }`. When `data` is
//! missing the frame itself is read as the payload.

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::codec::{Codec, JsonCodec};
use crate::event::{Envelope, EventKind, ForceExit, GameEvent, Inbound};
use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Message extraction
// ---------------------------------------------------------------------------

/// A place a human-readable message may hide in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSource {
    /// `message`
    Message,
    /// `data.message`
    DataMessage,
    /// `data.messages`
    DataMessages,
    /// `payload.message`
    PayloadMessage,
}

impl MessageSource {
    fn path(self) -> &'static [&'static str] {
        match self {
            Self::Message => &["message"],
            Self::DataMessage => &["data", "message"],
            Self::DataMessages => &["data", "messages"],
            Self::PayloadMessage => &["payload", "message"],
        }
    }
}

/// Pulls display messages out of a frame.
///
/// Sources are tried in order and the first one present wins. A string
/// yields one message, an array yields each string element. Finding nothing
/// is normal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageExtractor {
    order: Vec<MessageSource>,
}

impl MessageExtractor {
    pub const DEFAULT_ORDER: [MessageSource; 4] = [
        MessageSource::Message,
        MessageSource::DataMessage,
        MessageSource::DataMessages,
        MessageSource::PayloadMessage,
    ];

    /// An extractor with a custom search order.
    pub fn with_order(order: impl Into<Vec<MessageSource>>) -> Self {
        Self {
            order: order.into(),
        }
    }

    pub fn extract(&self, frame: &Value) -> Vec<String> {
        self.order
            .iter()
            .filter_map(|source| lookup(frame, source.path()))
            .find(|value| !value.is_null())
            .map(to_messages)
            .unwrap_or_default()
    }
}

impl Default for MessageExtractor {
    fn default() -> Self {
        Self::with_order(Self::DEFAULT_ORDER)
    }
}

fn lookup<'a>(frame: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(frame, |value, key| value.get(key))
}

fn to_messages(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Receives frames that decoded to [`GameEvent::Unknown`].
pub trait DiagnosticSink: Send + Sync + 'static {
    fn unknown_frame(&self, kind: Option<&str>, reason: &str, raw: &str);
}

/// Logs unknown frames at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn unknown_frame(&self, kind: Option<&str>, reason: &str, raw: &str) {
        tracing::warn!(kind, %reason, raw, "unknown game frame");
    }
}

/// One frame captured by [`RecordingDiagnostics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: Option<String>,
    pub reason: String,
    pub raw: String,
}

/// Keeps unknown frames in memory.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, oldest first.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for RecordingDiagnostics {
    fn unknown_frame(&self, kind: Option<&str>, reason: &str, raw: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(Diagnostic {
                kind: kind.map(str::to_owned),
                reason: reason.to_string(),
                raw: raw.to_string(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decodes frames and reports unknown ones.
#[derive(Clone)]
pub struct Decoder {
    extractor: MessageExtractor,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Decoder {
    pub fn new(diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            extractor: MessageExtractor::default(),
            diagnostics,
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: MessageExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Decodes a raw frame body.
    pub fn decode(&self, text: &str) -> Inbound {
        let inbound = match parse_frame(text) {
            Ok(value) => decode_with(&self.extractor, &value),
            Err(e) => invalid_json(&e),
        };
        if let Inbound::Event(Envelope {
            event: GameEvent::Unknown { kind, reason },
            ..
        }) = &inbound
        {
            self.diagnostics.unknown_frame(kind.as_deref(), reason, text);
        }
        inbound
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(Arc::new(TracingDiagnostics))
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("extractor", &self.extractor)
            .finish_non_exhaustive()
    }
}

/// Decodes a frame body. Invalid JSON becomes [`GameEvent::Unknown`].
pub fn decode_str(text: &str) -> Inbound {
    match parse_frame(text) {
        Ok(value) => decode_value(&value),
        Err(e) => invalid_json(&e),
    }
}

fn parse_frame(text: &str) -> Result<Value, ProtocolError> {
    JsonCodec.decode(text.as_bytes())
}

/// Decodes an already-parsed frame.
pub fn decode_value(frame: &Value) -> Inbound {
    decode_with(&MessageExtractor::default(), frame)
}

fn invalid_json(error: &ProtocolError) -> Inbound {
    Inbound::Event(Envelope::new(GameEvent::unknown(
        None,
        format!("invalid JSON: {error}"),
    )))
}

fn decode_with(extractor: &MessageExtractor, frame: &Value) -> Inbound {
    if let Some(exit) = force_exit(frame) {
        return Inbound::ForceExit(exit);
    }
    Inbound::Event(Envelope {
        event: decode_event(frame),
        messages: extractor.extract(frame),
    })
}

fn is_force_exit(value: &Value) -> bool {
    value
        .get("type")
        .and_then(Value::as_str)
        .and_then(EventKind::parse)
        == Some(EventKind::ForceExit)
}

/// Recognizes `force_exit` at the top level or inside `data`.
fn force_exit(frame: &Value) -> Option<ForceExit> {
    let data = frame.get("data");
    let source = if is_force_exit(frame) {
        frame
    } else {
        data.filter(|d| is_force_exit(d))?
    };
    let field = |keys: &[&str]| {
        [Some(source), data]
            .into_iter()
            .flatten()
            .flat_map(|v| keys.iter().filter_map(move |k| v.get(k)))
            .find_map(Value::as_str)
            .map(str::to_owned)
    };
    Some(ForceExit {
        reason: field(&["reason", "message"]),
        target_url: field(&["target_url", "targetUrl"]).filter(|u| !u.is_empty()),
    })
}

fn decode_event(frame: &Value) -> GameEvent {
    if !frame.is_object() {
        return GameEvent::unknown(None, "frame is not a JSON object");
    }
    let Some(raw_type) = frame.get("type") else {
        return GameEvent::unknown(None, "missing type discriminator");
    };
    let Some(raw_type) = raw_type.as_str() else {
        return GameEvent::unknown(None, "type discriminator is not a string");
    };
    let Some(kind) = EventKind::parse(raw_type) else {
        return GameEvent::unknown(Some(raw_type), "unrecognized event type");
    };

    let payload = frame
        .get("data")
        .filter(|d| d.is_object())
        .unwrap_or(frame);

    let decoded = match kind {
        EventKind::StartGame => parse(payload).map(GameEvent::StartGame),
        EventKind::Roll => parse(payload).map(GameEvent::Roll),
        EventKind::Purchase => parse(payload).map(GameEvent::Purchase),
        EventKind::Toll => parse(payload).map(GameEvent::Toll),
        EventKind::Tax => parse(payload).map(GameEvent::Tax),
        EventKind::Salary => parse(payload).map(GameEvent::Salary),
        EventKind::Quiz => parse(payload).map(GameEvent::Quiz),
        EventKind::QuizCheck => parse(payload).map(GameEvent::QuizCheck),
        EventKind::QuizClear => Ok(GameEvent::QuizClear),
        EventKind::Prison => parse(payload).map(GameEvent::Prison),
        EventKind::Bankruptcy => parse(payload).map(GameEvent::Bankruptcy),
        EventKind::Exit => parse(payload).map(GameEvent::Exit),
        EventKind::TurnEnd => parse(payload).map(GameEvent::TurnEnd),
        EventKind::GameEnd => parse(payload).map(GameEvent::GameEnd),
        // Intercepted before we get here.
        EventKind::ForceExit => {
            return GameEvent::unknown(Some(raw_type), "force_exit in event position");
        }
    };

    decoded.unwrap_or_else(|e| {
        GameEvent::unknown(Some(raw_type), format!("payload mismatch: {e}"))
    })
}

fn parse<T: DeserializeOwned>(payload: &Value) -> Result<T, serde_json::Error> {
    T::deserialize(payload)
}
