//! STOMP 1.2 frame codec.
//!
//! A frame on the wire looks like:
//!
//! ```text
//! COMMAND\n
//! header1:value1\n
//! header2:value2\n
//! \n
//! body^@
//! ```
//!
//! where `^@` is the NUL byte. Bare EOLs between frames are heart-beats.
//! Header names and values are escaped (`\\`, `\n`, `\r`, `\c`) in every
//! frame except `CONNECT` and `CONNECTED`.

use std::fmt;
use std::str::FromStr;

use crate::TransportError;

/// The frame commands this client sends or understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    /// The command as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl FromStr for Command {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "CONNECTED" => Self::Connected,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "DISCONNECT" => Self::Disconnect,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            other => {
                return Err(TransportError::MalformedFrame(format!(
                    "unknown command {other:?}"
                )));
            }
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    /// Headers in wire order. Repeated names are allowed; the first wins.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    /// Creates a frame with no headers and an empty body.
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the first value of the named header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Serializes the frame, including the trailing NUL.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                push_escaped(&mut out, name);
                out.push(':');
                push_escaped(&mut out, value);
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parses every frame in `text`.
    ///
    /// Heart-beat EOLs before, between, and after frames are skipped, so a
    /// pure heart-beat yields an empty vector.
    pub fn decode_all(text: &str) -> Result<Vec<Frame>, TransportError> {
        let mut frames = Vec::new();
        let mut rest = text;
        loop {
            rest = rest.trim_start_matches(['\r', '\n']);
            if rest.is_empty() {
                break;
            }
            let (frame, remaining) = parse_one(rest)?;
            frames.push(frame);
            rest = remaining;
        }
        Ok(frames)
    }
}

fn malformed(reason: impl Into<String>) -> TransportError {
    TransportError::MalformedFrame(reason.into())
}

fn parse_one(input: &str) -> Result<(Frame, &str), TransportError> {
    let (command_line, mut rest) =
        split_line(input).ok_or_else(|| malformed("missing command line"))?;
    let command: Command = command_line.parse()?;
    let escape = command.escapes_headers();

    let mut headers = Vec::new();
    loop {
        let (line, after) = split_line(rest)
            .ok_or_else(|| malformed("unterminated header block"))?;
        rest = after;
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| malformed(format!("header without colon: {line:?}")))?;
        if escape {
            headers.push((unescape(name)?, unescape(value)?));
        } else {
            headers.push((name.to_string(), value.to_string()));
        }
    }

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.trim().parse::<usize>().ok());

    let (body, after) = match content_length {
        Some(len) => {
            let body = rest
                .get(..len)
                .ok_or_else(|| malformed("body shorter than content-length"))?;
            let after = rest[len..]
                .strip_prefix('\0')
                .ok_or_else(|| malformed("missing NUL after body"))?;
            (body, after)
        }
        None => {
            let end = rest
                .find('\0')
                .ok_or_else(|| malformed("missing NUL terminator"))?;
            (&rest[..end], &rest[end + 1..])
        }
    };

    Ok((
        Frame {
            command,
            headers,
            body: body.to_string(),
        },
        after,
    ))
}

/// Splits off one line, accepting both `\n` and `\r\n`.
fn split_line(s: &str) -> Option<(&str, &str)> {
    let idx = s.find('\n')?;
    let line = &s[..idx];
    Some((line.strip_suffix('\r').unwrap_or(line), &s[idx + 1..]))
}

fn push_escaped(out: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String, TransportError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(malformed(format!(
                    "invalid escape sequence \\{}",
                    other.map(String::from).unwrap_or_default()
                )));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_send_frame_layout() {
        let frame = Frame::new(Command::Send)
            .with_header("destination", "/app/roll/7")
            .with_body("{}");
        assert_eq!(frame.encode(), "SEND\ndestination:/app/roll/7\n\n{}\0");
    }

    #[test]
    fn test_encode_escapes_colons_except_connect() {
        let send = Frame::new(Command::Send).with_header("x", "a:b");
        assert!(send.encode().contains("x:a\\cb\n"));

        let connect = Frame::new(Command::Connect).with_header("host", "a:b");
        assert!(connect.encode().contains("host:a:b\n"));
    }

    #[test]
    fn test_decode_message_frame() {
        let text = "MESSAGE\ndestination:/topic/game/7\nsubscription:sub-1\n\n{\"type\":\"roll\"}\0";
        let frames = Frame::decode_all(text).unwrap();
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.command, Command::Message);
        assert_eq!(frame.header("destination"), Some("/topic/game/7"));
        assert_eq!(frame.header("subscription"), Some("sub-1"));
        assert_eq!(frame.body, "{\"type\":\"roll\"}");
    }

    #[test]
    fn test_decode_heartbeat_yields_no_frames() {
        assert!(Frame::decode_all("\n").unwrap().is_empty());
        assert!(Frame::decode_all("\r\n\r\n").unwrap().is_empty());
    }

    #[test]
    fn test_decode_multiple_frames_with_heartbeats_between() {
        let text = "\nCONNECTED\nversion:1.2\n\n\0\nRECEIPT\nreceipt-id:1\n\n\0\n";
        let frames = Frame::decode_all(text).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].command, Command::Connected);
        assert_eq!(frames[1].header("receipt-id"), Some("1"));
    }

    #[test]
    fn test_decode_content_length_allows_nul_in_body() {
        let text = "MESSAGE\ncontent-length:3\n\na\0b\0";
        let frames = Frame::decode_all(text).unwrap();
        assert_eq!(frames[0].body, "a\0b");
    }

    #[test]
    fn test_decode_crlf_line_endings() {
        let text = "MESSAGE\r\ndestination:/x\r\n\r\nhi\0";
        let frames = Frame::decode_all(text).unwrap();
        assert_eq!(frames[0].header("destination"), Some("/x"));
        assert_eq!(frames[0].body, "hi");
    }

    #[test]
    fn test_decode_unescapes_headers() {
        let text = "MESSAGE\nmessage:a\\cb\\nc\\\\d\n\n\0";
        let frames = Frame::decode_all(text).unwrap();
        assert_eq!(frames[0].header("message"), Some("a:b\nc\\d"));
    }

    #[test]
    fn test_header_first_value_wins() {
        let frame = Frame::new(Command::Message)
            .with_header("k", "first")
            .with_header("k", "second");
        assert_eq!(frame.header("k"), Some("first"));
    }

    #[test]
    fn test_decode_escaped_header_survives_encoding() {
        let original = Frame::new(Command::Send)
            .with_header("note", "x:y\\z")
            .with_body("b");
        let decoded = Frame::decode_all(&original.encode()).unwrap();
        assert_eq!(decoded, vec![original]);
    }

    #[test]
    fn test_decode_missing_nul_is_error() {
        let result = Frame::decode_all("MESSAGE\n\nbody");
        assert!(matches!(result, Err(TransportError::MalformedFrame(_))));
    }

    #[test]
    fn test_decode_unknown_command_is_error() {
        let result = Frame::decode_all("FLY\n\n\0");
        assert!(matches!(result, Err(TransportError::MalformedFrame(_))));
    }

    #[test]
    fn test_decode_invalid_escape_is_error() {
        let result = Frame::decode_all("MESSAGE\nk:\\t\n\n\0");
        assert!(matches!(result, Err(TransportError::MalformedFrame(_))));
    }

    #[test]
    fn test_decode_short_body_is_error() {
        let result = Frame::decode_all("MESSAGE\ncontent-length:10\n\nab\0");
        assert!(matches!(result, Err(TransportError::MalformedFrame(_))));
    }
}
