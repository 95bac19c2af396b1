// ABOUTME: Event protocol spoken over the terminal socket between the client and the shell service
// Outbound: requestTerminal, terminalData. Inbound: terminal pushes carrying text or raw bytes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ============================================
// Client → Shell Service
// ============================================

/// Events the client sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Ask the service to allocate a shell for this connection
    RequestTerminal,
    /// Keystrokes, pastes or priming input for the shell
    TerminalData(TerminalInput),
}

/// Payload of `terminalData`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalInput {
    /// Input for the shell
    pub data: String,
}

impl ClientEvent {
    /// `terminalData` event carrying `data`
    pub fn terminal_data(data: impl Into<String>) -> Self {
        ClientEvent::TerminalData(TerminalInput { data: data.into() })
    }

    /// Wire name of the event
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientEvent::RequestTerminal => "requestTerminal",
            ClientEvent::TerminalData(_) => "terminalData",
        }
    }

    /// Serialize as a JSON text frame
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================
// Shell Service → Client
// ============================================

/// Events delivered to listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Shell output push
    Terminal(TerminalFrame),
    /// The transport went away. Never sent by the peer, raised locally.
    Disconnected { reason: Option<String> },
}

/// One unit of shell output as delivered by the connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalFrame {
    /// Text payload
    Text(String),
    /// Raw byte payload
    Bytes(Vec<u8>),
}

/// How byte frames become text before reaching the surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ByteDecoding {
    /// Each byte becomes the char with the same code point (0..=255).
    /// Multi-byte UTF-8 sequences come out as one char per byte.
    #[default]
    CodeUnits,
    /// Decode as UTF-8, replacing invalid sequences
    Utf8Lossy,
}

impl TerminalFrame {
    /// Text to write to the surface
    pub fn into_text(self, decoding: ByteDecoding) -> String {
        match self {
            TerminalFrame::Text(text) => text,
            TerminalFrame::Bytes(bytes) => decode_bytes(&bytes, decoding),
        }
    }
}

/// Turn a byte payload into text
pub fn decode_bytes(bytes: &[u8], decoding: ByteDecoding) -> String {
    match decoding {
        ByteDecoding::CodeUnits => bytes.iter().map(|&b| char::from(b)).collect(),
        ByteDecoding::Utf8Lossy => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Failures decoding wire frames
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Not valid JSON
    #[error("Invalid JSON frame: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is neither text nor bytes
    #[error("Malformed terminal payload: expected a string or byte array")]
    MalformedPayload,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

impl ServerEvent {
    /// Parse a text frame. Events other than `terminal` yield `Ok(None)`.
    pub fn from_text(text: &str) -> Result<Option<Self>, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        if envelope.event != "terminal" {
            return Ok(None);
        }

        let frame = match envelope.data.get("data") {
            Some(Value::String(text)) => TerminalFrame::Text(text.clone()),
            Some(Value::Array(items)) => TerminalFrame::Bytes(bytes_from_json(items)?),
            _ => return Err(ProtocolError::MalformedPayload),
        };
        Ok(Some(ServerEvent::Terminal(frame)))
    }

    /// Binary frames carry a raw `terminal` byte buffer
    pub fn from_binary(bytes: Vec<u8>) -> Self {
        ServerEvent::Terminal(TerminalFrame::Bytes(bytes))
    }
}

fn bytes_from_json(items: &[Value]) -> Result<Vec<u8>, ProtocolError> {
    items
        .iter()
        .map(|item| {
            item.as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or(ProtocolError::MalformedPayload)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_client_event_wire_format() {
        let request = serde_json::to_value(ClientEvent::RequestTerminal).unwrap();
        assert_eq!(request, json!({ "event": "requestTerminal" }));

        let data = serde_json::to_value(ClientEvent::terminal_data("ls\r")).unwrap();
        assert_eq!(
            data,
            json!({ "event": "terminalData", "data": { "data": "ls\r" } })
        );
    }

    #[test]
    fn test_parse_text_payload() {
        let event = ServerEvent::from_text(r#"{"event":"terminal","data":{"data":"hello"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event, ServerEvent::Terminal(TerminalFrame::Text("hello".into())));
    }

    #[test]
    fn test_parse_byte_array_payload() {
        let event = ServerEvent::from_text(r#"{"event":"terminal","data":{"data":[104,105]}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event, ServerEvent::Terminal(TerminalFrame::Bytes(vec![104, 105])));
    }

    #[test]
    fn test_malformed_payloads_are_rejected() {
        for text in [
            r#"{"event":"terminal","data":{"data":42}}"#,
            r#"{"event":"terminal","data":{"data":{"x":1}}}"#,
            r#"{"event":"terminal","data":{"data":[104,300]}}"#,
            r#"{"event":"terminal","data":{}}"#,
            r#"{"event":"terminal"}"#,
        ] {
            assert!(
                matches!(ServerEvent::from_text(text), Err(ProtocolError::MalformedPayload)),
                "expected malformed payload for {}",
                text
            );
        }
        assert!(matches!(ServerEvent::from_text("not json"), Err(ProtocolError::Json(_))));
    }

    #[test]
    fn test_other_events_are_ignored() {
        let event = ServerEvent::from_text(r#"{"event":"loaded","data":{"rootContent":[]}}"#).unwrap();
        assert!(event.is_none());
    }

    #[test]
    fn test_code_unit_decoding() {
        assert_eq!(decode_bytes(&[104, 105], ByteDecoding::CodeUnits), "hi");
        // "é" in UTF-8 is two bytes and comes out as two chars
        assert_eq!(decode_bytes(&[0xC3, 0xA9], ByteDecoding::CodeUnits), "\u{C3}\u{A9}");
        assert_eq!(decode_bytes(&[0xC3, 0xA9], ByteDecoding::CodeUnits), "Ã©");
    }

    #[test]
    fn test_utf8_lossy_decoding() {
        assert_eq!(decode_bytes(&[0xC3, 0xA9], ByteDecoding::Utf8Lossy), "é");
        assert_eq!(decode_bytes(&[0xFF], ByteDecoding::Utf8Lossy), "\u{FFFD}");
    }
}
