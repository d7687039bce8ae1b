//! Message elements as OneBot sends them.
//!
//! ```json
//! [
//!   { "type": "text", "data": { "text": "hello " } },
//!   { "type": "at",   "data": { "qq": "10001" } }
//! ]
//! ```
//!
//! Text maps to [`Segment::Text`]; every other kind is kept verbatim as
//! [`Segment::Raw`].

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use campfire_core::Segment;

/// One `{type, data}` element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSegment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl From<WireSegment> for Segment {
    fn from(wire: WireSegment) -> Self {
        if wire.kind == "text"
            && let Some(text) = wire.data.get("text").and_then(Value::as_str)
        {
            return Segment::text(text);
        }
        Segment::Raw {
            kind: wire.kind,
            data: wire.data,
        }
    }
}

impl From<&Segment> for WireSegment {
    fn from(segment: &Segment) -> Self {
        match segment {
            Segment::Text(text) => Self {
                kind: "text".to_string(),
                data: json!({ "text": text }),
            },
            Segment::Raw { kind, data } => Self {
                kind: kind.clone(),
                data: data.clone(),
            },
        }
    }
}

/// Converts the `message` field of an event.
///
/// Implementations configured for string messages send CQ-coded text; it is
/// kept as a single text segment.
pub fn from_wire(message: Value) -> Vec<Segment> {
    match message {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<WireSegment>(item) {
                Ok(wire) => Some(Segment::from(wire)),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed message segment");
                    None
                }
            })
            .collect(),
        Value::String(text) if text.is_empty() => Vec::new(),
        Value::String(text) => vec![Segment::Text(text)],
        _ => Vec::new(),
    }
}

pub fn to_wire(segments: &[Segment]) -> Vec<WireSegment> {
    segments.iter().map(WireSegment::from).collect()
}
