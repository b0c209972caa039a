//! Lazy decoding of the nested-document text columns.
//!
//! Text is tried against an ordered chain of decoders: strict JSON first, then
//! Python-style literals. The first decoder that accepts the text wins and is
//! recorded in the result.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::literal::parse_literal;

/// Which grammar accepted a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderKind {
    Json,
    Literal,
}

/// Outcome of decoding one nested-document text value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDocument {
    Decoded { value: Value, decoder: DecoderKind },
    Unparseable,
}

impl ParsedDocument {
    pub fn is_decoded(&self) -> bool {
        matches!(self, Self::Decoded { .. })
    }

    pub fn decoder(&self) -> Option<DecoderKind> {
        match self {
            Self::Decoded { decoder, .. } => Some(*decoder),
            Self::Unparseable => None,
        }
    }

    /// Convert the decoded value into a typed, default-filled document.
    ///
    /// A value that does not fit the expected shape is treated as
    /// unparseable.
    pub fn into_typed<T: DeserializeOwned>(self) -> Option<T> {
        match self {
            Self::Decoded { value, decoder } => match serde_json::from_value(value) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    debug!(?decoder, error = %e, "Decoded document has unexpected shape");
                    None
                }
            },
            Self::Unparseable => None,
        }
    }
}

/// One grammar in the decoder chain.
pub trait DocumentDecoder: Sync {
    fn kind(&self) -> DecoderKind;

    fn decode(&self, text: &str) -> Option<Value>;
}

struct JsonDecoder;

impl DocumentDecoder for JsonDecoder {
    fn kind(&self) -> DecoderKind {
        DecoderKind::Json
    }

    fn decode(&self, text: &str) -> Option<Value> {
        serde_json::from_str(text).ok()
    }
}

struct LiteralDecoder;

impl DocumentDecoder for LiteralDecoder {
    fn kind(&self) -> DecoderKind {
        DecoderKind::Literal
    }

    fn decode(&self, text: &str) -> Option<Value> {
        parse_literal(text).ok()
    }
}

/// Decoders in priority order.
static DECODERS: &[&dyn DocumentDecoder] = &[&JsonDecoder, &LiteralDecoder];

/// Decode one stored nested-document value.
///
/// Absent, blank, `null`/`None` and malformed text all yield
/// [`ParsedDocument::Unparseable`].
pub fn parse_document(text: Option<&str>) -> ParsedDocument {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return ParsedDocument::Unparseable;
    };

    for decoder in DECODERS {
        match decoder.decode(text) {
            Some(Value::Null) => return ParsedDocument::Unparseable,
            Some(value) => {
                return ParsedDocument::Decoded {
                    value,
                    decoder: decoder.kind(),
                }
            }
            None => continue,
        }
    }

    debug!(len = text.len(), "Nested document is unparseable");
    ParsedDocument::Unparseable
}

/// Decode straight into a typed document.
pub fn decode_as<T: DeserializeOwned>(text: Option<&str>) -> Option<T> {
    parse_document(text).into_typed()
}
