//! Best-effort reading of model replies.
//!
//! Models are asked for a JSON object but regularly answer in prose or wrap the
//! object in a Markdown fence. Neither is an error: a fenced object is unwrapped,
//! and anything that is not an object is returned as text under the endpoint's
//! fallback key.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

lazy_static! {
    static ref RE_JSON_FENCE: Regex =
        Regex::new(r"(?is)^```json[ \t]*\r?\n?(.*?)\s*(?:```)?$").unwrap();
}

/// Layout of the plain-text fallback, which differs per endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackShape {
    pub text_key: String,
    /// Emitted as `null` next to the text when set
    #[serde(default)]
    pub title_key: Option<String>,
}

impl FallbackShape {
    pub fn new<S: Into<String>>(text_key: S) -> Self {
        Self {
            text_key: text_key.into(),
            title_key: None,
        }
    }

    pub fn with_title_key<S: Into<String>>(mut self, title_key: S) -> Self {
        self.title_key = Some(title_key.into());
        self
    }

    /// `{"response": ..., "title": null}`
    pub fn response() -> Self {
        Self::new("response").with_title_key("title")
    }

    /// `{"text_explanation": ..., "title": null}`
    pub fn text_explanation() -> Self {
        Self::new("text_explanation").with_title_key("title")
    }

    /// `{"correction": ...}`
    pub fn correction() -> Self {
        Self::new("correction")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterpretedResult {
    /// The model's own object, returned untouched
    Structured(Map<String, Value>),
    PlainText { text: String, shape: FallbackShape },
}

impl InterpretedResult {
    pub fn is_structured(&self) -> bool {
        matches!(self, InterpretedResult::Structured(_))
    }

    pub fn to_json(&self) -> Value {
        match self {
            InterpretedResult::Structured(map) => Value::Object(map.clone()),
            InterpretedResult::PlainText { text, shape } => {
                let mut map = Map::new();
                map.insert(shape.text_key.clone(), Value::String(text.clone()));
                if let Some(title_key) = &shape.title_key {
                    map.insert(title_key.clone(), Value::Null);
                }
                Value::Object(map)
            }
        }
    }
}

impl Serialize for InterpretedResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Remove a leading ```` ```json ```` fence and its closing fence, if present
pub fn strip_json_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    match RE_JSON_FENCE.captures(trimmed).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

pub fn interpret(reply: &str, shape: &FallbackShape) -> InterpretedResult {
    match serde_json::from_str::<Value>(strip_json_fence(reply)) {
        Ok(Value::Object(map)) => InterpretedResult::Structured(map),
        Ok(_) => {
            tracing::warn!("AI response was JSON but not an object, returning as plain text");
            InterpretedResult::PlainText {
                text: reply.to_string(),
                shape: shape.clone(),
            }
        }
        Err(_) => {
            tracing::warn!("AI response was not valid JSON, returning as plain text");
            InterpretedResult::PlainText {
                text: reply.to_string(),
                shape: shape.clone(),
            }
        }
    }
}
