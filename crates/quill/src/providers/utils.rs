use anyhow::{anyhow, Result};
use serde_json::{json, Value};

use crate::models::content::ImageContent;
use crate::models::message::{Message, MessageContent};

/// Convert internal Message format to OpenAI's API message specification
///
/// A message made of a single text part is sent with string content; anything
/// else is sent as an ordered array of typed parts.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = json!({
            "role": message.role
        });

        match message.content.as_slice() {
            [] => continue,
            [MessageContent::Text(text)] => {
                converted["content"] = json!(text.text);
            }
            parts => {
                let content: Vec<Value> = parts
                    .iter()
                    .map(|part| match part {
                        MessageContent::Text(text) => json!({
                            "type": "text",
                            "text": text.text,
                        }),
                        MessageContent::Image(image) => convert_image(image),
                    })
                    .collect();
                converted["content"] = json!(content);
            }
        }

        messages_spec.push(converted);
    }

    messages_spec
}

/// Convert an image content into an OpenAI `image_url` part
pub fn convert_image(image: &ImageContent) -> Value {
    json!({
        "type": "image_url",
        "image_url": {
            "url": image.data_url()
        }
    })
}

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: Value) -> Result<Message> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("Response contained no choices: {}", response))?;

    let mut message = Message::assistant();
    // A null content is a legitimate empty reply
    if let Some(text) = original.get("content").and_then(|c| c.as_str()) {
        message = message.with_text(text);
    }

    Ok(message)
}

/// Pull a human readable message out of an OpenAI-style error body.
///
/// Providers answer either `{"error": {"message": ...}}` or `{"error": "..."}`;
/// `message` at the top level shows up on some compatible gateways.
pub fn provider_error_message(body: &Value) -> Option<String> {
    match body.get("error") {
        Some(Value::String(message)) => Some(message.clone()),
        Some(error) => error
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from),
        None => body
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from),
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}
