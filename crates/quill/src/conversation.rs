//! Builds the single-turn conversation sent to the model and reads its reply.

use std::sync::Arc;

use crate::errors::{QuillError, QuillResult};
use crate::interpret::{interpret, FallbackShape, InterpretedResult};
use crate::models::message::Message;
use crate::normalize::{NormalizedContent, Normalizer, UploadedResource};
use crate::prompts::{
    CHAT_SYSTEM_PROMPT, GRADING_FOLLOW_UP_PROMPT, GRADING_SYSTEM_PROMPT, TITLE_DIRECTIVE,
};
use crate::providers::base::{ModelSettings, Provider};

/// Everything that differs between endpoints for one model call
#[derive(Debug, Clone)]
pub struct ConversationProfile {
    pub system_instruction: String,
    pub settings: ModelSettings,
    pub fallback: FallbackShape,
}

impl ConversationProfile {
    pub fn new<S: Into<String>>(
        system_instruction: S,
        settings: ModelSettings,
        fallback: FallbackShape,
    ) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            settings,
            fallback,
        }
    }

    pub fn chat(settings: ModelSettings) -> Self {
        Self::new(CHAT_SYSTEM_PROMPT, settings, FallbackShape::response())
    }

    pub fn grading(settings: ModelSettings) -> Self {
        Self::new(GRADING_SYSTEM_PROMPT, settings, FallbackShape::correction())
    }

    pub fn grading_follow_up(settings: ModelSettings) -> Self {
        Self::new(
            GRADING_FOLLOW_UP_PROMPT,
            settings,
            FallbackShape::text_explanation(),
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConverseOptions {
    /// Ask the model to name the conversation
    pub is_first_turn: bool,
}

/// An attachment after normalization, paired with the name shown to the model
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub content: NormalizedContent,
}

impl Attachment {
    pub fn new<S: Into<String>>(name: S, content: NormalizedContent) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }
}

fn attachment_block(name: &str, text: &str) -> String {
    format!(
        "\n\n--- Attached file '{}' ---\n{}\n--- End of file ---",
        name, text
    )
}

/// Fold the prompt and attachments into one user message.
///
/// The message always starts with exactly one text part; inline images follow
/// it in attachment order.
pub fn assemble(prompt: &str, attachments: &[Attachment], is_first_turn: bool) -> Message {
    let mut text = prompt.to_string();
    let mut images = Vec::new();

    for attachment in attachments {
        match &attachment.content {
            NormalizedContent::InlineImage(image) => images.push(image.clone()),
            other => {
                if let Some(body) = other.transcript_text() {
                    text.push_str(&attachment_block(&attachment.name, body));
                }
            }
        }
    }

    if is_first_turn {
        text.push_str(TITLE_DIRECTIVE);
    }

    images
        .into_iter()
        .fold(Message::user().with_text(text), |message, image| {
            message.with_content(image.into())
        })
}

/// Normalizes attachments and talks to the conversational model
#[derive(Clone)]
pub struct Conversation {
    provider: Arc<dyn Provider>,
    normalizer: Normalizer,
}

impl Conversation {
    pub fn new(provider: Arc<dyn Provider>, normalizer: Normalizer) -> Self {
        Self {
            provider,
            normalizer,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub async fn converse(
        &self,
        profile: &ConversationProfile,
        prompt: Option<&str>,
        resources: &[UploadedResource],
        options: ConverseOptions,
    ) -> QuillResult<InterpretedResult> {
        let prompt = prompt.unwrap_or_default();
        if prompt.trim().is_empty() && resources.is_empty() {
            return Err(QuillError::InvalidInput(
                "Prompt or at least one file is required".to_string(),
            ));
        }

        let mut attachments = Vec::with_capacity(resources.len());
        for resource in resources {
            tracing::info!(
                file = resource.display_name(),
                media_type = resource.media_type.as_deref().unwrap_or("none"),
                "processing attachment"
            );
            let content = self.normalizer.normalize(resource).await;
            attachments.push(Attachment::new(resource.display_name(), content));
        }

        let message = assemble(prompt, &attachments, options.is_first_turn);
        self.send(profile, message).await
    }

    /// Send an already assembled user text under the given profile
    pub async fn send_text(
        &self,
        profile: &ConversationProfile,
        text: &str,
    ) -> QuillResult<InterpretedResult> {
        self.send(profile, Message::user().with_text(text)).await
    }

    async fn send(
        &self,
        profile: &ConversationProfile,
        message: Message,
    ) -> QuillResult<InterpretedResult> {
        tracing::info!(
            model = %profile.settings.model,
            images = message.images().count(),
            "sending request to AI model"
        );
        let (reply, usage) = self
            .provider
            .complete(&profile.system_instruction, &[message], &profile.settings)
            .await
            .map_err(|e| {
                tracing::error!("AI service call failed: {}", e);
                QuillError::ServiceUnavailable(e.to_string())
            })?;
        tracing::debug!(?usage, "received AI response");

        Ok(interpret(&reply.text(), &profile.fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::ImageContent;
    use crate::normalize::ImagePolicy;
    use crate::providers::mock::MockProvider;
    use serde_json::json;

    fn conversation(provider: &MockProvider) -> Conversation {
        Conversation::new(
            Arc::new(provider.clone()),
            Normalizer::new(ImagePolicy::PassThrough),
        )
    }

    fn chat_profile() -> ConversationProfile {
        ConversationProfile::chat(
            ModelSettings::new("qwen-plus")
                .with_temperature(0.7)
                .with_max_tokens(4096),
        )
    }

    #[tokio::test]
    async fn test_empty_request_makes_no_calls() {
        let provider = MockProvider::with_replies(["unused"]);
        let conversation = conversation(&provider);

        for prompt in [None, Some(""), Some("  \n\t")] {
            let result = conversation
                .converse(&chat_profile(), prompt, &[], ConverseOptions::default())
                .await;
            assert!(matches!(result, Err(QuillError::InvalidInput(_))));
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_attachment_without_prompt_is_accepted() {
        let provider = MockProvider::with_replies([r#"{"text_explanation": "ok"}"#]);
        let resources = [UploadedResource::new("2 + 2", Some("text/plain"), None)];

        let result = conversation(&provider)
            .converse(&chat_profile(), None, &resources, ConverseOptions::default())
            .await
            .unwrap();

        assert_eq!(result.to_json(), json!({"text_explanation": "ok"}));
        let calls = provider.calls();
        assert_eq!(
            calls[0].messages[0].text(),
            "\n\n--- Attached file 'unnamed' ---\n2 + 2\n--- End of file ---"
        );
    }

    #[tokio::test]
    async fn test_title_directive_is_last() {
        let provider = MockProvider::with_replies(["{}"]);
        let resources = [
            UploadedResource::new("first", Some("text/plain"), Some("a.txt")),
            UploadedResource::new(&b"PK"[..], Some("application/zip"), Some("b.zip")),
        ];

        conversation(&provider)
            .converse(
                &chat_profile(),
                Some("Explain these"),
                &resources,
                ConverseOptions {
                    is_first_turn: true,
                },
            )
            .await
            .unwrap();

        let text = provider.calls()[0].messages[0].text();
        assert!(text.starts_with("Explain these"));
        assert!(text.ends_with(TITLE_DIRECTIVE));
        assert!(text.find("End of file").unwrap() < text.find("first message").unwrap());
        assert!(text.contains("Unsupported file type: application/zip"));
    }

    #[tokio::test]
    async fn test_images_follow_single_text_part() {
        let provider = MockProvider::with_replies(["{}"]);
        let resources = [
            UploadedResource::new(&b"one"[..], Some("image/png"), Some("1.png")),
            UploadedResource::new("notes", Some("text/plain"), Some("notes.txt")),
            UploadedResource::new(&b"two"[..], Some("image/jpeg"), Some("2.jpg")),
        ];

        conversation(&provider)
            .converse(
                &chat_profile(),
                Some("What is shown?"),
                &resources,
                ConverseOptions::default(),
            )
            .await
            .unwrap();

        let call = &provider.calls()[0];
        assert_eq!(call.system, CHAT_SYSTEM_PROMPT);
        assert_eq!(call.settings.temperature, Some(0.7));
        assert_eq!(call.messages.len(), 1);

        let content = &call.messages[0].content;
        assert_eq!(content.len(), 3);
        assert_eq!(
            content[0].as_text(),
            Some("What is shown?\n\n--- Attached file 'notes.txt' ---\nnotes\n--- End of file ---")
        );
        assert_eq!(content[1].as_image().unwrap().mime_type, "image/png");
        assert_eq!(content[2].as_image().unwrap().mime_type, "image/jpeg");
        assert_eq!(
            content[2].as_image().unwrap().data,
            ImageContent::from_bytes(b"two", "image/jpeg").data
        );
    }

    #[tokio::test]
    async fn test_prose_reply_uses_fallback() {
        let provider = MockProvider::with_replies(["hello world"]);
        let result = conversation(&provider)
            .converse(&chat_profile(), Some("hi"), &[], ConverseOptions::default())
            .await
            .unwrap();
        assert_eq!(result.to_json(), json!({"response": "hello world", "title": null}));
    }

    #[tokio::test]
    async fn test_provider_failure_is_service_unavailable() {
        let provider = MockProvider::failing("connection refused");
        let result = conversation(&provider)
            .converse(&chat_profile(), Some("hi"), &[], ConverseOptions::default())
            .await;
        assert_eq!(
            result,
            Err(QuillError::ServiceUnavailable("connection refused".to_string()))
        );
    }

    #[test]
    fn test_assemble_failed_extraction_is_inlined() {
        let attachments = [Attachment::new(
            "scan.pdf",
            NormalizedContent::ExtractionFailed("Error extracting PDF text: bad xref".to_string()),
        )];
        let message = assemble("Check this", &attachments, false);
        assert_eq!(
            message.text(),
            "Check this\n\n--- Attached file 'scan.pdf' ---\nError extracting PDF text: bad xref\n--- End of file ---"
        );
        assert_eq!(message.images().count(), 0);
    }
}
