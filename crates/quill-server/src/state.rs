use std::sync::Arc;

use quill::conversation::{Conversation, ConversationProfile};
use quill::normalize::{ImagePolicy, ImageMode, Normalizer, OcrEngine};
use quill::providers::base::Provider;

use crate::configuration::Settings;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub conversation: Arc<Conversation>,
    /// Always transcribes images, whatever the chat policy is
    pub ocr: Arc<Normalizer>,
    pub chat_profile: Arc<ConversationProfile>,
    pub grading_profile: Arc<ConversationProfile>,
    pub follow_up_profile: Arc<ConversationProfile>,
}

impl AppState {
    pub fn new(provider: Arc<dyn Provider>, settings: &Settings) -> Self {
        let engine = OcrEngine::new(provider.clone(), settings.ocr_model());
        let chat_policy = ImagePolicy::from_mode(settings.chat.image_policy, engine.clone());
        tracing::info!(image_policy = %settings.chat.image_policy, "chat image handling configured");

        Self {
            conversation: Arc::new(Conversation::new(provider, Normalizer::new(chat_policy))),
            ocr: Arc::new(Normalizer::new(ImagePolicy::from_mode(
                ImageMode::EagerOcr,
                engine,
            ))),
            chat_profile: Arc::new(ConversationProfile::chat(settings.chat_model())),
            grading_profile: Arc::new(ConversationProfile::grading(settings.grading_model())),
            follow_up_profile: Arc::new(ConversationProfile::grading_follow_up(
                settings.grading_model(),
            )),
        }
    }
}
