//! Fixed instructions sent to the model. Templates are rendered with
//! [`crate::prompt_template::load_prompt`].

pub const CHAT_SYSTEM_PROMPT: &str = include_str!("prompts/chat_system.md");
pub const GRADING_SYSTEM_PROMPT: &str = include_str!("prompts/grading_system.md");
pub const GRADING_FOLLOW_UP_PROMPT: &str = include_str!("prompts/grading_follow_up.md");

pub const GRADING_REQUEST_TEMPLATE: &str = include_str!("prompts/grading_request.md");
pub const FOLLOW_UP_CONTEXT_TEMPLATE: &str = include_str!("prompts/follow_up_context.md");
pub const FOLLOW_UP_TURN_TEMPLATE: &str = include_str!("prompts/follow_up_turn.md");

/// Sent alongside every image under eager OCR
pub const OCR_INSTRUCTION: &str = "Extract all mathematical formulas and text from this image. \
Do not add any explanation or commentary, return only the extracted plain text.";

/// Appended to the first message of a conversation
pub const TITLE_DIRECTIVE: &str = "\n\n(Note: this is the first message of the conversation. \
Include a 'title' field in your JSON answer.)";
