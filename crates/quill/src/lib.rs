pub mod conversation;
pub mod errors;
pub mod grading;
pub mod interpret;
pub mod models;
pub mod normalize;
pub mod prompt_template;
pub mod prompts;
pub mod providers;
