//! Homework grading and follow-up questions about a correction.
//!
//! Nothing is stored between turns: the client sends the problem, the
//! solution and the correction it was given with every follow-up.

use serde::Serialize;
use serde_json::json;

use crate::conversation::{Conversation, ConversationProfile};
use crate::errors::{QuillError, QuillResult};
use crate::interpret::InterpretedResult;
use crate::prompt_template::load_prompt;
use crate::prompts::{
    FOLLOW_UP_CONTEXT_TEMPLATE, FOLLOW_UP_TURN_TEMPLATE, GRADING_FOLLOW_UP_PROMPT,
    GRADING_REQUEST_TEMPLATE,
};

/// The state a follow-up turn is anchored to
#[derive(Debug, Clone, Serialize)]
pub struct GradingContext {
    pub problem: String,
    pub solution: String,
    pub correction: String,
}

impl GradingContext {
    pub fn new<P, S, C>(problem: P, solution: S, correction: C) -> Self
    where
        P: Into<String>,
        S: Into<String>,
        C: Into<String>,
    {
        Self {
            problem: problem.into(),
            solution: solution.into(),
            correction: correction.into(),
        }
    }

    fn validate(&self) -> QuillResult<()> {
        require("problem_text", &self.problem)?;
        require("solution_text", &self.solution)?;
        require("correction_text", &self.correction)
    }
}

fn require(field: &str, value: &str) -> QuillResult<()> {
    if value.trim().is_empty() {
        return Err(QuillError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

pub async fn grade(
    conversation: &Conversation,
    profile: &ConversationProfile,
    problem: &str,
    solution: &str,
) -> QuillResult<InterpretedResult> {
    require("problem_text", problem)?;
    require("solution_text", solution)?;

    let request = load_prompt(
        GRADING_REQUEST_TEMPLATE,
        &json!({"problem": problem, "solution": solution}),
    )?;
    tracing::info!("sending grading request");
    conversation.send_text(profile, &request).await
}

/// The system context a client uses to open a chat about a correction
pub fn follow_up_system_prompt(context: &GradingContext) -> QuillResult<String> {
    context.validate()?;
    Ok(load_prompt(
        FOLLOW_UP_CONTEXT_TEMPLATE,
        &json!({
            "instruction": GRADING_FOLLOW_UP_PROMPT,
            "problem": context.problem,
            "solution": context.solution,
            "correction": context.correction,
        }),
    )?)
}

pub async fn follow_up(
    conversation: &Conversation,
    profile: &ConversationProfile,
    context: &GradingContext,
    question: &str,
) -> QuillResult<InterpretedResult> {
    context.validate()?;
    require("question", question)?;

    let turn = load_prompt(
        FOLLOW_UP_TURN_TEMPLATE,
        &json!({
            "problem": context.problem,
            "solution": context.solution,
            "correction": context.correction,
            "question": question,
        }),
    )?;
    conversation.send_text(profile, &turn).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{ImagePolicy, Normalizer};
    use crate::prompts::GRADING_SYSTEM_PROMPT;
    use crate::providers::base::ModelSettings;
    use crate::providers::mock::MockProvider;
    use std::sync::Arc;

    fn conversation(provider: &MockProvider) -> Conversation {
        Conversation::new(
            Arc::new(provider.clone()),
            Normalizer::new(ImagePolicy::PassThrough),
        )
    }

    fn settings() -> ModelSettings {
        ModelSettings::new("qwen-plus")
            .with_temperature(0.3)
            .with_max_tokens(4096)
    }

    fn context() -> GradingContext {
        GradingContext::new(
            "Solve 2x = 6",
            "x = 2",
            "Incorrect: dividing 6 by 2 gives x = 3.",
        )
    }

    #[tokio::test]
    async fn test_grade_prose_reply() {
        let provider = MockProvider::with_replies(["The answer x = 2 is wrong."]);
        let result = grade(
            &conversation(&provider),
            &ConversationProfile::grading(settings()),
            "Solve 2x = 6",
            "x = 2",
        )
        .await
        .unwrap();

        assert_eq!(
            result.to_json(),
            json!({"correction": "The answer x = 2 is wrong."})
        );

        let call = &provider.calls()[0];
        assert_eq!(call.system, GRADING_SYSTEM_PROMPT);
        assert_eq!(call.settings.temperature, Some(0.3));
        let text = call.messages[0].text();
        assert!(text.find("Solve 2x = 6").unwrap() < text.find("x = 2").unwrap());
    }

    #[tokio::test]
    async fn test_grade_requires_both_fields() {
        let provider = MockProvider::with_replies(["unused"]);
        let conversation = conversation(&provider);
        let profile = ConversationProfile::grading(settings());

        let missing_solution = grade(&conversation, &profile, "Solve 2x = 6", " ").await;
        assert_eq!(
            missing_solution,
            Err(QuillError::InvalidInput("solution_text is required".to_string()))
        );
        let missing_problem = grade(&conversation, &profile, "", "x = 3").await;
        assert!(matches!(missing_problem, Err(QuillError::InvalidInput(_))));
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_follow_up_system_prompt() {
        let prompt = follow_up_system_prompt(&context()).unwrap();
        assert!(prompt.starts_with(GRADING_FOLLOW_UP_PROMPT));
        let problem_at = prompt.find("Solve 2x = 6").unwrap();
        let solution_at = prompt.find("x = 2").unwrap();
        let correction_at = prompt.find("Incorrect: dividing").unwrap();
        assert!(problem_at < solution_at && solution_at < correction_at);
    }

    #[test]
    fn test_follow_up_system_prompt_requires_correction() {
        let context = GradingContext::new("Solve 2x = 6", "x = 2", "");
        assert!(matches!(
            follow_up_system_prompt(&context),
            Err(QuillError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_follow_up_puts_question_last() {
        let provider = MockProvider::with_replies([
            "```json\n{\"text_explanation\": \"Divide both sides by 2.\"}\n```",
        ]);
        let result = follow_up(
            &conversation(&provider),
            &ConversationProfile::grading_follow_up(settings()),
            &context(),
            "Why is it 3?",
        )
        .await
        .unwrap();

        assert_eq!(
            result.to_json(),
            json!({"text_explanation": "Divide both sides by 2."})
        );

        let call = &provider.calls()[0];
        assert_eq!(call.system, GRADING_FOLLOW_UP_PROMPT);
        let text = call.messages[0].text();
        assert!(text.trim_end().ends_with("Why is it 3?"));
        assert!(text.find("Incorrect: dividing").unwrap() < text.find("Why is it 3?").unwrap());
    }

    #[tokio::test]
    async fn test_follow_up_prose_reply() {
        let provider = MockProvider::with_replies(["Because 6 / 2 = 3."]);
        let result = follow_up(
            &conversation(&provider),
            &ConversationProfile::grading_follow_up(settings()),
            &context(),
            "Why?",
        )
        .await
        .unwrap();
        assert_eq!(
            result.to_json(),
            json!({"text_explanation": "Because 6 / 2 = 3.", "title": null})
        );
    }

    #[tokio::test]
    async fn test_follow_up_requires_question() {
        let provider = MockProvider::with_replies(["unused"]);
        let result = follow_up(
            &conversation(&provider),
            &ConversationProfile::grading_follow_up(settings()),
            &context(),
            "",
        )
        .await;
        assert_eq!(
            result,
            Err(QuillError::InvalidInput("question is required".to_string()))
        );
        assert_eq!(provider.call_count(), 0);
    }
}
