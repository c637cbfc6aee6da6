use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

/// Render an inline tera template against any serializable context.
///
/// Templates are registered without a file extension so tera never HTML-escapes
/// the values; student work is full of `<` and `&`.
pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::GRADING_REQUEST_TEMPLATE;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_load_prompt() {
        let template = "Hello, {{ name }}! You are {{ age }} years old.";
        let mut context = HashMap::new();
        context.insert("name".to_string(), "Alice".to_string());
        context.insert("age".to_string(), 30.to_string());

        let result = load_prompt(template, &context).unwrap();
        assert_eq!(result, "Hello, Alice! You are 30 years old.");
    }

    #[test]
    fn test_load_prompt_missing_variable() {
        let template = "Hello, {{ name }}! You are {{ age }} years old.";
        let mut context = HashMap::new();
        context.insert("name".to_string(), "Alice".to_string());
        // 'age' is missing from context
        let result = load_prompt(template, &context);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_prompt_does_not_escape() {
        let result = load_prompt("{{ expr }}", &json!({"expr": "a < b && c > d"})).unwrap();
        assert_eq!(result, "a < b && c > d");
    }

    #[test]
    fn test_grading_request_template() {
        let result = load_prompt(
            GRADING_REQUEST_TEMPLATE,
            &json!({"problem": "Solve x + 1 = 2", "solution": "x = 1"}),
        )
        .unwrap();
        let problem_at = result.find("Solve x + 1 = 2").unwrap();
        let solution_at = result.find("x = 1").unwrap();
        assert!(problem_at < solution_at);
    }
}
