// Prompt templates for question generation.

use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;

use super::validation::ValidatedForm;

/// Number of questions requested per interview.
pub const QUESTION_COUNT: usize = 5;

/// Inline example of the expected shape.
const QUESTIONS_EXAMPLE: &str = r#"[{"question": "What is React?", "answer": "React is a JavaScript library for building user interfaces."}, ...]"#;

/// Whole years read as integers ("3 years", not "3.0 years").
fn format_years(experience: f64) -> String {
    if experience.fract() == 0.0 {
        format!("{experience:.0}")
    } else {
        experience.to_string()
    }
}

pub fn build_questions_prompt(form: &ValidatedForm) -> String {
    format!(
        "Generate {count} technical interview questions for {position} based on the following:\n\
         - Job Description: {description}\n\
         - Experience: {years} years\n\
         - Tech Stack: {tech_stack}\n\
         Return the result as a JSON array where each item has \"question\" and \"answer\" fields.\n\
         Example: {example}\n\
         {json_only}",
        count = QUESTION_COUNT,
        position = form.position,
        description = form.description,
        years = format_years(form.experience),
        tech_stack = form.tech_stack,
        example = QUESTIONS_EXAMPLE,
        json_only = JSON_ONLY_INSTRUCTION,
    )
}
