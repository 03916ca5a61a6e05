// Prompt templates for answer scoring.

use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;

pub fn build_scoring_prompt(question: &str, user_answer: &str, expected_answer: &str) -> String {
    format!(
        "Question: \"{question}\"\n\
         User Answer: \"{user_answer}\"\n\
         Correct Answer: \"{expected_answer}\"\n\
         Please compare the user's answer to the correct answer, provide a rating (1-10), and give feedback.\n\
         Return the result as JSON with \"ratings\" (number) and \"feedback\" (string).\n\
         {JSON_ONLY_INSTRUCTION}"
    )
}
