use crate::models::answer::UserAnswer;

/// Mean rating across `answers`, one decimal, halves rounded away from zero.
/// `"0.0"` when nothing has been answered yet.
pub fn overall_rating(answers: &[UserAnswer]) -> String {
    if answers.is_empty() {
        return "0.0".to_string();
    }
    let total: f64 = answers.iter().map(|a| f64::from(a.rating)).sum();
    let mean = total / answers.len() as f64;
    format!("{:.1}", (mean * 10.0).round() / 10.0)
}
