use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAX_POSITION_CHARS: usize = 100;
const MIN_DESCRIPTION_CHARS: usize = 10;

/// Raw editor form as posted by the browser. `experience` arrives as a
/// number or as the text of a number input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewForm {
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub experience: Value,
    #[serde(default)]
    pub tech_stack: String,
}

/// A form that passed every field rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedForm {
    pub position: String,
    pub description: String,
    pub experience: f64,
    pub tech_stack: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Number-input coercion: empty and null read as zero.
fn coerce_experience(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Null => 0.0,
        Value::Number(n) => n.as_f64()?,
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Array(_) | Value::Object(_) => return None,
    };
    number.is_finite().then_some(number)
}

/// Checks every field and reports all failures at once.
pub fn validate(form: &InterviewForm) -> Result<ValidatedForm, Vec<FieldError>> {
    let mut errors = Vec::new();

    let position = form.position.trim();
    if position.is_empty() {
        errors.push(FieldError::new("position", "Position is required"));
    } else if position.chars().count() > MAX_POSITION_CHARS {
        errors.push(FieldError::new(
            "position",
            "Position must be at most 100 characters",
        ));
    }

    let description = form.description.trim();
    if description.chars().count() < MIN_DESCRIPTION_CHARS {
        errors.push(FieldError::new("description", "Description is required"));
    }

    let experience = coerce_experience(&form.experience);
    match experience {
        None => errors.push(FieldError::new("experience", "Experience must be a number")),
        Some(years) if years < 0.0 => {
            errors.push(FieldError::new("experience", "Experience cannot be negative"))
        }
        Some(_) => {}
    }

    let tech_stack = form.tech_stack.trim();
    if tech_stack.is_empty() {
        errors.push(FieldError::new(
            "techStack",
            "Tech stack must be at least a character",
        ));
    }

    match experience {
        Some(experience) if errors.is_empty() => Ok(ValidatedForm {
            position: position.to_string(),
            description: description.to_string(),
            experience,
            tech_stack: tech_stack.to_string(),
        }),
        _ => Err(errors),
    }
}
