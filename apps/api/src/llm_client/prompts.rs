// Shared prompt fragments. Each feature that talks to the model keeps its own
// prompts.rs alongside it; only cross-cutting pieces live here.

/// Appended to every prompt that expects structured output. The response
/// parser still tolerates prose and code fences when the model ignores it.
pub const JSON_ONLY_INSTRUCTION: &str = "Respond with the JSON only. \
    Do not add explanations before or after it.";
