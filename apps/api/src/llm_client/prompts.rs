// Shared prompt fragments used by every structured-output call.
// Feature-specific prompts live next to the feature (see tailoring::prompts).

/// Appended to every prompt whose answer is parsed as JSON.
pub const JSON_ENFORCEMENT_SUFFIX: &str = "

CRITICAL: Your response must be ONLY a valid JSON object. Do not include:
- Markdown code blocks (```json)
- Explanatory text before or after
- Any formatting except the raw JSON

Start your response with { and end with }
";

/// Appends the JSON-only instruction to a prompt.
pub fn with_json_enforcement(prompt: &str) -> String {
    format!("{prompt}{JSON_ENFORCEMENT_SUFFIX}")
}
