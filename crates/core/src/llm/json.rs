const FENCE: &str = "```";

/// Strips Markdown code-fence wrapping (```` ```json ```` or ```` ``` ````) from a model reply.
///
/// Repeats until nothing changes, so the function is idempotent, and text without fences
/// comes back only trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let mut current = text.trim();
    loop {
        let mut next = current;
        if let Some(rest) = next.strip_prefix("```json") {
            next = rest;
        } else if let Some(rest) = next.strip_prefix(FENCE) {
            next = rest;
        }
        if let Some(rest) = next.strip_suffix(FENCE) {
            next = rest;
        }
        let next = next.trim();
        if next.len() == current.len() {
            return current;
        }
        current = next;
    }
}

/// Strip fences, then decode.
pub fn decode_reply<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str::<T>(strip_code_fences(text))
}
