//! Prompt text for AI-mode reformatting.
//!
//! Keeping the instruction block here means the rules can be changed (or
//! inspected by tests) without touching the HTTP client in
//! [`crate::pipeline::format`].

/// Instruction block prepended to the raw extracted text.
pub const FORMAT_INSTRUCTIONS: &str = "Convert the following raw PDF text into well-formatted markdown.
Rules:
- Use appropriate heading levels
- Format lists properly
- Preserve code blocks if present
- Add proper spacing
- Make it readable and well-structured
- Do not output any preamble or explanation, just the markdown.";

/// Build the full prompt sent to the model for one document.
pub fn format_prompt(raw_text: &str) -> String {
    format!("{FORMAT_INSTRUCTIONS}\n\nRaw text:\n{raw_text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_ends_with_raw_text() {
        let p = format_prompt("Chapter 1\nIntro");
        assert!(p.starts_with("Convert the following raw PDF text"));
        assert!(p.ends_with("Raw text:\nChapter 1\nIntro"));
    }

    #[test]
    fn prompt_forbids_preamble() {
        assert!(FORMAT_INSTRUCTIONS.contains("Do not output any preamble"));
        assert!(FORMAT_INSTRUCTIONS.contains("heading levels"));
        assert!(FORMAT_INSTRUCTIONS.contains("code blocks"));
    }
}
