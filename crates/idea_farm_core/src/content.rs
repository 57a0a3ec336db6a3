//! Rules for the text handed to the summarizer.

use crate::domain::{Idea, InputType};
use crate::ports::ExtractionFailure;

/// Upper bound on stored extracted text, in characters.
pub const MAX_EXTRACTED_CHARS: usize = 900_000;

pub const TRUNCATION_MARKER: &str = "... (truncated)";

pub const SYSTEM_NOTE_PREFIX: &str = "SYSTEM_NOTE: The content extraction failed";

/// Banner the model is asked to open its overview with when extraction failed.
pub const EXTRACTION_FAILED_BANNER: &str = "⚠️ **Content Extraction Failed**";

/// Cuts `text` to `max_chars` characters, appending the truncation marker if anything was cut.
pub fn truncate_with_marker(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            let mut truncated = text;
            truncated.truncate(byte_index);
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => text,
    }
}

/// The note that replaces extracted text when a URL could not be read.
pub fn extraction_failure_note(reason: &str, url: &str) -> String {
    format!(
        "{} with error: '{}'. Please summarize based on the URL itself, but START THE SUMMARY with: '{}'.\n\nURL: {}",
        SYSTEM_NOTE_PREFIX,
        reason,
        EXTRACTION_FAILED_BANNER,
        url
    )
}

/// Resolves the text for an idea given the extraction result (only consulted for URLs).
pub fn resolve_extracted_text(
    idea: &Idea,
    extraction: Option<Result<String, ExtractionFailure>>,
) -> String {
    let text = match idea.input_type {
        InputType::Text => idea.original_content.clone(),
        InputType::Url => match extraction {
            Some(Ok(text)) if !text.trim().is_empty() => text,
            Some(Ok(_)) => extraction_failure_note(
                "Extraction returned empty content.",
                &idea.original_content,
            ),
            Some(Err(failure)) => extraction_failure_note(
                &format!("Extraction failed: {}", failure),
                &idea.original_content,
            ),
            None => extraction_failure_note(
                "Extraction was not attempted.",
                &idea.original_content,
            ),
        },
    };
    truncate_with_marker(text, MAX_EXTRACTED_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn url_idea(url: &str) -> Idea {
        Idea::new(Uuid::new_v4(), InputType::Url, url.to_string())
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_with_marker("hello".into(), 10), "hello");
        assert_eq!(truncate_with_marker("hello".into(), 5), "hello");
    }

    #[test]
    fn long_text_is_cut_on_character_boundaries() {
        let truncated = truncate_with_marker("héllo wörld".into(), 4);
        assert_eq!(truncated, format!("héll{}", TRUNCATION_MARKER));
    }

    #[test]
    fn text_ideas_pass_through_verbatim() {
        let idea = Idea::new(
            Uuid::new_v4(),
            InputType::Text,
            "Remember to refactor the scheduler".into(),
        );
        assert_eq!(
            resolve_extracted_text(&idea, None),
            "Remember to refactor the scheduler"
        );
    }

    #[test]
    fn oversized_extraction_is_truncated() {
        let idea = url_idea("https://example.com/big");
        let big = "a".repeat(MAX_EXTRACTED_CHARS + 10);
        let text = resolve_extracted_text(&idea, Some(Ok(big)));
        assert_eq!(
            text.chars().count(),
            MAX_EXTRACTED_CHARS + TRUNCATION_MARKER.chars().count()
        );
        assert!(text.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn failed_extraction_produces_system_note() {
        let idea = url_idea("https://unreachable.invalid/page");
        let text = resolve_extracted_text(
            &idea,
            Some(Err(ExtractionFailure::Fetch("dns error".into()))),
        );
        assert!(text.starts_with(SYSTEM_NOTE_PREFIX));
        assert!(text.contains("dns error"));
        assert!(text.contains("https://unreachable.invalid/page"));
        assert!(text.contains(EXTRACTION_FAILED_BANNER));
    }

    #[test]
    fn empty_extraction_counts_as_failure() {
        let idea = url_idea("https://example.com/blank");
        let text = resolve_extracted_text(&idea, Some(Ok("   ".into())));
        assert!(text.starts_with(SYSTEM_NOTE_PREFIX));
        assert!(text.contains("empty content"));
    }
}
