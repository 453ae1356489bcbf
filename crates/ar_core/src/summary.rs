/// Maximum summary length in characters.
pub const MAX_SUMMARY_LENGTH: usize = 200;

/// Summary of an article body: the body itself when short, otherwise its
/// first [`MAX_SUMMARY_LENGTH`] characters.
pub fn generate_summary(content: &str) -> String {
    truncate_chars(content, MAX_SUMMARY_LENGTH)
}

pub fn truncate_chars(content: &str, max: usize) -> String {
    match content.char_indices().nth(max) {
        Some((end, _)) => content[..end].to_string(),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_content_is_kept_verbatim() {
        let content = "a".repeat(199);
        assert_eq!(generate_summary(&content), content);
        assert_eq!(generate_summary(""), "");
    }

    #[test]
    fn test_long_content_is_truncated() {
        let exact = "b".repeat(200);
        assert_eq!(generate_summary(&exact), exact);

        let long = format!("{}{}", "c".repeat(200), "tail");
        let summary = generate_summary(&long);
        assert_eq!(summary.chars().count(), 200);
        assert!(long.starts_with(&summary));
    }

    #[test]
    fn test_multibyte_content_is_cut_on_char_boundary() {
        let content = "文".repeat(250);
        let summary = generate_summary(&content);
        assert_eq!(summary.chars().count(), 200);
        assert_eq!(summary.len(), 600);
    }
}
