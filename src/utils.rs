//! Small string helpers shared across modules.

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte count
/// indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…(+{} bytes)", &s[..end], s.len() - end)
    }
}

/// Lowercase-hyphen slug for category names.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Words of `text` that carry meaning, in original order.
///
/// Used by the deterministic title fallback: stop words would make a fallback
/// title read like filler.
pub fn meaningful_words(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .filter(|word| !is_stop_word(&word.to_lowercase()))
        .collect()
}

fn is_stop_word(word: &str) -> bool {
    const STOP_WORDS: [&str; 24] = [
        "a", "an", "the", "and", "or", "but", "of", "in", "on", "at", "to", "for", "with", "by",
        "from", "as", "is", "are", "was", "were", "be", "this", "that", "its",
    ];
    STOP_WORDS.contains(&word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let s = "é".repeat(100);
        let result = truncate_for_log(&s, 101);
        assert!(result.starts_with('é'));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Science & Technology"), "science-technology");
        assert_eq!(slugify("Health"), "health");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
    }

    #[test]
    fn test_meaningful_words_filters_stop_words() {
        let words = meaningful_words("The Future of Artificial Intelligence in Healthcare");
        assert_eq!(words, vec!["Future", "Artificial", "Intelligence", "Healthcare"]);
    }

    #[test]
    fn test_meaningful_words_empty_input() {
        assert!(meaningful_words("").is_empty());
    }
}
