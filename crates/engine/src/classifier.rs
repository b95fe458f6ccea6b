/// Pluggable "is the user asking for help" seam. The default keyword
/// containment check is intentionally simple; swapping in a better
/// classifier must not touch the tracker's transition logic.
pub trait HelpClassifier: Send + Sync {
    fn is_help_request(&self, text: &str) -> bool;
}

pub const DEFAULT_HELP_KEYWORDS: [&str; 5] = ["help", "hint", "stuck", "how", "what"];

/// Case-insensitive substring containment against a fixed keyword set.
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new(keywords: impl IntoIterator<Item = String>) -> Self {
        let keywords = keywords
            .into_iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn with_default_keywords() -> Self {
        Self::new(DEFAULT_HELP_KEYWORDS.iter().map(|keyword| keyword.to_string()))
    }
}

impl HelpClassifier for KeywordClassifier {
    fn is_help_request(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.keywords.iter().any(|keyword| lowered.contains(keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keywords_match_case_insensitively() {
        let classifier = KeywordClassifier::with_default_keywords();

        assert!(classifier.is_help_request("I'm STUCK on the mushroom puzzle"));
        assert!(classifier.is_help_request("can I get a hint?"));
        assert!(classifier.is_help_request("How does the safe open?"));
        assert!(!classifier.is_help_request("nice room decorations"));
    }

    #[test]
    fn containment_is_substring_level() {
        // "what" inside "whatever" counts; the heuristic is deliberately blunt.
        let classifier = KeywordClassifier::with_default_keywords();
        assert!(classifier.is_help_request("whatever this dial does"));
    }

    #[test]
    fn custom_keyword_set_replaces_the_default() {
        let classifier = KeywordClassifier::new(vec!["ayuda".to_string()]);
        assert!(classifier.is_help_request("necesito AYUDA con el candado"));
        assert!(!classifier.is_help_request("give me a hint"));
    }
}
