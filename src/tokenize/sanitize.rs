use std::collections::HashSet;

/// One text-cleaning step applied before tokenizing.
pub trait Sanitizer: Send + Sync {
    /// Return the cleaned form of `text`.
    fn sanitize(&self, text: &str) -> String;
}

/// Lower-cases text unless the run is case sensitive.
#[derive(Debug, Clone)]
pub struct CaseSanitizer {
    case_sensitive: bool,
}

impl CaseSanitizer {
    /// Create a case sanitizer.
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }
}

impl Sanitizer for CaseSanitizer {
    fn sanitize(&self, text: &str) -> String {
        if self.case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        }
    }
}

/// Replaces every filtered character with a replacement string (possibly empty).
#[derive(Debug, Clone)]
pub struct FilteringSanitizer {
    filtered: HashSet<char>,
    replacement: String,
}

impl FilteringSanitizer {
    /// Replace each of `filtered` with `replacement`.
    pub fn new(replacement: impl Into<String>, filtered: impl IntoIterator<Item = char>) -> Self {
        Self {
            filtered: filtered.into_iter().collect(),
            replacement: replacement.into(),
        }
    }

    /// Replace each of `filtered` with the delimiter.
    pub fn with_delimiter(delimiter: char, filtered: impl IntoIterator<Item = char>) -> Self {
        Self::new(delimiter, filtered)
    }
}

impl Sanitizer for FilteringSanitizer {
    fn sanitize(&self, text: &str) -> String {
        if self.filtered.is_empty() {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if self.filtered.contains(&c) {
                out.push_str(&self.replacement);
            } else {
                out.push(c);
            }
        }
        out
    }
}

/// Cuts text at the first occurrence of any trim character.
#[derive(Debug, Clone)]
pub struct TrimmingSanitizer {
    trim: Vec<char>,
}

impl TrimmingSanitizer {
    /// Trim at the first of `trim`.
    pub fn new(trim: impl IntoIterator<Item = char>) -> Self {
        Self {
            trim: trim.into_iter().collect(),
        }
    }
}

impl Sanitizer for TrimmingSanitizer {
    fn sanitize(&self, text: &str) -> String {
        match text.find(|c: char| self.trim.contains(&c)) {
            Some(cut) => text[..cut].to_string(),
            None => text.to_string(),
        }
    }
}

/// Sanitizers applied in insertion order.
#[derive(Default)]
pub struct SanitizerChain {
    steps: Vec<Box<dyn Sanitizer>>,
}

impl SanitizerChain {
    /// An empty chain (identity).
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn then(mut self, step: impl Sanitizer + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Run every step over `text`.
    pub fn apply(&self, text: &str) -> String {
        self.steps
            .iter()
            .fold(text.to_string(), |acc, step| step.sanitize(&acc))
    }
}

impl std::fmt::Debug for SanitizerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanitizerChain")
            .field("steps", &self.steps.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case() {
        assert_eq!(CaseSanitizer::new(false).sanitize("AbC"), "abc");
        assert_eq!(CaseSanitizer::new(true).sanitize("AbC"), "AbC");
    }

    #[test]
    fn filtering_replaces_every_occurrence() {
        let s = FilteringSanitizer::with_delimiter(' ', ['-', '_']);
        assert_eq!(s.sanitize("a-b_c-d"), "a b c d");
        let drop = FilteringSanitizer::new("", ['\'']);
        assert_eq!(drop.sanitize("don't"), "dont");
    }

    #[test]
    fn trimming_cuts_at_first_match() {
        let s = TrimmingSanitizer::new([',', '@']);
        assert_eq!(s.sanitize("user@example.com"), "user");
        assert_eq!(s.sanitize("a,b@c"), "a");
        assert_eq!(s.sanitize("plain"), "plain");
    }

    #[test]
    fn chain_runs_in_order() {
        let chain = SanitizerChain::new()
            .then(CaseSanitizer::new(false))
            .then(FilteringSanitizer::with_delimiter(' ', ['.']));
        assert_eq!(chain.apply("Hello.World"), "hello world");
        assert_eq!(SanitizerChain::new().apply("same"), "same");
    }
}
