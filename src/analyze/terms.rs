// src/analyze/terms.rs
//! Keyword matching shared by category, urgency and priority detection.
//!
//! ASCII terms match as whole words (case-insensitive `\b` boundaries).
//! Terms with any non-ASCII character (CJK etc.) have no useful word
//! boundaries, so they match as lowercase substrings instead.

use regex::Regex;

#[derive(Debug, Clone)]
enum Pattern {
    Word(Regex),
    Substring(String),
}

#[derive(Debug, Clone)]
pub struct TermMatcher {
    term: String,
    pattern: Pattern,
}

impl TermMatcher {
    pub fn new(term: &str) -> Result<Self, regex::Error> {
        let term = term.trim();
        let pattern = if term.is_ascii() {
            Pattern::Word(Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term)))?)
        } else {
            Pattern::Substring(term.to_lowercase())
        };
        Ok(Self {
            term: term.to_string(),
            pattern,
        })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// `lowered` must be `text.to_lowercase()`; callers compute it once per item.
    pub fn is_match(&self, text: &str, lowered: &str) -> bool {
        if self.term.is_empty() {
            return false;
        }
        match &self.pattern {
            Pattern::Word(re) => re.is_match(text),
            Pattern::Substring(needle) => lowered.contains(needle.as_str()),
        }
    }
}

/// Build matchers for a term list, skipping blanks.
pub fn compile(terms: &[String]) -> Result<Vec<TermMatcher>, regex::Error> {
    terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| TermMatcher::new(t))
        .collect()
}

/// Headline plus body, the text every detector scans.
pub struct ScanText {
    pub text: String,
    pub lowered: String,
}

impl ScanText {
    pub fn new(headline: &str, body: Option<&str>) -> Self {
        let text = match body {
            Some(b) if !b.trim().is_empty() => format!("{headline}\n{b}"),
            _ => headline.to_string(),
        };
        let lowered = text.to_lowercase();
        Self { text, lowered }
    }

    pub fn matches(&self, m: &TermMatcher) -> bool {
        m.is_match(&self.text, &self.lowered)
    }

    pub fn any(&self, ms: &[TermMatcher]) -> bool {
        ms.iter().any(|m| self.matches(m))
    }
}
