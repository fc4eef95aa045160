// src/analyze/mod.rs
//! Item classification: categories, language, urgency and priority.
//!
//! A `Classifier` is built once from `ClassifierConfig` (all regexes compiled
//! up front) and is then pure: the same text and configuration always yield
//! the same output.

pub mod categories;
pub mod language;
pub mod priority;
pub mod terms;
pub mod urgency;

use crate::analyze::categories::CategoryDetector;
use crate::analyze::priority::PriorityScorer;
use crate::analyze::terms::ScanText;
use crate::analyze::urgency::UrgencyDetector;
use crate::ingest::config::ClassifierConfig;
use crate::model::{CategorySet, Item, Urgency};

pub use crate::analyze::language::{detect_language, UNKNOWN_LANGUAGE};
pub use crate::analyze::priority::rank_by_score;

/// Everything the classifier derives from one item's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub categories: CategorySet,
    pub language: String,
    pub urgency: Urgency,
    pub priority_score: i32,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    categories: CategoryDetector,
    urgency: UrgencyDetector,
    priority: PriorityScorer,
}

impl Classifier {
    pub fn new(cfg: &ClassifierConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            categories: CategoryDetector::new(&cfg.categories)?,
            urgency: UrgencyDetector::new(&cfg.urgency)?,
            priority: PriorityScorer::new(&cfg.priority)?,
        })
    }

    pub fn classify(
        &self,
        headline: &str,
        body: Option<&str>,
        requested: Option<&str>,
    ) -> Classification {
        let text = ScanText::new(headline, body);
        Classification {
            categories: self.categories.detect(&text, requested),
            language: detect_language(headline),
            urgency: self.urgency.detect(&text),
            priority_score: self.priority.score(&text),
        }
    }

    /// Classify `item` in place from its headline and body.
    pub fn apply(&self, item: &mut Item, requested: Option<&str>) {
        let c = self.classify(&item.headline, item.body.as_deref(), requested);
        item.categories = c.categories;
        item.language = c.language;
        item.urgency = c.urgency;
        item.priority_score = c.priority_score;
    }

    /// Minimum-score filters (global, then highest per-category).
    pub fn passes_filters(&self, item: &Item) -> bool {
        self.priority.passes(item)
    }
}
