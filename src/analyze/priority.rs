// src/analyze/priority.rs
//! Additive keyword scoring and minimum-score filters.

use std::collections::BTreeMap;

use crate::analyze::terms::{ScanText, TermMatcher};
use crate::ingest::config::PriorityConfig;
use crate::model::{CategorySet, Item};

#[derive(Debug, Clone)]
pub struct PriorityScorer {
    keywords: Vec<(TermMatcher, i32)>,
    min_score: Option<i32>,
    category_min: BTreeMap<String, i32>,
}

impl PriorityScorer {
    pub fn new(cfg: &PriorityConfig) -> Result<Self, regex::Error> {
        let keywords = cfg
            .keywords
            .iter()
            .filter(|(k, _)| !k.trim().is_empty())
            .map(|(k, v)| Ok((TermMatcher::new(k)?, *v)))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        let category_min = cfg
            .category_min_score
            .iter()
            .map(|(k, v)| (k.trim().to_ascii_uppercase(), *v))
            .collect();
        Ok(Self {
            keywords,
            min_score: cfg.min_score,
            category_min,
        })
    }

    /// Sum of scores of every keyword present; each keyword counts once.
    pub fn score(&self, text: &ScanText) -> i32 {
        self.keywords
            .iter()
            .filter(|(m, _)| text.matches(m))
            .map(|(_, s)| *s)
            .sum()
    }

    /// Highest per-category minimum among `categories`, if any is configured.
    pub fn category_threshold(&self, categories: &CategorySet) -> Option<i32> {
        categories
            .iter()
            .filter_map(|c| self.category_min.get(&c.to_ascii_uppercase()).copied())
            .max()
    }

    /// Global minimum and category minimum must both hold.
    pub fn passes(&self, item: &Item) -> bool {
        if let Some(min) = self.min_score {
            if item.priority_score < min {
                return false;
            }
        }
        match self.category_threshold(&item.categories) {
            Some(min) => item.priority_score >= min,
            None => true,
        }
    }
}

/// Stable sort by descending score; equal scores keep page order.
pub fn rank_by_score(items: &mut [Item]) {
    items.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));
}
