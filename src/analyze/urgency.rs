// src/analyze/urgency.rs
use crate::analyze::terms::{compile, ScanText, TermMatcher};
use crate::ingest::config::UrgencyConfig;
use crate::model::Urgency;

/// Two keyword tiers, checked high then medium; first hit wins.
#[derive(Debug, Clone)]
pub struct UrgencyDetector {
    high: Vec<TermMatcher>,
    medium: Vec<TermMatcher>,
}

impl UrgencyDetector {
    pub fn new(cfg: &UrgencyConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            high: compile(&cfg.high)?,
            medium: compile(&cfg.medium)?,
        })
    }

    pub fn detect(&self, text: &ScanText) -> Urgency {
        if text.any(&self.high) {
            Urgency::High
        } else if text.any(&self.medium) {
            Urgency::Medium
        } else {
            Urgency::Normal
        }
    }
}
