// src/analyze/categories.rs
//! Multi-label category detection over an ordered category table.

use crate::analyze::terms::{compile, ScanText, TermMatcher};
use crate::ingest::config::CategoryRule;
use crate::model::CategorySet;

#[derive(Debug, Clone)]
struct CompiledCategory {
    name: String,
    terms: Vec<TermMatcher>,
}

#[derive(Debug, Clone)]
pub struct CategoryDetector {
    table: Vec<CompiledCategory>,
}

impl CategoryDetector {
    pub fn new(rules: &[CategoryRule]) -> Result<Self, regex::Error> {
        let table = rules
            .iter()
            .map(|r| {
                Ok(CompiledCategory {
                    name: r.name.trim().to_string(),
                    terms: compile(&r.terms)?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { table })
    }

    /// Requested category first (even without a textual match), then every
    /// matching category in table order.
    pub fn detect(&self, text: &ScanText, requested: Option<&str>) -> CategorySet {
        let mut set = CategorySet::new();
        if let Some(req) = requested {
            set.push(req);
        }
        for cat in &self.table {
            if text.any(&cat.terms) {
                set.push(&cat.name);
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::config::ClassifierConfig;

    fn detector() -> CategoryDetector {
        CategoryDetector::new(&ClassifierConfig::default().categories).unwrap()
    }

    #[test]
    fn detects_in_table_order() {
        let d = detector();
        let set = d.detect(&ScanText::new("Zinc and copper prices rise", None), None);
        assert_eq!(set.joined(), "COPPER,ZINC");
    }

    #[test]
    fn requested_category_leads_and_is_not_repeated() {
        let d = detector();
        let set = d.detect(&ScanText::new("Copper and zinc prices rise", None), Some("ZINC"));
        assert_eq!(set.joined(), "ZINC,COPPER");

        let set = d.detect(&ScanText::new("Fed holds rates", None), Some("FOREX"));
        assert_eq!(set.joined(), "FOREX");
    }

    #[test]
    fn no_match_is_empty() {
        assert!(detector()
            .detect(&ScanText::new("Weather turns mild", None), None)
            .is_empty());
    }
}
