// src/ingest/config.rs
//! Immutable application configuration, assembled once at startup.
//!
//! Resolution order:
//! 1) `$NEWSWIRE_CONFIG_PATH`
//! 2) `config/newswire.toml`
//! 3) built-in defaults
//!
//! Every section has serde defaults, so a config file only needs the keys it
//! wants to override.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "NEWSWIRE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/newswire.toml";

/// Upper bound for hour-valued windows (about a century).
pub const MAX_WINDOW_HOURS: i64 = 100 * 366 * 24;
/// Upper bound for retention in days.
pub const MAX_RETENTION_DAYS: i64 = 100 * 366;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Remote API pacing, retry and paging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the JSON content API (HTTP transport only)
    pub base_url: Option<String>,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub header_delay_ms: u64,
    pub body_delay_ms: u64,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub page_capacity: usize,
    pub max_page_capacity: usize,
    /// `None` = walk until the range is covered
    pub max_pages: Option<usize>,
    pub fetch_body: bool,
    pub max_headline_length: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: "NEWSWIRE_API_KEY".to_string(),
            timeout_secs: 30,
            header_delay_ms: 1_000,
            body_delay_ms: 2_000,
            max_attempts: 3,
            retry_base_delay_ms: 2_000,
            page_capacity: 50,
            max_page_capacity: 100,
            max_pages: None,
            fetch_body: true,
            max_headline_length: 500,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupConfig {
    #[serde(default)]
    pub near_duplicate: NearDuplicateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NearDuplicateConfig {
    pub enabled: bool,
    pub window_hours: i64,
    pub threshold: f64,
    pub max_features: usize,
}

impl Default for NearDuplicateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window_hours: 24,
            threshold: 0.85,
            max_features: 100,
        }
    }
}

/// One category and the terms that trigger it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub terms: Vec<String>,
    /// Remote filter code used when a fetch is scoped to this category
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencyConfig {
    pub high: Vec<String>,
    pub medium: Vec<String>,
}

impl Default for UrgencyConfig {
    fn default() -> Self {
        Self {
            high: defaults::strings(&["breaking", "urgent", "flash", "速報"]),
            medium: defaults::strings(&["update", "alert", "exclusive", "warning"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub keywords: BTreeMap<String, i32>,
    pub min_score: Option<i32>,
    pub category_min_score: BTreeMap<String, i32>,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            keywords: defaults::priority_keywords(),
            min_score: None,
            category_min_score: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Detection order is the order of this list
    pub categories: Vec<CategoryRule>,
    pub urgency: UrgencyConfig,
    pub priority: PriorityConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            categories: defaults::categories(),
            urgency: UrgencyConfig::default(),
            priority: PriorityConfig::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn category(&self, name: &str) -> Option<&CategoryRule> {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub incremental_interval_secs: u64,
    /// Look-back used when the store is empty
    pub incremental_lookback_hours: i64,
    /// Categories walked by the incremental job; empty = one unscoped run
    pub incremental_categories: Vec<String>,
    pub category_pause_secs: u64,
    /// UTC hour at which the previous day is backfilled
    pub daily_batch_hour: u32,
    pub maintenance_interval_secs: u64,
    pub retention_days: i64,
    pub health_interval_secs: u64,
    pub health_stale_after_secs: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            incremental_interval_secs: 5 * 60,
            incremental_lookback_hours: 1,
            incremental_categories: Vec::new(),
            category_pause_secs: 60,
            daily_batch_hour: 3,
            maintenance_interval_secs: 7 * 24 * 3600,
            retention_days: 365,
            health_interval_secs: 15 * 60,
            health_stale_after_secs: 2 * 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding `articles.jsonl` and `runs.json`; `None` = in-memory
    pub path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: Some(PathBuf::from("data")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// e.g. "127.0.0.1:9000"; `None` disables the Prometheus listener
    pub listen_addr: Option<String>,
}

impl AppConfig {
    /// Load from an explicit TOML path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks (see module docs).
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from(&fallback);
        }
        Ok(Self::default())
    }

    /// Sanity checks that would otherwise surface as odd runtime behavior.
    pub fn validate(&self) -> Result<()> {
        let s = &self.source;
        if s.page_capacity == 0 {
            bail!("source.page_capacity must be > 0");
        }
        if s.page_capacity > s.max_page_capacity {
            bail!(
                "source.page_capacity {} exceeds source.max_page_capacity {}",
                s.page_capacity,
                s.max_page_capacity
            );
        }
        if s.max_attempts == 0 {
            bail!("source.max_attempts must be > 0");
        }
        if s.max_pages == Some(0) {
            bail!("source.max_pages must be > 0 when set");
        }
        if s.max_headline_length == 0 {
            bail!("source.max_headline_length must be > 0");
        }
        let nd = &self.dedup.near_duplicate;
        if !(nd.threshold > 0.0 && nd.threshold <= 1.0) {
            bail!("dedup.near_duplicate.threshold must be in (0, 1]");
        }
        if !(1..=MAX_WINDOW_HOURS).contains(&nd.window_hours) {
            bail!("dedup.near_duplicate.window_hours must be in 1..={MAX_WINDOW_HOURS}");
        }
        if nd.max_features == 0 {
            bail!("dedup.near_duplicate.max_features must be > 0");
        }
        for rule in &self.classifier.categories {
            if rule.name.trim().is_empty() {
                bail!("classifier category with empty name");
            }
        }
        let sc = &self.schedule;
        if sc.daily_batch_hour > 23 {
            bail!("schedule.daily_batch_hour must be 0..=23");
        }
        if !(1..=MAX_WINDOW_HOURS).contains(&sc.incremental_lookback_hours) {
            bail!("schedule.incremental_lookback_hours must be in 1..={MAX_WINDOW_HOURS}");
        }
        if !(0..=MAX_RETENTION_DAYS).contains(&sc.retention_days) {
            bail!("schedule.retention_days must be in 0..={MAX_RETENTION_DAYS}");
        }
        if !(1..=MAX_WINDOW_HOURS * 3600).contains(&sc.health_stale_after_secs) {
            bail!("schedule.health_stale_after_secs must be positive and at most a century");
        }
        Ok(())
    }
}

mod defaults {
    use super::CategoryRule;
    use std::collections::BTreeMap;

    pub fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn rule(name: &str, terms: &[&str], topic: Option<&str>) -> CategoryRule {
        CategoryRule {
            name: name.to_string(),
            terms: strings(terms),
            topic: topic.map(str::to_string),
        }
    }

    /// Base metals first, then broad asset classes, then special feeds.
    pub fn categories() -> Vec<CategoryRule> {
        vec![
            rule("COPPER", &["copper", "銅"], Some("MCU")),
            rule(
                "ALUMINIUM",
                &["aluminium", "aluminum", "アルミ"],
                Some("MAL"),
            ),
            rule("ZINC", &["zinc", "亜鉛"], Some("MZN")),
            rule("LEAD", &["lead", "鉛"], Some("MPB")),
            rule("NICKEL", &["nickel", "ニッケル"], Some("MNI")),
            rule("TIN", &["tin", "スズ"], Some("MTN")),
            rule(
                "EQUITY",
                &["equity", "equities", "stock", "stocks", "株式"],
                Some("STX"),
            ),
            rule(
                "FOREX",
                &["forex", "currency", "currencies", "外国為替", "為替"],
                Some("FRX"),
            ),
            rule(
                "COMMODITIES",
                &["commodity", "commodities", "商品"],
                Some("COM"),
            ),
            rule("NY_MARKET", &["NY市場サマリー"], None),
        ]
    }

    pub fn priority_keywords() -> BTreeMap<String, i32> {
        [
            ("lme", 3),
            ("supply", 2),
            ("demand", 2),
            ("tariff", 3),
            ("strike", 3),
            ("inventory", 2),
            ("shortage", 3),
            ("price", 1),
            ("prices", 1),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}
