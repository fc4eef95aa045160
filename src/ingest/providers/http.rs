// src/ingest/providers/http.rs
//! JSON content API over HTTP (feature `ingest-http`).
//!
//! `GET {base}/headlines?query&start&end&count` returns `{"data": [...]}`
//! newest first; `GET {base}/stories?id=...` returns `{"body": "..."}`.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use crate::error::SourceError;
use crate::ingest::config::SourceConfig;
use crate::ingest::types::{HeadlineRequest, NewsSource};
use crate::model::RawItem;

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    #[serde(default)]
    data: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct StoryResponse {
    #[serde(default)]
    body: Option<String>,
}

pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpSource {
    pub fn from_config(cfg: &SourceConfig) -> Result<Self> {
        let base_url = cfg
            .base_url
            .clone()
            .ok_or_else(|| anyhow!("source.base_url is required for the HTTP source"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: std::env::var(&cfg.api_key_env).ok(),
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let rb = self.client.get(format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(k) => rb.header("X-Api-Key", k),
            None => rb,
        }
    }
}

fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    if resp.status() == StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceError::RateLimited);
    }
    Ok(resp.error_for_status()?)
}

#[async_trait]
impl NewsSource for HttpSource {
    async fn fetch_headlines(&self, req: &HeadlineRequest) -> Result<Vec<RawItem>, SourceError> {
        let mut params: Vec<(&str, String)> = vec![("count", req.capacity.to_string())];
        if let Some(s) = req.range.start {
            params.push(("start", s.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(e) = req.range.end {
            params.push(("end", e.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(q) = &req.query {
            params.push(("query", q.clone()));
        }
        let resp = self.get("/headlines").query(&params).send().await?;
        let page: HeadlinesResponse = check_status(resp)?
            .json()
            .await
            .map_err(SourceError::decode)?;
        Ok(page.data)
    }

    async fn fetch_body(&self, id: &str) -> Result<Option<String>, SourceError> {
        let resp = self.get("/stories").query(&[("id", id)]).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let story: StoryResponse = check_status(resp)?
            .json()
            .await
            .map_err(SourceError::decode)?;
        Ok(story.body)
    }

    fn name(&self) -> &str {
        "http"
    }
}
