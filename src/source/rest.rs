use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::retry::{is_retryable_http_error, is_retryable_network_error, retry_async, RetryConfig};
use super::EntitySource;
use crate::config::Config;
use crate::entity::RawEntity;

const FIELDS: &str = "name,population,area";

#[derive(Debug, Error)]
#[error("unexpected http status {status} from {url}")]
pub struct HttpStatusError {
    pub status: u16,
    pub url: String,
}

/// Pulls the country collection from a REST Countries style endpoint.
pub struct RestCountriesSource {
    client: Client,
    endpoint: Url,
    retry: RetryConfig,
}

impl RestCountriesSource {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
            .build()
            .context("building http client")?;
        let retry = RetryConfig {
            max_retries: cfg.fetch_retries,
            base_delay_ms: cfg.retry_base_ms,
            ..RetryConfig::default()
        };
        Ok(Self {
            client,
            endpoint: endpoint_url(&cfg.source_base)?,
            retry,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn fetch_once(&self) -> Result<Vec<RawEntity>> {
        let resp = self.client.get(self.endpoint.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HttpStatusError {
                status: status.as_u16(),
                url: self.endpoint.to_string(),
            }
            .into());
        }
        let body = resp.text().await?;
        parse_records(&body)
    }
}

#[async_trait]
impl EntitySource for RestCountriesSource {
    async fn fetch(&self) -> Result<Vec<RawEntity>> {
        retry_async(&self.retry, "fetch_countries", is_retryable, || self.fetch_once()).await
    }

    fn describe(&self) -> String {
        self.endpoint.to_string()
    }
}

/// `<base>/all?fields=name,population,area`
pub fn endpoint_url(base: &str) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("parsing source base {:?}", base))?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("source base {:?} cannot carry a path", base))?
        .pop_if_empty()
        .push("all");
    url.query_pairs_mut().append_pair("fields", FIELDS);
    Ok(url)
}

pub fn parse_records(body: &str) -> Result<Vec<RawEntity>> {
    serde_json::from_str(body).context("decoding entity records")
}

fn is_retryable(err: &anyhow::Error) -> bool {
    if let Some(status) = err.downcast_ref::<HttpStatusError>() {
        return is_retryable_http_error(status.status);
    }
    if let Some(net) = err.downcast_ref::<reqwest::Error>() {
        return is_retryable_network_error(net);
    }
    false
}
