use crate::config::{FetchConfig, FetchMode};
use crate::model::SortOrder;
use anyhow::{Context, Result, bail};
use reqwest::Proxy;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRequest {
    pub limit: usize,
    pub order: SortOrder,
}

pub struct Fetcher {
    config: FetchConfig,
    client: Option<Client>,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = match config.mode {
            FetchMode::Http => Some(build_client(&config)?),
            FetchMode::File | FetchMode::Inline => None,
        };
        Ok(Self { config, client })
    }

    pub fn fetch(&self, request: &HistoryRequest) -> Result<String> {
        match self.config.mode {
            FetchMode::Http => self.fetch_http(request),
            FetchMode::File => self.fetch_file(),
            FetchMode::Inline => self.fetch_inline(),
        }
    }

    fn fetch_http(&self, request: &HistoryRequest) -> Result<String> {
        let client = self.client.as_ref().context("http client not initialized")?;
        let query = [
            ("limit", request.limit.to_string()),
            ("sort", request.order.query_value().to_string()),
        ];
        let url = &self.config.base_url;
        let attempts = self.config.retry_attempts.max(1);

        for attempt in 1..=attempts {
            match client.get(url).query(&query).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let text = resp
                            .text()
                            .with_context(|| format!("failed to decode response from {url}"))?;
                        info!(
                            %url,
                            limit = request.limit,
                            bytes = text.len(),
                            "fetched draw history"
                        );
                        return Ok(text);
                    }
                    if attempt == attempts {
                        bail!("request to {url} failed with status {status}");
                    }
                    warn!(%url, %status, attempt, "request failed; retrying");
                }
                Err(err) => {
                    if attempt == attempts {
                        return Err(err).with_context(|| format!("request to {url} failed"));
                    }
                    warn!(%url, attempt, error = %err, "request errored; retrying");
                }
            }

            std::thread::sleep(Duration::from_millis(self.config.retry_backoff_ms));
        }

        bail!("request to {url} failed after retries")
    }

    fn fetch_file(&self) -> Result<String> {
        let path = self
            .config
            .file_path
            .as_ref()
            .context("fetch.file_path missing for file mode")?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read markup file {}", path.display()))?;

        info!(file = %path.display(), bytes = bytes.len(), "loaded markup file");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn fetch_inline(&self) -> Result<String> {
        let inline = self
            .config
            .inline_data
            .as_ref()
            .context("fetch.inline_data missing for inline mode")?;

        debug!(bytes = inline.len(), "loaded inline markup");
        Ok(inline.clone())
    }
}

fn build_client(config: &FetchConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    for (k, v) in &config.headers {
        let name = HeaderName::from_bytes(k.as_bytes())
            .with_context(|| format!("invalid header name {k}"))?;
        let value =
            HeaderValue::from_str(v).with_context(|| format!("invalid header value for {k}"))?;
        headers.insert(name, value);
    }

    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.as_str())
        .default_headers(headers);

    if let Some(proxy) = &config.proxy {
        let proxy = Proxy::all(proxy.as_str()).with_context(|| format!("invalid proxy {proxy}"))?;
        builder = builder.proxy(proxy);
        debug!("routing requests through configured proxy");
    }

    builder.build().context("failed to build reqwest client")
}
