use crate::analysis::{analyze_frequency, analyze_missing, filter_by_issue, filter_by_issue_range};
use crate::config::Config;
use crate::extract_ordered;
use crate::fetch::{Fetcher, HistoryRequest};
use crate::model::{BallCount, BallMissing, Record, SortOrder};
use crate::render::{render_frequency, render_missing, render_records};
use serde::Serialize;
use tracing::{info, warn};

pub const LOOKUP_WINDOW: usize = 1000;
pub const DEFAULT_RECENT_LIMIT: usize = 10;
pub const DEFAULT_ANALYSIS_LIMIT: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct DrawList {
    pub data: Vec<Record>,
    pub total: usize,
    pub markdown: String,
}

impl DrawList {
    fn from_records(data: Vec<Record>) -> Self {
        let markdown = render_records(&data);
        Self {
            total: data.len(),
            data,
            markdown,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FrequencyAnalysis {
    pub red_freq: Vec<BallCount>,
    pub blue_freq: Vec<BallCount>,
    pub markdown: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MissingAnalysis {
    pub red_missing: Vec<BallMissing>,
    pub blue_missing: Vec<BallMissing>,
    pub latest_issue: Option<String>,
    pub markdown: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProxyStatus {
    pub proxy: Option<String>,
    pub enabled: bool,
}

pub fn fetch_records(fetcher: &Fetcher, limit: usize, order: SortOrder) -> Vec<Record> {
    let markup = match fetcher.fetch(&HistoryRequest { limit, order }) {
        Ok(markup) => markup,
        Err(err) => {
            warn!(error = %format!("{err:#}"), "fetch failed; treating as no data");
            return Vec::new();
        }
    };

    let records = extract_ordered(&markup, limit, order);
    info!(limit, records = records.len(), "extracted draws");
    records
}

pub fn recent_draws(fetcher: &Fetcher, limit: usize) -> DrawList {
    DrawList::from_records(fetch_records(fetcher, limit, SortOrder::Descending))
}

pub fn draws_in_range(fetcher: &Fetcher, start: &str, end: &str) -> DrawList {
    let history = fetch_records(fetcher, LOOKUP_WINDOW, SortOrder::Ascending);
    DrawList::from_records(filter_by_issue_range(&history, start, end))
}

pub fn draw_by_issue(fetcher: &Fetcher, issue: &str) -> DrawList {
    let history = fetch_records(fetcher, LOOKUP_WINDOW, SortOrder::Ascending);
    DrawList::from_records(filter_by_issue(&history, issue))
}

pub fn frequency_analysis(fetcher: &Fetcher, limit: usize, top_n: usize) -> FrequencyAnalysis {
    let records = fetch_records(fetcher, limit, SortOrder::Descending);
    frequency_of(&records, top_n)
}

pub fn missing_analysis(fetcher: &Fetcher, limit: usize, top_n: usize) -> MissingAnalysis {
    let records = fetch_records(fetcher, limit, SortOrder::Descending);
    missing_of(&records, top_n)
}

pub fn frequency_of(records: &[Record], top_n: usize) -> FrequencyAnalysis {
    let Some(report) = analyze_frequency(records, top_n) else {
        return FrequencyAnalysis {
            red_freq: Vec::new(),
            blue_freq: Vec::new(),
            markdown: render_frequency(None),
        };
    };

    FrequencyAnalysis {
        markdown: render_frequency(Some(&report)),
        red_freq: report.red,
        blue_freq: report.blue,
    }
}

pub fn missing_of(records: &[Record], top_n: usize) -> MissingAnalysis {
    let Some(report) = analyze_missing(records, top_n) else {
        return MissingAnalysis {
            red_missing: Vec::new(),
            blue_missing: Vec::new(),
            latest_issue: None,
            markdown: render_missing(None),
        };
    };

    MissingAnalysis {
        markdown: render_missing(Some(&report)),
        red_missing: report.red,
        blue_missing: report.blue,
        latest_issue: Some(report.latest_issue),
    }
}

pub fn proxy_status(config: &Config) -> ProxyStatus {
    ProxyStatus {
        proxy: config.fetch.proxy.clone(),
        enabled: config.fetch.proxy.is_some(),
    }
}
