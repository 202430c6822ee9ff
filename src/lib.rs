pub mod analysis;
pub mod config;
pub mod fetch;
pub mod lenient;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod render;

use model::{Record, SortOrder};
use normalize::normalize_ordered;
use parser::{Extraction, run_strategies};

pub fn extract(markup: &str, limit: usize) -> Vec<Record> {
    extract_ordered(markup, limit, SortOrder::Descending)
}

pub fn extract_ordered(markup: &str, limit: usize, order: SortOrder) -> Vec<Record> {
    match run_strategies(markup) {
        Extraction::Found { table, .. } => normalize_ordered(&table, limit, order),
        Extraction::NotFound => Vec::new(),
    }
}
