use crate::model::{
    BLUE_BALL_MAX, BallCount, BallMissing, FrequencyReport, MissingReport, RED_BALL_MAX, Record,
    SortOrder, cmp_issue, sort_records,
};
use std::cmp::Reverse;

pub const DEFAULT_TOP_N: usize = 10;

/// Ties keep first-appearance order: reds are flattened field by field within
/// each record, records in the order given. Pass most recent first so that
/// "first" means "most recent".
pub fn analyze_frequency(records: &[Record], top_n: usize) -> Option<FrequencyReport> {
    if records.is_empty() {
        return None;
    }

    let reds = records.iter().flat_map(|r| r.red_balls().iter().copied());
    let blues = records.iter().map(Record::blue_ball);

    Some(FrequencyReport {
        red: top_counts(reds, top_n),
        blue: top_counts(blues, top_n),
        draws: records.len(),
    })
}

fn top_counts(balls: impl Iterator<Item = u8>, top_n: usize) -> Vec<BallCount> {
    let mut counts: Vec<BallCount> = Vec::new();
    for ball in balls {
        match counts.iter_mut().find(|c| c.ball == ball) {
            Some(entry) => entry.count += 1,
            None => counts.push(BallCount { ball, count: 1 }),
        }
    }

    counts.sort_by_key(|c| Reverse(c.count));
    counts.truncate(top_n);
    counts
}

pub fn analyze_missing(records: &[Record], top_n: usize) -> Option<MissingReport> {
    if records.is_empty() {
        return None;
    }

    let mut window = records.to_vec();
    sort_records(&mut window, SortOrder::Descending);

    let red = longest_missing(RED_BALL_MAX, window.len(), top_n, |ball| {
        window.iter().position(|r| r.red_balls().contains(&ball))
    });
    let blue = longest_missing(BLUE_BALL_MAX, window.len(), top_n, |ball| {
        window.iter().position(|r| r.blue_ball() == ball)
    });

    Some(MissingReport {
        red,
        blue,
        latest_issue: window[0].issue().to_string(),
        window: window.len(),
    })
}

fn longest_missing(
    max_ball: u8,
    window: usize,
    top_n: usize,
    last_seen: impl Fn(u8) -> Option<usize>,
) -> Vec<BallMissing> {
    let mut missing: Vec<BallMissing> = (1..=max_ball)
        .map(|ball| BallMissing {
            ball,
            periods: last_seen(ball).unwrap_or(window),
        })
        .collect();

    missing.sort_by_key(|m| Reverse(m.periods));
    missing.truncate(top_n);
    missing
}

pub fn filter_by_issue_range(records: &[Record], start: &str, end: &str) -> Vec<Record> {
    records
        .iter()
        .filter(|r| cmp_issue(r.issue(), start).is_ge() && cmp_issue(r.issue(), end).is_le())
        .cloned()
        .collect()
}

pub fn filter_by_issue(records: &[Record], issue: &str) -> Vec<Record> {
    records
        .iter()
        .filter(|r| r.issue() == issue)
        .cloned()
        .collect()
}
