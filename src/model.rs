use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;

pub const RED_BALL_COUNT: usize = 6;
pub const RED_BALL_MAX: u8 = 33;
pub const BLUE_BALL_MAX: u8 = 16;
pub const MIN_ISSUE_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    issue: String,
    red_balls: [u8; RED_BALL_COUNT],
    blue_ball: u8,
    draw_date: Option<NaiveDate>,
}

impl Record {
    pub fn new(
        issue: impl Into<String>,
        red_balls: [u8; RED_BALL_COUNT],
        blue_ball: u8,
        draw_date: Option<NaiveDate>,
    ) -> Result<Self> {
        let issue = issue.into();
        if !is_valid_issue(&issue) {
            bail!("issue {issue:?} must be at least {MIN_ISSUE_LEN} ascii digits");
        }
        if let Some(ball) = red_balls.iter().find(|b| !is_red_ball(**b)) {
            bail!("red ball {ball} out of range 1..={RED_BALL_MAX} in issue {issue}");
        }
        if !is_blue_ball(blue_ball) {
            bail!("blue ball {blue_ball} out of range 1..={BLUE_BALL_MAX} in issue {issue}");
        }

        Ok(Self {
            issue,
            red_balls,
            blue_ball,
            draw_date,
        })
    }

    pub fn issue(&self) -> &str {
        &self.issue
    }

    pub fn red_balls(&self) -> &[u8; RED_BALL_COUNT] {
        &self.red_balls
    }

    pub fn blue_ball(&self) -> u8 {
        self.blue_ball
    }

    pub fn draw_date(&self) -> Option<NaiveDate> {
        self.draw_date
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Descending,
    Ascending,
}

impl SortOrder {
    pub fn query_value(self) -> u8 {
        match self {
            SortOrder::Descending => 0,
            SortOrder::Ascending => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BallCount {
    pub ball: u8,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencyReport {
    pub red: Vec<BallCount>,
    pub blue: Vec<BallCount>,
    pub draws: usize,
}

/// `periods` is the number of draws since the ball last appeared; a value
/// equal to `window` means it never appeared in the window at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BallMissing {
    pub ball: u8,
    pub periods: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingReport {
    pub red: Vec<BallMissing>,
    pub blue: Vec<BallMissing>,
    pub latest_issue: String,
    pub window: usize,
}

pub fn is_all_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_valid_issue(value: &str) -> bool {
    value.len() >= MIN_ISSUE_LEN && is_all_digits(value)
}

pub fn is_red_ball(value: u8) -> bool {
    (1..=RED_BALL_MAX).contains(&value)
}

pub fn is_blue_ball(value: u8) -> bool {
    (1..=BLUE_BALL_MAX).contains(&value)
}

/// Compares two issues as zero-padded numbers: the shorter one is treated
/// as if left-padded with `0` to the longer one's width.
pub fn cmp_issue(a: &str, b: &str) -> Ordering {
    let width = a.len().max(b.len());
    let pad_a = width - a.len();
    let pad_b = width - b.len();

    let left = std::iter::repeat_n(b'0', pad_a).chain(a.bytes());
    let right = std::iter::repeat_n(b'0', pad_b).chain(b.bytes());
    left.cmp(right)
}

pub fn sort_records(records: &mut [Record], order: SortOrder) {
    match order {
        SortOrder::Descending => records.sort_by(|a, b| cmp_issue(&b.issue, &a.issue)),
        SortOrder::Ascending => records.sort_by(|a, b| cmp_issue(&a.issue, &b.issue)),
    }
}
