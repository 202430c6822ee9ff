use crate::lenient::LenientTableStrategy;
use crate::model::{
    BLUE_BALL_MAX, MIN_ISSUE_LEN, RED_BALL_COUNT, RED_BALL_MAX, is_all_digits, is_blue_ball,
    is_red_ball,
};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, info};

pub const TABLE_ID: &str = "tablelist";
pub const RED_BALL_CLASS: &str = "ball_1";
pub const BLUE_BALL_CLASS: &str = "ball_2";

const MIN_RECOGNIZED_COLUMNS: usize = 10;
const MIN_ROW_FIELDS: usize = 8;

static ROW_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"<tr[^>]*>(?:<!--<td>\d+</td>-->)?<td>(\d+)</td>",
        r"<td[^>]*>(\d+)</td><td[^>]*>(\d+)</td><td[^>]*>(\d+)</td>",
        r"<td[^>]*>(\d+)</td><td[^>]*>(\d+)</td><td[^>]*>(\d+)</td>",
        r"<td[^>]*>(\d+)</td>",
    ))
    .expect("row signature regex must compile")
});

static DATE_CELL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<td>(\d{4}-\d{2}-\d{2})</td>").expect("date cell regex must compile")
});

static DATE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("date prefix regex must compile"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Issue,
    Red(u8),
    Blue,
    DrawDate,
    PrizePool,
    FirstPrizeCount,
    FirstPrizeAmount,
    SecondPrizeCount,
    SecondPrizeAmount,
    TotalStake,
    Other(String),
}

impl Column {
    pub fn label(&self) -> String {
        match self {
            Column::Issue => "issue".to_string(),
            Column::Red(n) => format!("red_{n}"),
            Column::Blue => "blue".to_string(),
            Column::DrawDate => "draw_date".to_string(),
            Column::PrizePool => "prize_pool".to_string(),
            Column::FirstPrizeCount => "first_prize_count".to_string(),
            Column::FirstPrizeAmount => "first_prize_amount".to_string(),
            Column::SecondPrizeCount => "second_prize_count".to_string(),
            Column::SecondPrizeAmount => "second_prize_amount".to_string(),
            Column::TotalStake => "total_stake".to_string(),
            Column::Other(text) => text.clone(),
        }
    }
}

pub fn draw_columns() -> Vec<Column> {
    let mut columns = vec![Column::Issue];
    columns.extend((1..=RED_BALL_COUNT as u8).map(Column::Red));
    columns.push(Column::Blue);
    columns
}

pub fn dated_draw_columns() -> Vec<Column> {
    let mut columns = draw_columns();
    columns.push(Column::DrawDate);
    columns
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Found {
        strategy: &'static str,
        table: RawTable,
    },
    NotFound,
}

pub trait Strategy: Send + Sync {
    fn key(&self) -> &'static str;
    fn extract(&self, markup: &str) -> Option<RawTable>;
}

pub fn run_strategies(markup: &str) -> Extraction {
    let strategies: [Box<dyn Strategy>; 3] = [
        Box::new(PatternStrategy),
        Box::new(TableStrategy),
        Box::new(LenientTableStrategy),
    ];

    for strategy in strategies {
        let Some(table) = strategy.extract(markup) else {
            debug!(strategy = strategy.key(), "strategy found no rows");
            continue;
        };
        if table.rows.is_empty() || !table.rows.iter().all(|r| r.len() >= MIN_ROW_FIELDS) {
            debug!(strategy = strategy.key(), "strategy produced malformed rows");
            continue;
        }

        info!(
            strategy = strategy.key(),
            rows = table.rows.len(),
            "extraction strategy succeeded"
        );
        return Extraction::Found {
            strategy: strategy.key(),
            table,
        };
    }

    info!("no extraction strategy found draw rows");
    Extraction::NotFound
}

pub struct PatternStrategy;

impl Strategy for PatternStrategy {
    fn key(&self) -> &'static str {
        "pattern"
    }

    fn extract(&self, markup: &str) -> Option<RawTable> {
        let mut rows = Vec::new();

        for caps in ROW_SIGNATURE.captures_iter(markup) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let fields: Vec<&str> = (1..=8)
                .filter_map(|i| caps.get(i).map(|m| m.as_str()))
                .collect();
            if fields.len() != 8 || fields[0].len() < MIN_ISSUE_LEN {
                continue;
            }

            let Some(balls) = fields[1..]
                .iter()
                .map(|v| v.parse::<u8>().ok())
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            let (reds, blue) = balls.split_at(RED_BALL_COUNT);
            if !reds.iter().all(|b| is_red_ball(*b)) || !is_blue_ball(blue[0]) {
                continue;
            }

            let date = issue_scoped_date(&markup[whole.end()..]).unwrap_or_default();

            let mut row: Vec<String> = fields.iter().map(|v| v.to_string()).collect();
            row.push(date);
            rows.push(row);
        }

        if rows.is_empty() {
            return None;
        }
        Some(RawTable {
            columns: dated_draw_columns(),
            rows,
        })
    }
}

// Searches the rest of the matched row only, up to `</tr>` or the line end.
fn issue_scoped_date(after_row_start: &str) -> Option<String> {
    let row = after_row_start.split("</tr>").next().unwrap_or_default();
    let line = row.split('\n').next().unwrap_or_default();
    DATE_CELL
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub struct TableStrategy;

impl Strategy for TableStrategy {
    fn key(&self) -> &'static str {
        "table"
    }

    fn extract(&self, markup: &str) -> Option<RawTable> {
        let doc = Html::parse_document(markup);
        let table = locate_table(&doc)?;

        let tr = selector("tr");
        let mut tr_nodes = table.select(&tr);
        let header = tr_nodes.next()?;
        let data_rows: Vec<ElementRef<'_>> = tr_nodes.collect();

        let mut columns = classify_header(header);
        if columns.len() < MIN_RECOGNIZED_COLUMNS {
            debug!(
                recognized = columns.len(),
                "header too sparse; using minimal draw columns"
            );
            columns = dated_draw_columns();
        } else {
            let labels: Vec<String> = columns.iter().map(Column::label).collect();
            debug!(columns = %labels.join(","), "classified results header");
        }

        let rows: Vec<Vec<String>> = data_rows
            .iter()
            .filter_map(|row| parse_table_row(*row))
            .collect();
        if !rows.is_empty() {
            return Some(RawTable { columns, rows });
        }

        let rows: Vec<Vec<String>> = data_rows
            .iter()
            .filter_map(|row| parse_tagged_row(*row))
            .collect();
        if rows.is_empty() {
            return None;
        }

        debug!(rows = rows.len(), "recovered rows from tagged ball spans");
        if columns.len() != rows[0].len() {
            columns = if rows[0].len() > MIN_ROW_FIELDS {
                dated_draw_columns()
            } else {
                draw_columns()
            };
        }
        Some(RawTable { columns, rows })
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

fn locate_table(doc: &Html) -> Option<ElementRef<'_>> {
    let by_id = selector(&format!("table#{TABLE_ID}"));
    if let Some(table) = doc.select(&by_id).next() {
        return Some(table);
    }

    debug!("no table with the history id; choosing the table with the most rows");
    let tr = selector("tr");
    let mut best: Option<(ElementRef<'_>, usize)> = None;
    for table in doc.select(&selector("table")) {
        let rows = table.select(&tr).count();
        if best.is_none_or(|(_, most)| rows > most) {
            best = Some((table, rows));
        }
    }
    best.map(|(table, _)| table)
}

static HEADER_VOCABULARY: &[(&str, HeaderKind)] = &[
    ("期号", HeaderKind::Single(Column::Issue)),
    ("红球", HeaderKind::RedBlock),
    ("蓝球", HeaderKind::Single(Column::Blue)),
    ("开奖日期", HeaderKind::Single(Column::DrawDate)),
    ("奖池奖金", HeaderKind::Single(Column::PrizePool)),
    ("一等奖奖金", HeaderKind::Single(Column::FirstPrizeAmount)),
    ("一等奖", HeaderKind::Single(Column::FirstPrizeCount)),
    ("二等奖奖金", HeaderKind::Single(Column::SecondPrizeAmount)),
    ("二等奖", HeaderKind::Single(Column::SecondPrizeCount)),
    ("总投注额", HeaderKind::Single(Column::TotalStake)),
];

enum HeaderKind {
    Single(Column),
    RedBlock,
}

fn classify_header(header: ElementRef<'_>) -> Vec<Column> {
    let mut columns = Vec::new();
    for cell in header.select(&selector("td, th")) {
        let text = cell_text(cell);
        match HEADER_VOCABULARY
            .iter()
            .find(|(needle, _)| text.contains(needle))
            .map(|(_, kind)| kind)
        {
            Some(HeaderKind::Single(column)) => columns.push(column.clone()),
            Some(HeaderKind::RedBlock) => {
                columns.extend((1..=RED_BALL_COUNT as u8).map(Column::Red));
            }
            None => columns.push(Column::Other(text)),
        }
    }
    columns
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn parse_table_row(row: ElementRef<'_>) -> Option<Vec<String>> {
    let cells: Vec<String> = row.select(&selector("td, th")).map(cell_text).collect();
    if cells.len() < MIN_ROW_FIELDS {
        return None;
    }

    let mut out = validate_positions(&cells);
    let reds = out[1..=RED_BALL_COUNT].iter().filter(|v| !v.is_empty()).count();
    if reds != RED_BALL_COUNT {
        let tagged = tagged_balls(row, RED_BALL_CLASS, RED_BALL_MAX);
        if tagged.len() == RED_BALL_COUNT {
            out[1..=RED_BALL_COUNT].clone_from_slice(&tagged);
        }
    }

    let validated = out.iter().filter(|v| !v.is_empty()).count();
    (validated >= MIN_ROW_FIELDS).then_some(out)
}

pub(crate) fn validate_positions(cells: &[String]) -> Vec<String> {
    cells
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let keep = match i {
                0 => is_all_digits(text),
                1..=6 => ball_in_range(text, RED_BALL_MAX),
                7 => ball_in_range(text, BLUE_BALL_MAX),
                _ => true,
            };
            if keep { text.clone() } else { String::new() }
        })
        .collect()
}

fn ball_in_range(text: &str, max: u8) -> bool {
    is_all_digits(text) && text.parse::<u8>().is_ok_and(|v| (1..=max).contains(&v))
}

pub(crate) fn looks_like_date(text: &str) -> bool {
    DATE_PREFIX.is_match(text)
}

fn tagged_balls(row: ElementRef<'_>, class: &str, max: u8) -> Vec<String> {
    row.select(&selector(&format!("span.{class}")))
        .map(cell_text)
        .filter(|text| ball_in_range(text, max))
        .collect()
}

fn parse_tagged_row(row: ElementRef<'_>) -> Option<Vec<String>> {
    let td = selector("td");
    let issue = cell_text(row.select(&td).next()?);
    if !is_all_digits(&issue) {
        return None;
    }

    let reds: Vec<String> = row
        .select(&selector(&format!("span.{RED_BALL_CLASS}")))
        .map(cell_text)
        .collect();
    let blue = row
        .select(&selector(&format!("span.{BLUE_BALL_CLASS}")))
        .next()
        .map(cell_text)?;
    if reds.len() != RED_BALL_COUNT {
        return None;
    }

    let mut out = vec![issue];
    out.extend(reds);
    out.push(blue);
    if let Some(date) = row.select(&td).map(cell_text).find(|t| looks_like_date(t)) {
        out.push(date);
    }
    Some(out)
}
