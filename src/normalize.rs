use crate::model::{RED_BALL_COUNT, Record, SortOrder, is_all_digits, sort_records};
use crate::parser::{Column, RawTable, dated_draw_columns, looks_like_date};
use chrono::NaiveDate;
use tracing::debug;

const DRAW_FIELDS: usize = RED_BALL_COUNT + 2;

pub fn normalize(table: &RawTable, limit: usize) -> Vec<Record> {
    normalize_ordered(table, limit, SortOrder::Descending)
}

pub fn normalize_ordered(table: &RawTable, limit: usize, order: SortOrder) -> Vec<Record> {
    let mut rows: &[Vec<String>] = &table.rows;
    if rows.first().is_some_and(|row| is_leaked_header(row)) {
        debug!("dropping header row that leaked into data rows");
        rows = &rows[1..];
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or_default();
    let columns = resolve_columns(&table.columns, width);
    let date_column = columns.iter().position(|c| *c == Column::DrawDate);

    let mut records: Vec<Record> = rows
        .iter()
        .filter_map(|row| row_to_record(row, date_column))
        .collect();

    debug!(
        rows = rows.len(),
        kept = records.len(),
        dropped = rows.len() - records.len(),
        "normalized extracted rows"
    );

    sort_records(&mut records, SortOrder::Descending);
    records.truncate(limit);
    if order == SortOrder::Ascending {
        records.reverse();
    }
    records
}

fn is_leaked_header(row: &[String]) -> bool {
    row.first().is_some_and(|issue| issue == "1")
        && !row.get(1).is_some_and(|next| is_all_digits(next))
}

fn resolve_columns(columns: &[Column], width: usize) -> Vec<Column> {
    let minimal = dated_draw_columns();
    let agrees = columns.len() == width
        && columns.len() >= DRAW_FIELDS
        && columns[..DRAW_FIELDS] == minimal[..DRAW_FIELDS];
    if agrees {
        return columns.to_vec();
    }

    let mut resolved: Vec<Column> = minimal.into_iter().take(width.max(DRAW_FIELDS)).collect();
    while resolved.len() < width {
        resolved.push(Column::Other(format!("column_{}", resolved.len() + 1)));
    }
    resolved
}

fn row_to_record(row: &[String], date_column: Option<usize>) -> Option<Record> {
    if row.len() < DRAW_FIELDS {
        return None;
    }
    let issue = row[0].trim();
    if !is_all_digits(issue) {
        return None;
    }

    let mut reds = [0u8; RED_BALL_COUNT];
    for (slot, cell) in reds.iter_mut().zip(&row[1..DRAW_FIELDS - 1]) {
        *slot = coerce_ball(cell)?;
    }
    let blue = coerce_ball(&row[DRAW_FIELDS - 1])?;

    Record::new(issue, reds, blue, draw_date(row, date_column)).ok()
}

fn coerce_ball(cell: &str) -> Option<u8> {
    let cell = cell.trim();
    if !is_all_digits(cell) {
        return None;
    }
    cell.parse().ok()
}

fn draw_date(row: &[String], date_column: Option<usize>) -> Option<NaiveDate> {
    let labeled = date_column
        .and_then(|i| row.get(i))
        .and_then(|cell| parse_date(cell));
    labeled.or_else(|| {
        row.iter()
            .skip(DRAW_FIELDS)
            .filter(|cell| looks_like_date(cell))
            .find_map(|cell| parse_date(cell))
    })
}

fn parse_date(cell: &str) -> Option<NaiveDate> {
    let prefix = cell.trim().get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}
