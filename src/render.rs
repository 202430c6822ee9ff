use crate::model::{BallCount, BallMissing, FrequencyReport, MissingReport, Record};
use comfy_table::Table;
use comfy_table::presets::ASCII_MARKDOWN;

pub const NO_DATA: &str = "No data found";
pub const NO_ANALYSIS: &str = "No data to analyze";

pub fn render_records(records: &[Record]) -> String {
    if records.is_empty() {
        return NO_DATA.to_string();
    }

    let mut table = markdown_table(vec![
        "Issue",
        "Red 1",
        "Red 2",
        "Red 3",
        "Red 4",
        "Red 5",
        "Red 6",
        "Blue",
        "Draw date",
    ]);
    for record in records {
        let mut row = vec![record.issue().to_string()];
        row.extend(record.red_balls().iter().map(|b| format!("{b:02}")));
        row.push(format!("{:02}", record.blue_ball()));
        row.push(
            record
                .draw_date()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        );
        table.add_row(row);
    }
    table.to_string()
}

pub fn render_frequency(report: Option<&FrequencyReport>) -> String {
    let Some(report) = report else {
        return NO_ANALYSIS.to_string();
    };

    format!(
        "## Red ball frequency (top {})\n\n{}\n\n## Blue ball frequency (top {})\n\n{}",
        report.red.len(),
        count_table(&report.red),
        report.blue.len(),
        count_table(&report.blue),
    )
}

pub fn render_missing(report: Option<&MissingReport>) -> String {
    let Some(report) = report else {
        return NO_ANALYSIS.to_string();
    };

    format!(
        "## Red ball missing periods (as of {issue})\n\n{}\n\n## Blue ball missing periods (as of {issue})\n\n{}",
        missing_table(&report.red),
        missing_table(&report.blue),
        issue = report.latest_issue,
    )
}

fn count_table(counts: &[BallCount]) -> String {
    let mut table = markdown_table(vec!["Ball", "Count"]);
    for entry in counts {
        table.add_row(vec![format!("{:02}", entry.ball), entry.count.to_string()]);
    }
    table.to_string()
}

fn missing_table(missing: &[BallMissing]) -> String {
    let mut table = markdown_table(vec!["Ball", "Periods"]);
    for entry in missing {
        table.add_row(vec![format!("{:02}", entry.ball), entry.periods.to_string()]);
    }
    table.to_string()
}

fn markdown_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(ASCII_MARKDOWN).set_header(header);
    table
}
