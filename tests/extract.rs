use anyhow::Result;
use chrono::NaiveDate;
use ssq::extract;
use ssq::extract_ordered;
use ssq::model::{Record, SortOrder};
use ssq::lenient::LenientTableStrategy;
use ssq::normalize::normalize;
use ssq::parser::{
    Column, Extraction, RawTable, Strategy, TableStrategy, dated_draw_columns, run_strategies,
};
use std::fs;
use std::path::Path;

#[test]
fn pattern_strategy_reads_results_page_rows() -> Result<()> {
    let html = fixture("history.html")?;

    let Extraction::Found { strategy, table } = run_strategies(&html) else {
        panic!("history fixture must yield rows");
    };
    assert_eq!(strategy, "pattern");
    assert_eq!(table.rows.len(), 5);

    let records = extract(&html, 10);
    let issues: Vec<&str> = records.iter().map(Record::issue).collect();
    assert_eq!(
        issues,
        ["2023005", "2023004", "2023003", "2023002", "2023001"]
    );

    let latest = &records[0];
    assert_eq!(latest.red_balls(), &[3, 9, 14, 21, 27, 33]);
    assert_eq!(latest.blue_ball(), 12);
    assert_eq!(latest.draw_date(), NaiveDate::from_ymd_opt(2023, 1, 12));

    // The last row has no commented-out leading cell.
    assert_eq!(records[4].red_balls(), &[2, 7, 15, 20, 24, 32]);
    assert_eq!(records[4].draw_date(), NaiveDate::from_ymd_opt(2023, 1, 3));

    Ok(())
}

#[test]
fn extract_keeps_the_most_recent_window() -> Result<()> {
    let html = fixture("history.html")?;

    let recent = extract(&html, 2);
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].issue(), "2023005");
    assert_eq!(recent[1].issue(), "2023004");

    let ascending = extract_ordered(&html, 3, SortOrder::Ascending);
    let issues: Vec<&str> = ascending.iter().map(Record::issue).collect();
    assert_eq!(issues, ["2023003", "2023004", "2023005"]);

    Ok(())
}

#[test]
fn pattern_strategy_tolerates_missing_date() {
    let html = concat!(
        "<table><tr><td>2024010</td><td>01</td><td>02</td><td>03</td>",
        "<td>04</td><td>05</td><td>06</td><td>09</td></tr></table>"
    );

    let records = extract(html, 10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].issue(), "2024010");
    assert_eq!(records[0].draw_date(), None);
}

#[test]
fn pattern_strategy_keeps_dates_within_their_row() {
    let html = concat!(
        "<table><tr><td>2024011</td><td>01</td><td>02</td><td>03</td>",
        "<td>04</td><td>05</td><td>06</td><td>09</td><td>&nbsp;</td></tr>",
        "<tr><td>2024010</td><td>07</td><td>08</td><td>10</td>",
        "<td>11</td><td>12</td><td>13</td><td>14</td><td>2024-01-20</td></tr></table>"
    );

    let records = extract(html, 10);
    let issues: Vec<&str> = records.iter().map(Record::issue).collect();
    assert_eq!(issues, ["2024011", "2024010"]);
    assert_eq!(records[0].draw_date(), None);
    assert_eq!(records[1].draw_date(), NaiveDate::from_ymd_opt(2024, 1, 20));
}

#[test]
fn pattern_strategy_skips_out_of_range_rows() {
    let html = concat!(
        "<table>",
        "<tr><td>2024011</td><td>01</td><td>02</td><td>03</td>",
        "<td>04</td><td>05</td><td>34</td><td>09</td></tr>",
        "<tr><td>2024012</td><td>01</td><td>02</td><td>03</td>",
        "<td>04</td><td>05</td><td>06</td><td>17</td></tr>",
        "<tr><td>2024013</td><td>01</td><td>02</td><td>03</td>",
        "<td>04</td><td>05</td><td>06</td><td>16</td></tr>",
        "</table>"
    );

    let records = extract(html, 10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].issue(), "2024013");
}

#[test]
fn table_strategy_uses_header_vocabulary() {
    let html = tree_page(&[
        tree_row("2023002", &["08", "12", "19", "22", "28", "31"], "03", "2023-01-05"),
        tree_row("2023003", &["01", "02", "03", "04", "05", "06"], "07", "2023-01-08"),
    ]);

    let Extraction::Found { strategy, table } = run_strategies(&html) else {
        panic!("tree page must yield rows");
    };
    assert_eq!(strategy, "table");
    assert_eq!(table.columns.len(), 15);
    assert_eq!(table.columns[0], Column::Issue);
    assert_eq!(table.columns[6], Column::Red(6));
    assert_eq!(table.columns[7], Column::Blue);
    assert_eq!(table.columns[9], Column::FirstPrizeCount);
    assert_eq!(table.columns[10], Column::FirstPrizeAmount);
    assert_eq!(table.columns[14], Column::DrawDate);
    assert_eq!(table.columns[14].label(), "draw_date");
    assert_eq!(table.columns[3].label(), "red_3");

    let records = extract(&html, 10);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].issue(), "2023003");
    assert_eq!(records[0].draw_date(), NaiveDate::from_ymd_opt(2023, 1, 8));
    assert_eq!(records[1].red_balls(), &[8, 12, 19, 22, 28, 31]);
}

#[test]
fn table_strategy_repairs_reds_from_tagged_spans() {
    let decorated: Vec<String> = ["04", "09", "13", "17", "25", "33"]
        .iter()
        .map(|b| format!("<span class=\"ball_1\">{b}</span><sup>*</sup>"))
        .collect();
    let decorated: Vec<&str> = decorated.iter().map(String::as_str).collect();

    let html = tree_page(&[
        tree_row("2023004", &decorated, "11", "2023-01-10"),
        tree_row("2023003", &["01", "02", "03", "04", "05", "06"], "07", "2023-01-08"),
    ]);

    let records = extract(&html, 10);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].issue(), "2023004");
    assert_eq!(records[0].red_balls(), &[4, 9, 13, 17, 25, 33]);
    assert_eq!(records[0].blue_ball(), 11);
}

#[test]
fn row_with_five_reds_is_dropped_whole() {
    let html = tree_page(&[
        tree_row("2023004", &["04", "09", "13", "17", "25", "--"], "11", "2023-01-10"),
        tree_row("2023003", &["01", "02", "03", "04", "05", "06"], "07", "2023-01-08"),
    ]);

    let Extraction::Found { table, .. } = run_strategies(&html) else {
        panic!("tree page must yield rows");
    };
    assert!(table.rows.iter().any(|row| row[0] == "2023004"));

    let records = extract(&html, 10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].issue(), "2023003");
}

#[test]
fn sparse_header_falls_back_to_minimal_columns() {
    let html = format!(
        "<table><tr><th>期号</th><th>号码</th></tr>{}</table>",
        tree_row("2023003", &["01", "02", "03", "04", "05", "06"], "07", "2023-01-08")
    );

    let Extraction::Found { strategy, table } = run_strategies(&html) else {
        panic!("table must yield rows");
    };
    assert_eq!(strategy, "table");
    assert_eq!(table.columns, dated_draw_columns());
}

#[test]
fn table_without_history_id_is_the_one_with_most_rows() {
    let reds = ["01", "02", "03", "04", "05", "06"];
    let header = "<tr><th>期号</th><th>红球</th><th>蓝球</th></tr>\n";
    let html = format!(
        "<html><body>\n<table>{header}{}</table>\n<table>{header}{}{}</table>\n<table>{header}</table>\n</body></html>",
        tree_row("2022150", &reds, "09", "2022-12-29"),
        tree_row("2023003", &reds, "07", "2023-01-08"),
        tree_row("2023002", &reds, "03", "2023-01-05"),
    );

    let table = TableStrategy.extract(&html).expect("largest table has rows");
    let issues: Vec<&str> = table.rows.iter().map(|row| row[0].as_str()).collect();
    assert_eq!(issues, ["2023003", "2023002"]);
}

#[test]
fn tagged_spans_recover_rows_the_cells_cannot() -> Result<()> {
    let html = fixture("ball_spans.html")?;

    let Extraction::Found { strategy, table } = run_strategies(&html) else {
        panic!("span fixture must yield rows");
    };
    assert_eq!(strategy, "table");
    assert_eq!(table.columns, dated_draw_columns());

    let records = extract(&html, 10);
    let issues: Vec<&str> = records.iter().map(Record::issue).collect();
    // 2023001 only carries five red spans.
    assert_eq!(issues, ["2023003", "2023002"]);
    assert_eq!(records[0].red_balls(), &[1, 2, 3, 4, 5, 6]);
    assert_eq!(records[0].blue_ball(), 7);
    assert_eq!(records[1].draw_date(), NaiveDate::from_ymd_opt(2023, 1, 5));

    Ok(())
}

#[test]
fn lenient_reader_takes_first_table_when_tree_parse_fails() -> Result<()> {
    let html = fixture("first_table.html")?;

    let Extraction::Found { strategy, table } = run_strategies(&html) else {
        panic!("first table fixture must yield rows");
    };
    assert_eq!(strategy, "lenient_table");
    assert_eq!(table.rows.len(), 2);

    let records = extract(&html, 10);
    let issues: Vec<&str> = records.iter().map(Record::issue).collect();
    assert_eq!(issues, ["2023003", "2023002"]);
    assert_eq!(records[1].red_balls(), &[8, 12, 19, 22, 28, 31]);
    assert_eq!(records[1].blue_ball(), 3);
    assert_eq!(records[0].draw_date(), NaiveDate::from_ymd_opt(2023, 1, 8));

    Ok(())
}

#[test]
fn lenient_reader_gives_up_quietly_on_reader_errors() {
    let rows = concat!(
        "<table><tr><th>期号</th></tr>",
        "<tr><td>2023003</td><td>01</td><td>02</td><td>03</td>",
        "<td>04</td><td>05</td><td>06</td><td>07</td></tr>"
    );

    let unclosed = LenientTableStrategy
        .extract(rows)
        .expect("an unclosed table still yields its rows");
    assert_eq!(unclosed.rows.len(), 1);

    let broken = format!("{rows}<!-- comment never ends");
    assert_eq!(LenientTableStrategy.extract(&broken), None);
}

#[test]
fn lenient_reader_keeps_nested_cells_in_the_outer_row() {
    let html = concat!(
        "<table><tr><th>期号</th></tr>\n",
        "<tr><td>2023003</td><td>01</td><td>02</td><td>03</td><td>04</td>",
        "<td>05</td><td>06</td><td><table><tr><td>07</td></tr></table></td>",
        "<td>2023-01-08</td></tr>\n</table>"
    );

    let table = LenientTableStrategy
        .extract(html)
        .expect("outer row survives its nested table");
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0][0], "2023003");
    assert_eq!(table.rows[0][7], "07");
    assert_eq!(table.rows[0].last().map(String::as_str), Some("2023-01-08"));
}

#[test]
fn markup_without_draws_yields_nothing() {
    let pages = [
        "",
        "<html><body><p>维护中</p></body></html>",
        "<table><tr><th>期号</th></tr><tr><td>abc</td></tr></table>",
        "<table><tr><td>1<td>2</table></tr></td></p>",
        "not markup at all < > & <<",
    ];

    for page in pages {
        assert_eq!(run_strategies(page), Extraction::NotFound, "page {page:?}");
        assert!(extract(page, 10).is_empty());
    }
}

#[test]
fn extracted_records_hold_domain_invariants() -> Result<()> {
    for name in ["history.html", "ball_spans.html", "first_table.html"] {
        for record in extract(&fixture(name)?, 100) {
            assert!(record.issue().len() >= 4);
            assert!(record.issue().bytes().all(|b| b.is_ascii_digit()));
            assert!(record.red_balls().iter().all(|b| (1..=33).contains(b)));
            assert!((1..=16).contains(&record.blue_ball()));
        }
    }
    Ok(())
}

#[test]
fn normalizer_strips_leaked_header_row() {
    let table = RawTable {
        columns: dated_draw_columns(),
        rows: vec![
            cells(&["1", "红球", "红球", "红球", "红球", "红球", "红球", "蓝球", "开奖日期"]),
            cells(&["2023003", "01", "02", "03", "04", "05", "06", "07", "2023-01-08"]),
        ],
    };

    let records = normalize(&table, 10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].issue(), "2023003");
}

#[test]
fn normalizer_drops_rows_that_fail_validation() {
    let table = RawTable {
        columns: dated_draw_columns(),
        rows: vec![
            cells(&["20230x3", "01", "02", "03", "04", "05", "06", "07", ""]),
            cells(&["2023004", "01", "", "03", "04", "05", "06", "07", ""]),
            cells(&["2023005", "01", "02", "03", "04", "05", "06", "", ""]),
            cells(&["2023006", "01", "02", "03", "04", "05", "06", "17", ""]),
            cells(&["123", "01", "02", "03", "04", "05", "06", "07", ""]),
            cells(&["2023007", "01", "02", "03", "04", "05"]),
            cells(&["2023008", "01", "01", "03", "04", "05", "06", "07", "2023-02-30"]),
        ],
    };

    let records = normalize(&table, 10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].issue(), "2023008");
    assert_eq!(records[0].red_balls(), &[1, 1, 3, 4, 5, 6]);
    assert_eq!(records[0].draw_date(), None);
}

#[test]
fn normalizer_finds_date_in_unlabeled_trailing_cells() {
    let table = RawTable {
        columns: vec![Column::Issue],
        rows: vec![cells(&[
            "2023003", "01", "02", "03", "04", "05", "06", "07", "", "1,000", "2023-01-08",
        ])],
    };

    let records = normalize(&table, 10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].draw_date(), NaiveDate::from_ymd_opt(2023, 1, 8));
}

fn fixture(name: &str) -> Result<String> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    Ok(fs::read_to_string(path)?)
}

fn cells(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Cells on separate lines, so only the tree parsers can read the page.
fn tree_row(issue: &str, reds: &[&str], blue: &str, date: &str) -> String {
    let mut cells = vec![issue.to_string()];
    cells.extend(reds.iter().map(|r| r.to_string()));
    cells.push(blue.to_string());
    cells.extend(
        ["1,234,567", "6", "7,654,321", "120", "234,567", "345,678,912"]
            .iter()
            .map(|v| v.to_string()),
    );
    cells.push(date.to_string());

    let tds: Vec<String> = cells
        .iter()
        .map(|c| format!("  <td class=\"cell\">{c}</td>"))
        .collect();
    format!("<tr>\n{}\n</tr>\n", tds.join("\n"))
}

fn tree_page(rows: &[String]) -> String {
    let header = [
        "期号",
        "红球号码",
        "蓝球",
        "奖池奖金(元)",
        "一等奖注数",
        "一等奖奖金(元)",
        "二等奖注数",
        "二等奖奖金(元)",
        "总投注额(元)",
        "开奖日期",
    ]
    .iter()
    .map(|h| format!("<th>{h}</th>"))
    .collect::<String>();

    format!(
        "<html><body>\n<table id=\"tablelist\">\n<tr>{header}</tr>\n{}</table>\n</body></html>",
        rows.concat()
    )
}
