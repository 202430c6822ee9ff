use crate::parser::{RawTable, Strategy, dated_draw_columns, draw_columns, validate_positions};
use anyhow::Result;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

const MIN_ROW_CELLS: usize = 8;

pub struct LenientTableStrategy;

impl Strategy for LenientTableStrategy {
    fn key(&self) -> &'static str {
        "lenient_table"
    }

    fn extract(&self, markup: &str) -> Option<RawTable> {
        let rows = match first_table_rows(markup) {
            Ok(rows) => rows,
            Err(err) => {
                debug!(error = %err, "lenient reader gave up");
                return None;
            }
        };
        if rows.len() < 2 {
            return None;
        }

        let parsed: Vec<Vec<String>> = rows
            .iter()
            .skip(1)
            .filter(|cells| cells.len() >= MIN_ROW_CELLS)
            .map(|cells| validate_positions(cells))
            .filter(|cells| cells.iter().filter(|v| !v.is_empty()).count() >= MIN_ROW_CELLS)
            .collect();
        if parsed.is_empty() {
            return None;
        }

        let columns = if parsed[0].len() > MIN_ROW_CELLS {
            dated_draw_columns()
        } else {
            draw_columns()
        };
        Some(RawTable {
            columns,
            rows: parsed,
        })
    }
}

enum Frame {
    Table,
    Row(usize),
    Cell(usize),
}

/// Open-element stack for the first table. Every `<tr>` lists the text of all
/// `<td>` beneath it in start order, nested tables included, and a cell's
/// text covers its descendants.
#[derive(Default)]
struct TableScan {
    frames: Vec<Frame>,
    rows: Vec<Vec<usize>>,
    cells: Vec<String>,
    started: bool,
}

impl TableScan {
    fn in_table(&self) -> bool {
        !self.frames.is_empty()
    }

    fn open_table(&mut self) {
        self.started = true;
        self.frames.push(Frame::Table);
    }

    fn open_row(&mut self) {
        if !self.in_table() {
            return;
        }
        self.unwind(|frame| matches!(frame, Frame::Row(_)));
        self.frames.push(Frame::Row(self.rows.len()));
        self.rows.push(Vec::new());
    }

    fn open_cell(&mut self) -> bool {
        if !self.in_table() {
            return false;
        }
        self.unwind(|frame| matches!(frame, Frame::Cell(_)));
        if !matches!(self.frames.last(), Some(Frame::Row(_))) {
            return false;
        }

        let id = self.cells.len();
        self.cells.push(String::new());
        for frame in &self.frames {
            if let Frame::Row(row) = frame {
                self.rows[*row].push(id);
            }
        }
        self.frames.push(Frame::Cell(id));
        true
    }

    fn push_text(&mut self, text: &str) {
        for frame in &self.frames {
            if let Frame::Cell(id) = frame {
                self.cells[*id].push_str(text);
                self.cells[*id].push(' ');
            }
        }
    }

    fn unwind(&mut self, target: impl Fn(&Frame) -> bool) {
        let floor = self
            .frames
            .iter()
            .rposition(|frame| matches!(frame, Frame::Table))
            .map_or(0, |i| i + 1);
        if let Some(pos) = self.frames[floor..].iter().rposition(target) {
            self.frames.truncate(floor + pos);
        }
    }

    fn close_table(&mut self) -> bool {
        if let Some(pos) = self
            .frames
            .iter()
            .rposition(|frame| matches!(frame, Frame::Table))
        {
            self.frames.truncate(pos);
        }
        self.started && self.frames.is_empty()
    }

    fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|ids| ids.iter().map(|id| normalize_ws(&self.cells[*id])).collect())
            .collect()
    }
}

fn first_table_rows(markup: &str) -> Result<Vec<Vec<String>>> {
    let mut reader = Reader::from_str(markup);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut scan = TableScan::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref().to_ascii_lowercase().as_slice() {
                b"table" => scan.open_table(),
                b"tr" => scan.open_row(),
                b"td" => {
                    scan.open_cell();
                }
                _ => {}
            },
            Event::Empty(e) => {
                let name = e.local_name().as_ref().to_ascii_lowercase();
                if name == b"td" && scan.open_cell() {
                    scan.unwind(|frame| matches!(frame, Frame::Cell(_)));
                }
            }
            Event::Text(e) => scan.push_text(&String::from_utf8_lossy(&e)),
            Event::CData(e) => scan.push_text(&String::from_utf8_lossy(&e)),
            Event::End(e) => match e.local_name().as_ref().to_ascii_lowercase().as_slice() {
                b"td" => scan.unwind(|frame| matches!(frame, Frame::Cell(_))),
                b"tr" => scan.unwind(|frame| matches!(frame, Frame::Row(_))),
                b"table" => {
                    if scan.close_table() {
                        break;
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(scan.into_rows())
}

fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
