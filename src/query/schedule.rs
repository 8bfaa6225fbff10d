use chrono::NaiveDate;
use serde::Serialize;

use super::parse_date_cell;
use crate::excel::{ColumnSpec, Table};

/// One planned site visit from the schedule sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    /// Row index within the table
    pub row: usize,
    /// 1-based row in the schedule sheet
    pub sheet_row: Option<u32>,
    pub date: Option<NaiveDate>,
    pub onzs: String,
    pub developer: String,
    pub object: String,
    pub address: String,
    pub case_no: String,
    pub inspection_type: String,
    pub inspector: String,
}

fn hints(h: &[&str]) -> ColumnSpec {
    ColumnSpec::hints(h.iter().copied())
}

/// Extract entries by header hints. Columns that cannot be found read as
/// empty text.
pub fn schedule_entries(table: &Table) -> Vec<ScheduleEntry> {
    let date = table.column(&hints(&["дата выезда", "дата"]));
    let onzs = table.column(&hints(&["онзс"]));
    let developer = table.column(&hints(&["застройщик"]));
    let object = table.column(&hints(&["наименование объекта", "объект"]));
    let address = table.column(&hints(&["адрес"]));
    let case_no = table.column(&hints(&["номер дела", "дело"]));
    let inspection_type = table.column(&hints(&["вид проверки", "проверк"]));
    let inspector = table.column(&hints(&["должностное лицо", "инспектор"]));

    let text = |row: usize, col: Option<usize>| col.map(|c| table.text(row, c)).unwrap_or_default();

    (0..table.len())
        .map(|row| ScheduleEntry {
            row,
            sheet_row: table.sheet_row(row),
            date: date.and_then(|c| parse_date_cell(table.cell(row, c))),
            onzs: text(row, onzs),
            developer: text(row, developer),
            object: text(row, object),
            address: text(row, address),
            case_no: text(row, case_no),
            inspection_type: text(row, inspection_type),
            inspector: text(row, inspector),
        })
        .collect()
}

/// Dated entries on or after `today`, soonest first
pub fn upcoming(entries: &[ScheduleEntry], today: NaiveDate, limit: usize) -> Vec<ScheduleEntry> {
    let mut out: Vec<ScheduleEntry> = entries
        .iter()
        .filter(|e| e.date.is_some_and(|d| d >= today))
        .cloned()
        .collect();
    out.sort_by_key(|e| e.date);
    out.truncate(limit);
    out
}

/// Upcoming final inspections ("итоговая ...")
pub fn final_inspections(entries: &[ScheduleEntry], today: NaiveDate, limit: usize) -> Vec<ScheduleEntry> {
    let finals: Vec<ScheduleEntry> = entries
        .iter()
        .filter(|e| e.inspection_type.to_lowercase().contains("итог"))
        .cloned()
        .collect();
    upcoming(&finals, today, limit)
}
