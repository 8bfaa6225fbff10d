//! Read-only queries over loaded tables, used by the command layer.

pub mod remarks;
pub mod schedule;

use chrono::{NaiveDate, NaiveDateTime};

use crate::excel::reader::format_excel_datetime;
use crate::excel::CellValue;

// Two-digit years first: "%Y" would read "25" as year 25
const DATE_FORMATS: [&str; 3] = ["%d.%m.%y", "%d.%m.%Y", "%Y-%m-%d"];

/// Best-effort date of a cell: date-time cells, Excel serials, or text in
/// `DD.MM.YYYY`, `DD.MM.YY`, `YYYY-MM-DD` or ISO date-time.
pub fn parse_date_cell(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::DateTime(iso) => parse_date_text(iso),
        CellValue::Number(n) if *n > 0.0 => format_excel_datetime(*n).and_then(|iso| parse_date_text(&iso)),
        CellValue::String(s) => parse_date_text(s),
        _ => None,
    }
}

fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
                .ok()
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, day)
    }

    #[test]
    fn test_parse_date_cell_formats() {
        assert_eq!(parse_date_cell(&CellValue::String("03.12.2025".into())), d(2025, 12, 3));
        assert_eq!(parse_date_cell(&CellValue::String(" 03.12.25 ".into())), d(2025, 12, 3));
        assert_eq!(parse_date_cell(&CellValue::String("2025-12-03".into())), d(2025, 12, 3));
        assert_eq!(
            parse_date_cell(&CellValue::DateTime("2025-12-03T10:30:00".into())),
            d(2025, 12, 3)
        );
        assert_eq!(parse_date_cell(&CellValue::Number(45658.0)), d(2025, 1, 1));
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(parse_date_cell(&CellValue::Empty), None);
        assert_eq!(parse_date_cell(&CellValue::String("скоро".into())), None);
        assert_eq!(parse_date_cell(&CellValue::Boolean(true)), None);
    }
}
