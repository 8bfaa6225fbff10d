use chrono::NaiveDate;
use serde::Serialize;

use super::parse_date_cell;
use crate::excel::{ColumnSpec, StatusColumn, Table};

pub const DATE_COLUMN: &str = "B";
pub const ONZS_COLUMN: &str = "D";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemarkStatus {
    /// At least one mark says "нет"
    NotResolved,
    /// At least one "да" and no "нет"
    Resolved,
    /// Every mark is empty
    NotRequired,
    /// Marks present but none is "да"/"нет"
    Unclassified,
}

impl RemarkStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RemarkStatus::NotResolved => "не устранены",
            RemarkStatus::Resolved => "устранены",
            RemarkStatus::NotRequired => "не требуется",
            RemarkStatus::Unclassified => "не определено",
        }
    }
}

fn normalized_mark(raw: &str) -> String {
    let mark = raw.trim().to_lowercase();
    if mark == "nan" {
        String::new()
    } else {
        mark
    }
}

/// Classify a set of mark values
pub fn classify_marks<I, S>(marks: I) -> RemarkStatus
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let marks: Vec<String> = marks.into_iter().map(|m| normalized_mark(m.as_ref())).collect();

    if marks.iter().any(|m| m == "нет") {
        RemarkStatus::NotResolved
    } else if marks.iter().any(|m| m == "да") {
        RemarkStatus::Resolved
    } else if marks.iter().all(|m| m.is_empty()) {
        RemarkStatus::NotRequired
    } else {
        RemarkStatus::Unclassified
    }
}

/// Status of one table row; columns the table does not reach read as empty
pub fn classify_row(table: &Table, row: usize) -> RemarkStatus {
    let marks = StatusColumn::ALL.iter().map(|column| {
        table
            .column(&ColumnSpec::letter(column.letter()))
            .map(|c| table.text(row, c))
            .unwrap_or_default()
    });
    classify_marks(marks)
}

pub fn rows_with_status(table: &Table, status: RemarkStatus) -> Vec<usize> {
    (0..table.len())
        .filter(|&row| classify_row(table, row) == status)
        .collect()
}

/// Rows for one ONzS identifier, optionally limited to an inclusive date
/// range. With a bound set, rows whose date cannot be read are left out.
pub fn rows_for_onzs(
    table: &Table,
    onzs: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<usize> {
    let wanted = onzs.trim();
    let Some(onzs_col) = table.column(&ColumnSpec::letter(ONZS_COLUMN)) else {
        return Vec::new();
    };
    let date_col = table.column(&ColumnSpec::letter(DATE_COLUMN));
    let bounded = from.is_some() || to.is_some();

    (0..table.len())
        .filter(|&row| table.text(row, onzs_col) == wanted)
        .filter(|&row| {
            if !bounded {
                return true;
            }
            let date = date_col.and_then(|c| parse_date_cell(table.cell(row, c)));
            match date {
                Some(d) => from.map_or(true, |f| d >= f) && to.map_or(true, |t| d <= t),
                None => false,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::{column_index_to_letter, CellValue, Row};

    const WIDTH: usize = 30;

    fn table(rows: &[&[(&str, &str)]]) -> Table {
        let columns = (0..WIDTH as u32).map(column_index_to_letter).collect();
        let mut table = Table::new(columns);
        for cells in rows {
            let mut row = vec![CellValue::Empty; WIDTH];
            for (letter, value) in cells.iter() {
                let idx = crate::excel::column_letter_to_index(letter).unwrap();
                row[idx] = CellValue::String(value.to_string());
            }
            table.rows.push(Row {
                sheet: Some("2025".into()),
                line: None,
                cells: row,
            });
        }
        table
    }

    #[test]
    fn test_classify_marks() {
        assert_eq!(classify_marks(["да", "нет", "", ""]), RemarkStatus::NotResolved);
        assert_eq!(classify_marks([" Да ", "", "nan", ""]), RemarkStatus::Resolved);
        assert_eq!(classify_marks(["", "NaN", " ", ""]), RemarkStatus::NotRequired);
        assert_eq!(classify_marks(["частично", "", "", ""]), RemarkStatus::Unclassified);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(RemarkStatus::NotResolved.label(), "не устранены");
        assert_eq!(RemarkStatus::NotRequired.label(), "не требуется");
    }

    #[test]
    fn test_rows_with_status() {
        let t = table(&[
            &[("Q", "да"), ("AD", "да")],
            &[("R", "нет")],
            &[("D", "3")],
            &[("Y", "в работе")],
        ]);
        assert_eq!(rows_with_status(&t, RemarkStatus::Resolved), vec![0]);
        assert_eq!(rows_with_status(&t, RemarkStatus::NotResolved), vec![1]);
        assert_eq!(rows_with_status(&t, RemarkStatus::NotRequired), vec![2]);
        assert_eq!(rows_with_status(&t, RemarkStatus::Unclassified), vec![3]);
    }

    #[test]
    fn test_narrow_table_marks_read_empty() {
        let mut t = Table::new(vec!["A".into(), "B".into()]);
        t.rows.push(Row {
            sheet: None,
            line: None,
            cells: vec![CellValue::String("1".into()), CellValue::Empty],
        });
        assert_eq!(classify_row(&t, 0), RemarkStatus::NotRequired);
    }

    #[test]
    fn test_rows_for_onzs_without_range() {
        let t = table(&[
            &[("B", "01.03.2025"), ("D", "2")],
            &[("B", "02.03.2025"), ("D", " 2 ")],
            &[("B", "03.03.2025"), ("D", "12")],
        ]);
        assert_eq!(rows_for_onzs(&t, "2", None, None), vec![0, 1]);
    }

    #[test]
    fn test_rows_for_onzs_with_range() {
        let t = table(&[
            &[("B", "01.03.2025"), ("D", "5")],
            &[("B", "10.03.2025"), ("D", "5")],
            &[("B", "20.03.2025"), ("D", "5")],
            &[("B", "когда-то"), ("D", "5")],
        ]);
        let from = NaiveDate::from_ymd_opt(2025, 3, 1);
        let to = NaiveDate::from_ymd_opt(2025, 3, 10);

        assert_eq!(rows_for_onzs(&t, "5", from, to), vec![0, 1]);
        assert_eq!(rows_for_onzs(&t, "5", None, to), vec![0, 1]);
        assert_eq!(rows_for_onzs(&t, "5", to, None), vec![1, 2]);
    }
}
