//! Workbook fixtures for unit tests.

use std::path::Path;

/// Write an xlsx with the given sheets. Empty strings leave the cell unset.
pub fn write_workbook(path: &Path, sheets: &[(&str, Vec<Vec<&str>>)]) {
    let mut book = umya_spreadsheet::new_file_empty_worksheet();

    for (name, rows) in sheets {
        let sheet = book.new_sheet(*name).expect("add sheet");
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                sheet
                    .get_cell_mut(((c + 1) as u32, (r + 1) as u32))
                    .set_value_string(*value);
            }
        }
    }

    umya_spreadsheet::writer::xlsx::write(&book, path).expect("write workbook");
}

/// A sheet with a title row, the visit-date header in row 2 and `data` below
pub fn remarks_sheet<'a>(data: &[[&'a str; 3]]) -> Vec<Vec<&'a str>> {
    let mut rows = vec![
        vec!["Реестр выездов"],
        vec!["№", "Дата выезда", "ОНзС"],
    ];
    rows.extend(data.iter().map(|r| r.to_vec()));
    rows
}
