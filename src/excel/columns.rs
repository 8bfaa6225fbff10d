//! Column addressing: header-hint lookup and spreadsheet letter addresses.

use serde::{Deserialize, Serialize};

/// How a logical field is located in a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnSpec {
    /// Case-insensitive substrings matched against header text
    Hints(Vec<String>),
    /// Spreadsheet letter address such as "B" or "AI"
    Letter(String),
}

impl ColumnSpec {
    pub fn hints<I, S>(hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnSpec::Hints(hints.into_iter().map(Into::into).collect())
    }

    pub fn letter(letter: impl Into<String>) -> Self {
        ColumnSpec::Letter(letter.into())
    }
}

/// Resolve a spec against a header list. Letter addresses past the last
/// column resolve to `None`.
pub fn resolve_column(columns: &[String], spec: &ColumnSpec) -> Option<usize> {
    match spec {
        ColumnSpec::Hints(hints) => find_column_by_hints(columns, hints),
        ColumnSpec::Letter(letter) => {
            column_letter_to_index(letter).filter(|idx| *idx < columns.len())
        }
    }
}

/// First column whose lowercased header contains any of the hints
pub fn find_column_by_hints(columns: &[String], hints: &[String]) -> Option<usize> {
    let hints: Vec<String> = hints
        .iter()
        .map(|h| h.trim().to_lowercase())
        .filter(|h| !h.is_empty())
        .collect();

    columns.iter().position(|header| {
        let header = header.to_lowercase();
        hints.iter().any(|h| header.contains(h.as_str()))
    })
}

/// Convert an Excel column letter (A, B, ..., Z, AA, ...) to a 0-based index.
/// Returns `None` for empty input or anything that is not a letter.
pub fn column_letter_to_index(letter: &str) -> Option<usize> {
    let letter = letter.trim();
    if letter.is_empty() {
        return None;
    }

    let mut n: usize = 0;
    for ch in letter.chars() {
        let ch = ch.to_ascii_uppercase();
        if !ch.is_ascii_uppercase() {
            return None;
        }
        let digit = (ch as u8 - b'A' + 1) as usize;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }

    Some(n - 1)
}

/// Convert column index (0-based) to Excel column letter (A, B, ..., Z, AA, AB, ...)
pub fn column_index_to_letter(index: u32) -> String {
    let mut result = String::new();
    let mut n = index + 1;

    while n > 0 {
        n -= 1;
        let c = (b'A' + (n % 26) as u8) as char;
        result.insert(0, c);
        n /= 26;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_column_letter_to_index() {
        assert_eq!(column_letter_to_index("A"), Some(0));
        assert_eq!(column_letter_to_index("Z"), Some(25));
        assert_eq!(column_letter_to_index("AA"), Some(26));
        assert_eq!(column_letter_to_index("AC"), Some(28));
        assert_eq!(column_letter_to_index("AI"), Some(34));
        assert_eq!(column_letter_to_index("ad"), Some(29));
        assert_eq!(column_letter_to_index(""), None);
        assert_eq!(column_letter_to_index("A1"), None);
    }

    #[test]
    fn test_column_index_to_letter() {
        assert_eq!(column_index_to_letter(0), "A");
        assert_eq!(column_index_to_letter(1), "B");
        assert_eq!(column_index_to_letter(25), "Z");
        assert_eq!(column_index_to_letter(26), "AA");
        assert_eq!(column_index_to_letter(27), "AB");
        assert_eq!(column_index_to_letter(51), "AZ");
        assert_eq!(column_index_to_letter(52), "BA");
    }

    #[test]
    fn test_letter_round_trip_on_boundaries() {
        for idx in [0u32, 25, 26, 701, 702] {
            let letter = column_index_to_letter(idx);
            assert_eq!(column_letter_to_index(&letter), Some(idx as usize));
        }
    }

    #[test]
    fn test_letter_past_last_column_is_absent() {
        let cols = headers(&["№", "Дата выезда", "ОНзС"]);
        assert_eq!(resolve_column(&cols, &ColumnSpec::letter("C")), Some(2));
        assert_eq!(resolve_column(&cols, &ColumnSpec::letter("AI")), None);
    }

    #[test]
    fn test_hints_match_case_insensitively() {
        let cols = headers(&["№ п/п", "Дата выезда", "Наименование застройщика"]);
        assert_eq!(
            resolve_column(&cols, &ColumnSpec::hints(["ЗАСТРОЙЩИК"])),
            Some(2)
        );
        assert_eq!(
            resolve_column(&cols, &ColumnSpec::hints(["нет такого", "дата"])),
            Some(1)
        );
        assert_eq!(resolve_column(&cols, &ColumnSpec::hints(["адрес"])), None);
    }

    #[test]
    fn test_blank_hints_never_match() {
        let cols = headers(&["a", "b"]);
        assert_eq!(resolve_column(&cols, &ColumnSpec::hints(["  "])), None);
    }
}
