//! A1 notation helpers.
//!
//! Column and row indices are 1-based everywhere in this module, matching
//! the Sheets API.

use crate::error::SheetsError;

/// Columns read and appended when addressing a whole sheet.
pub const DEFAULT_COLUMNS: &str = "A:Z";

/// Convert a 1-based column index to its letter form (`1 -> A`, `27 -> AA`).
pub fn column_name(index: usize) -> Result<String, SheetsError> {
    if index < 1 {
        return Err(SheetsError::ConfigError(
            "Column index must be >= 1".to_string(),
        ));
    }

    let mut letters = Vec::new();
    let mut current = index;
    while current > 0 {
        let remainder = (current - 1) % 26;
        letters.push((b'A' + remainder as u8) as char);
        current = (current - 1) / 26;
    }

    Ok(letters.iter().rev().collect())
}

/// Quote a sheet name for use in a range when it is not a plain identifier.
///
/// Embedded single quotes are doubled per the A1 grammar.
pub fn quote_sheet_name(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());

    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// Range covering every used row of a sheet (`tasks!A:Z`).
pub fn sheet_range(sheet: &str) -> String {
    format!("{}!{}", quote_sheet_name(sheet), DEFAULT_COLUMNS)
}

/// Range addressing a single cell.
pub fn cell_range(sheet: &str, row: usize, column: usize) -> Result<String, SheetsError> {
    if row < 1 {
        return Err(SheetsError::ConfigError("Row index must be >= 1".to_string()));
    }
    Ok(format!(
        "{}!{}{}",
        quote_sheet_name(sheet),
        column_name(column)?,
        row
    ))
}

/// Range addressing `width` cells of one row, starting at column A.
pub fn row_range(sheet: &str, row: usize, width: usize) -> Result<String, SheetsError> {
    if row < 1 {
        return Err(SheetsError::ConfigError("Row index must be >= 1".to_string()));
    }
    let last = column_name(width.max(1))?;
    Ok(format!("{}!A{}:{}{}", quote_sheet_name(sheet), row, last, row))
}
