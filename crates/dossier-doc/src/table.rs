//! Arity-preserving table edits.

use dossier_types::TableData;

use crate::{DocError, Result};

/// One edit against a table block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableEdit {
    SetHeader { column: usize, value: String },
    SetCell { row: usize, column: usize, value: String },
    /// Append an empty row.
    AddRow,
    RemoveRow(usize),
    /// Append a column named `Col {n+1}` with an empty cell in every row.
    AddColumn,
    RemoveColumn(usize),
}

fn check(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(DocError::TableIndexOutOfBounds { index, len })
    }
}

/// Apply `edit`, keeping every row as wide as the header row.
pub fn apply(table: &mut TableData, edit: TableEdit) -> Result<()> {
    match edit {
        TableEdit::SetHeader { column, value } => {
            check(column, table.headers.len())?;
            table.headers[column] = value;
        }
        TableEdit::SetCell { row, column, value } => {
            check(row, table.rows.len())?;
            check(column, table.headers.len())?;
            let cells = &mut table.rows[row];
            // Pad rows that arrived short from the wire.
            if cells.len() < table.headers.len() {
                cells.resize(table.headers.len(), String::new());
            }
            cells[column] = value;
        }
        TableEdit::AddRow => {
            table.rows.push(vec![String::new(); table.headers.len()]);
        }
        TableEdit::RemoveRow(row) => {
            check(row, table.rows.len())?;
            table.rows.remove(row);
        }
        TableEdit::AddColumn => {
            table.headers.push(format!("Col {}", table.headers.len() + 1));
            for row in &mut table.rows {
                row.push(String::new());
            }
        }
        TableEdit::RemoveColumn(column) => {
            check(column, table.headers.len())?;
            if table.headers.len() == 1 {
                return Err(DocError::LastColumn);
            }
            table.headers.remove(column);
            for row in &mut table.rows {
                if column < row.len() {
                    row.remove(column);
                }
            }
        }
    }
    Ok(())
}
