use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::error::ReportError;
use crate::pipeline::BatchOutcome;
use crate::results::{image_link, Cell};

pub const RESULTS_SHEET: &str = "Results";
pub const FAILURES_SHEET: &str = "Failures";

const FAILURE_COLUMNS: [&str; 4] = ["Image", "PPN", "Kind", "Message"];

/// Writes the result table (and the skipped assets, if any) as an .xlsx workbook.
pub fn write_workbook(outcome: &BatchOutcome, path: &Path) -> Result<(), ReportError> {
    let mut workbook = build_workbook(outcome)?;
    workbook.save(path)?;
    Ok(())
}

/// Same workbook as [`write_workbook`], in memory.
pub fn workbook_bytes(outcome: &BatchOutcome) -> Result<Vec<u8>, ReportError> {
    let mut workbook = build_workbook(outcome)?;
    Ok(workbook.save_to_buffer()?)
}

fn build_workbook(outcome: &BatchOutcome) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let results = workbook.add_worksheet();
    results.set_name(RESULTS_SHEET)?;
    write_results(results, outcome, &header)?;

    if !outcome.failures.is_empty() {
        let failures = workbook.add_worksheet();
        failures.set_name(FAILURES_SHEET)?;
        write_failures(failures, outcome, &header)?;
    }

    Ok(workbook)
}

fn write_results(
    sheet: &mut Worksheet,
    outcome: &BatchOutcome,
    header: &Format,
) -> Result<(), XlsxError> {
    for (col, name) in outcome.results.columns().iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, header)?;
    }

    for (row, cells) in outcome.results.rows().iter().enumerate() {
        let row = row as u32 + 1;
        for (col, cell) in cells.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Empty => {}
                Cell::Bool(b) => {
                    sheet.write_boolean(row, col, *b)?;
                }
                Cell::Integer(i) => {
                    sheet.write_number(row, col, *i as f64)?;
                }
                Cell::Number(n) => {
                    sheet.write_number(row, col, *n)?;
                }
                Cell::Text(s) => {
                    sheet.write_string(row, col, s)?;
                }
            }
        }
    }

    Ok(())
}

fn write_failures(
    sheet: &mut Worksheet,
    outcome: &BatchOutcome,
    header: &Format,
) -> Result<(), XlsxError> {
    for (col, name) in FAILURE_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, header)?;
    }

    for (row, failure) in outcome.failures.iter().enumerate() {
        let row = row as u32 + 1;
        let link = image_link(&failure.asset);
        sheet.write_string(row, 0, &link)?;
        sheet.write_string(row, 1, failure.asset.document_id.to_string())?;
        sheet.write_string(row, 2, failure.kind.as_str())?;
        sheet.write_string(row, 3, &failure.message)?;
    }

    Ok(())
}
