//! CSV to XLSX converter
//!
//! Companion utility for the crawler's reports: converts one or more
//! semicolon-separated CSV files into a single XLSX workbook, one sheet per
//! input file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rust_xlsxwriter::Workbook;

/// Convert CSV data to XLSX
///
/// Example:
///   csv2xlsx --sheet Pages --sheet Errors --output result.xlsx data.csv data2.csv
#[derive(Parser, Debug)]
#[command(name = "csv2xlsx")]
#[command(version)]
#[command(about = "Convert semicolon-separated CSV files to a single XLSX workbook")]
struct Cli {
    /// CSV files to convert, one sheet each
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<PathBuf>,

    /// Sheet names applied to the inputs in order
    #[arg(short, long = "sheet", value_name = "NAME")]
    sheets: Vec<String>,

    /// Path to the resulting xlsx file
    #[arg(short, long, default_value = "output.xlsx")]
    output: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match build_workbook(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("csv2xlsx: {e}");
            ExitCode::from(1)
        }
    }
}

fn build_workbook(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut workbook = Workbook::new();

    for (index, input) in cli.inputs.iter().enumerate() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(&cli.sheets, index))?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .from_path(input)?;

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            for (col, field) in record.iter().enumerate() {
                worksheet.write_string(row as u32, col as u16, field)?;
            }
        }
    }

    workbook.save(&cli.output)?;
    Ok(())
}

/// Sheet name for the input at `index`: the given name, or `Sheet N`
fn sheet_name(names: &[String], index: usize) -> String {
    names
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("Sheet {}", index + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_name_from_list() {
        let names = vec!["Pages".to_string(), "Errors".to_string()];
        assert_eq!(sheet_name(&names, 0), "Pages");
        assert_eq!(sheet_name(&names, 1), "Errors");
    }

    #[test]
    fn test_sheet_name_fallback() {
        let names = vec!["Pages".to_string()];
        assert_eq!(sheet_name(&names, 1), "Sheet 2");
        assert_eq!(sheet_name(&[], 0), "Sheet 1");
    }
}
