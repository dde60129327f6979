use crate::catalog::models::{ParsedUpload, RawRow, RawTable, SourceFormat};
use crate::catalog::xlsx;
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported file type `{0}` (expected .csv, .tsv, .txt or .xlsx)")]
    UnsupportedExtension(String),
    #[error("file is {size} bytes; the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("file is empty")]
    EmptyFile,
    #[error("file is not valid UTF-8 text")]
    Encoding,
    #[error("unable to read delimited text: {0}")]
    Delimited(#[from] csv::Error),
    #[error("unable to read spreadsheet: {0}")]
    Workbook(#[from] xlsx::WorkbookError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Delimited,
    Spreadsheet,
}

fn file_kind(filename: &str) -> Result<FileKind, IngestError> {
    let extension = Path::new(filename.trim())
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "csv" | "tsv" | "txt" => Ok(FileKind::Delimited),
        "xlsx" => Ok(FileKind::Spreadsheet),
        _ => Err(IngestError::UnsupportedExtension(if extension.is_empty() {
            filename.to_string()
        } else {
            format!(".{extension}")
        })),
    }
}

/// Decodes an uploaded listing file into headers and rows.
///
/// Rejections happen before any decoding: unknown extension, empty file,
/// or a file over `max_bytes`. A well-formed file with no data rows yields
/// an empty table rather than an error.
pub fn parse(bytes: &[u8], filename: &str, max_bytes: usize) -> Result<ParsedUpload, IngestError> {
    let kind = file_kind(filename)?;
    if bytes.is_empty() {
        return Err(IngestError::EmptyFile);
    }
    if bytes.len() > max_bytes {
        return Err(IngestError::TooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }

    let upload = match kind {
        FileKind::Spreadsheet => ParsedUpload {
            format: SourceFormat::Xlsx,
            table: finish_table(xlsx::read_first_sheet(bytes)?),
        },
        FileKind::Delimited => {
            let text = std::str::from_utf8(bytes).map_err(|_| IngestError::Encoding)?;
            let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
            let format = detect_delimiter(text);
            ParsedUpload {
                format,
                table: parse_delimited(text, format)?,
            }
        }
    };

    debug!(
        target = "hermes.ingest",
        filename,
        format = ?upload.format,
        columns = upload.table.headers.len(),
        rows = upload.table.rows.len(),
        "upload_parsed"
    );
    Ok(upload)
}

/// Tabs win only when they strictly outnumber commas on the first line.
pub fn detect_delimiter(text: &str) -> SourceFormat {
    let first_line = text.lines().next().unwrap_or("");
    let tabs = first_line.matches('\t').count();
    let commas = first_line.matches(',').count();
    if tabs > commas {
        SourceFormat::Tsv
    } else {
        SourceFormat::Csv
    }
}

pub fn parse_delimited(text: &str, format: SourceFormat) -> Result<RawTable, IngestError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(format.delimiter().unwrap_or(b','))
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|value| value.trim().to_string())
        .collect();

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    Ok(finish_table(Grid { headers, rows: grid }))
}

/// Header row plus positional cells, before column names are attached.
#[derive(Debug)]
pub struct Grid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Attaches column names to positional rows. Blank headers become
/// `column_<n>` and repeats of an earlier name become `<name>_2`, `<name>_3`
/// so no cell is lost to a key collision.
fn finish_table(grid: Grid) -> RawTable {
    let source_headers = grid.headers;
    let mut taken: HashSet<String> = HashSet::new();
    let headers: Vec<String> = source_headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let base = if name.trim().is_empty() {
                format!("column_{}", idx + 1)
            } else {
                name.clone()
            };
            let mut unique = base.clone();
            let mut suffix = 2;
            while !taken.insert(unique.clone()) {
                unique = format!("{base}_{suffix}");
                suffix += 1;
            }
            unique
        })
        .collect();

    let rows = grid
        .rows
        .into_iter()
        .filter(|cells| cells.iter().any(|cell| !cell.trim().is_empty()))
        .map(|cells| {
            headers
                .iter()
                .enumerate()
                .map(|(idx, header)| (header.clone(), cells.get(idx).cloned().unwrap_or_default()))
                .collect::<RawRow>()
        })
        .collect();

    let renamed = headers != source_headers;
    RawTable {
        headers,
        rows,
        source_headers: if renamed { source_headers } else { Vec::new() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 1024 * 1024;

    #[test]
    fn parses_comma_delimited_file() {
        let csv = "Title,Description,Price\nMug,\"Big, blue mug\",9.99\nPlate,Flat,4\n";
        let upload = parse(csv.as_bytes(), "listings.csv", LIMIT).expect("parse");
        assert_eq!(upload.format, SourceFormat::Csv);
        assert_eq!(upload.table.headers, vec!["Title", "Description", "Price"]);
        assert_eq!(upload.table.rows.len(), 2);
        assert_eq!(upload.table.rows[0]["Description"], "Big, blue mug");
    }

    #[test]
    fn tabs_must_strictly_outnumber_commas() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), SourceFormat::Tsv);
        assert_eq!(detect_delimiter("a,b\tc\n"), SourceFormat::Csv);
        assert_eq!(detect_delimiter("a,b,c\td\te\n"), SourceFormat::Csv);
    }

    #[test]
    fn tab_delimited_file_with_csv_extension() {
        let text = "item_name\tbullet_point1\nLamp, brass\tBright\n";
        let upload = parse(text.as_bytes(), "flat.csv", LIMIT).expect("parse");
        assert_eq!(upload.format, SourceFormat::Tsv);
        assert_eq!(upload.table.rows[0]["item_name"], "Lamp, brass");
    }

    #[test]
    fn short_rows_fill_missing_cells_with_empty_strings() {
        let text = "a,b,c\n1\n";
        let upload = parse(text.as_bytes(), "x.csv", LIMIT).expect("parse");
        assert_eq!(upload.table.rows[0]["b"], "");
        assert_eq!(upload.table.rows[0]["c"], "");
    }

    #[test]
    fn strips_bom_and_names_blank_headers() {
        let text = "\u{feff}Title,,Price\nMug,x,1\n";
        let upload = parse(text.as_bytes(), "x.csv", LIMIT).expect("parse");
        assert_eq!(upload.table.headers, vec!["Title", "column_2", "Price"]);
        assert_eq!(upload.table.source_header(1), Some(""));
    }

    #[test]
    fn repeated_headers_keep_every_cell() {
        let text = "item_name\tsearch_terms\tsearch_terms\tsearch_terms_2\nLamp\tbrass\tdesk\tlight\n";
        let upload = parse(text.as_bytes(), "flat.txt", LIMIT).expect("parse");
        let table = upload.table;
        assert_eq!(
            table.headers,
            vec!["item_name", "search_terms", "search_terms_2", "search_terms_2_2"]
        );
        assert_eq!(table.rows[0]["search_terms"], "brass");
        assert_eq!(table.rows[0]["search_terms_2"], "desk");
        assert_eq!(table.rows[0]["search_terms_2_2"], "light");
        assert_eq!(table.source_header(2), Some("search_terms"));
        assert_eq!(table.source_header(3), Some("search_terms_2"));
    }

    #[test]
    fn distinct_headers_record_no_source_names() {
        let upload = parse(b"Title,Price\nMug,1\n", "x.csv", LIMIT).expect("parse");
        assert!(upload.table.source_headers.is_empty());
        assert_eq!(upload.table.source_header(1), Some("Price"));
    }

    #[test]
    fn header_only_file_is_empty_not_error() {
        let upload = parse(b"Title,Description\n", "x.csv", LIMIT).expect("parse");
        assert!(upload.table.is_empty());
        assert_eq!(upload.table.headers.len(), 2);
    }

    #[test]
    fn blank_rows_are_skipped() {
        let upload = parse(b"Title,Price\n,\nMug,1\n", "x.csv", LIMIT).expect("parse");
        assert_eq!(upload.table.rows.len(), 1);
    }

    #[test]
    fn rejects_unsupported_extension_before_parsing() {
        let err = parse(b"", "catalog.pdf", LIMIT).expect_err("reject");
        assert!(matches!(err, IngestError::UnsupportedExtension(ext) if ext == ".pdf"));
    }

    #[test]
    fn rejects_empty_and_oversized_files() {
        assert!(matches!(
            parse(b"", "x.csv", LIMIT),
            Err(IngestError::EmptyFile)
        ));
        assert!(matches!(
            parse(b"Title\nMug\n", "x.csv", 4),
            Err(IngestError::TooLarge { size: 10, limit: 4 })
        ));
    }

    #[test]
    fn rejects_invalid_utf8() {
        let bytes = [b'T', b'i', 0xff, 0xfe, b'\n'];
        assert!(matches!(
            parse(&bytes, "x.csv", LIMIT),
            Err(IngestError::Encoding)
        ));
    }

    #[test]
    fn rejects_corrupt_spreadsheet() {
        let err = parse(b"not a zip archive", "x.xlsx", LIMIT).expect_err("reject");
        assert!(matches!(err, IngestError::Workbook(_)));
    }
}
