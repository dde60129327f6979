use crate::catalog::ingest::Grid;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const SHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Zero-based index of column `XFD`, the last one SpreadsheetML allows.
const MAX_COLUMN: usize = 16_383;
/// Upper bound on decoded cells (header row included) for one sheet.
const MAX_GRID_CELLS: usize = 2_000_000;
/// Upper bound on one decompressed package part.
const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

const HEADER_STYLE: u32 = 1;
const BODY_STYLE: u32 = 2;

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("zip: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("xml in {part}: {message}")]
    Xml { part: String, message: String },
    #[error("workbook has no worksheet")]
    MissingSheet,
}

fn xml_error(part: &str, err: impl std::fmt::Display) -> WorkbookError {
    WorkbookError::Xml {
        part: part.to_string(),
        message: err.to_string(),
    }
}

// ---------------------------------------------------------------- reading

/// Reads the first worksheet of an `.xlsx` package into a positional grid.
/// The first populated row becomes the header row.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Grid, WorkbookError> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let shared = match read_part(&mut zip, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };
    let sheet_path = first_sheet_path(&mut zip)?;
    let sheet_xml = read_part(&mut zip, &sheet_path)?.ok_or(WorkbookError::MissingSheet)?;
    let cells = parse_sheet_cells(&sheet_path, &sheet_xml, &shared)?;

    let mut rows = cells.into_values();
    let Some(header_cells) = rows.next() else {
        return Ok(Grid {
            headers: Vec::new(),
            rows: Vec::new(),
        });
    };
    let width = header_cells.keys().next_back().map(|col| col + 1).unwrap_or(0);
    if width.saturating_mul(rows.len() + 1) > MAX_GRID_CELLS {
        return Err(xml_error(
            &sheet_path,
            format!("sheet is too large ({width} columns, {} rows)", rows.len() + 1),
        ));
    }
    let headers = positional(&header_cells, width)
        .into_iter()
        .map(|value| value.trim().to_string())
        .collect();
    let rows = rows.map(|cells| positional(&cells, width)).collect();
    Ok(Grid { headers, rows })
}

fn positional(cells: &BTreeMap<usize, String>, width: usize) -> Vec<String> {
    (0..width)
        .map(|col| cells.get(&col).cloned().unwrap_or_default())
        .collect()
}

fn read_part<R: Read + std::io::Seek>(
    zip: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, WorkbookError> {
    let mut file = match zip.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut xml = String::new();
    file.by_ref()
        .take(MAX_PART_BYTES + 1)
        .read_to_string(&mut xml)?;
    if xml.len() as u64 > MAX_PART_BYTES {
        return Err(xml_error(name, "part exceeds the decompressed size limit"));
    }
    Ok(Some(xml))
}

fn attr(start: &BytesStart<'_>, part: &str, name: &[u8]) -> Result<Option<String>, WorkbookError> {
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| xml_error(part, err))?;
        if attribute.key.local_name().as_ref() == name {
            let value = attribute
                .unescape_value()
                .map_err(|err| xml_error(part, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Follows workbook.xml → workbook rels to the first declared sheet.
fn first_sheet_path<R: Read + std::io::Seek>(
    zip: &mut ZipArchive<R>,
) -> Result<String, WorkbookError> {
    const FALLBACK: &str = "xl/worksheets/sheet1.xml";

    let Some(workbook) = read_part(zip, "xl/workbook.xml")? else {
        return Ok(FALLBACK.to_string());
    };
    let mut rel_id = None;
    let mut reader = Reader::from_str(&workbook);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                rel_id = attr(&e, "xl/workbook.xml", b"id")?;
                break;
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(xml_error("xl/workbook.xml", err)),
            _ => {}
        }
    }
    let Some(rel_id) = rel_id else {
        return Err(WorkbookError::MissingSheet);
    };

    let Some(rels) = read_part(zip, "xl/_rels/workbook.xml.rels")? else {
        return Ok(FALLBACK.to_string());
    };
    let mut reader = Reader::from_str(&rels);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let part = "xl/_rels/workbook.xml.rels";
                if attr(&e, part, b"Id")?.as_deref() == Some(rel_id.as_str()) {
                    let target = attr(&e, part, b"Target")?.unwrap_or_default();
                    return Ok(match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("xl/{target}"),
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(xml_error("xl/_rels/workbook.xml.rels", err)),
            _ => {}
        }
    }
    Ok(FALLBACK.to_string())
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, WorkbookError> {
    const PART: &str = "xl/sharedStrings.xml";
    let mut strings = Vec::new();
    let mut reader = Reader::from_str(xml);
    let mut current = String::new();
    let mut in_text = false;
    // Phonetic runs repeat the reading of the text and are not part of the value.
    let mut in_phonetic = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::Text(t)) if in_text => {
                current.push_str(&t.unescape().map_err(|err| xml_error(PART, err))?);
            }
            Ok(Event::CData(t)) if in_text => {
                current.push_str(&String::from_utf8_lossy(&t.into_inner()));
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(xml_error(PART, err)),
            _ => {}
        }
    }
    Ok(strings)
}

/// "AB12" → column index 27 (zero-based). `Ok(None)` when the reference
/// carries no column letters; anything past `XFD` is rejected.
fn column_index(part: &str, reference: &str) -> Result<Option<usize>, WorkbookError> {
    let letters = reference.bytes().take_while(u8::is_ascii_alphabetic).count();
    if letters == 0 {
        return Ok(None);
    }
    let out_of_range = || {
        let shown: String = reference.chars().take(16).collect();
        xml_error(part, format!("cell reference `{shown}` is past column XFD"))
    };
    if letters > 3 {
        return Err(out_of_range());
    }
    let mut acc = 0usize;
    for ch in reference.bytes().take(letters) {
        let digit = usize::from(ch.to_ascii_uppercase() - b'A' + 1);
        acc = acc
            .checked_mul(26)
            .and_then(|value| value.checked_add(digit))
            .ok_or_else(out_of_range)?;
    }
    let index = acc - 1;
    if index > MAX_COLUMN {
        return Err(out_of_range());
    }
    Ok(Some(index))
}

/// Column of a `<c>` element: its `r` reference, else the slot after the
/// previous cell.
fn cell_column(start: &BytesStart<'_>, part: &str, next_column: usize) -> Result<usize, WorkbookError> {
    let column = match attr(start, part, b"r")? {
        Some(reference) => column_index(part, &reference)?.unwrap_or(next_column),
        None => next_column,
    };
    if column > MAX_COLUMN {
        return Err(xml_error(part, "row has more cells than column XFD allows"));
    }
    Ok(column)
}

#[derive(Default)]
struct CellCursor {
    column: usize,
    kind: Option<String>,
    value: String,
    capture: bool,
}

fn parse_sheet_cells(
    part: &str,
    xml: &str,
    shared: &[String],
) -> Result<BTreeMap<usize, BTreeMap<usize, String>>, WorkbookError> {
    let mut grid: BTreeMap<usize, BTreeMap<usize, String>> = BTreeMap::new();
    let mut reader = Reader::from_str(xml);
    let mut row_index = 0usize;
    let mut next_column = 0usize;
    let mut cell: Option<CellCursor> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row_index = attr(&e, part, b"r")?
                        .and_then(|r| r.parse::<usize>().ok())
                        .unwrap_or(row_index.saturating_add(1));
                    next_column = 0;
                }
                b"c" => {
                    let column = cell_column(&e, part, next_column)?;
                    next_column = column + 1;
                    cell = Some(CellCursor {
                        column,
                        kind: attr(&e, part, b"t")?,
                        ..CellCursor::default()
                    });
                }
                b"v" | b"t" => {
                    if let Some(cursor) = cell.as_mut() {
                        cursor.capture = true;
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"c" => {
                next_column = cell_column(&e, part, next_column)? + 1;
            }
            Ok(Event::Text(t)) => {
                if let Some(cursor) = cell.as_mut().filter(|c| c.capture) {
                    cursor
                        .value
                        .push_str(&t.unescape().map_err(|err| xml_error(part, err))?);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => {
                    if let Some(cursor) = cell.as_mut() {
                        cursor.capture = false;
                    }
                }
                b"c" => {
                    if let Some(cursor) = cell.take() {
                        let value = resolve_cell(cursor.kind.as_deref(), cursor.value, shared);
                        if !value.is_empty() {
                            grid.entry(row_index)
                                .or_default()
                                .insert(cursor.column, value);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(xml_error(part, err)),
            _ => {}
        }
    }
    Ok(grid)
}

fn resolve_cell(kind: Option<&str>, raw: String, shared: &[String]) -> String {
    match kind {
        Some("s") => raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|idx| shared.get(idx).cloned())
            .unwrap_or_default(),
        Some("b") => match raw.trim() {
            "1" => "TRUE".to_string(),
            _ => "FALSE".to_string(),
        },
        _ => raw,
    }
}

// ---------------------------------------------------------------- writing

#[derive(Debug, Clone)]
pub struct SheetColumn {
    pub header: String,
    pub width: f32,
}

impl SheetColumn {
    pub fn new(header: impl Into<String>, width: f32) -> Self {
        Self {
            header: header.into(),
            width,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<SheetColumn>,
    pub rows: Vec<Vec<String>>,
}

/// Writes a minimal SpreadsheetML package: one worksheet per `Sheet`,
/// bold frozen header row, inline strings.
pub fn write_workbook(sheets: &[Sheet]) -> Result<Vec<u8>, WorkbookError> {
    if sheets.is_empty() {
        return Err(WorkbookError::MissingSheet);
    }
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut parts: Vec<(String, String)> = vec![
        ("[Content_Types].xml".into(), content_types(sheets.len())),
        ("_rels/.rels".into(), root_rels()),
        ("xl/workbook.xml".into(), workbook_xml(sheets)),
        ("xl/_rels/workbook.xml.rels".into(), workbook_rels(sheets.len())),
        ("xl/styles.xml".into(), styles_xml()),
    ];
    for (idx, sheet) in sheets.iter().enumerate() {
        parts.push((
            format!("xl/worksheets/sheet{}.xml", idx + 1),
            worksheet_xml(sheet),
        ));
    }

    for (name, body) in parts {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
    }
    Ok(zip.finish()?.into_inner())
}

fn content_types(sheet_count: usize) -> String {
    let mut xml = format!(
        "{XML_DECL}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
<Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>"
    );
    for idx in 1..=sheet_count {
        xml.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{idx}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>"
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn root_rels() -> String {
    format!(
        "{XML_DECL}<Relationships xmlns=\"{PKG_REL_NS}\">\
<Relationship Id=\"rId1\" Type=\"{REL_NS}/officeDocument\" Target=\"xl/workbook.xml\"/>\
</Relationships>"
    )
}

fn workbook_xml(sheets: &[Sheet]) -> String {
    let mut xml = format!("{XML_DECL}<workbook xmlns=\"{SHEET_NS}\" xmlns:r=\"{REL_NS}\"><sheets>");
    for (idx, sheet) in sheets.iter().enumerate() {
        let name: String = sheet.name.chars().take(31).collect();
        xml.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{id}\" r:id=\"rId{id}\"/>",
            escape(name.as_str()),
            id = idx + 1
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels(sheet_count: usize) -> String {
    let mut xml = format!("{XML_DECL}<Relationships xmlns=\"{PKG_REL_NS}\">");
    for idx in 1..=sheet_count {
        xml.push_str(&format!(
            "<Relationship Id=\"rId{idx}\" Type=\"{REL_NS}/worksheet\" Target=\"worksheets/sheet{idx}.xml\"/>"
        ));
    }
    xml.push_str(&format!(
        "<Relationship Id=\"rId{}\" Type=\"{REL_NS}/styles\" Target=\"styles.xml\"/></Relationships>",
        sheet_count + 1
    ));
    xml
}

fn styles_xml() -> String {
    format!(
        "{XML_DECL}<styleSheet xmlns=\"{SHEET_NS}\">\
<fonts count=\"2\"><font><sz val=\"11\"/><name val=\"Calibri\"/></font><font><b/><sz val=\"11\"/><name val=\"Calibri\"/></font></fonts>\
<fills count=\"2\"><fill><patternFill patternType=\"none\"/></fill><fill><patternFill patternType=\"gray125\"/></fill></fills>\
<borders count=\"1\"><border><left/><right/><top/><bottom/><diagonal/></border></borders>\
<cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>\
<cellXfs count=\"3\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/>\
<xf numFmtId=\"0\" fontId=\"1\" fillId=\"0\" borderId=\"0\" xfId=\"0\" applyFont=\"1\"/>\
<xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\" applyAlignment=\"1\"><alignment vertical=\"top\" wrapText=\"1\"/></xf></cellXfs>\
<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>\
</styleSheet>"
    )
}

fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Drops characters XML 1.0 cannot carry.
fn xml_safe(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control() || matches!(ch, '\t' | '\n' | '\r'))
        .collect()
}

fn push_row(xml: &mut String, row_number: usize, values: &[String], style: u32) {
    xml.push_str(&format!("<row r=\"{row_number}\">"));
    for (col, value) in values.iter().enumerate() {
        if value.is_empty() {
            continue;
        }
        let safe = xml_safe(value);
        xml.push_str(&format!(
            "<c r=\"{}{row_number}\" s=\"{style}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
            column_letters(col),
            escape(safe.as_str())
        ));
    }
    xml.push_str("</row>");
}

fn worksheet_xml(sheet: &Sheet) -> String {
    let mut xml = format!(
        "{XML_DECL}<worksheet xmlns=\"{SHEET_NS}\" xmlns:r=\"{REL_NS}\">\
<sheetViews><sheetView workbookViewId=\"0\"><pane ySplit=\"1\" topLeftCell=\"A2\" activePane=\"bottomLeft\" state=\"frozen\"/></sheetView></sheetViews>"
    );
    if !sheet.columns.is_empty() {
        xml.push_str("<cols>");
        for (idx, column) in sheet.columns.iter().enumerate() {
            xml.push_str(&format!(
                "<col min=\"{n}\" max=\"{n}\" width=\"{:.1}\" customWidth=\"1\"/>",
                column.width,
                n = idx + 1
            ));
        }
        xml.push_str("</cols>");
    }
    xml.push_str("<sheetData>");
    let headers: Vec<String> = sheet.columns.iter().map(|c| c.header.clone()).collect();
    push_row(&mut xml, 1, &headers, HEADER_STYLE);
    for (idx, row) in sheet.rows.iter().enumerate() {
        push_row(&mut xml, idx + 2, row, BODY_STYLE);
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Reads the `index`-th written worksheet back as a grid (no shared strings).
#[cfg(test)]
pub fn read_sheet(bytes: &[u8], index: usize) -> Result<Option<Grid>, WorkbookError> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let path = format!("xl/worksheets/sheet{}.xml", index + 1);
    let Some(xml) = read_part(&mut zip, &path)? else {
        return Ok(None);
    };
    let cells = parse_sheet_cells(&path, &xml, &[])?;
    let mut rows = cells.into_values();
    let headers_cells = rows.next().unwrap_or_default();
    let width = headers_cells.keys().next_back().map(|c| c + 1).unwrap_or(0);
    Ok(Some(Grid {
        headers: positional(&headers_cells, width),
        rows: rows.map(|cells| positional(&cells, width)).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn column_letters_round_trip() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_index("p", "AB12").unwrap(), Some(27));
        assert_eq!(column_index("p", "A1").unwrap(), Some(0));
        assert_eq!(column_index("p", "xfd3").unwrap(), Some(MAX_COLUMN));
        assert_eq!(column_index("p", "12").unwrap(), None);
    }

    #[test]
    fn column_references_past_xfd_are_rejected() {
        assert!(matches!(
            column_index("p", "XFE1"),
            Err(WorkbookError::Xml { .. })
        ));
        assert!(matches!(
            column_index("p", "ZZZZZZ1"),
            Err(WorkbookError::Xml { .. })
        ));
        assert!(matches!(
            column_index("p", &format!("{}1", "A".repeat(25))),
            Err(WorkbookError::Xml { .. })
        ));
    }

    fn single_sheet(sheet_xml: &str) -> Vec<u8> {
        package(&[("xl/worksheets/sheet1.xml", sheet_xml)])
    }

    #[test]
    fn oversized_header_reference_is_a_workbook_error() {
        for reference in ["AAAAAAAAAAAAAAAAAAAAAAAAA1", "ZZZZZZ1"] {
            let bytes = single_sheet(&format!(
                r#"<worksheet><sheetData><row r="1"><c r="{reference}" t="inlineStr"><is><t>Title</t></is></c></row></sheetData></worksheet>"#
            ));
            let err = read_first_sheet(&bytes).unwrap_err();
            assert!(
                err.to_string().contains("past column XFD"),
                "{reference}: {err}"
            );
        }
    }

    #[test]
    fn wide_sheet_with_many_rows_is_rejected() {
        let mut xml = String::from(
            r#"<worksheet><sheetData><row r="1"><c r="XFD1" t="inlineStr"><is><t>Title</t></is></c></row>"#,
        );
        for row in 2..=200 {
            xml.push_str(&format!(r#"<row r="{row}"><c r="A{row}"><v>1</v></c></row>"#));
        }
        xml.push_str("</sheetData></worksheet>");
        let err = read_first_sheet(&single_sheet(&xml)).unwrap_err();
        assert!(err.to_string().contains("too large"), "{err}");
    }

    #[test]
    fn reads_shared_and_inline_strings_from_first_sheet() {
        let bytes = package(&[
            (
                "xl/workbook.xml",
                r#"<workbook xmlns:r="r"><sheets><sheet name="Data" sheetId="1" r:id="rId7"/><sheet name="Other" sheetId="2" r:id="rId8"/></sheets></workbook>"#,
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<Relationships><Relationship Id="rId8" Target="worksheets/other.xml"/><Relationship Id="rId7" Target="worksheets/data.xml"/></Relationships>"#,
            ),
            (
                "xl/sharedStrings.xml",
                r#"<sst><si><t>Title</t></si><si><t>Price</t></si><si><r><t>Brass </t></r><r><t>lamp</t></r><rPh><t>ignored</t></rPh></si></sst>"#,
            ),
            (
                "xl/worksheets/data.xml",
                r#"<worksheet><sheetData>
                <row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="s"><v>1</v></c></row>
                <row r="2"><c r="A2" t="s"><v>2</v></c><c r="C2"><v>19.5</v></c></row>
                <row r="4"><c r="A4" t="inlineStr"><is><t>Desk &amp; chair</t></is></c></row>
                </sheetData></worksheet>"#,
            ),
            (
                "xl/worksheets/other.xml",
                r#"<worksheet><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>wrong</t></is></c></row></sheetData></worksheet>"#,
            ),
        ]);

        let grid = read_first_sheet(&bytes).expect("read");
        assert_eq!(grid.headers, vec!["Title", "", "Price"]);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[0], vec!["Brass lamp", "", "19.5"]);
        assert_eq!(grid.rows[1], vec!["Desk & chair", "", ""]);
    }

    #[test]
    fn written_workbook_reads_back() {
        let sheet = Sheet {
            name: "Listings".into(),
            columns: vec![SheetColumn::new("Title", 30.0), SheetColumn::new("Notes", 20.0)],
            rows: vec![
                vec!["Lampe <Messing>".into(), "".into()],
                vec!["Tasse".into(), "a \"quote\"".into()],
            ],
        };
        let bytes = write_workbook(&[sheet]).expect("write");
        let grid = read_first_sheet(&bytes).expect("read back");
        assert_eq!(grid.headers, vec!["Title", "Notes"]);
        assert_eq!(grid.rows[0], vec!["Lampe <Messing>", ""]);
        assert_eq!(grid.rows[1], vec!["Tasse", "a \"quote\""]);
    }

    #[test]
    fn refuses_to_write_without_sheets() {
        assert!(matches!(
            write_workbook(&[]),
            Err(WorkbookError::MissingSheet)
        ));
    }
}
