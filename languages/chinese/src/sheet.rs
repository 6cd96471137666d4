//! Minimal xlsx reader: first worksheet, cell text only.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use twdict_core::error::ParseError;
use zip::ZipArchive;

const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const DEFAULT_SHEET: &str = "xl/worksheets/sheet1.xml";
/// Column count of a worksheet, `A` through `XFD`
const MAX_COLUMNS: usize = 16_384;

/// One non-empty worksheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    /// 1-based row number as shown by spreadsheet applications
    pub number: u32,
    /// Cell text by column position; gaps are empty strings
    pub cells: Vec<String>,
}

pub fn read_first_sheet(path: &Path) -> Result<Vec<SheetRow>, ParseError> {
    let file = File::open(path).map_err(|e| ParseError::io(path, e))?;
    read_first_sheet_from(BufReader::new(file))
}

pub fn read_first_sheet_from<R: Read + Seek>(reader: R) -> Result<Vec<SheetRow>, ParseError> {
    let mut archive = ZipArchive::new(reader).map_err(|e| ParseError::Workbook(e.to_string()))?;

    let shared = match archive.by_name(SHARED_STRINGS) {
        Ok(entry) => read_shared_strings(BufReader::new(entry))?,
        Err(zip::result::ZipError::FileNotFound) => Vec::new(),
        Err(e) => return Err(ParseError::Workbook(e.to_string())),
    };

    let sheet_name = first_sheet_name(&mut archive)?;
    tracing::debug!("Reading worksheet {}", sheet_name);

    let entry = archive
        .by_name(&sheet_name)
        .map_err(|e| ParseError::Workbook(e.to_string()))?;
    read_rows(BufReader::new(entry), &shared)
}

/// Resolve the first `<sheet>` of the workbook through its relationship,
/// falling back to the conventional part names.
fn first_sheet_name<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String, ParseError> {
    if let Some(name) = sheet_from_workbook(archive)?
        && archive.index_for_name(&name).is_some()
    {
        return Ok(name);
    }

    if archive.index_for_name(DEFAULT_SHEET).is_some() {
        return Ok(DEFAULT_SHEET.to_string());
    }

    let mut sheets: Vec<&str> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/") && n.ends_with(".xml"))
        .collect();
    sheets.sort_unstable();

    sheets
        .first()
        .map(|s| s.to_string())
        .ok_or(ParseError::MissingSheet)
}

fn sheet_from_workbook<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<Option<String>, ParseError> {
    let Some(workbook) = read_part(archive, WORKBOOK)? else {
        return Ok(None);
    };
    let mut reader = Reader::from_reader(workbook.as_slice());
    // `r:id` of the first sheet
    let Some(rel_id) = first_attribute(&mut reader, b"sheet", |key| key.ends_with(b"id"))? else {
        return Ok(None);
    };

    let Some(rels) = read_part(archive, WORKBOOK_RELS)? else {
        return Ok(None);
    };
    let target = relationship_target(&mut Reader::from_reader(rels.as_slice()), &rel_id)?;

    Ok(target.map(|t| match t.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{t}"),
    }))
}

/// Raw bytes of a small package part, if present.
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, ParseError> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut bytes = Vec::new();
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| ParseError::Workbook(e.to_string()))?;
            Ok(Some(bytes))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(ParseError::Workbook(e.to_string())),
    }
}

fn first_attribute<B: BufRead>(
    reader: &mut Reader<B>,
    element: &[u8],
    key_matches: impl Fn(&[u8]) -> bool,
) -> Result<Option<String>, ParseError> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == element => {
                for attr in e.attributes() {
                    let attr = attr.map_err(xml_error)?;
                    if key_matches(attr.key.as_ref()) {
                        return Ok(Some(attr.unescape_value().map_err(xml_error)?.into_owned()));
                    }
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

fn relationship_target<B: BufRead>(
    reader: &mut Reader<B>,
    rel_id: &str,
) -> Result<Option<String>, ParseError> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if attribute(e, b"Id")?.as_deref() == Some(rel_id) {
                    return attribute(e, b"Target");
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, ParseError> {
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value().map_err(xml_error)?.into_owned()));
        }
    }
    Ok(None)
}

/// Shared string table. Rich-text runs are concatenated; phonetic runs
/// (`<rPh>`) are dropped.
fn read_shared_strings<B: BufRead>(source: B) -> Result<Vec<String>, ParseError> {
    let mut reader = Reader::from_reader(source);
    reader.trim_text(false);

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_phonetic = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(ref t) if in_text && !in_phonetic => {
                current.push_str(&t.unescape().map_err(xml_error)?);
            }
            Event::CData(ref t) if in_text && !in_phonetic => {
                current.push_str(&String::from_utf8_lossy(t));
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

#[derive(Default)]
struct CellState {
    column: usize,
    kind: CellKind,
    value: String,
}

#[derive(Default, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    #[default]
    Number,
    Shared,
    Inline,
    Text,
    Bool,
}

fn read_rows<B: BufRead>(source: B, shared: &[String]) -> Result<Vec<SheetRow>, ParseError> {
    let mut reader = Reader::from_reader(source);
    reader.trim_text(false);

    let mut rows = Vec::new();
    let mut row_number = 0u32;
    let mut cells: Vec<String> = Vec::new();
    let mut cell: Option<CellState> = None;
    let mut capture = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"row" => {
                    row_number = attribute(e, b"r")?
                        .and_then(|r| r.parse().ok())
                        .unwrap_or(row_number + 1);
                    cells.clear();
                }
                b"c" => cell = Some(start_cell(e, cells.len())?),
                b"v" => capture = true,
                b"t" => capture = cell.as_ref().is_some_and(|c| c.kind == CellKind::Inline),
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                row_number = attribute(e, b"r")?
                    .and_then(|r| r.parse().ok())
                    .unwrap_or(row_number + 1);
            }
            Event::Text(ref t) if capture => {
                if let Some(cell) = cell.as_mut() {
                    cell.value.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    if let Some(done) = cell.take() {
                        place_cell(&mut cells, done, shared);
                    }
                }
                b"row" => {
                    if cells.iter().any(|c| !c.trim().is_empty()) {
                        rows.push(SheetRow {
                            number: row_number,
                            cells: std::mem::take(&mut cells),
                        });
                    }
                    cells.clear();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(rows)
}

fn start_cell(e: &BytesStart<'_>, next_column: usize) -> Result<CellState, ParseError> {
    let column = match attribute(e, b"r")? {
        Some(reference) => column_index(&reference)?.unwrap_or(next_column),
        None => next_column,
    };
    if column >= MAX_COLUMNS {
        return Err(ParseError::Xml(format!("too many cells in row, column {}", column + 1)));
    }

    let kind = match attribute(e, b"t")?.as_deref() {
        Some("s") => CellKind::Shared,
        Some("inlineStr") => CellKind::Inline,
        Some("str") => CellKind::Text,
        Some("b") => CellKind::Bool,
        _ => CellKind::Number,
    };

    Ok(CellState {
        column,
        kind,
        value: String::new(),
    })
}

fn place_cell(cells: &mut Vec<String>, cell: CellState, shared: &[String]) {
    let text = match cell.kind {
        CellKind::Shared => cell
            .value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared.get(i).cloned())
            .unwrap_or_default(),
        CellKind::Bool => match cell.value.trim() {
            "1" => "TRUE".to_string(),
            _ => "FALSE".to_string(),
        },
        _ => cell.value,
    };

    if cells.len() <= cell.column {
        cells.resize(cell.column + 1, String::new());
    }
    cells[cell.column] = text;
}

/// Zero-based column index from a cell reference such as `B7` or `AA12`.
///
/// `None` when the reference carries no column letters. References past
/// `XFD` are rejected.
pub fn column_index(reference: &str) -> Result<Option<usize>, ParseError> {
    let letters = reference.bytes().take_while(u8::is_ascii_alphabetic);

    let mut index = 0usize;
    for letter in letters {
        index = index * 26 + (letter.to_ascii_uppercase() - b'A') as usize + 1;
        if index > MAX_COLUMNS {
            return Err(ParseError::Xml(format!(
                "cell reference '{reference}' is past column XFD"
            )));
        }
    }
    Ok(index.checked_sub(1))
}

fn xml_error(e: impl std::fmt::Display) -> ParseError {
    ParseError::Xml(e.to_string())
}
