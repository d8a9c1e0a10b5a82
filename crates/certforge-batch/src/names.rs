//! Name lists and the sources that produce them.

use std::path::{Path, PathBuf};

use calamine::{Data, Reader};
use thiserror::Error;

/// Ordered names to render, one certificate each.
///
/// Order is source row order. Duplicates are kept and blank (empty or
/// whitespace-only) entries are dropped when the list is built. Kept names
/// are stored exactly as given.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct NameList(Vec<String>);

impl NameList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            names
                .into_iter()
                .filter(|n| !n.as_ref().trim().is_empty())
                .map(|n| n.as_ref().to_string())
                .collect(),
        )
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    #[inline]
    pub fn first(&self) -> Option<&str> {
        self.get(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[inline]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for NameList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Error produced while reading names.
#[derive(Debug, Error)]
pub enum NameSourceError {
    #[error("failed to read names from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unterminated quoted cell on line {line}")]
    UnterminatedQuote { line: usize },
    #[error("failed to read workbook {path}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
}

/// Supplies the ordered name list for a batch.
pub trait NameSource {
    fn names(&self) -> Result<NameList, NameSourceError>;
}

impl NameSource for NameList {
    fn names(&self) -> Result<NameList, NameSourceError> {
        Ok(self.clone())
    }
}

/// Reads names from a delimited text table (CSV, TSV or `;`-separated).
///
/// Every cell of every row is taken in row-major order and blank cells are
/// dropped, so a single column, a single row and a ragged grid all flatten to
/// the same kind of list. Cells may be wrapped in double quotes; `""` inside a
/// quoted cell is a literal quote. Quoted cells cannot span lines.
#[derive(Debug, Clone)]
pub struct DelimitedNameSource {
    text: String,
}

impl DelimitedNameSource {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, NameSourceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| NameSourceError::Io { path: path.to_path_buf(), source })?;
        Ok(Self::from_text(text))
    }
}

impl NameSource for DelimitedNameSource {
    fn names(&self) -> Result<NameList, NameSourceError> {
        let text = self.text.strip_prefix('\u{feff}').unwrap_or(&self.text);
        let mut cells = Vec::new();
        for (i, line) in text.lines().enumerate() {
            split_row(line, delimiter_for(line), i + 1, &mut cells)?;
        }
        Ok(NameList::new(cells))
    }
}

/// Reads names from the first worksheet of a spreadsheet workbook
/// (`.xlsx`, `.xlsm`, `.xlsb`, `.xls` or `.ods`).
///
/// Cells are flattened row by row, left to right, and empty cells are
/// dropped. Numbers, booleans and dates are taken as their display text. A
/// workbook with no worksheets yields an empty list.
#[derive(Debug, Clone)]
pub struct WorkbookNameSource {
    path: PathBuf,
}

impl WorkbookNameSource {
    /// File extensions this source can open.
    pub const EXTENSIONS: [&'static str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Whether `path` has a workbook extension, ignoring case.
    pub fn handles(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| Self::EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
    }

    fn error(&self, source: calamine::Error) -> NameSourceError {
        NameSourceError::Workbook { path: self.path.clone(), source }
    }
}

impl NameSource for WorkbookNameSource {
    fn names(&self) -> Result<NameList, NameSourceError> {
        let mut workbook = calamine::open_workbook_auto(&self.path).map_err(|e| self.error(e))?;
        let Some(sheet) = workbook.worksheet_range_at(0) else {
            log::warn!("{} has no worksheets", self.path.display());
            return Ok(NameList::default());
        };
        let sheet = sheet.map_err(|e| self.error(e))?;

        Ok(sheet
            .rows()
            .flatten()
            .filter(|cell| !matches!(cell, Data::Empty))
            .map(ToString::to_string)
            .collect())
    }
}

fn delimiter_for(line: &str) -> char {
    if line.contains('\t') {
        '\t'
    } else if line.contains(';') && !line.contains(',') {
        ';'
    } else {
        ','
    }
}

fn split_row(
    line: &str,
    delimiter: char,
    line_no: usize,
    out: &mut Vec<String>,
) -> Result<(), NameSourceError> {
    let mut cell = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cell.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' if cell.trim().is_empty() => {
                cell.clear();
                quoted = true;
            }
            c if c == delimiter && !quoted => out.push(std::mem::take(&mut cell)),
            c => cell.push(c),
        }
    }

    if quoted {
        return Err(NameSourceError::UnterminatedQuote { line: line_no });
    }
    out.push(cell);
    Ok(())
}
