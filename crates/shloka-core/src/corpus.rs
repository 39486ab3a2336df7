//! Reading the verse corpus from CSV.
//!
//! The corpus is one CSV file, or a directory of them read in path order.
//! Columns are matched by name, case-insensitively; extra columns are ignored.

use std::io::Read;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::record::{cell, RawRow};

const REQUIRED_COLUMNS: [&str; 4] = ["canto", "chapter", "sanskrit", "translation"];

/// Reads every corpus row under `path`, in file order then row order.
/// Rows are returned as-is; incomplete rows are filtered by the index builder.
pub fn read_corpus(path: &Path) -> Result<Vec<RawRow>, CorpusError> {
    let mut rows = Vec::new();
    for file in corpus_files(path)? {
        let f = std::fs::File::open(&file).map_err(|e| CorpusError::Read(file.clone(), e))?;
        rows.extend(read_csv(f).map_err(|e| e.in_file(&file))?);
    }
    Ok(rows)
}

/// The CSV files making up the corpus at `path`, sorted.
pub fn corpus_files(path: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(CorpusError::NotFound(path.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
    {
        let entry = entry.map_err(|e| CorpusError::Walk(e.to_string()))?;
        let p = entry.path();
        if p.extension().is_some_and(|e| e.eq_ignore_ascii_case("csv")) && p.is_file() {
            files.push(p.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

/// Parses CSV with a header row into raw rows. Short rows yield `None` for the absent cells.
pub fn read_csv<R: Read>(input: R) -> Result<Vec<RawRow>, CorpusError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);
    let columns = Columns::locate(reader.headers()?)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let get = |i: Option<usize>| i.and_then(|i| record.get(i)).and_then(cell);
        rows.push(RawRow {
            canto: get(Some(columns.canto)),
            chapter: get(Some(columns.chapter)),
            sanskrit: get(Some(columns.sanskrit)),
            translation: get(Some(columns.translation)),
            purport: get(columns.purport),
        });
    }
    Ok(rows)
}

/// Column positions in the header.
struct Columns {
    canto: usize,
    chapter: usize,
    sanskrit: usize,
    translation: usize,
    purport: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, CorpusError> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();
        let find = |name: &str| names.iter().position(|n| n == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| find(c).is_none())
            .map(|c| c.to_string())
            .collect();
        match (find("canto"), find("chapter"), find("sanskrit"), find("translation")) {
            (Some(canto), Some(chapter), Some(sanskrit), Some(translation)) => Ok(Self {
                canto,
                chapter,
                sanskrit,
                translation,
                purport: find("purport"),
            }),
            _ => Err(CorpusError::MissingColumns(missing)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("corpus not found: {0}")]
    NotFound(PathBuf),
    #[error("walk error: {0}")]
    Walk(String),
    #[error("read error for {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("{0}: {1}")]
    InFile(PathBuf, Box<CorpusError>),
}

impl CorpusError {
    fn in_file(self, path: &Path) -> Self {
        CorpusError::InFile(path.to_path_buf(), Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\u{feff}Canto,Chapter,Sanskrit,Transliteration,Translation,Purport\n\
        1,1,om namo,oṁ namo,O my Lord,The purport.\n\
        1,1,janmady asya,janmādy asya,I meditate upon Him,\n\
        1,2,,x,Missing sanskrit,P\n\
        1,3\n";

    #[test]
    fn reads_columns_by_name() {
        let rows = read_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].canto.as_deref(), Some("1"));
        assert_eq!(rows[0].sanskrit.as_deref(), Some("om namo"));
        assert_eq!(rows[0].translation.as_deref(), Some("O my Lord"));
        assert_eq!(rows[0].purport.as_deref(), Some("The purport."));
        assert_eq!(rows[1].purport, None);
        assert_eq!(rows[2].sanskrit, None);
        assert_eq!(rows[3].missing_fields(), vec!["Sanskrit", "Translation"]);
    }

    #[test]
    fn header_match_is_case_insensitive() {
        let rows = read_csv("CANTO,chapter,sanskrit,TRANSLATION\n2,3,s,t\n".as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].purport, None);
        assert_eq!(rows[0].chapter.as_deref(), Some("3"));
    }

    #[test]
    fn missing_required_column() {
        let err = read_csv("Canto,Chapter,Purport\n1,1,x\n".as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "missing required column(s): sanskrit, translation");
        match err {
            CorpusError::MissingColumns(cols) => assert_eq!(cols, vec!["sanskrit", "translation"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reads_directory_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        let header = "Canto,Chapter,Sanskrit,Translation\n";
        std::fs::write(dir.path().join("b.csv"), format!("{header}2,1,b,B\n")).unwrap();
        std::fs::write(dir.path().join("a.csv"), format!("{header}1,1,a,A\n")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::create_dir(dir.path().join(".hidden")).unwrap();
        std::fs::write(dir.path().join(".hidden/c.csv"), format!("{header}3,1,c,C\n")).unwrap();

        let rows = read_corpus(dir.path()).unwrap();
        let sanskrit: Vec<_> = rows.iter().map(|r| r.sanskrit.as_deref().unwrap()).collect();
        assert_eq!(sanskrit, vec!["a", "b"]);
    }

    #[test]
    fn missing_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_corpus(&dir.path().join("nope.csv")),
            Err(CorpusError::NotFound(_))
        ));
    }
}
