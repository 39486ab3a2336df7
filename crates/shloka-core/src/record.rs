//! Verse records: the raw corpus row, the validated metadata record, and which
//! field gets embedded.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canto or chapter identifier. Numeric in the scraped corpus, but any label is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Number(i64),
    Text(String),
}

impl Identifier {
    /// Integer if the cell parses as one, otherwise the trimmed text.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.parse::<i64>() {
            Ok(n) => Identifier::Number(n),
            Err(_) => Identifier::Text(s.to_string()),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Number(n) => write!(f, "{n}"),
            Identifier::Text(s) => f.write_str(s),
        }
    }
}

/// One verse as stored in the metadata table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataRecord {
    pub canto: Identifier,
    pub chapter: Identifier,
    pub sanskrit: String,
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purport: Option<String>,
}

/// A corpus row as read from input. Empty cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub canto: Option<String>,
    pub chapter: Option<String>,
    pub sanskrit: Option<String>,
    pub translation: Option<String>,
    pub purport: Option<String>,
}

impl RawRow {
    /// Names of required fields this row lacks.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("Canto", &self.canto),
            ("Chapter", &self.chapter),
            ("Sanskrit", &self.sanskrit),
            ("Translation", &self.translation),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| name)
        .collect()
    }

    /// Convert into a record, or return the missing required field names.
    pub fn into_record(self) -> Result<MetadataRecord, Vec<&'static str>> {
        match self {
            RawRow {
                canto: Some(canto),
                chapter: Some(chapter),
                sanskrit: Some(sanskrit),
                translation: Some(translation),
                purport,
            } => Ok(MetadataRecord {
                canto: Identifier::parse(&canto),
                chapter: Identifier::parse(&chapter),
                sanskrit,
                translation,
                purport,
            }),
            incomplete => Err(incomplete.missing_fields()),
        }
    }
}

/// Which field of a record is sent to the embedding model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedField {
    #[default]
    Sanskrit,
    Translation,
}

impl EmbedField {
    pub fn text<'a>(&self, record: &'a MetadataRecord) -> &'a str {
        match self {
            EmbedField::Sanskrit => &record.sanskrit,
            EmbedField::Translation => &record.translation,
        }
    }
}

/// Normalize a cell: trimmed, `None` if blank.
pub(crate) fn cell(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}
