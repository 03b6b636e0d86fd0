//! FAQ Storage
//!
//! Read-only question/answer lookup. The bot only needs listing and lookup
//! by id; where the entries live is up to the implementation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Question/answer pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub id: u64,
    pub question: String,
    /// May be empty
    pub answer: String,
}

/// Read-only FAQ store
pub trait FaqStore: Send + Sync {
    /// All entries, ordered by id
    fn select_all(&self) -> Vec<FaqEntry>;

    /// Entry with the given id
    fn get_by_id(&self, id: u64) -> Option<FaqEntry>;
}

/// Entry as written in a data file (id optional)
#[derive(Debug, Deserialize)]
struct RawEntry {
    id: Option<u64>,
    question: String,
    #[serde(default)]
    answer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    #[serde(default)]
    entries: Vec<RawEntry>,
}

/// In-memory store loaded from a TOML or JSON file
///
/// ```toml
/// [[entries]]
/// question = "How do I connect?"
/// answer = "Import the config into the WireGuard app."
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticFaqStore {
    entries: Vec<FaqEntry>,
}

impl StaticFaqStore {
    /// Build from entries (sorted by id, ids must be unique)
    pub fn new(mut entries: Vec<FaqEntry>) -> Result<Self, StoreError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.id) {
                return Err(StoreError::DuplicateId(entry.id));
            }
        }
        entries.sort_by_key(|e| e.id);
        Ok(Self { entries })
    }

    /// Load from file, format chosen by extension
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::Io(e.to_string()))?;

        let store = match ext {
            "toml" => Self::from_toml(&content)?,
            "json" => Self::from_json(&content)?,
            _ => return Err(StoreError::UnsupportedFormat),
        };

        info!("Loaded {} FAQ entries from {}", store.len(), path.display());
        Ok(store)
    }

    /// Parse TOML (`[[entries]]` tables)
    pub fn from_toml(content: &str) -> Result<Self, StoreError> {
        let raw: RawFile = toml::from_str(content).map_err(|e| StoreError::Parse(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Parse JSON (`{"entries": [...]}`)
    pub fn from_json(content: &str) -> Result<Self, StoreError> {
        let raw: RawFile =
            serde_json::from_str(content).map_err(|e| StoreError::Parse(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawFile) -> Result<Self, StoreError> {
        // Entries without an id follow the previous one; `None` once u64::MAX is taken
        let mut next_id = Some(1);
        let mut entries = Vec::with_capacity(raw.entries.len());
        for e in raw.entries {
            let id = match e.id {
                Some(id) => id,
                None => next_id.ok_or(StoreError::IdOverflow)?,
            };
            next_id = id.checked_add(1);
            entries.push(FaqEntry {
                id,
                question: e.question,
                answer: e.answer.unwrap_or_default(),
            });
        }
        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FaqStore for StaticFaqStore {
    fn select_all(&self) -> Vec<FaqEntry> {
        self.entries.clone()
    }

    fn get_by_id(&self, id: u64) -> Option<FaqEntry> {
        self.entries
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|i| self.entries[i].clone())
    }
}

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported FAQ file format")]
    UnsupportedFormat,

    #[error("Duplicate FAQ id: {0}")]
    DuplicateId(u64),

    #[error("No FAQ id left after {}", u64::MAX)]
    IdOverflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML: &str = r#"
        [[entries]]
        question = "How do I connect?"
        answer = "Import the config into the WireGuard app."

        [[entries]]
        question = "Is it free?"

        [[entries]]
        id = 10
        question = "Who runs this?"
        answer = "Students."
    "#;

    #[test]
    fn test_toml_ids_and_order() {
        let store = StaticFaqStore::from_toml(TOML).unwrap();
        let ids: Vec<u64> = store.select_all().iter().map(|e| e.id).collect();

        assert_eq!(ids, vec![1, 2, 10]);
        assert_eq!(store.get_by_id(2).unwrap().answer, "");
        assert_eq!(store.get_by_id(10).unwrap().question, "Who runs this?");
        assert!(store.get_by_id(3).is_none());
    }

    #[test]
    fn test_json() {
        let store = StaticFaqStore::from_json(
            r#"{"entries": [{"id": 5, "question": "Q", "answer": "A"}, {"question": "Next"}]}"#,
        )
        .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get_by_id(6).unwrap().question, "Next");
    }

    #[test]
    fn test_duplicate_ids() {
        let err = StaticFaqStore::from_toml(
            "[[entries]]\nid = 1\nquestion = \"a\"\n[[entries]]\nid = 1\nquestion = \"b\"\n",
        )
        .unwrap_err();
        assert_eq!(err, StoreError::DuplicateId(1));
    }

    #[test]
    fn test_implicit_id_after_max() {
        let err = StaticFaqStore::from_json(
            r#"{"entries":[{"id":18446744073709551615,"question":"Q"},{"question":"N"}]}"#,
        )
        .unwrap_err();
        assert_eq!(err, StoreError::IdOverflow);

        let store =
            StaticFaqStore::from_json(r#"{"entries":[{"id":18446744073709551615,"question":"Q"}]}"#)
                .unwrap();
        assert_eq!(store.get_by_id(u64::MAX).unwrap().question, "Q");
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::TempDir::new().unwrap();

        let toml_path = dir.path().join("faq.toml");
        std::fs::write(&toml_path, TOML).unwrap();
        assert_eq!(StaticFaqStore::load(&toml_path).unwrap().len(), 3);

        let yaml_path = dir.path().join("faq.yaml");
        std::fs::write(&yaml_path, "entries: []").unwrap();
        assert_eq!(StaticFaqStore::load(&yaml_path).unwrap_err(), StoreError::UnsupportedFormat);

        assert!(matches!(
            StaticFaqStore::load(&dir.path().join("missing.toml")),
            Err(StoreError::Io(_))
        ));
    }
}
