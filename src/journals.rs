//! Journal name to listing URL table
//!
//! The table is plain data handed to the harvester by the caller. A built-in
//! default exists for convenience; a JSON object of `"name": "listing url"`
//! pairs replaces it.

use crate::config::DEFAULT_LISTING_BASE;
use crate::error::{Error, Result};
use crate::listing::listing_url;
use std::collections::BTreeMap;
use std::path::Path;

/// Selection keyword that picks every journal in the table
pub const ALL_JOURNALS: &str = "all";

/// Journals known without a table file: name → Crossref publication id
const BUILTIN_PUBIDS: &[(&str, &str)] = &[("J140965", "J140965")];

/// Mapping journal name → listing URL, iterated in name order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JournalTable {
    entries: BTreeMap<String, String>,
}

impl JournalTable {
    /// Table from explicit `(name, listing url)` pairs
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Built-in table against the Crossref depositor report
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (name, pubid) in BUILTIN_PUBIDS {
            if let Ok(url) = listing_url(DEFAULT_LISTING_BASE, pubid) {
                table.entries.insert((*name).to_string(), url);
            }
        }
        table
    }

    /// Parse a JSON object of `"name": "listing url"` pairs
    ///
    /// # Errors
    /// Returns error if the JSON is malformed, empty, uses the reserved name
    /// `all`, has a name that is not a plain directory name, or contains a URL
    /// that does not parse
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: BTreeMap<String, String> = serde_json::from_str(json)?;
        if entries.is_empty() {
            return Err(Error::config("journals", "journal table is empty"));
        }
        if entries.contains_key(ALL_JOURNALS) {
            return Err(Error::config(
                "journals",
                format!("'{ALL_JOURNALS}' is reserved and cannot name a journal"),
            ));
        }
        for (name, url) in &entries {
            if !is_plain_name(name) {
                return Err(Error::config(
                    "journals",
                    format!("journal name '{name}' must not be empty, '.', '..' or contain path separators"),
                ));
            }
            url::Url::parse(url).map_err(|e| {
                Error::config("journals", format!("journal '{name}' has invalid URL: {e}"))
            })?;
        }
        Ok(Self { entries })
    }

    /// Load a table file (see [`JournalTable::from_json`])
    ///
    /// Names double as output subdirectories, so they are checked to stay
    /// inside the output directory.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Sorted journal names
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Listing URL for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Number of journals
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table has no journals
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a selection to `(name, listing url)` pairs
    ///
    /// `all` selects every journal in name order.
    ///
    /// # Errors
    /// Returns [`Error::UnknownJournal`] with the available names if the
    /// selection matches nothing
    pub fn resolve(&self, selection: &str) -> Result<Vec<(String, String)>> {
        if selection == ALL_JOURNALS {
            return Ok(self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect());
        }
        match self.entries.get(selection) {
            Some(url) => Ok(vec![(selection.to_string(), url.clone())]),
            None => Err(Error::UnknownJournal {
                name: selection.to_string(),
                available: self.names(),
            }),
        }
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> JournalTable {
        JournalTable::new([
            ("prx", "http://listing.test/report?pubid=J1"),
            ("prb", "http://listing.test/report?pubid=J2"),
        ])
    }

    #[test]
    fn builtin_points_at_depositor_report() {
        let table = JournalTable::builtin();
        assert_eq!(
            table.get("J140965"),
            Some("http://data.crossref.org/depositorreport?pubid=J140965")
        );
    }

    #[test]
    fn resolve_single_journal() {
        let resolved = table().resolve("prx").unwrap();
        assert_eq!(
            resolved,
            vec![(
                "prx".to_string(),
                "http://listing.test/report?pubid=J1".to_string()
            )]
        );
    }

    #[test]
    fn resolve_all_in_name_order() {
        let names: Vec<_> = table()
            .resolve(ALL_JOURNALS)
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["prb", "prx"]);
    }

    #[test]
    fn unknown_journal_reports_available_names() {
        match table().resolve("nature") {
            Err(Error::UnknownJournal { name, available }) => {
                assert_eq!(name, "nature");
                assert_eq!(available, vec!["prb", "prx"]);
            }
            other => panic!("expected UnknownJournal, got {other:?}"),
        }
    }

    #[test]
    fn from_json_validates_entries() {
        let table =
            JournalTable::from_json(r#"{"prx": "http://data.crossref.org/depositorreport?pubid=J1"}"#)
                .unwrap();
        assert_eq!(table.len(), 1);

        assert!(JournalTable::from_json("{}").is_err());
        assert!(JournalTable::from_json(r#"{"all": "http://x.test/"}"#).is_err());
        assert!(JournalTable::from_json(r#"{"prx": "not a url"}"#).is_err());
        assert!(matches!(
            JournalTable::from_json("[1, 2]"),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn from_json_rejects_names_that_leave_output_dir() {
        for name in ["../escape", "/tmp/x", "a\\b", "..", ".", ""] {
            let json = serde_json::json!({ name: "http://example.com/r?pubid=J1" }).to_string();
            assert!(
                matches!(JournalTable::from_json(&json), Err(Error::Config { .. })),
                "{name:?} should be rejected"
            );
        }
        assert!(JournalTable::from_json(r#"{"phys..rev": "http://example.com/r"}"#).is_ok());
    }

    #[test]
    fn load_reads_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("journals.json");
        std::fs::write(&path, r#"{"a": "http://x.test/r?pubid=1", "b": "http://x.test/r?pubid=2"}"#)
            .unwrap();
        let table = JournalTable::load(&path).unwrap();
        assert_eq!(table.names(), vec!["a", "b"]);

        assert!(matches!(
            JournalTable::load(&temp_dir.path().join("missing.json")),
            Err(Error::Io(_))
        ));
    }
}
