//! Memory store: tagged records on disk, one JSON file per topic.
//!
//! Layout under the memory root:
//! - `summaries/<topic>_summary.json`: `{"tags": [...], "points": [...]}`
//! - `reflections/<topic>_reflections.json`: `{"tags": [...], "questions": [...]}`
//! - `trees/<topic>_tree.json`: `{"statement": ["child", ...], ...}`
//!
//! Older summaries and reflections were bare arrays with no tags. Those still
//! load, tagged `legacy`; nothing writes that shape anymore.
//!
//! There is no in-memory cache. Every call reads disk; [`MemoryStore::snapshot`]
//! is the explicit way to hold a copy.

use crate::tree::ReflectionTree;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const LEGACY_TAG: &str = "legacy";

const TREES_DIR: &str = "trees";
const TREE_SUFFIX: &str = "_tree.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid topic '{0}'")]
    InvalidTopic(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: malformed record: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The two tagged collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Summary,
    Reflection,
}

impl RecordKind {
    fn dir(self) -> &'static str {
        match self {
            Self::Summary => "summaries",
            Self::Reflection => "reflections",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Summary => "_summary.json",
            Self::Reflection => "_reflections.json",
        }
    }

    /// JSON key holding the record body.
    pub fn body_key(self) -> &'static str {
        match self {
            Self::Summary => "points",
            Self::Reflection => "questions",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Reflection => "reflection",
        }
    }
}

/// A summary (body = points) or reflection (body = questions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub topic: String,
    pub tags: BTreeSet<String>,
    pub body: Vec<String>,
}

impl Record {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// On-disk shapes, decoded once here and never passed further.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Legacy(Vec<String>),
    Current {
        #[serde(default)]
        tags: BTreeSet<String>,
        #[serde(default, alias = "points", alias = "questions")]
        body: Vec<String>,
    },
}

impl StoredRecord {
    fn into_record(self, topic: &str) -> Record {
        let (tags, body) = match self {
            Self::Current { tags, body } => (tags, body),
            Self::Legacy(body) => (BTreeSet::from([LEGACY_TAG.to_string()]), body),
        };
        Record {
            topic: topic.to_string(),
            tags,
            body,
        }
    }
}

/// Result of [`MemoryStore::search_memories`].
#[derive(Debug, Default)]
pub struct MemorySearch {
    pub summaries: BTreeMap<String, Record>,
    pub reflections: BTreeMap<String, Record>,
}

impl MemorySearch {
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty() && self.reflections.is_empty()
    }
}

/// Point-in-time copy of every collection, bodies only.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub summaries: BTreeMap<String, Vec<String>>,
    pub reflections: BTreeMap<String, Vec<String>>,
    pub trees: BTreeMap<String, ReflectionTree>,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    root: PathBuf,
}

impl MemoryStore {
    /// Open (creating if needed) the three collections under `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self { root: root.into() };
        for dir in [
            RecordKind::Summary.dir(),
            RecordKind::Reflection.dir(),
            TREES_DIR,
        ] {
            let path = store.root.join(dir);
            fs::create_dir_all(&path).map_err(|source| StoreError::Io { path, source })?;
        }
        log::debug!("[store] opened {}", store.root.display());
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // --- writes ---

    pub fn save_summary(&self, topic: &str, points: &[String], tags: &[&str]) -> Result<(), StoreError> {
        self.save_record(RecordKind::Summary, topic, points, tags)
    }

    pub fn save_reflections(
        &self,
        topic: &str,
        questions: &[String],
        tags: &[&str],
    ) -> Result<(), StoreError> {
        self.save_record(RecordKind::Reflection, topic, questions, tags)
    }

    pub fn save_tree(&self, topic: &str, tree: &ReflectionTree) -> Result<(), StoreError> {
        let path = self.tree_path(topic)?;
        write_json(&path, tree)
    }

    fn save_record(
        &self,
        kind: RecordKind,
        topic: &str,
        body: &[String],
        tags: &[&str],
    ) -> Result<(), StoreError> {
        let path = self.record_path(kind, topic)?;
        let tags: BTreeSet<&str> = tags.iter().copied().collect();
        let mut doc = serde_json::Map::new();
        doc.insert("tags".into(), serde_json::json!(tags));
        doc.insert(kind.body_key().into(), serde_json::json!(body));
        write_json(&path, &doc)?;
        log::debug!("[store] saved {} '{topic}' ({} entries)", kind.label(), body.len());
        Ok(())
    }

    // --- single reads ---

    pub fn load_summary(&self, topic: &str) -> Result<Option<Record>, StoreError> {
        self.load_record(RecordKind::Summary, topic)
    }

    pub fn load_reflections(&self, topic: &str) -> Result<Option<Record>, StoreError> {
        self.load_record(RecordKind::Reflection, topic)
    }

    pub fn load_tree(&self, topic: &str) -> Result<Option<ReflectionTree>, StoreError> {
        let path = self.tree_path(topic)?;
        read_json(&path)
    }

    fn load_record(&self, kind: RecordKind, topic: &str) -> Result<Option<Record>, StoreError> {
        let path = self.record_path(kind, topic)?;
        let stored: Option<StoredRecord> = read_json(&path)?;
        Ok(stored.map(|s| s.into_record(topic)))
    }

    // --- bulk reads ---

    pub fn load_all_summaries(&self) -> Result<BTreeMap<String, Record>, StoreError> {
        self.load_all(RecordKind::Summary)
    }

    pub fn load_all_reflections(&self) -> Result<BTreeMap<String, Record>, StoreError> {
        self.load_all(RecordKind::Reflection)
    }

    /// Every record of `kind`. Unreadable files are logged and skipped.
    pub fn load_all(&self, kind: RecordKind) -> Result<BTreeMap<String, Record>, StoreError> {
        let mut out = BTreeMap::new();
        for (topic, path) in self.scan(kind.dir(), kind.suffix())? {
            match read_json::<StoredRecord>(&path) {
                Ok(Some(stored)) => {
                    out.insert(topic.clone(), stored.into_record(&topic));
                }
                Ok(None) => {}
                Err(e) => log::warn!("[store] skipping {} '{topic}': {e}", kind.label()),
            }
        }
        Ok(out)
    }

    pub fn load_all_trees(&self) -> Result<BTreeMap<String, ReflectionTree>, StoreError> {
        let mut out = BTreeMap::new();
        for (topic, path) in self.scan(TREES_DIR, TREE_SUFFIX)? {
            match read_json::<ReflectionTree>(&path) {
                Ok(Some(tree)) => {
                    out.insert(topic, tree);
                }
                Ok(None) => {}
                Err(e) => log::warn!("[store] skipping tree '{topic}': {e}"),
            }
        }
        Ok(out)
    }

    /// True when any of the three collections holds a file for `topic`.
    pub fn has_topic(&self, topic: &str) -> Result<bool, StoreError> {
        Ok(self.record_path(RecordKind::Summary, topic)?.exists()
            || self.record_path(RecordKind::Reflection, topic)?.exists()
            || self.tree_path(topic)?.exists())
    }

    // --- search ---

    /// Records of `kind` whose tag set contains `tag` (exact, case-sensitive).
    pub fn search_by_tag(&self, kind: RecordKind, tag: &str) -> Result<BTreeMap<String, Record>, StoreError> {
        let mut all = self.load_all(kind)?;
        all.retain(|_, record| record.has_tag(tag));
        Ok(all)
    }

    pub fn search_memories(&self, tag: &str) -> Result<MemorySearch, StoreError> {
        Ok(MemorySearch {
            summaries: self.search_by_tag(RecordKind::Summary, tag)?,
            reflections: self.search_by_tag(RecordKind::Reflection, tag)?,
        })
    }

    pub fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let bodies = |records: BTreeMap<String, Record>| {
            records
                .into_iter()
                .map(|(topic, record)| (topic, record.body))
                .collect()
        };
        Ok(Snapshot {
            summaries: bodies(self.load_all_summaries()?),
            reflections: bodies(self.load_all_reflections()?),
            trees: self.load_all_trees()?,
        })
    }

    // --- paths ---

    fn record_path(&self, kind: RecordKind, topic: &str) -> Result<PathBuf, StoreError> {
        check_topic(topic)?;
        Ok(self.root.join(kind.dir()).join(format!("{topic}{}", kind.suffix())))
    }

    fn tree_path(&self, topic: &str) -> Result<PathBuf, StoreError> {
        check_topic(topic)?;
        Ok(self.root.join(TREES_DIR).join(format!("{topic}{TREE_SUFFIX}")))
    }

    /// (topic, path) for every file in `dir` ending in `suffix`, sorted by topic.
    fn scan(&self, dir: &str, suffix: &str) -> Result<Vec<(String, PathBuf)>, StoreError> {
        let dir = self.root.join(dir);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path: dir, source }),
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            match name.strip_suffix(suffix) {
                Some(topic) if !topic.is_empty() => found.push((topic.to_string(), entry.path())),
                _ => {}
            }
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }
}

fn check_topic(topic: &str) -> Result<(), StoreError> {
    let bad = topic.is_empty()
        || topic == "."
        || topic == ".."
        || topic.contains(['/', '\\', '\0']);
    if bad {
        Err(StoreError::InvalidTopic(topic.to_string()))
    } else {
        Ok(())
    }
}

/// Absent file → `Ok(None)`.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })
}

/// Whole-file replace: write a sibling temp file, then rename over the target.
fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).map_err(|source| StoreError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree;

    fn store() -> (tempfile::TempDir, MemoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::open(dir.path()).unwrap();
        (dir, store)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn summary_round_trip_keeps_order_and_tags() {
        let (_dir, store) = store();
        let points = strings(&["zeta", "alpha", "mid"]);
        store.save_summary("notes", &points, &["chess", "general"]).unwrap();

        let record = store.load_summary("notes").unwrap().unwrap();
        assert_eq!(record.topic, "notes");
        assert_eq!(record.body, points);
        assert_eq!(record.tags, BTreeSet::from(["chess".to_string(), "general".to_string()]));
    }

    #[test]
    fn missing_record_is_none() {
        let (_dir, store) = store();
        assert!(store.load_summary("nope").unwrap().is_none());
        assert!(store.load_reflections("nope").unwrap().is_none());
        assert!(store.load_tree("nope").unwrap().is_none());
    }

    #[test]
    fn files_use_documented_shape() {
        let (dir, store) = store();
        store.save_reflections("r", &strings(&["q1"]), &["t"]).unwrap();
        let raw = fs::read_to_string(dir.path().join("reflections/r_reflections.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({"tags": ["t"], "questions": ["q1"]}));
        assert!(!dir.path().join("reflections/r_reflections.tmp").exists());
    }

    #[test]
    fn save_overwrites_by_topic() {
        let (_dir, store) = store();
        store.save_summary("t", &strings(&["old"]), &["a"]).unwrap();
        store.save_summary("t", &strings(&["new"]), &[]).unwrap();
        let record = store.load_summary("t").unwrap().unwrap();
        assert_eq!(record.body, vec!["new"]);
        assert!(record.tags.is_empty());
    }

    #[test]
    fn legacy_bare_array_upgrades_on_every_read_path() {
        let (dir, store) = store();
        fs::write(dir.path().join("summaries/old_summary.json"), r#"["x", "y"]"#).unwrap();

        let record = store.load_summary("old").unwrap().unwrap();
        assert_eq!(record.tags, BTreeSet::from([LEGACY_TAG.to_string()]));
        assert_eq!(record.body, vec!["x", "y"]);

        let all = store.load_all_summaries().unwrap();
        assert_eq!(all["old"].body, vec!["x", "y"]);

        let hits = store.search_by_tag(RecordKind::Summary, "legacy").unwrap();
        assert!(hits.contains_key("old"));
    }

    #[test]
    fn missing_tags_default_to_empty() {
        let (dir, store) = store();
        fs::write(
            dir.path().join("reflections/bare_reflections.json"),
            r#"{"questions": ["q"]}"#,
        )
        .unwrap();
        let record = store.load_reflections("bare").unwrap().unwrap();
        assert!(record.tags.is_empty());
        assert_eq!(record.body, vec!["q"]);
    }

    #[test]
    fn missing_body_defaults_to_empty() {
        let (dir, store) = store();
        fs::write(dir.path().join("summaries/tagged_summary.json"), r#"{"tags": ["chess"]}"#).unwrap();
        let record = store.load_summary("tagged").unwrap().unwrap();
        assert!(record.body.is_empty());
        assert!(store.search_by_tag(RecordKind::Summary, "chess").unwrap().contains_key("tagged"));
    }

    #[test]
    fn has_topic_checks_every_collection() {
        let (_dir, store) = store();
        assert!(!store.has_topic("t").unwrap());
        store.save_tree("t", &tree::grow(&["q"], 1)).unwrap();
        assert!(store.has_topic("t").unwrap());
        assert!(store.root().join("trees/t_tree.json").exists());
    }

    #[test]
    fn search_by_tag_is_exact_and_case_sensitive() {
        let (_dir, store) = store();
        store.save_summary("a", &strings(&["1"]), &["chess"]).unwrap();
        store.save_summary("b", &strings(&["2"]), &["Chess"]).unwrap();
        store.save_summary("c", &strings(&["3"]), &["chess", "science"]).unwrap();

        let hits = store.search_by_tag(RecordKind::Summary, "chess").unwrap();
        assert_eq!(hits.keys().collect::<Vec<_>>(), vec!["a", "c"]);

        assert!(store.search_by_tag(RecordKind::Summary, "ches").unwrap().is_empty());
        assert!(store.search_by_tag(RecordKind::Summary, "unused").unwrap().is_empty());
    }

    #[test]
    fn search_memories_combines_collections() {
        let (_dir, store) = store();
        store.save_summary("doc", &strings(&["p"]), &["poetry"]).unwrap();
        store.save_reflections("doc", &strings(&["q"]), &["poetry"]).unwrap();
        store.save_reflections("other", &strings(&["q"]), &["science"]).unwrap();

        let found = store.search_memories("poetry").unwrap();
        assert_eq!(found.summaries.len(), 1);
        assert_eq!(found.reflections.len(), 1);
        assert!(store.search_memories("nothing").unwrap().is_empty());
    }

    #[test]
    fn malformed_record_is_skipped_in_bulk_but_fails_alone() {
        let (dir, store) = store();
        store.save_summary("good", &strings(&["ok"]), &["t"]).unwrap();
        fs::write(dir.path().join("summaries/bad_summary.json"), "{not json").unwrap();

        let all = store.load_all_summaries().unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["good"]);

        let err = store.load_summary("bad").unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[test]
    fn invalid_topics_are_rejected() {
        let (_dir, store) = store();
        for topic in ["", "..", "a/b"] {
            let err = store.save_summary(topic, &[], &[]).unwrap_err();
            assert!(matches!(err, StoreError::InvalidTopic(_)));
        }
    }

    #[test]
    fn tree_round_trip_keeps_insertion_order() {
        let (_dir, store) = store();
        let grown = tree::grow(&["b", "a"], 2);
        store.save_tree("t", &grown).unwrap();
        let loaded = store.load_tree("t").unwrap().unwrap();
        assert_eq!(loaded, grown);
        assert_eq!(loaded.keys().next().map(String::as_str), Some("b"));
    }

    #[test]
    fn snapshot_holds_every_collection() {
        let (dir, store) = store();
        store.save_summary("s", &strings(&["p"]), &[]).unwrap();
        store.save_reflections("s", &strings(&["q"]), &[]).unwrap();
        store.save_tree("s", &tree::grow(&["q"], 1)).unwrap();
        fs::write(dir.path().join("summaries/ignored.txt"), "x").unwrap();

        let snap = store.snapshot().unwrap();
        assert_eq!(snap.summaries["s"], vec!["p"]);
        assert_eq!(snap.reflections["s"], vec!["q"]);
        assert_eq!(snap.trees["s"].len(), 1);
        assert_eq!(snap.summaries.len(), 1);
    }
}
