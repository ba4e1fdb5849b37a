//! Ingestion pipeline: text file → digest → reflections → tree → store.

use crate::digest::{DigestError, Digester, FirstLines};
use crate::reflect::reflect;
use crate::store::{MemoryStore, StoreError};
use crate::tree::{self, DEFAULT_LAYERS};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CHAT_TAG: &str = "chat";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Digest {
        path: PathBuf,
        #[source]
        source: DigestError,
    },

    #[error("{}: not a usable input file name", .0.display())]
    BadName(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What one document or chat turn produced.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub topic: String,
    pub tags: Vec<&'static str>,
    pub points: Vec<String>,
    pub reflections: Vec<String>,
    pub tree_nodes: usize,
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub ingested: Vec<Ingested>,
    pub failed: Vec<(PathBuf, IngestError)>,
}

/// Tags guessed from keywords in a file name; `general` when none match.
pub fn guess_tags(filename: &str) -> Vec<&'static str> {
    let name = filename.to_lowercase();
    let tags: Vec<&'static str> = ["chess", "poetry", "science", "philosophy"]
        .into_iter()
        .filter(|kw| name.contains(kw))
        .collect();
    if tags.is_empty() { vec!["general"] } else { tags }
}

/// `*.txt` files directly inside `dir`, sorted. A missing directory is empty.
pub fn list_inputs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub struct Ingestor<'a> {
    store: &'a MemoryStore,
    digester: Box<dyn Digester>,
    layers: usize,
}

impl<'a> Ingestor<'a> {
    pub fn new(store: &'a MemoryStore) -> Self {
        Self {
            store,
            digester: Box::new(FirstLines::default()),
            layers: DEFAULT_LAYERS,
        }
    }

    pub fn with_digester(mut self, digester: Box<dyn Digester>) -> Self {
        self.digester = digester;
        self
    }

    pub fn with_layers(mut self, layers: usize) -> Self {
        self.layers = layers;
        self
    }

    /// Ingest one document. The topic is the file stem.
    pub fn process_file(&self, path: &Path) -> Result<Ingested, IngestError> {
        let (Some(topic), Some(name)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.file_name().and_then(|s| s.to_str()),
        ) else {
            return Err(IngestError::BadName(path.to_path_buf()));
        };

        let text = fs::read_to_string(path).map_err(|source| IngestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let points = self
            .digester
            .digest(&text)
            .map_err(|source| IngestError::Digest {
                path: path.to_path_buf(),
                source,
            })?;

        let ingested = self.store_points(topic, points, guess_tags(name))?;
        log::info!(
            "[ingest] {} → '{topic}' ({} points, {} reflections)",
            path.display(),
            ingested.points.len(),
            ingested.reflections.len()
        );
        Ok(ingested)
    }

    /// Ingest every `*.txt` in `dir`. A failing document does not stop the rest.
    pub fn ingest_all(&self, dir: &Path) -> io::Result<IngestReport> {
        let mut report = IngestReport::default();
        for path in list_inputs(dir)? {
            match self.process_file(&path) {
                Ok(done) => report.ingested.push(done),
                Err(e) => {
                    log::warn!("[ingest] {e}");
                    report.failed.push((path, e));
                }
            }
        }
        Ok(report)
    }

    /// Store a chat line as its own one-point memory, tagged `chat`, under a
    /// timestamp topic. The line is not digested. A topic already taken in
    /// the same second gets a `-2`, `-3`, ... suffix.
    pub fn learn_chat(&self, line: &str) -> Result<Ingested, StoreError> {
        let stamp = format!("chat{}", chrono::Local::now().format("%Y%m%d%H%M%S"));
        let mut topic = stamp.clone();
        let mut n = 2;
        while self.store.has_topic(&topic)? {
            topic = format!("{stamp}-{n}");
            n += 1;
        }
        self.store_points(&topic, vec![line.to_string()], vec![CHAT_TAG])
    }

    fn store_points(
        &self,
        topic: &str,
        points: Vec<String>,
        tags: Vec<&'static str>,
    ) -> Result<Ingested, StoreError> {
        let reflections = reflect(&points);
        self.store.save_summary(topic, &points, &tags)?;
        self.store.save_reflections(topic, &reflections, &tags)?;
        let grown = tree::grow(&reflections, self.layers);
        self.store.save_tree(topic, &grown)?;

        Ok(Ingested {
            topic: topic.to_string(),
            tags,
            points,
            reflections,
            tree_nodes: grown.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, MemoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::open(dir.path().join("memory")).unwrap();
        (dir, store)
    }

    #[test]
    fn guesses_tags_from_file_name() {
        assert_eq!(guess_tags("Chess_Openings.txt"), vec!["chess"]);
        assert_eq!(guess_tags("science-and-philosophy.txt"), vec!["science", "philosophy"]);
        assert_eq!(guess_tags("groceries.txt"), vec!["general"]);
    }

    #[test]
    fn process_file_stores_all_three_records() {
        let (dir, store) = store();
        let path = dir.path().join("poetry_notes.txt");
        fs::write(&path, "Line one\n\nLine two\n").unwrap();

        let done = Ingestor::new(&store).process_file(&path).unwrap();
        assert_eq!(done.topic, "poetry_notes");
        assert_eq!(done.points, vec!["Line one", "Line two"]);
        assert_eq!(done.reflections.len(), 4);
        // 4 reflections + 8 children expanded over two layers
        assert_eq!(done.tree_nodes, 12);

        let summary = store.load_summary("poetry_notes").unwrap().unwrap();
        assert!(summary.has_tag("poetry"));
        let reflections = store.load_reflections("poetry_notes").unwrap().unwrap();
        assert_eq!(reflections.body, done.reflections);
        assert_eq!(store.load_tree("poetry_notes").unwrap().unwrap().len(), 12);
    }

    #[test]
    fn empty_document_is_a_digest_failure_and_stores_nothing() {
        let (dir, store) = store();
        let path = dir.path().join("blank.txt");
        fs::write(&path, "   \n\n").unwrap();

        let err = Ingestor::new(&store).process_file(&path).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Digest {
                source: DigestError::EmptyInput,
                ..
            }
        ));
        assert!(store.load_summary("blank").unwrap().is_none());
    }

    #[test]
    fn ingest_all_continues_past_failures() {
        let (dir, store) = store();
        let inputs = dir.path().join("inputs");
        fs::create_dir_all(&inputs).unwrap();
        fs::write(inputs.join("a.txt"), "alpha").unwrap();
        fs::write(inputs.join("b.txt"), "").unwrap();
        fs::write(inputs.join("c.txt"), "gamma").unwrap();
        fs::write(inputs.join("skip.md"), "not text input").unwrap();

        let report = Ingestor::new(&store).ingest_all(&inputs).unwrap();
        let topics: Vec<&str> = report.ingested.iter().map(|i| i.topic.as_str()).collect();
        assert_eq!(topics, vec!["a", "c"]);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].0.ends_with("b.txt"));
    }

    #[test]
    fn missing_input_dir_is_empty() {
        let (dir, _store) = store();
        assert!(list_inputs(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn learn_chat_stores_one_point_memory() {
        let (_dir, store) = store();
        let done = Ingestor::new(&store).learn_chat("knights move oddly").unwrap();
        assert!(done.topic.starts_with("chat"));
        assert_eq!(done.topic.len(), "chat".len() + 14);
        assert_eq!(done.points, vec!["knights move oddly"]);
        assert_eq!(done.reflections.len(), 2);

        let summary = store.load_summary(&done.topic).unwrap().unwrap();
        assert!(summary.has_tag(CHAT_TAG));
        assert_eq!(store.load_tree(&done.topic).unwrap().unwrap().len(), 6);
    }

    #[test]
    fn back_to_back_chats_get_distinct_topics() {
        let (_dir, store) = store();
        let ingestor = Ingestor::new(&store);
        let a = ingestor.learn_chat("first memory").unwrap();
        let b = ingestor.learn_chat("second memory").unwrap();
        assert_ne!(a.topic, b.topic);

        let stored = store.load_all_summaries().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[&a.topic].body, vec!["first memory"]);
        assert_eq!(stored[&b.topic].body, vec!["second memory"]);
    }

    #[test]
    fn custom_digester_is_used() {
        struct Whole;
        impl Digester for Whole {
            fn digest(&self, text: &str) -> Result<Vec<String>, DigestError> {
                Ok(vec![text.replace('\n', " ")])
            }
        }

        let (dir, store) = store();
        let path = dir.path().join("x.txt");
        fs::write(&path, "a\nb").unwrap();
        let done = Ingestor::new(&store)
            .with_digester(Box::new(Whole))
            .with_layers(0)
            .process_file(&path)
            .unwrap();
        assert_eq!(done.points, vec!["a b"]);
        assert_eq!(done.tree_nodes, 0);
    }
}
