use crate::index::IndexState;
use crate::DocId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 2;

/// Describes which store state a snapshot was taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    /// Id of the database the snapshot was taken from.
    #[serde(default)]
    pub store_id: String,
    pub num_docs: u64,
    pub last_id: Option<DocId>,
    pub created_at: String,
    pub version: u32,
}

impl MetaFile {
    /// Within one store ids are never reused, so equal (count, highest id) means the same
    /// set of documents.
    pub fn matches(&self, store_id: &str, num_docs: u64, last_id: Option<DocId>) -> bool {
        self.version == SNAPSHOT_VERSION
            && self.store_id == store_id
            && self.num_docs == num_docs
            && self.last_id == last_id
    }
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn index(&self) -> PathBuf { self.root.join("index.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }

    pub fn exists(&self) -> bool {
        self.index().is_file() && self.meta().is_file()
    }
}

pub fn save_index(paths: &IndexPaths, state: &IndexState) -> Result<()> {
    create_dir_all(&paths.root)?;
    let f = File::create(paths.index()).with_context(|| format!("creating {}", paths.index().display()))?;
    let mut w = BufWriter::new(f);
    bincode::serialize_into(&mut w, state)?;
    w.flush()?;
    Ok(())
}

pub fn load_index(paths: &IndexPaths) -> Result<IndexState> {
    let f = File::open(paths.index()).with_context(|| format!("opening {}", paths.index().display()))?;
    let state = bincode::deserialize_from(BufReader::new(f))?;
    Ok(state)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Write the index first and the meta file last, so a torn write never has matching meta.
pub fn save_snapshot(paths: &IndexPaths, state: &IndexState, store_id: &str, last_id: Option<DocId>) -> Result<()> {
    if paths.meta().exists() {
        std::fs::remove_file(paths.meta())?;
    }
    save_index(paths, state)?;
    let meta = MetaFile {
        store_id: store_id.to_string(),
        num_docs: state.num_docs,
        last_id,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: SNAPSHOT_VERSION,
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, "wrote index snapshot");
    Ok(())
}

/// Load the snapshot only if it describes the given store state.
pub fn load_snapshot(paths: &IndexPaths, store_id: &str, num_docs: u64, last_id: Option<DocId>) -> Result<Option<IndexState>> {
    if !paths.exists() {
        return Ok(None);
    }
    let meta = load_meta(paths)?;
    if meta.store_id != store_id {
        tracing::warn!(snapshot_store = %meta.store_id, store_id, "index snapshot belongs to another store");
        return Ok(None);
    }
    if !meta.matches(store_id, num_docs, last_id) {
        tracing::info!(snapshot_docs = meta.num_docs, num_docs, "index snapshot is stale");
        return Ok(None);
    }
    let state = load_index(paths)?;
    if state.num_docs != num_docs {
        return Ok(None);
    }
    Ok(Some(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FullTextIndex;
    use tempfile::tempdir;

    #[test]
    fn snapshot_round_trip_and_staleness() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path().join("snap"));
        let idx = FullTextIndex::default();
        idx.index(1, "rust", "systems programming").unwrap();
        idx.index(2, "go", "programming").unwrap();

        save_snapshot(&paths, &idx.snapshot(), "store-a", Some(2)).unwrap();
        let loaded = load_snapshot(&paths, "store-a", 2, Some(2)).unwrap().unwrap();
        assert_eq!(loaded.num_docs, 2);
        assert_eq!(loaded.postings["programming"].df(), 2);

        assert!(load_snapshot(&paths, "store-a", 2, Some(3)).unwrap().is_none());
        assert!(load_snapshot(&paths, "store-a", 1, Some(2)).unwrap().is_none());
        assert!(load_snapshot(&paths, "store-b", 2, Some(2)).unwrap().is_none());
    }

    #[test]
    fn missing_snapshot_is_none() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        assert!(load_snapshot(&paths, "store-a", 0, None).unwrap().is_none());
    }
}
