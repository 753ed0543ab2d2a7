use crate::{DocId, DocMeta, DocTokens, DocumentLengths, ImportanceScores, RawIndex};
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn raw_index(&self) -> PathBuf { self.root.join("raw_index.bin") }
    fn doc_tokens(&self) -> PathBuf { self.root.join("doc_tokens.bin") }
    fn importance(&self) -> PathBuf { self.root.join("importance.bin") }
    fn doc_lengths(&self) -> PathBuf { self.root.join("doc_lengths.bin") }
    fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    fn doc_id_map(&self) -> PathBuf { self.root.join("doc_id_map.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn write_bin<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let mut w = BufWriter::new(File::create(path).with_context(|| format!("creating {}", path.display()))?);
    bincode::serialize_into(&mut w, value)?;
    w.flush()?;
    Ok(())
}

fn read_bin<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let value = bincode::deserialize_from(BufReader::new(f)).with_context(|| format!("decoding {}", path.display()))?;
    Ok(value)
}

pub fn save_raw_index(paths: &IndexPaths, index: &RawIndex) -> Result<()> { write_bin(&paths.raw_index(), index) }
pub fn load_raw_index(paths: &IndexPaths) -> Result<RawIndex> { read_bin(&paths.raw_index()) }

pub fn save_doc_tokens(paths: &IndexPaths, tokens: &DocTokens) -> Result<()> { write_bin(&paths.doc_tokens(), tokens) }
pub fn load_doc_tokens(paths: &IndexPaths) -> Result<DocTokens> { read_bin(&paths.doc_tokens()) }

pub fn save_importance(paths: &IndexPaths, scores: &ImportanceScores) -> Result<()> { write_bin(&paths.importance(), scores) }
pub fn load_importance(paths: &IndexPaths) -> Result<ImportanceScores> { read_bin(&paths.importance()) }

pub fn save_doc_lengths(paths: &IndexPaths, lengths: &DocumentLengths) -> Result<()> { write_bin(&paths.doc_lengths(), lengths) }

/// The length table is optional; without it the session computes lengths itself.
pub fn load_doc_lengths(paths: &IndexPaths) -> Result<Option<DocumentLengths>> {
    let path = paths.doc_lengths();
    if !path.exists() {
        return Ok(None);
    }
    read_bin(&path).map(Some)
}

pub fn save_docs(paths: &IndexPaths, docs: &HashMap<DocId, DocMeta>) -> Result<()> { write_bin(&paths.docs(), docs) }
pub fn load_docs(paths: &IndexPaths) -> Result<HashMap<DocId, DocMeta>> { read_bin(&paths.docs()) }

pub fn save_doc_id_map(paths: &IndexPaths, map: &HashMap<String, DocId>) -> Result<()> { write_bin(&paths.doc_id_map(), map) }
pub fn load_doc_id_map(paths: &IndexPaths) -> Result<HashMap<String, DocId>> { read_bin(&paths.doc_id_map()) }

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let f = File::open(paths.meta()).with_context(|| format!("opening {}", paths.meta().display()))?;
    let meta: MetaFile = serde_json::from_reader(BufReader::new(f))?;
    if meta.version != FORMAT_VERSION {
        bail!("index format version {} is not supported (expected {})", meta.version, FORMAT_VERSION);
    }
    Ok(meta)
}

/// Everything a search session needs, as written by the index builder.
pub struct IndexBundle {
    pub meta: MetaFile,
    pub raw_index: RawIndex,
    pub doc_tokens: DocTokens,
    pub importance: ImportanceScores,
    pub doc_lengths: Option<DocumentLengths>,
    pub docs: HashMap<DocId, DocMeta>,
    /// External document id -> doc id.
    pub doc_id_map: HashMap<String, DocId>,
}

pub fn load_bundle(paths: &IndexPaths) -> Result<IndexBundle> {
    let meta = load_meta(paths)?;
    let bundle = IndexBundle {
        raw_index: load_raw_index(paths)?,
        doc_tokens: load_doc_tokens(paths)?,
        importance: load_importance(paths)?,
        doc_lengths: load_doc_lengths(paths)?,
        docs: load_docs(paths)?,
        doc_id_map: load_doc_id_map(paths)?,
        meta,
    };
    tracing::info!(
        root = %paths.root.display(),
        num_docs = bundle.meta.num_docs,
        num_terms = bundle.raw_index.num_terms(),
        precomputed_lengths = bundle.doc_lengths.is_some(),
        "loaded index bundle"
    );
    Ok(bundle)
}
