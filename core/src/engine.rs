use crate::analyzer::Analyzer;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::{PosRule, TermFilterState};
use crate::idf::IdfDictionary;
use crate::model::Scope;
use crate::persist::{ensure_meta, DataPaths};
use crate::store::{DocumentStore, SledStore};
use crate::tokenizer::{self, Tokenizer};
use crate::word_index::WordIndex;
use parking_lot::{Mutex, MutexGuard};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Stripes of the per-document write lock.
const WRITE_STRIPES: usize = 64;

/// Owns every index structure of a data directory and runs the indexing and
/// search pipelines over them. Cheap to share behind an `Arc`; all methods
/// take `&self`.
pub struct Engine {
    db: sled::Db,
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) index: WordIndex,
    pub(crate) idf: IdfDictionary,
    pub(crate) analyzer: Option<Analyzer>,
    pub(crate) blacklist: Arc<TermFilterState>,
    pub(crate) similarity_limit: usize,
    pub(crate) pool: rayon::ThreadPool,
    write_locks: Box<[Mutex<()>]>,
}

impl Engine {
    /// Open (or initialize) the data directory named by `config.data_dir`.
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let paths = DataPaths::new(&config.data_dir);
        let tokenizer = tokenizer::from_config(&config.tokenizer);
        ensure_meta(&paths, tokenizer.as_ref().map_or("none", |t| t.name()))?;
        let store = SledStore::open(paths.db())?;
        let db = store.db().clone();
        let blacklist = Arc::new(TermFilterState::load(paths.blacklist())?);
        let engine = Self::assemble(Arc::new(store), db, tokenizer, config, blacklist)?;
        tracing::info!(data_dir = %paths.root.display(), tokenizer = engine.tokenizer_name().unwrap_or("none"), "engine opened");
        Ok(engine)
    }

    /// An engine over a temporary database and an unpersisted blacklist.
    pub fn in_memory(config: &Config) -> Result<Self> {
        config.validate()?;
        let tokenizer = tokenizer::from_config(&config.tokenizer);
        let blacklist = Arc::new(TermFilterState::default());
        let store = SledStore::temporary()?;
        let db = store.db().clone();
        Self::assemble(Arc::new(store), db, tokenizer, config, blacklist)
    }

    /// An engine over a caller-supplied document store. The word index and
    /// idf tables live in a temporary database.
    pub fn with_store(config: &Config, store: Arc<dyn DocumentStore>) -> Result<Self> {
        config.validate()?;
        let tokenizer = tokenizer::from_config(&config.tokenizer);
        let db = sled::Config::new().temporary(true).open()?;
        Self::assemble(store, db, tokenizer, config, Arc::new(TermFilterState::default()))
    }

    fn assemble(
        store: Arc<dyn DocumentStore>,
        db: sled::Db,
        tokenizer: Option<Arc<dyn Tokenizer>>,
        config: &Config,
        blacklist: Arc<TermFilterState>,
    ) -> Result<Self> {
        let index = WordIndex::new(db.clone());
        let idf = IdfDictionary::new(db.clone(), index.clone());
        let analyzer = tokenizer.map(|t| Analyzer::new(t, config.pos_whitelist.clone(), blacklist.clone()));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("indexer-{i}"))
            .build()?;
        Ok(Self {
            db,
            store,
            index,
            idf,
            analyzer,
            blacklist,
            similarity_limit: config.similarity_limit,
            pool,
            write_locks: (0..WRITE_STRIPES).map(|_| Mutex::new(())).collect(),
        })
    }

    /// Serializes writes to one document. Ids that share a stripe wait on
    /// each other; the lock is not reentrant.
    pub(crate) fn lock_doc(&self, scope: &Scope, id: &str) -> MutexGuard<'_, ()> {
        let mut h = DefaultHasher::new();
        (scope, id).hash(&mut h);
        self.write_locks[(h.finish() as usize) % self.write_locks.len()].lock()
    }

    /// Swap the segmenter, e.g. to inject a custom adapter. `None` leaves only
    /// unweighted field search available.
    pub fn set_tokenizer(&mut self, tokenizer: Option<Arc<dyn Tokenizer>>, whitelist: Option<Vec<PosRule>>) {
        self.analyzer = tokenizer.map(|t| Analyzer::new(t, whitelist, self.blacklist.clone()));
    }

    pub(crate) fn analyzer(&self) -> Result<&Analyzer> {
        self.analyzer
            .as_ref()
            .ok_or_else(|| Error::TokenizerUnavailable("no tokenizer configured".into()))
    }

    pub fn tokenizer_name(&self) -> Option<&'static str> {
        self.analyzer.as_ref().map(|a| a.tokenizer_name())
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn word_index(&self) -> &WordIndex {
        &self.index
    }

    pub fn idf_dictionary(&self) -> &IdfDictionary {
        &self.idf
    }

    pub fn blacklist(&self) -> &TermFilterState {
        &self.blacklist
    }

    pub fn similarity_limit(&self) -> usize {
        self.similarity_limit
    }

    /// Force pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenizerConfig;

    #[test]
    fn open_initializes_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config { data_dir: dir.path().to_path_buf(), workers: 2, ..Default::default() };
        let engine = Engine::open(&config).unwrap();
        assert_eq!(engine.tokenizer_name(), Some("simple"));
        assert!(dir.path().join("meta.json").exists());
        assert!(dir.path().join("db").exists());
    }

    #[test]
    fn without_tokenizer_analysis_is_unavailable() {
        let config = Config { tokenizer: TokenizerConfig::None, ..Default::default() };
        let engine = Engine::in_memory(&config).unwrap();
        assert!(matches!(engine.analyzer(), Err(Error::TokenizerUnavailable(_))));
    }
}
