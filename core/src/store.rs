use crate::error::{Error, Result};
use crate::model::{DocRecord, Scope};
use crate::query::Filter;
use std::path::Path;

const DOCS: &str = "docs";

/// Keyed document storage the engine writes records and vectors into.
pub trait DocumentStore: Send + Sync {
    fn get(&self, scope: &Scope, id: &str) -> Result<Option<DocRecord>>;
    /// Insert or fully replace the record stored under `record.id`.
    fn put(&self, scope: &Scope, record: &DocRecord) -> Result<()>;
    /// Returns whether a record was present.
    fn delete(&self, scope: &Scope, id: &str) -> Result<bool>;
    /// Records whose fields satisfy `filter`, ordered by id.
    fn find(&self, scope: &Scope, filter: &Filter) -> Result<Vec<DocRecord>>;
    fn count(&self, scope: &Scope) -> Result<usize>;
}

/// Document store on a sled database, one tree per scope.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self { db: sled::open(path)? })
    }

    /// A throwaway database removed when dropped.
    pub fn temporary() -> Result<Self> {
        Ok(Self { db: sled::Config::new().temporary(true).open()? })
    }

    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    fn tree(&self, scope: &Scope) -> Result<sled::Tree> {
        Ok(self.db.open_tree(scope.tree(DOCS))?)
    }
}

fn decode(key: &[u8], bytes: &[u8]) -> Result<DocRecord> {
    serde_json::from_slice(bytes).map_err(|e| Error::corrupt(String::from_utf8_lossy(key), e))
}

impl DocumentStore for SledStore {
    fn get(&self, scope: &Scope, id: &str) -> Result<Option<DocRecord>> {
        match self.tree(scope)?.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(id.as_bytes(), &bytes)?)),
            None => Ok(None),
        }
    }

    fn put(&self, scope: &Scope, record: &DocRecord) -> Result<()> {
        let bytes = serde_json::to_vec(record)?;
        self.tree(scope)?.insert(record.id.as_bytes(), bytes)?;
        Ok(())
    }

    fn delete(&self, scope: &Scope, id: &str) -> Result<bool> {
        Ok(self.tree(scope)?.remove(id.as_bytes())?.is_some())
    }

    fn find(&self, scope: &Scope, filter: &Filter) -> Result<Vec<DocRecord>> {
        let mut out = Vec::new();
        for item in self.tree(scope)?.iter() {
            let (key, bytes) = item?;
            let record = decode(&key, &bytes)?;
            if filter.matches(&record.fields) {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn count(&self, scope: &Scope) -> Result<usize> {
        Ok(self.tree(scope)?.len())
    }
}
