//! In-memory storage.

use std::{error, fmt};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use url::Url;
use crate::commons::error::{Action, StoreError};
use crate::commons::storage::{
    Collection, CollectionBuf, Document, Encoded, RecordId, RecordNameBuf,
    Shape,
};


//------------ Store ---------------------------------------------------------

type Collections = HashMap<CollectionBuf, HashMap<RecordNameBuf, Document>>;

/// A storage backend keeping documents in memory.
///
/// The content is shared between clones of the same store and lost when
/// the last clone is dropped. Each store opened from a `memory:` URI
/// starts out empty.
#[derive(Clone, Debug, Default)]
pub struct Store {
    collections: Arc<RwLock<Collections>>,
}

impl Store {
    pub fn from_uri(uri: &Url) -> Result<Option<Self>, Error> {
        if uri.scheme() != "memory" {
            return Ok(None)
        }
        Ok(Some(Self::default()))
    }

    pub fn shape(&self) -> Shape {
        Shape::Document
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, Error> {
        self.collections.read().map_err(|_| Error::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, Error> {
        self.collections.write().map_err(|_| Error::Poisoned)
    }
}


/// # Reading
impl Store {
    pub fn has(&self, id: &RecordId) -> Result<bool, StoreError> {
        Ok(
            self.read()?.get(id.resolved_collection()).map(|records| {
                records.contains_key(id.name())
            }).unwrap_or(false)
        )
    }

    pub fn fetch(&self, id: &RecordId) -> Result<Encoded, StoreError> {
        self.read()?
            .get(id.resolved_collection())
            .and_then(|records| records.get(id.name()))
            .map(|document| Encoded::Document(document.clone()))
            .ok_or_else(|| StoreError::not_found(id, Action::Load))
    }

    pub fn list_names(
        &self, collection: &Collection
    ) -> Result<Vec<RecordNameBuf>, StoreError> {
        let mut res: Vec<_> = self.read()?.get(collection).map(|records| {
            records.keys().cloned().collect()
        }).unwrap_or_default();
        res.sort();
        Ok(res)
    }

    pub fn list_collections(&self) -> Result<Vec<CollectionBuf>, StoreError> {
        let mut res: Vec<_> = self.read()?.keys().cloned().collect();
        res.sort();
        Ok(res)
    }
}


/// # Writing
impl Store {
    pub fn insert_new(
        &self, id: &RecordId, value: &Encoded
    ) -> Result<(), StoreError> {
        let document = value.as_document()?;
        let mut collections = self.write()?;
        let records = collections.entry(
            id.resolved_collection().to_owned()
        ).or_default();
        if records.contains_key(id.name()) {
            return Err(StoreError::already_exists(id))
        }
        records.insert(id.name().to_owned(), document.clone());
        Ok(())
    }

    pub fn replace(
        &self, id: &RecordId, value: &Encoded
    ) -> Result<(), StoreError> {
        let document = value.as_document()?;
        let mut collections = self.write()?;
        match collections.get_mut(id.resolved_collection()).and_then(
            |records| records.get_mut(id.name())
        ) {
            Some(stored) => {
                *stored = document.clone();
                Ok(())
            }
            None => Err(StoreError::not_found(id, Action::Save))
        }
    }

    pub fn remove(&self, id: &RecordId) -> Result<(), StoreError> {
        let mut collections = self.write()?;
        match collections.get_mut(id.resolved_collection()).and_then(
            |records| records.remove(id.name())
        ) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(id, Action::Delete))
        }
    }
}


//------------ Error ---------------------------------------------------------

#[derive(Debug)]
pub enum Error {
    Poisoned,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Poisoned => f.write_str("memory store lock poisoned")
        }
    }
}

impl error::Error for Error { }
