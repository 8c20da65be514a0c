//! The store for calculation records.
//!
//! [`CalcStore`] offers the four record operations to async callers such
//! as HTTP handlers. The backends themselves are sync, so every operation
//! is moved onto the blocking thread pool of the Tokio runtime. This keeps
//! the runtime responsive and lets callers await, time out, or drop an
//! operation like any other future. Note that dropping the future doesn’t
//! stop an operation that has already started on the blocking pool.

pub use self::payload::{
    Crystal, Hkl, HklCalculation, Matrix, Orientation, Position, Reflection,
    UbCalculation, Xyz,
};

mod payload;


use std::sync::Arc;
use log::{debug, info};
use crate::commons::error::{Action, StoreError};
use crate::commons::storage::{
    Codec, Collection, CollectionBuf, JsonCodec, RecordId, RecordNameBuf,
    RecordStore,
};


//------------ CalcStore -----------------------------------------------------

/// Creates, loads, saves, and deletes calculation records.
///
/// The store is cheap to clone. All clones share the same backend which
/// is selected once at startup and then handed to everyone who needs it.
pub struct CalcStore<C = JsonCodec<HklCalculation>> {
    store: Arc<RecordStore>,
    codec: Arc<C>,
}

impl<C: Codec> CalcStore<C> {
    /// Creates a new calculation store atop a record store.
    pub fn new(store: RecordStore, codec: C) -> Self {
        CalcStore {
            store: Arc::new(store),
            codec: Arc::new(codec),
        }
    }

    /// Returns a reference to the underlying record store.
    pub fn records(&self) -> &RecordStore {
        &self.store
    }

    /// Runs `op` with the record store on the blocking thread pool.
    async fn run<F, T>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&RecordStore, &C) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        let codec = self.codec.clone();
        tokio::task::spawn_blocking(move || op(&store, &codec)).await?
    }

    /// Creates a new record with a fresh payload.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if there already is a
    /// record for `id`. The existing record stays as it is.
    pub async fn create(&self, id: &RecordId) -> Result<(), StoreError> {
        debug!("creating record {id}");
        let res = self.run({
            let id = id.clone();
            move |store, codec| {
                let payload = codec.fresh(id.name());
                let encoded = codec.encode(&payload, store.shape())?;
                store.insert_new(&id, &encoded)
            }
        }).await;
        Self::log_result(id, Action::Create, &res);
        res
    }

    /// Deletes a record.
    ///
    /// Fails with [`StoreError::NotFound`] if there is no record for `id`.
    pub async fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
        debug!("deleting record {id}");
        let res = self.run({
            let id = id.clone();
            move |store, _| store.remove(&id)
        }).await;
        Self::log_result(id, Action::Delete, &res);
        res
    }

    /// Replaces the payload of an existing record.
    ///
    /// Fails with [`StoreError::NotFound`] if there is no record for `id`.
    /// Use [`create`][Self::create] first.
    pub async fn save(
        &self, id: &RecordId, payload: C::Payload
    ) -> Result<(), StoreError> {
        debug!("saving record {id}");
        let res = self.run({
            let id = id.clone();
            move |store, codec| {
                let encoded = codec.encode(&payload, store.shape())?;
                store.replace(&id, &encoded)
            }
        }).await;
        Self::log_result(id, Action::Save, &res);
        res
    }

    /// Loads the payload of a record.
    ///
    /// Fails with [`StoreError::NotFound`] if there is no record for `id`.
    pub async fn load(
        &self, id: &RecordId
    ) -> Result<C::Payload, StoreError> {
        debug!("loading record {id}");
        let res = self.run({
            let id = id.clone();
            move |store, codec| {
                Ok(codec.decode(store.fetch(&id)?)?)
            }
        }).await;
        Self::log_result(id, Action::Load, &res);
        res
    }

    /// Returns the names of all records in a collection.
    pub async fn list(
        &self, collection: &Collection
    ) -> Result<Vec<RecordNameBuf>, StoreError> {
        let collection = collection.to_owned();
        self.run(move |store, _| store.list_names(&collection)).await
    }

    /// Returns the names of all collections.
    pub async fn collections(&self) -> Result<Vec<CollectionBuf>, StoreError> {
        self.run(|store, _| store.list_collections()).await
    }

    fn log_result<T>(
        id: &RecordId, action: Action, res: &Result<T, StoreError>
    ) {
        match res {
            Ok(_) => debug!("{action} of record {id} succeeded"),
            Err(err) if err.is_already_exists() || err.is_not_found() => {
                info!("{err}")
            }
            Err(_) => { }
        }
    }
}

impl<C> Clone for CalcStore<C> {
    fn clone(&self) -> Self {
        CalcStore {
            store: self.store.clone(),
            codec: self.codec.clone(),
        }
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use url::Url;
    use crate::commons::storage::RecordName;
    use super::*;

    fn store() -> CalcStore {
        CalcStore::new(
            RecordStore::new(&Url::parse("memory:").unwrap()).unwrap(),
            JsonCodec::new(),
        )
    }

    #[tokio::test]
    async fn create_seeds_fresh_payload() {
        let store = store();
        let id = RecordId::in_default(RecordName::make("n1"));
        store.create(&id).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap().ubcalc.name, "n1");
    }

    #[tokio::test]
    async fn clones_share_the_backend() {
        let store = store();
        let other = store.clone();
        let id = RecordId::in_default(RecordName::make("n1"));
        store.create(&id).await.unwrap();
        assert!(other.create(&id).await.unwrap_err().is_already_exists());
        other.delete(&id).await.unwrap();
        assert!(store.load(&id).await.unwrap_err().is_not_found());
    }
}
