//! Tests for the storage module.
//!
//! This module contains tests that are run for each storage backend which
//! requires a wee bit of macro magic.
#![cfg(test)]

#[cfg(feature = "postgres")]
use std::env;
#[cfg(feature = "postgres")]
use std::sync::{Mutex, MutexGuard};
use serde_json::json;
use tempfile::{TempDir, tempdir};
use url::Url;
use crate::commons::error::{Action, ErrorKind, StoreError};
#[cfg(feature = "postgres")]
use crate::constants::HKLSTORE_ENV_TEST_POSTGRES;
use super::{
    Collection, Document, Encoded, RecordId, RecordName, RecordStore, Shape,
    StoreNewError,
};


//------------ Macro to Construct Tests --------------------------------------

/// A macro to construct a function testing each backend.
///
/// For details, see the macro invocation below. This is just up here because
/// Rust wants it that way.
macro_rules! testfns {
    (
        $(
            fn $name:ident($harness:ident: impl Harness) $body:block
        )*
    ) => {
        mod testfns {
            use super::*;

            $(
                pub fn $name($harness: impl Harness) $body
            )*
        }

        mod memory {
            use super::*;

            $(
                #[test]
                fn $name() {
                    super::testfns::$name(MemoryHarness::new());
                }
            )*
        }

        mod disk {
            use super::*;

            $(
                #[test]
                fn $name() {
                    super::testfns::$name(DiskHarness::new());
                }
            )*
        }

        #[cfg(feature = "postgres")]
        mod postgres {
            use super::*;

            $(
                #[test]
                fn $name() {
                    if let Some(harness) = PostgresHarness::new() {
                        super::testfns::$name(harness);
                    }
                }
            )*
        }
    }
}


//------------ Test Data -----------------------------------------------------

const NAME: &RecordName = RecordName::make("n1");
const NAME_2: &RecordName = RecordName::make("n2");
const COLLECTION: &Collection = Collection::make("c1");
const COLLECTION_2: &Collection = Collection::make("c2");

/// Returns a value of the store’s shape carrying `content`.
fn value(store: &RecordStore, content: u32) -> Encoded {
    let mut document = Document::new();
    document.insert("content".into(), json!(content));
    match store.shape() {
        Shape::Blob => {
            Encoded::Blob(serde_json::to_vec(&document).unwrap())
        }
        Shape::Document => Encoded::Document(document)
    }
}

/// Returns the content of a value created by [`value`].
fn content(value: Encoded) -> u32 {
    let document: Document = match value {
        Encoded::Blob(blob) => serde_json::from_slice(&blob).unwrap(),
        Encoded::Document(document) => document,
    };
    document["content"].as_u64().unwrap() as u32
}

fn assert_not_found(err: StoreError, action: Action) {
    assert_eq!(err.kind(), ErrorKind::NotFound);
    match err {
        StoreError::NotFound { action: found, .. } => {
            assert_eq!(found, action)
        }
        _ => panic!("expected not found, got {err}")
    }
}


//------------ Test Functions ------------------------------------------------

// All the test functions.
//
// They all need to have the same signature taking one argument as an
// `impl Harness` and return unit. Each function will be transformed into a
// test function for each of the backends. The harness will give it access
// to a fresh, empty store atop that given backend.
testfns! {
    fn insert_fetch(harness: impl Harness) {
        let store = harness.store();
        let id = RecordId::in_collection(NAME, COLLECTION);

        assert!(!store.has(&id).unwrap());
        store.insert_new(&id, &value(&store, 42)).unwrap();
        assert!(store.has(&id).unwrap());
        assert_eq!(content(store.fetch(&id).unwrap()), 42);
    }

    fn insert_is_unique(harness: impl Harness) {
        let store = harness.store();
        let id = RecordId::in_collection(NAME, COLLECTION);

        store.insert_new(&id, &value(&store, 42)).unwrap();
        let err = store.insert_new(&id, &value(&store, 43)).unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(err.status_code(), 405);

        // The first record is left untouched.
        assert_eq!(content(store.fetch(&id).unwrap()), 42);
    }

    fn missing_record(harness: impl Harness) {
        let store = harness.store();
        let id = RecordId::in_collection(NAME, COLLECTION);

        assert_not_found(store.fetch(&id).unwrap_err(), Action::Load);
        assert_not_found(
            store.replace(&id, &value(&store, 42)).unwrap_err(),
            Action::Save
        );
        assert_not_found(store.remove(&id).unwrap_err(), Action::Delete);

        // Saving a missing record must not create it.
        assert!(!store.has(&id).unwrap());
    }

    fn replace(harness: impl Harness) {
        let store = harness.store();
        let id = RecordId::in_collection(NAME, COLLECTION);

        store.insert_new(&id, &value(&store, 42)).unwrap();
        store.replace(&id, &value(&store, 43)).unwrap();
        assert_eq!(content(store.fetch(&id).unwrap()), 43);
        store.replace(&id, &value(&store, 44)).unwrap();
        assert_eq!(content(store.fetch(&id).unwrap()), 44);
    }

    fn remove(harness: impl Harness) {
        let store = harness.store();
        let id = RecordId::in_collection(NAME, COLLECTION);
        let other = RecordId::in_collection(NAME_2, COLLECTION);

        store.insert_new(&id, &value(&store, 42)).unwrap();
        store.insert_new(&other, &value(&store, 43)).unwrap();
        store.remove(&id).unwrap();

        assert!(!store.has(&id).unwrap());
        assert_not_found(store.fetch(&id).unwrap_err(), Action::Load);
        assert_not_found(store.remove(&id).unwrap_err(), Action::Delete);
        assert_eq!(content(store.fetch(&other).unwrap()), 43);

        // The name can be used again.
        store.insert_new(&id, &value(&store, 44)).unwrap();
        assert_eq!(content(store.fetch(&id).unwrap()), 44);
    }

    fn collections_are_isolated(harness: impl Harness) {
        let store = harness.store();
        let id = RecordId::in_collection(NAME, COLLECTION);
        let id2 = RecordId::in_collection(NAME, COLLECTION_2);

        store.insert_new(&id, &value(&store, 42)).unwrap();
        assert!(!store.has(&id2).unwrap());
        store.insert_new(&id2, &value(&store, 43)).unwrap();

        assert_eq!(content(store.fetch(&id).unwrap()), 42);
        assert_eq!(content(store.fetch(&id2).unwrap()), 43);

        store.remove(&id2).unwrap();
        assert!(store.has(&id).unwrap());
    }

    fn default_collection(harness: impl Harness) {
        let store = harness.store();
        let implicit = RecordId::in_default(NAME);
        let explicit = RecordId::in_collection(
            NAME, crate::constants::DEFAULT_COLLECTION
        );

        store.insert_new(&implicit, &value(&store, 42)).unwrap();
        assert!(
            store.insert_new(&explicit, &value(&store, 43))
                .unwrap_err().is_already_exists()
        );
        assert_eq!(content(store.fetch(&explicit).unwrap()), 42);
        store.remove(&explicit).unwrap();
        assert!(!store.has(&implicit).unwrap());
    }

    fn list_names(harness: impl Harness) {
        let store = harness.store();

        assert!(store.list_names(COLLECTION).unwrap().is_empty());

        store.insert_new(
            &RecordId::in_collection(NAME_2, COLLECTION), &value(&store, 1)
        ).unwrap();
        store.insert_new(
            &RecordId::in_collection(NAME, COLLECTION), &value(&store, 2)
        ).unwrap();
        store.insert_new(
            &RecordId::in_collection(NAME, COLLECTION_2), &value(&store, 3)
        ).unwrap();

        assert_eq!(
            store.list_names(COLLECTION).unwrap(),
            [NAME.to_owned(), NAME_2.to_owned()]
        );
        assert_eq!(
            store.list_names(COLLECTION_2).unwrap(), [NAME.to_owned()]
        );
    }

    fn list_collections(harness: impl Harness) {
        let store = harness.store();

        assert!(store.list_collections().unwrap().is_empty());

        store.insert_new(
            &RecordId::in_collection(NAME, COLLECTION_2), &value(&store, 1)
        ).unwrap();
        store.insert_new(
            &RecordId::in_collection(NAME, COLLECTION), &value(&store, 2)
        ).unwrap();

        assert_eq!(
            store.list_collections().unwrap(),
            [COLLECTION.to_owned(), COLLECTION_2.to_owned()]
        );
    }

    fn wrong_shape_is_rejected(harness: impl Harness) {
        let store = harness.store();
        let id = RecordId::in_collection(NAME, COLLECTION);
        let wrong = match store.shape() {
            Shape::Blob => Encoded::Document(Document::new()),
            Shape::Document => Encoded::Blob(b"{}".to_vec()),
        };

        let err = store.insert_new(&id, &wrong).unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(!store.has(&id).unwrap());
    }
}


//------------ Backend Selection ---------------------------------------------

#[test]
fn unknown_scheme_is_rejected() {
    let err = RecordStore::new(&Url::parse("s3://bucket/calcs").unwrap())
        .unwrap_err();
    assert!(matches!(
        err, StoreNewError::UnknownStorageScheme(ref scheme) if scheme == "s3"
    ));
    assert_eq!(err.to_string(), "unknown storage scheme: s3");
}

#[test]
fn backend_name_follows_scheme() {
    let memory = RecordStore::new(&Url::parse("memory:").unwrap()).unwrap();
    assert_eq!(memory.backend_name(), "memory");
    assert_eq!(memory.shape(), Shape::Document);

    let dir = tempdir().unwrap();
    let disk = RecordStore::new(
        &Url::parse(&format!("local://{}", dir.path().display())).unwrap()
    ).unwrap();
    assert_eq!(disk.backend_name(), "disk");
    assert_eq!(disk.shape(), Shape::Blob);
}


//------------ Harness -------------------------------------------------------

/// A test harness for a specific storage backend.
trait Harness {
    /// Returns the URL of the backend.
    #[allow(dead_code)]
    fn url(&self) -> Url;

    /// Creates a new store.
    fn store(&self) -> RecordStore;
}


//------------ MemoryHarness -------------------------------------------------

/// The test harness for the memory backend.
///
/// Every memory store is separate, so there is nothing to clean up.
struct MemoryHarness;

impl MemoryHarness {
    fn new() -> Self {
        Self
    }
}

impl Harness for MemoryHarness {
    fn url(&self) -> Url {
        Url::parse("memory:").unwrap()
    }

    fn store(&self) -> RecordStore {
        RecordStore::new(&self.url()).unwrap()
    }
}


//------------ DiskHarness ---------------------------------------------------

/// The test harness for the disk backend.
///
/// Creates a temporary directory using the `tempfile` crate which will be
/// removed automatically when the harness is dropped.
struct DiskHarness {
    _dir: TempDir,
    url: Url,
}

impl DiskHarness {
    fn new() -> Self {
        let _dir = tempdir().unwrap();
        let url = format!("local://{}", _dir.path().display());
        let url = Url::parse(&url).unwrap();
        Self { _dir, url }
    }
}

impl Harness for DiskHarness {
    fn url(&self) -> Url {
        self.url.clone()
    }

    fn store(&self) -> RecordStore {
        RecordStore::new(&self.url).unwrap()
    }
}


//------------ PostgresHarness -----------------------------------------------

/// The test harness for the PostgreSQL backend.
///
/// The database is taken from the environment variable
/// `HKLSTORE_TEST_POSTGRES`. If it isn’t set, the tests are skipped. All
/// records are removed before the test, so don’t point it at a database
/// you care about. Since all tests share the database, only one of them
/// can run at a time.
#[cfg(feature = "postgres")]
struct PostgresHarness {
    _guard: MutexGuard<'static, ()>,
    url: Url,
}

#[cfg(feature = "postgres")]
static POSTGRES_LOCK: Mutex<()> = Mutex::new(());

#[cfg(feature = "postgres")]
impl PostgresHarness {
    fn new() -> Option<Self> {
        let url = Url::parse(
            &env::var(HKLSTORE_ENV_TEST_POSTGRES).ok()?
        ).unwrap();
        let _guard = POSTGRES_LOCK.lock().unwrap_or_else(|err| {
            err.into_inner()
        });
        let res = Self { _guard, url };
        let store = res.store();
        for collection in store.list_collections().unwrap() {
            for name in store.list_names(&collection).unwrap() {
                store.remove(
                    &RecordId::in_collection(name, collection.clone())
                ).unwrap();
            }
        }
        Some(res)
    }
}

#[cfg(feature = "postgres")]
impl Harness for PostgresHarness {
    fn url(&self) -> Url {
        self.url.clone()
    }

    fn store(&self) -> RecordStore {
        RecordStore::new(&self.url).unwrap()
    }
}
