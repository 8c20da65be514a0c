//! The record store.
//!
//! This module dispatches the storage primitives to whichever backend was
//! selected through the storage URI at startup. All backends behave the
//! same towards callers: the primitives report the expected conditions via
//! [`StoreError::AlreadyExists`] and [`StoreError::NotFound`] and wrap
//! everything else into a [`BackendError`].

use std::fmt;
use url::Url;
use crate::commons::error::StoreError;
use super::codec::{Encoded, Shape};
use super::types::{Collection, CollectionBuf, RecordId, RecordNameBuf};

macro_rules! store {
    ( $( ( $variant:ident, $module:ident ) )* ) => {


        //------------ RecordStore -------------------------------------------

        /// A store for calculation records atop one of the backends.
        #[derive(Debug)]
        pub struct RecordStore(StoreInner);

        #[derive(Debug)]
        enum StoreInner {
            $(
                $variant( super::backends::$module::Store),
            )*
        }

        impl RecordStore {
            /// Opens the store for the given storage URI.
            ///
            /// The URI’s scheme determines the backend.
            pub fn new(storage_uri: &Url) -> Result<Self, StoreNewError> {
                $(
                    if let Some(inner) =
                        super::backends::$module::Store::from_uri(
                            storage_uri
                        )?
                    {
                        return Ok(RecordStore(StoreInner::$variant(inner)))
                    }
                )*

                Err(StoreNewError::UnknownStorageScheme(
                    storage_uri.scheme().into()
                ))
            }

            /// Returns the name of the backend in use.
            pub fn backend_name(&self) -> &'static str {
                match &self.0 {
                    $(
                        StoreInner::$variant(_) => stringify!($module),
                    )*
                }
            }

            /// Returns the shape of data the backend stores.
            pub fn shape(&self) -> Shape {
                match &self.0 {
                    $(
                        StoreInner::$variant(inner) => inner.shape(),
                    )*
                }
            }

            /// Returns whether there is a record for the given identity.
            pub fn has(&self, id: &RecordId) -> Result<bool, StoreError> {
                match &self.0 {
                    $(
                        StoreInner::$variant(inner) => inner.has(id),
                    )*
                }
            }

            /// Stores a new record.
            ///
            /// Fails with [`StoreError::AlreadyExists`] if there already is
            /// a record for the identity. In this case, the existing record
            /// is left untouched.
            pub fn insert_new(
                &self, id: &RecordId, value: &Encoded
            ) -> Result<(), StoreError> {
                match &self.0 {
                    $(
                        StoreInner::$variant(inner) => {
                            inner.insert_new(id, value)
                        }
                    )*
                }
            }

            /// Replaces the value of an existing record.
            ///
            /// Fails with [`StoreError::NotFound`] if there is no record
            /// for the identity.
            pub fn replace(
                &self, id: &RecordId, value: &Encoded
            ) -> Result<(), StoreError> {
                match &self.0 {
                    $(
                        StoreInner::$variant(inner) => {
                            inner.replace(id, value)
                        }
                    )*
                }
            }

            /// Returns the value of a record.
            ///
            /// Fails with [`StoreError::NotFound`] if there is no record
            /// for the identity.
            pub fn fetch(&self, id: &RecordId) -> Result<Encoded, StoreError> {
                match &self.0 {
                    $(
                        StoreInner::$variant(inner) => inner.fetch(id),
                    )*
                }
            }

            /// Removes a record.
            ///
            /// Fails with [`StoreError::NotFound`] if there is no record
            /// for the identity.
            pub fn remove(&self, id: &RecordId) -> Result<(), StoreError> {
                match &self.0 {
                    $(
                        StoreInner::$variant(inner) => inner.remove(id),
                    )*
                }
            }

            /// Returns the names of all records in a collection, sorted.
            ///
            /// Returns an empty list for a collection that was never used.
            pub fn list_names(
                &self, collection: &Collection
            ) -> Result<Vec<RecordNameBuf>, StoreError> {
                match &self.0 {
                    $(
                        StoreInner::$variant(inner) => {
                            inner.list_names(collection)
                        }
                    )*
                }
            }

            /// Returns the names of all known collections, sorted.
            pub fn list_collections(
                &self
            ) -> Result<Vec<CollectionBuf>, StoreError> {
                match &self.0 {
                    $(
                        StoreInner::$variant(inner) => {
                            inner.list_collections()
                        }
                    )*
                }
            }
        }


        //------------ BackendError ------------------------------------------

        /// An unclassified failure of a backend.
        #[derive(Debug)]
        pub struct BackendError(ErrorInner);

        #[derive(Debug)]
        enum ErrorInner {
            $(
                $variant(super::backends::$module::Error),
            )*
        }

        $(
            impl From<super::backends::$module::Error> for BackendError {
                fn from(src: super::backends::$module::Error) -> Self {
                    Self(ErrorInner::$variant(src))
                }
            }

            impl From<super::backends::$module::Error> for StoreError {
                fn from(src: super::backends::$module::Error) -> Self {
                    StoreError::Backend(src.into())
                }
            }
        )*

        impl fmt::Display for BackendError {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                match &self.0 {
                    $(
                        ErrorInner::$variant(inner) => inner.fmt(f),
                    )*
                }
            }
        }

        impl std::error::Error for BackendError { }


        //------------ StoreNewError -----------------------------------------

        #[derive(Debug)]
        pub enum StoreNewError {
            UnknownStorageScheme(String),
            Store(BackendError)
        }

        impl From<BackendError> for StoreNewError {
            fn from(src: BackendError) -> Self {
                Self::Store(src)
            }
        }

        $(
            impl From<super::backends::$module::Error> for StoreNewError {
                fn from(src: super::backends::$module::Error) -> Self {
                    Self::Store(src.into())
                }
            }
        )*

        impl fmt::Display for StoreNewError {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                match self {
                    Self::UnknownStorageScheme(scheme) => {
                        write!(f, "unknown storage scheme: {scheme}")
                    }
                    Self::Store(inner) => inner.fmt(f)
                }
            }
        }

        impl std::error::Error for StoreNewError { }
    }
}

#[cfg(not(feature = "postgres"))]
store! {
    (Disk, disk)
    (Memory, memory)
}

#[cfg(feature = "postgres")]
store! {
    (Disk, disk)
    (Memory, memory)
    (Postgres, postgres)
}
