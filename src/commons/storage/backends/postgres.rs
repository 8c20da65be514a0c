//! Storage using a PostgreSQL database.
//!
//! Records are kept as JSONB documents in a single table. The collection
//! column acts as the logical table of a collection, the record name as the
//! document’s key within it.

use std::{error, fmt};
use log::debug;
use postgres::NoTls;
use postgres::types::Json;
use r2d2_postgres::r2d2;
use r2d2_postgres::PostgresConnectionManager;
use url::Url;
use crate::commons::error::{Action, StoreError};
use crate::commons::storage::{
    Collection, CollectionBuf, Document, Encoded, RecordId, RecordNameBuf,
    Shape,
};


//------------ Constants -----------------------------------------------------

/// The statement creating the record table if necessary.
const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS hkl_records ( \
        collection TEXT NOT NULL, \
        name TEXT NOT NULL, \
        document JSONB NOT NULL, \
        PRIMARY KEY (collection, name) \
    )";


//------------ Store ---------------------------------------------------------

/// A storage backend using a PostgreSQL database.
///
/// Every primitive checks out a connection from the pool and returns it
/// before returning, also on error.
#[derive(Debug)]
pub struct Store {
    pool: r2d2::Pool<PostgresConnectionManager<NoTls>>,
}

impl Store {
    pub fn from_uri(uri: &Url) -> Result<Option<Self>, Error> {
        if uri.scheme() != "postgres" && uri.scheme() != "postgresql" {
            return Ok(None)
        }

        let manager = PostgresConnectionManager::new(
            uri.as_str().parse().map_err(Error::Postgres)?,
            NoTls
        );
        let pool = r2d2::Pool::new(manager)?;
        pool.get()?.batch_execute(CREATE_TABLE)?;
        debug!("opened record table at {}", uri.host_str().unwrap_or(""));

        Ok(Some(Self { pool }))
    }

    pub fn shape(&self) -> Shape {
        Shape::Document
    }
}


/// # Reading
impl Store {
    pub fn has(&self, id: &RecordId) -> Result<bool, StoreError> {
        Ok(
            self.pool.get().map_err(Error::from)?.query_opt(
                "SELECT 1 FROM hkl_records \
                 WHERE collection = $1 AND name = $2",
                &[&id.resolved_collection().as_str(), &id.name().as_str()],
            ).map_err(Error::from)?.is_some()
        )
    }

    pub fn fetch(&self, id: &RecordId) -> Result<Encoded, StoreError> {
        let row = self.pool.get().map_err(Error::from)?.query_opt(
            "SELECT document FROM hkl_records \
             WHERE collection = $1 AND name = $2",
            &[&id.resolved_collection().as_str(), &id.name().as_str()],
        ).map_err(Error::from)?;
        let Some(row) = row else {
            return Err(StoreError::not_found(id, Action::Load))
        };
        let Json(document) = row.try_get::<_, Json<Document>>(0)
            .map_err(Error::from)?;
        Ok(Encoded::Document(document))
    }

    pub fn list_names(
        &self, collection: &Collection
    ) -> Result<Vec<RecordNameBuf>, StoreError> {
        let rows = self.pool.get().map_err(Error::from)?.query(
            "SELECT name FROM hkl_records \
             WHERE collection = $1 ORDER BY name",
            &[&collection.as_str()],
        ).map_err(Error::from)?;
        Ok(
            rows.into_iter().filter_map(|row| {
                row.try_get::<_, String>(0).ok().and_then(|name| {
                    RecordNameBuf::try_from(name).ok()
                })
            }).collect()
        )
    }

    pub fn list_collections(&self) -> Result<Vec<CollectionBuf>, StoreError> {
        let rows = self.pool.get().map_err(Error::from)?.query(
            "SELECT DISTINCT collection FROM hkl_records \
             ORDER BY collection",
            &[],
        ).map_err(Error::from)?;
        Ok(
            rows.into_iter().filter_map(|row| {
                row.try_get::<_, String>(0).ok().and_then(|name| {
                    CollectionBuf::try_from(name).ok()
                })
            }).collect()
        )
    }
}


/// # Writing
impl Store {
    pub fn insert_new(
        &self, id: &RecordId, value: &Encoded
    ) -> Result<(), StoreError> {
        let document = value.as_document()?;
        let mut client = self.pool.get().map_err(Error::from)?;
        let collection = id.resolved_collection().as_str();
        let name = id.name().as_str();

        if client.query_opt(
            "SELECT 1 FROM hkl_records WHERE collection = $1 AND name = $2",
            &[&collection, &name],
        ).map_err(Error::from)?.is_some() {
            return Err(StoreError::already_exists(id))
        }

        // A concurrent insert may have won between the check and here.
        let inserted = client.execute(
            "INSERT INTO hkl_records (collection, name, document) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (collection, name) DO NOTHING",
            &[&collection, &name, &Json(document)],
        ).map_err(Error::from)?;
        if inserted == 0 {
            return Err(StoreError::already_exists(id))
        }
        Ok(())
    }

    pub fn replace(
        &self, id: &RecordId, value: &Encoded
    ) -> Result<(), StoreError> {
        let document = value.as_document()?;
        let updated = self.pool.get().map_err(Error::from)?.execute(
            "UPDATE hkl_records SET document = $3 \
             WHERE collection = $1 AND name = $2",
            &[
                &id.resolved_collection().as_str(),
                &id.name().as_str(),
                &Json(document),
            ],
        ).map_err(Error::from)?;
        if updated == 0 {
            return Err(StoreError::not_found(id, Action::Save))
        }
        Ok(())
    }

    pub fn remove(&self, id: &RecordId) -> Result<(), StoreError> {
        let deleted = self.pool.get().map_err(Error::from)?.execute(
            "DELETE FROM hkl_records WHERE collection = $1 AND name = $2",
            &[&id.resolved_collection().as_str(), &id.name().as_str()],
        ).map_err(Error::from)?;
        if deleted == 0 {
            return Err(StoreError::not_found(id, Action::Delete))
        }
        Ok(())
    }
}


//------------ Error ---------------------------------------------------------

#[derive(Debug)]
pub enum Error {
    Postgres(postgres::error::Error),
    R2D2(r2d2::Error),
}

impl From<postgres::error::Error> for Error {
    fn from(src: postgres::error::Error) -> Self {
        Self::Postgres(src)
    }
}

impl From<r2d2::Error> for Error {
    fn from(src: r2d2::Error) -> Self {
        Self::R2D2(src)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Postgres(inner) => inner.fmt(f),
            Error::R2D2(inner) => inner.fmt(f),
        }
    }
}

impl error::Error for Error { }
