//! Filesystem-based storage.

use std::{error, fmt, fs, io};
use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use log::debug;
use tempfile::NamedTempFile;
use url::Url;
use crate::commons::error::{Action, StoreError};
use crate::commons::storage::{
    Collection, CollectionBuf, Encoded, RecordId, RecordNameBuf, Shape,
};


//------------ Constants -----------------------------------------------------

/// The directory under the root that contains temporary files.
const TMP_FILE_DIR: &str = ".tmp";

/// The directory under the root that contains the lock files.
const LOCK_FILE_DIR: &str = ".locks";

/// The name of the lock file for a collection.
pub const LOCK_FILE_NAME: &str = "lockfile.lock";


//------------ Store ---------------------------------------------------------

/// A storage backend that uses the filesystem for storing records.
///
/// The backend uses files under a root directory. Each collection has its
/// own directory under this root and each record is a file in its
/// collection’s directory named after the record. The file contains the
/// encoded blob as is.
///
/// The directory `.tmp` under the root is used for writing new content
/// before it is atomically moved into place, so a reader never sees a
/// partially written record. Because collection names cannot start with
/// a period, it can never collide with a collection.
///
/// Creating, saving, and deleting records is serialized per collection
/// through an advisory lock on a file under `.locks/$(collection)`.
/// Loading needs no lock since records are only ever replaced by renaming.
#[derive(Debug)]
pub struct Store {
    /// The root path for the store.
    root: PathBuf,

    /// The path for temporary files.
    tmp: PathBuf,

    /// The path for lock files.
    locks: PathBuf,
}

impl Store {
    pub fn from_uri(uri: &Url) -> Result<Option<Self>, Error> {
        match Uri::parse_uri(uri).map_err(Error::Uri)? {
            Some(uri) => Self::new(uri.path()).map(Some),
            None => Ok(None)
        }
    }

    /// Creates a store using the given directory as its root.
    pub fn new(root: &Path) -> Result<Self, Error> {
        let root = root.to_path_buf();
        let tmp = root.join(TMP_FILE_DIR);
        let locks = root.join(LOCK_FILE_DIR);

        Self::create_dirs(Some(&tmp))?;

        Ok(Self { root, tmp, locks })
    }

    pub fn shape(&self) -> Shape {
        Shape::Blob
    }

    /// Returns the path of the file for the given record.
    fn record_path(&self, id: &RecordId) -> PathBuf {
        let mut path = self.collection_path(id.resolved_collection());
        path.push(id.name().as_str());
        path
    }

    /// Returns the directory path for the given collection.
    fn collection_path(&self, collection: &Collection) -> PathBuf {
        self.root.join(collection.as_str())
    }

    /// Creates the lock for a collection.
    fn collection_lock(
        &self, collection: &Collection
    ) -> Result<FileLock, Error> {
        FileLock::create(self.locks.join(collection.as_str()))
    }

    /// Returns whether there is a record file at `path`.
    fn probe(path: &Path) -> Result<bool, Error> {
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => {
                Err(Error::io(
                    format!(
                        "failed to check existence of '{}'", path.display()
                    ),
                    err
                ))
            }
        }
    }

    /// Writes the blob to a new temporary file.
    ///
    /// tempfile makes sure the file is cleaned up if it isn’t persisted.
    fn write_temp(
        &self, id: &RecordId, blob: &[u8]
    ) -> Result<NamedTempFile, Error> {
        let mut tmp_file = NamedTempFile::new_in(&self.tmp).map_err(|err| {
            Error::io(
                format!("writing temp file failed for record '{id}'"),
                err,
            )
        })?;
        tmp_file.write_all(blob).and_then(|_| {
            tmp_file.as_file().sync_all()
        }).map_err(|err| {
            Error::io(
                format!(
                    "failed to write temp file '{}' for record '{}'",
                    tmp_file.path().display(), id
                ),
                err,
            )
        })?;
        Ok(tmp_file)
    }

    /// Creates the given directory if necessary.
    fn create_dirs(path: Option<&Path>) -> Result<(), Error> {
        if let Some(path) = path {
            fs::create_dir_all(path).map_err(|err| {
                Error::io(
                    format!(
                        "failed to create directory '{}'", path.display()
                    ),
                    err
                )
            })?;
        }
        Ok(())
    }

    /// Returns the names of the entries of a directory that parse.
    ///
    /// If `dirs` is true, only directories are considered, otherwise only
    /// files are. A directory that does not exist has no entries.
    fn read_names<T>(
        path: &Path,
        dirs: bool,
        parse: impl Fn(String) -> Option<T>,
    ) -> Result<Vec<T>, Error> {
        let read_err = |err| {
            Error::io(
                format!("failed to read directory '{}'", path.display()),
                err
            )
        };

        let mut res = Vec::new();
        let dir = match fs::read_dir(path) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(res)
            }
            Err(err) => return Err(read_err(err))
        };
        for item in dir {
            let item = item.map_err(read_err)?;
            let file_type = item.file_type().map_err(read_err)?;
            if file_type.is_dir() != dirs || file_type.is_symlink() {
                continue
            }
            if let Some(name) =
                item.file_name().into_string().ok().and_then(&parse)
            {
                res.push(name)
            }
        }
        Ok(res)
    }
}


/// # Reading
impl Store {
    pub fn has(&self, id: &RecordId) -> Result<bool, StoreError> {
        Ok(Self::probe(&self.record_path(id))?)
    }

    pub fn fetch(&self, id: &RecordId) -> Result<Encoded, StoreError> {
        let path = self.record_path(id);
        match fs::read(&path) {
            Ok(blob) => Ok(Encoded::Blob(blob)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::not_found(id, Action::Load))
            }
            Err(err) => {
                Err(Error::io(
                    format!("failed to read file '{}'", path.display()),
                    err
                ).into())
            }
        }
    }

    pub fn list_names(
        &self, collection: &Collection
    ) -> Result<Vec<RecordNameBuf>, StoreError> {
        let mut res = Self::read_names(
            &self.collection_path(collection), false,
            |name| RecordNameBuf::try_from(name).ok()
        )?;
        res.sort();
        Ok(res)
    }

    pub fn list_collections(&self) -> Result<Vec<CollectionBuf>, StoreError> {
        let mut res = Self::read_names(
            &self.root, true,
            |name| CollectionBuf::try_from(name).ok()
        )?;
        res.sort();
        Ok(res)
    }
}


/// # Writing
impl Store {
    pub fn insert_new(
        &self, id: &RecordId, value: &Encoded
    ) -> Result<(), StoreError> {
        let blob = value.as_blob()?;
        let mut lock = self.collection_lock(id.resolved_collection())?;
        let _guard = lock.write()?;

        let path = self.record_path(id);
        if Self::probe(&path)? {
            return Err(StoreError::already_exists(id))
        }
        Self::create_dirs(path.parent())?;

        // Even with the lock held, refuse to clobber a file that appeared
        // in the meantime. Another process may not honour the lock.
        let tmp_file = self.write_temp(id, blob)?;
        match tmp_file.persist_noclobber(&path) {
            Ok(_) => {
                debug!("created '{}'", path.display());
                Ok(())
            }
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::already_exists(id))
            }
            Err(err) => {
                Err(Error::io(
                    format!(
                        "failed to move temp file '{}' to '{}'",
                        err.file.path().display(),
                        path.display()
                    ),
                    err.error,
                ).into())
            }
        }
    }

    pub fn replace(
        &self, id: &RecordId, value: &Encoded
    ) -> Result<(), StoreError> {
        let blob = value.as_blob()?;
        let mut lock = self.collection_lock(id.resolved_collection())?;
        let _guard = lock.write()?;

        let path = self.record_path(id);
        if !Self::probe(&path)? {
            return Err(StoreError::not_found(id, Action::Save))
        }

        let tmp_file = self.write_temp(id, blob)?;
        tmp_file.persist(&path).map_err(|err| {
            Error::io(
                format!(
                    "failed to move temp file '{}' to '{}'",
                    err.file.path().display(),
                    path.display()
                ),
                err.error,
            )
        })?;
        debug!("replaced '{}'", path.display());
        Ok(())
    }

    pub fn remove(&self, id: &RecordId) -> Result<(), StoreError> {
        let mut lock = self.collection_lock(id.resolved_collection())?;
        let _guard = lock.write()?;

        let path = self.record_path(id);
        if !Self::probe(&path)? {
            return Err(StoreError::not_found(id, Action::Delete))
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("removed '{}'", path.display());
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::not_found(id, Action::Delete))
            }
            Err(err) => {
                Err(Error::io(
                    format!("failed to delete file '{}'", path.display()),
                    err
                ).into())
            }
        }
    }
}


//------------ FileLock ------------------------------------------------------

#[derive(Debug)]
struct FileLock {
    lock: fd_lock::RwLock<File>,
}

impl FileLock {
    fn create(path: PathBuf) -> Result<Self, Error> {
        let lock_path = path.join(LOCK_FILE_NAME);
        Store::create_dirs(Some(&path))?;

        let mut options = OpenOptions::new();
        options.create(true).truncate(false).read(true).write(true);
        let lock_file = options.open(&lock_path).map_err(|err| {
            Error::io(
                format!(
                    "failed to open lock file '{}'", lock_path.display(),
                ),
                err
            )
        })?;

        Ok(FileLock { lock: fd_lock::RwLock::new(lock_file) })
    }

    fn write(&mut self) -> Result<fd_lock::RwLockWriteGuard<'_, File>, Error> {
        self.lock.write().map_err(|err| {
            Error::io("cannot get file lock", err)
        })
    }
}


//------------ Uri -----------------------------------------------------------

/// The location of a disk store.
///
/// Two URI schemes are supported. With `local`, host and path of the URI
/// are joined, so `local://./data` refers to the relative directory
/// `./data`. With `file`, the URI must not have an authority and the path
/// must be absolute.
#[derive(Clone, Debug, PartialEq)]
pub struct Uri {
    path: PathBuf,
}

impl Uri {
    pub fn parse_uri(uri: &Url) -> Result<Option<Uri>, UriError> {
        match uri.scheme() {
            "local" => {
                let path = format!(
                    "{}{}", uri.host_str().unwrap_or_default(), uri.path()
                );
                if path.is_empty() {
                    return Err(UriError::MissingPath)
                }
                Ok(Some(Self { path: path.into() }))
            }
            "file" => {
                if !uri.authority().is_empty() {
                    return Err(UriError::HasAuthority(uri.authority().into()))
                }
                Self::parse_str(uri.path()).map(Some)
            }
            _ => Ok(None)
        }
    }

    pub fn parse_str(s: &str) -> Result<Uri, UriError> {
        if s.is_empty() {
            return Err(UriError::MissingPath)
        }
        let path = PathBuf::from(s);
        if !path.is_absolute() {
            return Err(UriError::RelativePath(path))
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "local://{}", self.path.display())
    }
}


//------------ Error ---------------------------------------------------------

#[derive(Debug)]
pub enum Error {
    Io {
        context: Cow<'static, str>,
        err: io::Error,
    },
    Uri(UriError),
}

impl Error {
    fn io(context: impl Into<Cow<'static, str>>, err: io::Error) -> Self {
        Error::Io { context: context.into(), err }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { context, err } => {
                write!(f, "{context}: {err}")
            }
            Error::Uri(err) => {
                write!(f, "invalid disk storage URI: {err}")
            }
        }
    }
}

impl error::Error for Error { }


//------------ UriError ------------------------------------------------------

#[derive(Debug)]
pub enum UriError {
    HasAuthority(String),
    MissingPath,
    RelativePath(PathBuf),
}

impl fmt::Display for UriError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::HasAuthority(host) => {
                write!(f, "non-local path with host '{host}'")
            }
            Self::MissingPath => {
                write!(f, "missing path")
            }
            Self::RelativePath(path) => {
                write!(f, "{} is not absolute.", path.display())
            }
        }
    }
}

impl error::Error for UriError { }


//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_uri_joins_host_and_path() {
        let uri = Url::parse("local://./data").unwrap();
        let uri = Uri::parse_uri(&uri).unwrap().unwrap();
        assert_eq!(uri.path(), Path::new("./data"));

        let uri = Url::parse("local:///var/lib/hkl").unwrap();
        let uri = Uri::parse_uri(&uri).unwrap().unwrap();
        assert_eq!(uri.path(), Path::new("/var/lib/hkl"));
    }

    #[test]
    fn file_uri_must_be_local() {
        let uri = Url::parse("file:///var/lib/hkl").unwrap();
        assert!(Uri::parse_uri(&uri).unwrap().is_some());

        let uri = Url::parse("file://example.com/var/lib/hkl").unwrap();
        assert!(matches!(
            Uri::parse_uri(&uri), Err(UriError::HasAuthority(_))
        ));
    }

    #[test]
    fn other_schemes_are_ignored() {
        let uri = Url::parse("memory:").unwrap();
        assert!(Uri::parse_uri(&uri).unwrap().is_none());
    }

    #[test]
    fn record_lives_in_collection_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        let id = RecordId::parse("n1", Some("B07")).unwrap();

        store.insert_new(&id, &Encoded::Blob(b"{}".to_vec())).unwrap();
        let path = dir.path().join("B07").join("n1");
        assert_eq!(fs::read(path).unwrap(), b"{}");

        let id = RecordId::parse("n1", None).unwrap();
        store.insert_new(&id, &Encoded::Blob(b"[]".to_vec())).unwrap();
        let path = dir.path().join("default").join("n1");
        assert_eq!(fs::read(path).unwrap(), b"[]");
    }

    #[test]
    fn bookkeeping_dirs_are_not_collections() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        let id = RecordId::parse("n1", Some("A")).unwrap();
        store.insert_new(&id, &Encoded::Blob(Vec::new())).unwrap();

        assert!(dir.path().join(TMP_FILE_DIR).is_dir());
        assert!(dir.path().join(LOCK_FILE_DIR).is_dir());
        let collections = store.list_collections().unwrap();
        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0].as_str(), "A");
    }

    #[test]
    fn rejects_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        let id = RecordId::parse("n1", None).unwrap();
        let err = store.insert_new(
            &id, &Encoded::Document(Default::default())
        ).unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
        assert!(!store.has(&id).unwrap());
    }

    #[test]
    fn emptied_collection_dir_remains() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        let id = RecordId::parse("n1", Some("A")).unwrap();
        store.insert_new(&id, &Encoded::Blob(Vec::new())).unwrap();
        store.remove(&id).unwrap();
        assert!(dir.path().join("A").is_dir());
        assert!(store.list_names(Collection::make("A")).unwrap().is_empty());
    }
}
