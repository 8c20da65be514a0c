//! The command line tool.

pub mod options;

pub use self::options::Options;


use std::{error, fmt, io};
use std::path::PathBuf;
use log::{debug, warn};
use crate::calc::{CalcStore, HklCalculation};
use crate::commons::error::{ErrorKind, StoreError};
use crate::commons::storage::{JsonCodec, RecordStore, StoreNewError};
use crate::config::{Config, ConfigError};


//------------ run -----------------------------------------------------------

/// Runs the command given through `options`.
///
/// Prints the command’s output to stdout.
pub async fn run(options: Options) -> Result<(), Error> {
    let config = Config::create(
        options.general.config.as_deref(), options.general.storage
    )?;
    let store = RecordStore::new(&config.storage_uri)?;
    debug!(
        "using {} storage at {}", store.backend_name(), config.storage_uri
    );
    let store = CalcStore::new(store, JsonCodec::<HklCalculation>::new());

    let output = options.command.run(&store).await?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}


//------------ Error ---------------------------------------------------------

#[derive(Debug)]
pub enum Error {
    Config(ConfigError),
    Open(StoreNewError),
    Store(StoreError),
    Io(PathBuf, io::Error),
    Json(serde_json::Error),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<StoreNewError> for Error {
    fn from(err: StoreNewError) -> Self {
        Error::Open(err)
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        if err.kind() == ErrorKind::Io {
            warn!("storage failure: {err}");
        }
        Error::Store(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(err) => write!(f, "Configuration error: {err}"),
            Error::Open(err) => write!(f, "Cannot open store: {err}"),
            Error::Store(err) => err.fmt(f),
            Error::Io(path, err) => {
                write!(f, "Cannot read '{}': {}", path.display(), err)
            }
            Error::Json(err) => write!(f, "Invalid calculation: {err}"),
        }
    }
}

impl error::Error for Error { }
