//! The command line options.

use std::fs;
use std::path::PathBuf;
use url::Url;
use crate::calc::{CalcStore, HklCalculation};
use crate::commons::storage::{CollectionBuf, RecordId, RecordNameBuf};
use crate::constants::DEFAULT_COLLECTION;
use super::Error;


//------------ Options -------------------------------------------------------

/// The command line options for the record store tool.
#[derive(clap::Parser)]
#[command(
    version,
    about = "Manage stored HKL calculation records.",
)]
pub struct Options {
    #[command(flatten)]
    pub general: GeneralOptions,

    #[command(subcommand)]
    pub command: Command,
}

impl Options {
    /// Creates the options from the process arguments.
    ///
    /// If the arguments won’t result in usable options, exits the process.
    pub fn from_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}


//------------ GeneralOptions ------------------------------------------------

/// The options common to all commands.
#[derive(clap::Args)]
pub struct GeneralOptions {
    /// Path to the config file (default: /etc/hklstore.conf if present)
    #[arg(short, long, env = "HKLSTORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Storage URI overriding the configured one
    #[arg(short, long)]
    pub storage: Option<Url>,
}


//------------ Command -------------------------------------------------------

#[derive(clap::Subcommand)]
pub enum Command {
    /// Create a new record with a fresh calculation.
    Create(Record),

    /// Delete a record. WARNING: Irreversible!
    Delete(Record),

    /// Show the calculation of a record as JSON.
    Show(Record),

    /// Replace the calculation of an existing record.
    Save(Save),

    /// List the records of a collection.
    List(List),

    /// List all collections.
    Collections,
}

impl Command {
    /// Runs the command and returns what should be printed.
    pub async fn run(self, store: &CalcStore) -> Result<String, Error> {
        match self {
            Self::Create(cmd) => {
                store.create(&cmd.id()).await?;
                Ok(String::new())
            }
            Self::Delete(cmd) => {
                store.delete(&cmd.id()).await?;
                Ok(String::new())
            }
            Self::Show(cmd) => {
                let calc = store.load(&cmd.id()).await?;
                Ok(serde_json::to_string_pretty(&calc)?)
            }
            Self::Save(cmd) => cmd.run(store).await,
            Self::List(cmd) => cmd.run(store).await,
            Self::Collections => {
                Ok(lines(store.collections().await?))
            }
        }
    }
}


//------------ Record --------------------------------------------------------

#[derive(clap::Args)]
pub struct Record {
    /// Name of the record
    pub name: RecordNameBuf,

    /// Collection of the record (default: “default”)
    #[arg(long, short = 'C')]
    pub collection: Option<CollectionBuf>,
}

impl Record {
    pub fn id(&self) -> RecordId {
        RecordId::new(self.name.clone(), self.collection.clone())
    }
}


//------------ Save ----------------------------------------------------------

#[derive(clap::Args)]
pub struct Save {
    #[command(flatten)]
    pub record: Record,

    /// Path to a JSON file with the calculation
    #[arg(long, short)]
    pub file: PathBuf,
}

impl Save {
    async fn run(self, store: &CalcStore) -> Result<String, Error> {
        let json = fs::read(&self.file).map_err(|err| {
            Error::Io(self.file.clone(), err)
        })?;
        let calc: HklCalculation = serde_json::from_slice(&json)?;
        store.save(&self.record.id(), calc).await?;
        Ok(String::new())
    }
}


//------------ List ----------------------------------------------------------

#[derive(clap::Args)]
pub struct List {
    /// The collection to list (default: “default”)
    #[arg(long, short = 'C')]
    pub collection: Option<CollectionBuf>,
}

impl List {
    async fn run(self, store: &CalcStore) -> Result<String, Error> {
        let names = match self.collection {
            Some(collection) => store.list(&collection).await?,
            None => store.list(DEFAULT_COLLECTION).await?,
        };
        Ok(lines(names))
    }
}


//------------ Helpers -------------------------------------------------------

fn lines<T: ToString>(items: Vec<T>) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}
