//! Various crate-wide constants.

use crate::commons::storage::Collection;


//------------ Binary Names -------------------------------------------------

/// The friendly name of the `hklstore` binary.
pub const HKLSTORE_APP: &str = "HKL Store";

/// The process name used when logging to syslog.
pub const HKLSTORE_PROCESS: &str = "hklstore";


//------------ Config Files Paths -------------------------------------------

/// The default path to the config file.
pub const HKLSTORE_DEFAULT_CONFIG_FILE: &str = "/etc/hklstore.conf";


//------------ Environment Variables ----------------------------------------

/// The environment variable with the storage URI.
///
/// It will be overwritten by the config file. The default is
/// “local://./data”.
pub const HKLSTORE_ENV_STORAGE_URI: &str = "HKLSTORE_STORAGE_URI";

/// The environment variable with the log level.
///
/// The variable should contain the name of a [`log::LevelFilter`]. It will
/// be overwritten by the config file. The default is “info.”
pub const HKLSTORE_ENV_LOG_LEVEL: &str = "HKLSTORE_LOG_LEVEL";

/// The environment variable with the log target.
///
/// The variable should contain the name of a
/// [`LogType`][crate::config::LogType]. It will be overwritten by the config
/// file. The default is “stderr.”
pub const HKLSTORE_ENV_LOG_TYPE: &str = "HKLSTORE_LOG_TYPE";

/// The environment variable with a database for the PostgreSQL tests.
///
/// If it isn’t set, tests of the PostgreSQL backend are skipped.
pub const HKLSTORE_ENV_TEST_POSTGRES: &str = "HKLSTORE_TEST_POSTGRES";


//------------ Storage -------------------------------------------------------

/// The collection used for records that don’t name one.
pub const DEFAULT_COLLECTION: &Collection = Collection::make("default");
