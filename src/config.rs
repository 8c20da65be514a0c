//! Configuration of the record store and its logging.

use std::{env, fmt, fs, io};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use log::{LevelFilter, debug, error};
use serde::de;
use serde::{Deserialize, Deserializer};
#[cfg(unix)]
use syslog::Facility;
use url::Url;
use crate::constants::*;


//------------ ConfigDefaults ------------------------------------------------

pub struct ConfigDefaults;

impl ConfigDefaults {
    fn storage_uri() -> Url {
        let uri = env::var(HKLSTORE_ENV_STORAGE_URI).unwrap_or_else(|_| {
            "local://./data".to_string()
        });
        match Url::parse(&uri) {
            Ok(uri) => uri,
            Err(_) => {
                eprintln!(
                    "Unrecognized value for storage URI in env var {}",
                    HKLSTORE_ENV_STORAGE_URI
                );
                ::std::process::exit(1);
            }
        }
    }

    fn log_level() -> LevelFilter {
        match env::var(HKLSTORE_ENV_LOG_LEVEL) {
            Ok(level) => match LevelFilter::from_str(&level) {
                Ok(level) => level,
                Err(_) => {
                    eprintln!(
                        "Unrecognized value for log level in env var {}",
                        HKLSTORE_ENV_LOG_LEVEL
                    );
                    ::std::process::exit(1);
                }
            },
            _ => LevelFilter::Info,
        }
    }

    fn log_type() -> LogType {
        match env::var(HKLSTORE_ENV_LOG_TYPE) {
            Ok(log_type) => match LogType::from_str(&log_type) {
                Ok(log_type) => log_type,
                Err(_) => {
                    eprintln!(
                        "Unrecognized value for log type in env var {}",
                        HKLSTORE_ENV_LOG_TYPE
                    );
                    ::std::process::exit(1);
                }
            },
            _ => LogType::Stderr,
        }
    }

    fn log_file() -> PathBuf {
        PathBuf::from("./hklstore.log")
    }

    fn syslog_facility() -> String {
        "daemon".to_string()
    }
}


//------------ Config --------------------------------------------------------

/// Global configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Where and how records are stored.
    ///
    /// The scheme of the URI selects the backend.
    #[serde(default = "ConfigDefaults::storage_uri")]
    pub storage_uri: Url,

    #[serde(
        default = "ConfigDefaults::log_level",
        deserialize_with = "de_level_filter"
    )]
    log_level: LevelFilter,

    #[serde(default = "ConfigDefaults::log_type")]
    log_type: LogType,

    #[serde(default = "ConfigDefaults::log_file")]
    log_file: PathBuf,

    #[serde(default = "ConfigDefaults::syslog_facility")]
    syslog_facility: String,
}

/// # Accessors
impl Config {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn log_type(&self) -> &LogType {
        &self.log_type
    }
}

/// # Create
impl Config {
    /// Creates a config using the default values only.
    pub fn from_defaults() -> Self {
        Config {
            storage_uri: ConfigDefaults::storage_uri(),
            log_level: ConfigDefaults::log_level(),
            log_type: ConfigDefaults::log_type(),
            log_file: ConfigDefaults::log_file(),
            syslog_facility: ConfigDefaults::syslog_facility(),
        }
    }

    /// Creates the config at startup.
    ///
    /// If `config_file` is given, it has to exist. Otherwise the default
    /// config file is used if it exists and the default values if it
    /// doesn’t. A given `storage_uri` overrides the configured one.
    ///
    /// This also initializes logging.
    pub fn create(
        config_file: Option<&Path>,
        storage_uri: Option<Url>,
    ) -> Result<Self, ConfigError> {
        let default_file = Path::new(HKLSTORE_DEFAULT_CONFIG_FILE);
        let config_file = match config_file {
            Some(path) => Some(path),
            None if default_file.exists() => Some(default_file),
            None => None,
        };
        let mut config = match config_file {
            Some(path) => Self::read_config(path).map_err(|err| {
                ConfigError::Other(format!(
                    "Error parsing config file: {}, error: {}",
                    path.display(), err
                ))
            })?,
            None => Self::from_defaults(),
        };
        if let Some(uri) = storage_uri {
            config.storage_uri = uri;
        }
        config.verify()?;
        config.init_logging()?;
        match config_file {
            Some(path) => {
                debug!(
                    "{} uses configuration file: {}",
                    HKLSTORE_APP, path.display()
                );
            }
            None => debug!("{} uses default configuration", HKLSTORE_APP),
        }
        Ok(config)
    }

    pub fn read_config(file: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(file)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn verify(&self) -> Result<(), ConfigError> {
        match self.storage_uri.scheme() {
            "local" | "file" | "memory" => { }
            "postgres" | "postgresql" => {
                if cfg!(not(feature = "postgres")) {
                    return Err(ConfigError::other(
                        "PostgreSQL storage requires the 'postgres' feature"
                    ))
                }
            }
            scheme => {
                return Err(ConfigError::Other(format!(
                    "Unsupported storage URI scheme: {scheme}"
                )))
            }
        }

        self.verify_syslog()
    }

    #[cfg(unix)]
    fn verify_syslog(&self) -> Result<(), ConfigError> {
        if self.log_type == LogType::Syslog
            && Facility::from_str(&self.syslog_facility).is_err()
        {
            return Err(ConfigError::other("Invalid syslog_facility"));
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn verify_syslog(&self) -> Result<(), ConfigError> {
        if self.log_type == LogType::Syslog {
            return Err(ConfigError::other("Syslog is only supported on Unix"));
        }
        Ok(())
    }
}

/// # Logging
impl Config {
    pub fn init_logging(&self) -> Result<(), ConfigError> {
        match self.log_type {
            LogType::File => self.file_logger(&self.log_file),
            LogType::Stderr => self.stderr_logger(),
            #[cfg(unix)]
            LogType::Syslog => {
                let facility = Facility::from_str(&self.syslog_facility)
                    .map_err(|_| {
                        ConfigError::other("Invalid syslog_facility")
                    })?;
                self.syslog_logger(facility)
            }
            #[cfg(not(unix))]
            LogType::Syslog => {
                Err(ConfigError::other("Syslog is only supported on Unix"))
            }
        }
    }

    /// Creates a stderr logger.
    fn stderr_logger(&self) -> Result<(), ConfigError> {
        self.fern_logger()
            .chain(io::stderr())
            .apply()
            .map_err(|e| {
                ConfigError::Other(
                    format!("Failed to init stderr logging: {}", e)
                )
            })
    }

    /// Creates a file logger using the file provided by `path`.
    fn file_logger(&self, path: &Path) -> Result<(), ConfigError> {
        let file = match fern::log_file(path) {
            Ok(file) => file,
            Err(err) => {
                let error_string = format!(
                    "Failed to open log file '{}': {}", path.display(), err
                );
                error!("{}", error_string.as_str());
                return Err(ConfigError::Other(error_string));
            }
        };
        self.fern_logger()
            .chain(file)
            .apply()
            .map_err(|e| {
                ConfigError::Other(
                    format!("Failed to init file logging: {}", e)
                )
            })
    }

    /// Creates a syslog logger and configures correctly.
    #[cfg(unix)]
    fn syslog_logger(
        &self, facility: syslog::Facility
    ) -> Result<(), ConfigError> {
        let process = env::current_exe()
            .ok()
            .and_then(|path| {
                path.file_name()
                    .and_then(std::ffi::OsStr::to_str)
                    .map(ToString::to_string)
            })
            .unwrap_or_else(|| String::from(HKLSTORE_PROCESS));
        let formatter = syslog::Formatter3164 {
            facility,
            hostname: None,
            process,
            pid: std::process::id(),
        };
        let logger = syslog::unix(formatter.clone())
            .or_else(|_| {
                syslog::tcp(formatter.clone(), ("127.0.0.1", 601))
            })
            .or_else(|_| {
                syslog::udp(formatter, ("127.0.0.1", 0), ("127.0.0.1", 514))
            });
        match logger {
            Ok(logger) => self
                .fern_logger()
                .chain(logger)
                .apply()
                .map_err(|e| {
                    ConfigError::Other(format!("Failed to init syslog: {}", e))
                }),
            Err(err) => {
                let msg = format!("Cannot connect to syslog: {}", err);
                Err(ConfigError::Other(msg))
            }
        }
    }

    /// Creates and returns a fern logger with log level tweaks.
    fn fern_logger(&self) -> fern::Dispatch {
        // suppress overly noisy logging
        let framework_level = self.log_level.min(LevelFilter::Warn);
        let backend_level = self.log_level.min(LevelFilter::Debug);

        let show_target = self.log_level == LevelFilter::Trace
            || self.log_level == LevelFilter::Debug;
        fern::Dispatch::new()
            .format(move |out, message, record| {
                if show_target {
                    out.finish(format_args!(
                        "{} [{}] [{}] {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                        record.level(),
                        record.target(),
                        message
                    ))
                } else {
                    out.finish(format_args!(
                        "{} [{}] {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                        record.level(),
                        message
                    ))
                }
            })
            .level(self.log_level)
            .level_for("postgres", framework_level)
            .level_for("tokio_postgres", framework_level)
            .level_for("r2d2", framework_level)
            .level_for("mio", framework_level)
            .level_for(
                "hklstore::commons::storage::backends", backend_level
            )
    }
}


//------------ de_level_filter -----------------------------------------------

fn de_level_filter<'de, D>(d: D) -> Result<LevelFilter, D::Error>
where D: Deserializer<'de> {
    let string = String::deserialize(d)?;
    LevelFilter::from_str(&string).map_err(de::Error::custom)
}


//------------ LogType -------------------------------------------------------

/// The target to log to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LogType {
    Stderr,
    File,
    Syslog,
}

impl FromStr for LogType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stderr" => Ok(LogType::Stderr),
            "file" => Ok(LogType::File),
            "syslog" => Ok(LogType::Syslog),
            _ => Err(format!(
                "expected \"stderr\", \"file\", or \"syslog\", \
                 found: \"{}\"",
                s
            )),
        }
    }
}

impl<'de> Deserialize<'de> for LogType {
    fn deserialize<D>(d: D) -> Result<LogType, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(d)?;
        LogType::from_str(&string).map_err(de::Error::custom)
    }
}


//------------ ConfigError ---------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    IoError(io::Error),
    TomlError(toml::de::Error),
    Other(String),
}

impl ConfigError {
    pub fn other(s: &str) -> ConfigError {
        ConfigError::Other(s.to_string())
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => e.fmt(f),
            ConfigError::TomlError(e) => e.fmt(f),
            ConfigError::Other(s) => s.fmt(f),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::IoError(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::TomlError(e)
    }
}

impl std::error::Error for ConfigError { }


//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_default_config_file() {
        let c = Config::read_config(
            Path::new("./defaults/hklstore.conf")
        ).unwrap();
        assert_eq!(c.storage_uri.as_str(), "local://./data");
        assert_eq!(c.log_level, LevelFilter::Info);
        assert_eq!(c.log_type, LogType::Stderr);
        c.verify().unwrap();
    }

    #[test]
    fn should_reject_unknown_storage() {
        let c: Config = toml::from_str(
            "storage_uri = \"s3://bucket/records\"\n\
             log_level = \"info\"\n\
             log_type = \"stderr\"\n"
        ).unwrap();
        assert!(c.verify().is_err());
    }

    #[test]
    fn should_reject_unknown_log_type() {
        assert!(
            toml::from_str::<Config>(
                "storage_uri = \"memory:\"\nlog_type = \"journal\"\n"
            ).is_err()
        );
    }

    #[test]
    fn should_set_correct_log_levels() {
        use log::Level as LL;

        fn void_logger(config: &str) -> Box<dyn log::Log> {
            let c: Config = toml::from_str(config).unwrap();
            let void_output = fern::Output::writer(Box::new(io::sink()), "");
            let (_, void_logger) = c.fern_logger().chain(void_output).into_log();
            void_logger
        }

        fn enabled(logger: &dyn log::Log, target: &str, level: LL) -> bool {
            logger.enabled(
                &log::Metadata::builder().target(target).level(level).build()
            )
        }

        let logger = void_logger(
            "storage_uri = \"memory:\"\n\
             log_level = \"trace\"\n\
             log_type = \"stderr\"\n"
        );
        assert!(enabled(logger.as_ref(), "hklstore", LL::Trace));
        assert!(enabled(logger.as_ref(), "r2d2", LL::Warn));
        assert!(!enabled(logger.as_ref(), "r2d2", LL::Info));
        assert!(!enabled(
            logger.as_ref(), "hklstore::commons::storage::backends::disk",
            LL::Trace
        ));
        assert!(enabled(
            logger.as_ref(), "hklstore::commons::storage::backends::disk",
            LL::Debug
        ));

        let logger = void_logger(
            "storage_uri = \"memory:\"\n\
             log_level = \"error\"\n\
             log_type = \"stderr\"\n"
        );
        assert!(enabled(logger.as_ref(), "hklstore", LL::Error));
        assert!(!enabled(logger.as_ref(), "hklstore", LL::Warn));
        assert!(!enabled(
            logger.as_ref(), "hklstore::commons::storage::backends", LL::Warn
        ));
    }
}
