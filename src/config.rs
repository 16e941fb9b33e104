use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

pub static CONFIG: OnceCell<Config> = OnceCell::new();

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub storefront: String,
    pub rusqlite: String,
}

impl LoggingConfig {
    const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    const STOREFRONT_LEVEL: &str = "info";
    const RUSQLITE_LEVEL: &str = "warn";

    fn default() -> Self {
        LoggingConfig {
            storefront: Self::STOREFRONT_LEVEL.to_string(),
            rusqlite: Self::RUSQLITE_LEVEL.to_string(),
        }
    }

    fn ensure_valid(&mut self) {
        Self::ensure_level("storefront", &mut self.storefront, Self::STOREFRONT_LEVEL);
        Self::ensure_level("rusqlite", &mut self.rusqlite, Self::RUSQLITE_LEVEL);
    }

    fn ensure_level(name: &str, level: &mut String, default: &str) {
        let str_original = level.clone();
        *level = level.trim().to_ascii_lowercase();
        if !Self::LOG_LEVELS.contains(&level.as_str()) {
            eprintln!(
                "Config error: {} log level of '{}' is invalid - using default of '{}'",
                name, str_original, default
            );
            *level = default.to_owned();
        }
    }

    /// Log specification in the form flexi_logger expects, e.g.
    /// `storefront=info, rusqlite=warn`
    pub fn log_spec(&self) -> String {
        format!("storefront={}, rusqlite={}", self.storefront, self.rusqlite)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    const HOST: &str = "127.0.0.1";
    const PORT: u16 = 8080;

    fn default() -> Self {
        ServerConfig {
            host: Self::HOST.to_owned(),
            port: Self::PORT,
        }
    }

    fn ensure_valid(&mut self) {
        if self.host.trim().is_empty() {
            eprintln!(
                "Config error: server host is empty - using default of '{}'",
                Self::HOST
            );
            self.host = Self::HOST.to_owned();
        }
        if self.port == 0 {
            eprintln!(
                "Config error: server port 0 is invalid - using default of '{}'",
                Self::PORT
            );
            self.port = Self::PORT;
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Database file. Relative paths resolve against the data directory.
    pub path: String,
    pub pool_size: u32,
}

impl DatabaseConfig {
    const PATH: &str = "storefront.db";
    const POOL_SIZE: u32 = 8;
    const MAX_POOL_SIZE: u32 = 64;

    fn default() -> Self {
        DatabaseConfig {
            path: Self::PATH.to_owned(),
            pool_size: Self::POOL_SIZE,
        }
    }

    fn ensure_valid(&mut self) {
        if self.path.trim().is_empty() {
            eprintln!(
                "Config error: database path is empty - using default of '{}'",
                Self::PATH
            );
            self.path = Self::PATH.to_owned();
        }
        if self.pool_size == 0 || self.pool_size > Self::MAX_POOL_SIZE {
            eprintln!(
                "Config error: pool size of '{}' is invalid - using default of '{}'",
                self.pool_size,
                Self::POOL_SIZE
            );
            self.pool_size = Self::POOL_SIZE;
        }
    }

    pub fn resolve_path(&self, data_dir: &std::path::Path) -> PathBuf {
        let path = PathBuf::from(&self.path);
        if path.is_absolute() {
            path
        } else {
            data_dir.join(path)
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl Config {
    const ENV_PREFIX: &str = "STOREFRONT_";

    pub fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Loads the configuration from a TOML file located in the app's data directory,
    /// then applies `STOREFRONT_` environment overrides (`__` separates sections).
    /// If the file is missing or fails to parse, defaults are used.
    /// Additionally, writes the default config to disk if no file exists.
    pub fn load_config(project_dirs: &ProjectDirs) -> Self {
        let config_path = project_dirs.data_local_dir().join("config.toml");
        let default_config = Config::default();

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    eprintln!(
                        "Failed to create configuration directory {}: {}",
                        parent.display(),
                        e
                    );
                }
            }
            if let Ok(toml_string) = toml::to_string_pretty(&default_config) {
                if let Err(e) = fs::write(&config_path, toml_string) {
                    eprintln!(
                        "Failed to write default config to {}: {}",
                        config_path.display(),
                        e
                    );
                }
            } else {
                eprintln!("Failed to serialize default config.");
            }
        }

        let figment = Self::figment(&default_config).merge(Toml::file(&config_path));
        let figment = figment.merge(Env::prefixed(Self::ENV_PREFIX).split("__"));

        let mut config = figment.extract().unwrap_or_else(|err| {
            eprintln!(
                "Could not load config file {}: {}. Using default configuration.",
                config_path.display(),
                err
            );
            default_config
        });

        config.ensure_valid();

        config
    }

    fn figment(defaults: &Config) -> Figment {
        Figment::from(Serialized::defaults(defaults.clone()))
    }

    /// Stores the loaded config for the life of the process. Later calls keep
    /// the first value.
    pub fn init(config: Config) -> &'static Config {
        CONFIG.get_or_init(|| config)
    }

    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::default)
    }

    fn ensure_valid(&mut self) {
        self.server.ensure_valid();
        self.database.ensure_valid();
        self.logging.ensure_valid();
    }
}
