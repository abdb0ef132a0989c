//! Configuration module
//!
//! Server, metadata store, blob storage and worker pool settings, loaded from the
//! environment (a `.env` file is honoured in development).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 8080;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_FILE_SIZE_MB: usize = 100;
const LOCAL_STORAGE_PATH: &str = "./data";
const WORKER_COUNT: usize = 5;
const JOB_QUEUE_CAPACITY: usize = 100;
const ENQUEUE_TIMEOUT_MS: u64 = 2000;
const SHUTDOWN_TIMEOUT_SECS: u64 = 5;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Where file metadata records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataBackend {
    Postgres,
    Memory,
}

impl FromStr for MetadataBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(MetadataBackend::Postgres),
            "memory" => Ok(MetadataBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid metadata backend: {}", s)),
        }
    }
}

/// Console log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub log_format: LogFormat,
    pub cors_origins: Vec<String>,
    pub http_concurrency_limit: usize,
    // Metadata store
    pub metadata_backend: MetadataBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Blob storage
    pub storage_backend: StorageBackend,
    pub local_storage_path: String,
    pub max_file_size_bytes: usize,
    // Worker pool
    pub worker_count: usize,
    pub job_queue_capacity: usize,
    pub enqueue_timeout_ms: u64,
    pub shutdown_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup (the environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let metadata_backend = match lookup("METADATA_BACKEND") {
            Some(value) => value.parse()?,
            None if database_url.is_some() => MetadataBackend::Postgres,
            None => MetadataBackend::Memory,
        };

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => StorageBackend::Local,
        };

        let log_format = match lookup("LOG_FORMAT").map(|s| s.to_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_file_size_mb = lookup("MAX_FILE_SIZE_MB")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(MAX_FILE_SIZE_MB);
        let max_file_size_bytes = max_file_size_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| anyhow::anyhow!("MAX_FILE_SIZE_MB is too large"))?;

        let config = Config {
            server_port: lookup("PORT")
                .unwrap_or_else(|| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            log_format,
            cors_origins,
            http_concurrency_limit: lookup("HTTP_CONCURRENCY_LIMIT")
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(HTTP_CONCURRENCY_LIMIT)
                .max(1),
            metadata_backend,
            database_url,
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: lookup("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            local_storage_path: lookup("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|| LOCAL_STORAGE_PATH.to_string()),
            max_file_size_bytes,
            worker_count: lookup("WORKER_COUNT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(WORKER_COUNT),
            job_queue_capacity: lookup("JOB_QUEUE_CAPACITY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(JOB_QUEUE_CAPACITY),
            enqueue_timeout_ms: lookup("ENQUEUE_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(ENQUEUE_TIMEOUT_MS),
            shutdown_timeout_secs: lookup("SHUTDOWN_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(SHUTDOWN_TIMEOUT_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.worker_count == 0 {
            return Err(anyhow::anyhow!("WORKER_COUNT must be at least 1"));
        }

        if self.job_queue_capacity == 0 {
            return Err(anyhow::anyhow!("JOB_QUEUE_CAPACITY must be at least 1"));
        }

        if self.metadata_backend == MetadataBackend::Postgres {
            match self.database_url.as_deref() {
                Some(url) if url.starts_with("postgresql://") || url.starts_with("postgres://") => {}
                Some(_) => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ))
                }
                None => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be set when METADATA_BACKEND=postgres"
                    ))
                }
            }
        }

        if self.is_production() && self.metadata_backend == MetadataBackend::Memory {
            return Err(anyhow::anyhow!(
                "The in-memory metadata backend cannot be used in production"
            ));
        }

        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_empty() {
            return Err(anyhow::anyhow!(
                "LOCAL_STORAGE_PATH must be set when using local storage backend"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_any_variables() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.worker_count, 5);
        assert_eq!(config.job_queue_capacity, 100);
        assert_eq!(config.metadata_backend, MetadataBackend::Memory);
        assert_eq!(config.storage_backend, StorageBackend::Local);
        assert_eq!(config.local_storage_path, "./data");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Compact);
        assert_eq!(config.cors_origins, vec!["*".to_string()]);
        assert_eq!(config.max_file_size_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn database_url_selects_postgres() {
        let config = load(&[("DATABASE_URL", "postgresql://u:p@localhost/filedrop")]).unwrap();
        assert_eq!(config.metadata_backend, MetadataBackend::Postgres);
    }

    #[test]
    fn postgres_without_url_is_rejected() {
        let err = load(&[("METADATA_BACKEND", "postgres")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(load(&[("WORKER_COUNT", "0")]).is_err());
        assert!(load(&[("JOB_QUEUE_CAPACITY", "0")]).is_err());
    }

    #[test]
    fn memory_metadata_is_rejected_in_production() {
        let err = load(&[("ENVIRONMENT", "production")]).unwrap_err();
        assert!(err.to_string().contains("production"));
    }

    #[test]
    fn oversized_upload_limit_is_rejected() {
        let huge = usize::MAX.to_string();
        let err = load(&[("MAX_FILE_SIZE_MB", huge.as_str())]).unwrap_err();
        assert!(err.to_string().contains("MAX_FILE_SIZE_MB"));

        let config = load(&[("MAX_FILE_SIZE_MB", "3")]).unwrap();
        assert_eq!(config.max_file_size_bytes, 3 * 1024 * 1024);
    }

    #[test]
    fn worker_settings_are_read() {
        let config = load(&[
            ("WORKER_COUNT", "3"),
            ("JOB_QUEUE_CAPACITY", "7"),
            ("ENQUEUE_TIMEOUT_MS", "250"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.job_queue_capacity, 7);
        assert_eq!(config.enqueue_timeout(), Duration::from_millis(250));
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
