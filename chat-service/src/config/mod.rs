use secrecy::SecretString;
use service_core::config::{self as core_config, get_env, split_list, Environment};
use service_core::error::AppError;
use service_core::middleware::CorsPolicy;
use std::env;
use std::time::Duration;

use crate::services::responder::dialogflow::DIALOGFLOW_API_BASE;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub store: StoreConfig,
    pub responder: ResponderConfig,
    pub cors: CorsPolicy,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct ResponderConfig {
    pub kind: ResponderKind,
    pub project_id: Option<String>,
    pub access_token: Option<SecretString>,
    pub endpoint: String,
    pub language_code: String,
    pub upstream_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderKind {
    Pattern,
    Dialogflow,
}

impl ChatConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let mut common = core_config::Config::load()?;
        if let Ok(level) = env::var("LOG_LEVEL") {
            common.log_level = level;
        }

        let environment = Environment::current();
        let is_prod = environment.is_prod();

        let store = StoreConfig {
            backend: get_env("CHAT_STORE_BACKEND", Some("memory"), false)?
                .parse()
                .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            database_url: env::var("DATABASE_URL").ok(),
            max_connections: parse_number("DATABASE_MAX_CONNECTIONS", 10)?,
            min_connections: parse_number("DATABASE_MIN_CONNECTIONS", 1)?,
        };
        if store.backend == StoreBackend::Postgres && store.database_url.is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_URL is required when CHAT_STORE_BACKEND=postgres"
            )));
        }

        let responder = ResponderConfig {
            kind: get_env("CHAT_RESPONDER", Some("pattern"), false)?
                .parse()
                .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            project_id: env::var("DIALOGFLOW_PROJECT_ID").ok().filter(|v| !v.is_empty()),
            access_token: env::var("DIALOGFLOW_ACCESS_TOKEN")
                .ok()
                .filter(|v| !v.is_empty())
                .map(SecretString::new),
            endpoint: get_env("DIALOGFLOW_ENDPOINT", Some(DIALOGFLOW_API_BASE), false)?,
            language_code: get_env("CHAT_LANGUAGE_CODE", Some("es"), false)?,
            upstream_timeout: Duration::from_millis(parse_number("CHAT_UPSTREAM_TIMEOUT_MS", 5000)?),
        };
        if responder.kind == ResponderKind::Dialogflow
            && (responder.project_id.is_none() || responder.access_token.is_none())
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DIALOGFLOW_PROJECT_ID and DIALOGFLOW_ACCESS_TOKEN are required when CHAT_RESPONDER=dialogflow"
            )));
        }

        let cors = CorsPolicy {
            allow_any: environment == Environment::Development,
            origins: split_list(&get_env(
                "CORS_ALLOWED_ORIGINS",
                Some("http://localhost:3000,http://localhost:5173"),
                false,
            )?),
            origin_suffixes: split_list(&get_env(
                "CORS_ALLOWED_ORIGIN_SUFFIXES",
                Some(".vercel.app"),
                false,
            )?),
        };
        if is_prod && cors.origins.is_empty() && cors.origin_suffixes.is_empty() {
            tracing::warn!("No CORS origins configured; browsers will be refused");
        }

        Ok(ChatConfig {
            common,
            environment,
            store,
            responder,
            cors,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
        })
    }

    /// Configuration for tests and embedding: in-memory store, pattern
    /// responder, any free port, localhost and preview-domain CORS.
    pub fn for_tests() -> Self {
        ChatConfig {
            common: core_config::Config {
                port: 0,
                log_level: "info".to_string(),
            },
            environment: Environment::Dev,
            store: StoreConfig {
                backend: StoreBackend::Memory,
                database_url: None,
                max_connections: 5,
                min_connections: 1,
            },
            responder: ResponderConfig {
                kind: ResponderKind::Pattern,
                project_id: None,
                access_token: None,
                endpoint: DIALOGFLOW_API_BASE.to_string(),
                language_code: "es".to_string(),
                upstream_timeout: Duration::from_millis(5000),
            },
            cors: CorsPolicy {
                allow_any: false,
                origins: vec!["http://localhost:5173".to_string()],
                origin_suffixes: vec![".vercel.app".to_string()],
            },
            otlp_endpoint: None,
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

impl std::str::FromStr for ResponderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pattern" => Ok(ResponderKind::Pattern),
            "dialogflow" => Ok(ResponderKind::Dialogflow),
            _ => Err(format!("Invalid responder: {}", s)),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!("{} must be a number, got {:?}", key, raw))
        }),
        Err(_) => Ok(default),
    }
}
