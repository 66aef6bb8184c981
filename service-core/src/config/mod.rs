use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Deployment environment, read from `ENVIRONMENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Dev,
    Prod,
}

impl Environment {
    pub fn current() -> Self {
        Self::parse(&env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()))
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Environment::Prod,
            "development" => Environment::Development,
            _ => Environment::Dev,
        }
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Environment::Prod)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }
}

/// Reads `key` from the process environment.
///
/// In production every key is mandatory. Outside production a missing key
/// falls back to `default`, and a missing key without a default is an error.
pub fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

/// Splits a comma separated list, dropping blanks.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parsing_is_lenient() {
        assert_eq!(Environment::parse("PROD"), Environment::Prod);
        assert_eq!(Environment::parse("production"), Environment::Prod);
        assert_eq!(Environment::parse("development"), Environment::Development);
        assert_eq!(Environment::parse("staging"), Environment::Dev);
    }

    #[test]
    fn split_list_trims_and_skips_blanks() {
        assert_eq!(
            split_list(" http://a.test , ,http://b.test,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn get_env_uses_default_outside_prod() {
        let value = get_env("SERVICE_CORE_TEST_UNSET_KEY", Some("fallback"), false).unwrap();
        assert_eq!(value, "fallback");
        assert!(get_env("SERVICE_CORE_TEST_UNSET_KEY", Some("fallback"), true).is_err());
        assert!(get_env("SERVICE_CORE_TEST_UNSET_KEY", None, false).is_err());
    }
}
