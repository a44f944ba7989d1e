use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use crate::scanner::NO_RESOURCES_PHRASE;
use crate::types::{Config, InfluxConfig, RetentionConfig};

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let namespaces = env.get_var("NAMESPACES").unwrap_or_default();
    let namespaces: Vec<String> = namespaces
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if namespaces.is_empty() {
        return Err(anyhow!("NAMESPACES env var must be set (comma-separated)"));
    }

    let bulk_size: usize = env.get_var("BULK_SIZE")
        .unwrap_or_else(|| "5".to_string())
        .parse()
        .context("Invalid BULK_SIZE")?;
    if bulk_size == 0 {
        return Err(anyhow!("BULK_SIZE must be at least 1"));
    }

    let oc_binary = var_or(env, "OC_BINARY", "oc");
    let no_resources_phrase = var_or(env, "NO_RESOURCES_PHRASE", NO_RESOURCES_PHRASE);

    let influx = InfluxConfig {
        url: var_or(env, "INFLUX_URL", "http://localhost:8086"),
        user: var_or(env, "INFLUX_USER", "root"),
        password: var_or(env, "INFLUX_PASSWORD", "root"),
        database: var_or(env, "INFLUX_DATABASE", "mydb"),
    };

    let replication: u32 = env.get_var("RETENTION_REPLICATION")
        .unwrap_or_else(|| "3".to_string())
        .parse()
        .context("Invalid RETENTION_REPLICATION")?;
    let retention = RetentionConfig {
        name: var_or(env, "RETENTION_POLICY", "metering_policy"),
        duration: var_or(env, "RETENTION_DURATION", "60d"),
        replication,
    };

    let provision_database = env.get_var("PROVISION_DATABASE")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(true);

    Ok(Config {
        namespaces,
        bulk_size,
        oc_binary,
        no_resources_phrase,
        influx,
        retention,
        provision_database,
    })
}

fn var_or<E: EnvironmentProvider>(env: &E, key: &str, default: &str) -> String {
    env.get_var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
