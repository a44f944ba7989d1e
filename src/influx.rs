use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

use crate::buffer::MetricsWriter;
use crate::error::MeteringError;
use crate::types::{InfluxConfig, RetentionConfig, SeriesPoint};

/// InfluxDB 1.x HTTP client.
pub struct InfluxClient {
    http: reqwest::Client,
    url: String,
    user: String,
    password: String,
    database: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    error: Option<String>,
}

impl InfluxClient {
    pub fn new(cfg: &InfluxConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            url: cfg.url.trim_end_matches('/').to_string(),
            user: cfg.user.clone(),
            password: cfg.password.clone(),
            database: cfg.database.clone(),
        })
    }

    /// Create the database and make `retention` its default policy.
    pub async fn provision(&self, retention: &RetentionConfig) -> Result<()> {
        self.query(&create_database_statement(&self.database)).await?;
        self.query(&create_retention_policy_statement(&self.database, retention))
            .await?;
        info!(
            "database {} ready with retention policy {} ({}, replication {})",
            self.database, retention.name, retention.duration, retention.replication
        );
        Ok(())
    }

    async fn query(&self, statement: &str) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/query", self.url))
            .basic_auth(&self.user, Some(&self.password))
            .form(&[("q", statement)])
            .send()
            .await
            .with_context(|| format!("influx query `{}`", statement))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            error!("influx query failed: status={} body={}", status, text);
            return Err(anyhow!("influx query failed with status {}", status));
        }
        let parsed: QueryResponse =
            serde_json::from_str(&text).context("decode influx query response")?;
        if let Some(e) = parsed
            .error
            .or_else(|| parsed.results.into_iter().find_map(|r| r.error))
        {
            return Err(anyhow!("influx rejected `{}`: {}", statement, e));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsWriter for InfluxClient {
    async fn write_points(&self, points: &[SeriesPoint]) -> Result<(), MeteringError> {
        let body = encode_batch(points);
        let resp = self
            .http
            .post(format!("{}/write", self.url))
            .query(&[("db", self.database.as_str())])
            .basic_auth(&self.user, Some(&self.password))
            .body(body)
            .send()
            .await
            .map_err(|e| MeteringError::WriteFailed(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!("influx write failed: status={} body={}", status, text);
            return Err(MeteringError::WriteFailed(format!(
                "status {}: {}",
                status,
                text.trim()
            )));
        }
        Ok(())
    }
}

pub fn create_database_statement(database: &str) -> String {
    format!("CREATE DATABASE {}", quote_ident(database))
}

pub fn create_retention_policy_statement(database: &str, retention: &RetentionConfig) -> String {
    format!(
        "CREATE RETENTION POLICY {} ON {} DURATION {} REPLICATION {} DEFAULT",
        quote_ident(&retention.name),
        quote_ident(database),
        retention.duration,
        retention.replication
    )
}

fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Newline-separated line protocol for a batch.
pub fn encode_batch(points: &[SeriesPoint]) -> String {
    points
        .iter()
        .map(encode_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// One point in InfluxDB line protocol, without timestamp.
pub fn encode_line(point: &SeriesPoint) -> String {
    let f = &point.fields;
    format!(
        "{},project_name={} namespace={},cpu={}i,mem={}i,storage={},pvc={}i",
        escape_measurement(&point.measurement),
        escape_tag(&point.tags.project_name),
        quote_field(&f.namespace),
        f.cpu,
        f.mem,
        f.storage,
        f.pvc
    )
}

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_tag(s: &str) -> String {
    s.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

fn quote_field(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
