use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone)]
pub struct Config {
    pub namespaces: Vec<String>,
    pub bulk_size: usize,
    pub oc_binary: String,
    pub no_resources_phrase: String,
    pub influx: InfluxConfig,
    pub retention: RetentionConfig,
    pub provision_database: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfluxConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetentionConfig {
    pub name: String,
    pub duration: String,
    pub replication: u32,
}

/// Kind of measurement carried by a value column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Cpu,
    Memory,
    PersistentVolume,
    ImageStorage,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Memory => "memory",
            MetricKind::PersistentVolume => "pvc",
            MetricKind::ImageStorage => "image storage",
        };
        f.write_str(s)
    }
}

/// A value normalized to the canonical unit of its metric kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quantity {
    Whole(u64),
    Fractional(f64),
}

impl Quantity {
    pub fn as_u64(self) -> u64 {
        match self {
            Quantity::Whole(v) => v,
            Quantity::Fractional(v) => v.round() as u64,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Quantity::Whole(v) => v as f64,
            Quantity::Fractional(v) => v,
        }
    }
}

/// Captured output of one CLI invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReport {
    pub stdout: String,
    pub stderr: String,
    pub succeeded: bool,
}

impl RawReport {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            succeeded: true,
        }
    }

    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            succeeded: false,
        }
    }
}

/// One row of tabular output, reduced to its name and measured columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    pub name: String,
    pub values: Vec<(MetricKind, String)>,
}

impl ResourceRecord {
    pub fn value(&self, kind: MetricKind) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, v)| v.as_str())
    }
}

/// Per-namespace totals for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedUsage {
    pub namespace: String,
    pub cpu_milli: u64,
    pub mem_mib: u64,
    pub storage_mib: f64,
    pub pvc_gib: u64,
}

pub const SERIES_NAME_TEMPLATE: &str = "usage.stats.{project_name}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointTags {
    pub project_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointFields {
    pub namespace: String,
    pub cpu: u64,
    pub mem: u64,
    pub storage: f64,
    pub pvc: u64,
}

/// Wire-ready form of an [`AggregatedUsage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub measurement: String,
    pub tags: PointTags,
    pub fields: PointFields,
}

impl SeriesPoint {
    pub fn from_usage(usage: &AggregatedUsage) -> Self {
        Self {
            measurement: SERIES_NAME_TEMPLATE.replace("{project_name}", &usage.namespace),
            tags: PointTags {
                project_name: usage.namespace.clone(),
            },
            fields: PointFields {
                namespace: usage.namespace.clone(),
                cpu: usage.cpu_milli,
                mem: usage.mem_mib,
                storage: usage.storage_mib,
                pvc: usage.pvc_gib,
            },
        }
    }
}

impl From<&AggregatedUsage> for SeriesPoint {
    fn from(usage: &AggregatedUsage) -> Self {
        SeriesPoint::from_usage(usage)
    }
}
