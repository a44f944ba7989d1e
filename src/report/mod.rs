use chrono::{DateTime, Utc};

use crate::types::AggregatedUsage;

/// Outcome of one metering run across all configured namespaces
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub usages: Vec<AggregatedUsage>,
    pub failures: Vec<NamespaceFailure>,
}

#[derive(Debug, Clone)]
pub struct NamespaceFailure {
    pub namespace: String,
    pub error: String,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            usages: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn add_usage(&mut self, usage: AggregatedUsage) {
        self.usages.push(usage);
    }

    pub fn add_failure(&mut self, namespace: &str, error: impl ToString) {
        self.failures.push(NamespaceFailure {
            namespace: namespace.to_string(),
            error: error.to_string(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Totals across every namespace that was metered
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            processed: self.usages.len(),
            failed: self.failures.len(),
            total_cpu_milli: self.usages.iter().map(|u| u.cpu_milli).sum(),
            total_mem_mib: self.usages.iter().map(|u| u.mem_mib).sum(),
            total_storage_mib: self.usages.iter().map(|u| u.storage_mib).sum(),
            total_pvc_gib: self.usages.iter().map(|u| u.pvc_gib).sum(),
            duration_ms: self
                .finished_at
                .map(|f| (f - self.started_at).num_milliseconds()),
        }
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RunSummary {
    pub processed: usize,
    pub failed: usize,
    pub total_cpu_milli: u64,
    pub total_mem_mib: u64,
    pub total_storage_mib: f64,
    pub total_pvc_gib: u64,
    pub duration_ms: Option<i64>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
