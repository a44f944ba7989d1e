use tracing::debug;

use crate::error::MeteringError;
use crate::parsing::parse_quantity;
use crate::runner::{CommandRunner, ReportKind};
use crate::scanner::{scan_report, NO_RESOURCES_PHRASE};
use crate::types::{AggregatedUsage, MetricKind, RawReport, ResourceRecord};

/// Collects the three reports for a namespace and sums them into one record.
pub struct NamespaceReportAggregator<'a, R: CommandRunner> {
    runner: &'a R,
    sentinel: String,
}

impl<'a, R: CommandRunner> NamespaceReportAggregator<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self {
            runner,
            sentinel: NO_RESOURCES_PHRASE.to_string(),
        }
    }

    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    /// Run every report for `namespace`; any failure fails the whole namespace.
    pub async fn aggregate(&self, namespace: &str) -> Result<AggregatedUsage, MeteringError> {
        let compute = self.runner.run(ReportKind::Compute, namespace).await?;
        let pvc = self.runner.run(ReportKind::Pvc, namespace).await?;
        let images = self.runner.run(ReportKind::ImageStream, namespace).await?;
        aggregate_reports_with_sentinel(namespace, &compute, &pvc, &images, &self.sentinel)
    }
}

pub fn aggregate_reports(
    namespace: &str,
    compute: &RawReport,
    pvc: &RawReport,
    images: &RawReport,
) -> Result<AggregatedUsage, MeteringError> {
    aggregate_reports_with_sentinel(namespace, compute, pvc, images, NO_RESOURCES_PHRASE)
}

pub fn aggregate_reports_with_sentinel(
    namespace: &str,
    compute: &RawReport,
    pvc: &RawReport,
    images: &RawReport,
    sentinel: &str,
) -> Result<AggregatedUsage, MeteringError> {
    let mut usage = AggregatedUsage {
        namespace: namespace.to_string(),
        ..Default::default()
    };

    let pods = scan_report(compute, ReportKind::Compute.layout(), sentinel)?;
    if pods.is_empty() {
        debug!("no pod resources found in {}", namespace);
    }
    usage.cpu_milli = sum_whole(&pods, MetricKind::Cpu)?;
    usage.mem_mib = sum_whole(&pods, MetricKind::Memory)?;

    let claims = scan_report(pvc, ReportKind::Pvc.layout(), sentinel)?;
    usage.pvc_gib = sum_whole(&claims, MetricKind::PersistentVolume)?;

    let streams = scan_report(images, ReportKind::ImageStream.layout(), sentinel)?;
    usage.storage_mib = sum_fractional(&streams, MetricKind::ImageStorage)?;

    Ok(usage)
}

fn sum_whole(records: &[ResourceRecord], kind: MetricKind) -> Result<u64, MeteringError> {
    let mut total: u64 = 0;
    for (record, raw) in values_of(records, kind) {
        match parse_quantity(kind, raw)? {
            Some(q) => total = total.saturating_add(q.as_u64()),
            None => debug!("skipping {} value {} for {}", kind, raw, record.name),
        }
    }
    Ok(total)
}

fn sum_fractional(records: &[ResourceRecord], kind: MetricKind) -> Result<f64, MeteringError> {
    let mut total = 0.0;
    for (record, raw) in values_of(records, kind) {
        match parse_quantity(kind, raw)? {
            Some(q) => total += q.as_f64(),
            None => debug!("skipping {} value {} for {}", kind, raw, record.name),
        }
    }
    Ok(total)
}

fn values_of(
    records: &[ResourceRecord],
    kind: MetricKind,
) -> impl Iterator<Item = (&ResourceRecord, &str)> {
    records
        .iter()
        .filter_map(move |r| r.value(kind).map(|v| (r, v)))
}
