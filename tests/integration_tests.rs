use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use kube_usage_meter::{
    aggregate_reports, parse_quantity, scan, AggregatedUsage, CommandRunner, MeteringError,
    MetricKind, MetricsWriter, NamespaceReportAggregator, RawReport, ReportKind, ReportLayout,
    RunReport, SeriesPoint, SeriesPointBuffer,
};

/// Serves canned reports per (namespace, kind).
#[derive(Default)]
struct FakeCluster {
    reports: HashMap<(String, ReportKind), RawReport>,
}

impl FakeCluster {
    fn with(mut self, ns: &str, kind: ReportKind, report: RawReport) -> Self {
        self.reports.insert((ns.to_string(), kind), report);
        self
    }
}

#[async_trait]
impl CommandRunner for FakeCluster {
    async fn run(&self, kind: ReportKind, namespace: &str) -> Result<RawReport, MeteringError> {
        Ok(self
            .reports
            .get(&(namespace.to_string(), kind))
            .cloned()
            .unwrap_or_else(|| RawReport {
                stdout: String::new(),
                stderr: format!("No resources found in {} namespace.", namespace),
                succeeded: true,
            }))
    }
}

#[derive(Default)]
struct MemoryStore {
    batches: Mutex<Vec<Vec<SeriesPoint>>>,
}

#[async_trait]
impl MetricsWriter for MemoryStore {
    async fn write_points(&self, points: &[SeriesPoint]) -> Result<(), MeteringError> {
        self.batches.lock().unwrap().push(points.to_vec());
        Ok(())
    }
}

fn tuples(points: &[SeriesPoint]) -> Vec<(String, u64, u64, f64, u64)> {
    points
        .iter()
        .map(|p| {
            let f = &p.fields;
            (f.namespace.clone(), f.cpu, f.mem, f.storage, f.pvc)
        })
        .collect()
}

#[test]
fn test_stride_over_json_echo_tokens() {
    let tokens = vec![
        "{\"args\":", "[\"oc", "adm", "top", "pods\"],", "\"stdout\":", "\"NAME",
        "CPU(cores)", "MEMORY(bytes)", "podA", "100m", "256Mi", "podB", "50m", "128Mi",
        "\"stderr\":", "\"\"}",
    ];
    let layout: &ReportLayout = ReportKind::Compute.layout();
    let records = scan(tokens, layout).unwrap();

    let cpu: u64 = records
        .iter()
        .map(|r| parse_quantity(MetricKind::Cpu, r.value(MetricKind::Cpu).unwrap()).unwrap().unwrap().as_u64())
        .sum();
    let mem: u64 = records
        .iter()
        .map(|r| parse_quantity(MetricKind::Memory, r.value(MetricKind::Memory).unwrap()).unwrap().unwrap().as_u64())
        .sum();
    assert_eq!(cpu, 150);
    assert_eq!(mem, 384);
}

#[test]
fn test_unit_stripping_examples() {
    let q = |kind, token| parse_quantity(kind, token).unwrap().unwrap();
    assert_eq!(q(MetricKind::Cpu, "500m").as_u64(), 500);
    assert_eq!(q(MetricKind::Memory, "512Mi").as_u64(), 512);
    assert_eq!(q(MetricKind::PersistentVolume, "10Gi").as_u64(), 10);
    assert_eq!(q(MetricKind::ImageStorage, "3.5Mi").as_f64(), 3.5);
}

#[test]
fn test_rejected_image_unit_keeps_alignment() {
    let images = RawReport::success(
        "NAME STORAGE IMAGES LAYERS\n\
         alpha 2MiB 1 3\n\
         beta 940B 1 1\n\
         gamma 0.5MiB 1 2\n\
         delta 812B 2 2\n\
         epsilon 1.5MiB 4 12\n",
    );
    let none = RawReport {
        stdout: String::new(),
        stderr: "No resources found".to_string(),
        succeeded: true,
    };
    let usage = aggregate_reports("ns", &none, &none, &images).unwrap();
    assert_eq!(usage.storage_mib, 4.0);
}

#[test]
fn test_sentinel_ignores_stdout() {
    let report = RawReport {
        stdout: "NAME CPU(cores) MEMORY(bytes)\npod 10m 1Mi\n".to_string(),
        stderr: "No resources found in ns namespace.".to_string(),
        succeeded: true,
    };
    let usage = aggregate_reports("ns", &report, &report, &report).unwrap();
    assert_eq!(usage, AggregatedUsage { namespace: "ns".to_string(), ..Default::default() });
}

#[tokio::test]
async fn test_run_over_namespaces_with_bulk_flush() {
    let cluster = FakeCluster::default()
        .with("minio-test", ReportKind::Compute, RawReport::success(
            "NAME CPU(cores) MEMORY(bytes)\nminio-0 100m 256Mi\nminio-1 50m 128Mi\n",
        ))
        .with("minio-test", ReportKind::Pvc, RawReport::success(
            "PVC STORAGE\ndata-minio-0 10Gi\n",
        ))
        .with("minio-test", ReportKind::ImageStream, RawReport::success(
            "NAME STORAGE IMAGES LAYERS\nminio 3.5MiB 2 7\n",
        ))
        .with("billing", ReportKind::Compute, RawReport::success(
            "NAME CPU(cores) MEMORY(bytes)\napi-0 20m 64Mi\n",
        ))
        .with("broken", ReportKind::Pvc, RawReport::success(
            "NAME SIZE\nclaim 1Gi\n",
        ));

    let aggregator = NamespaceReportAggregator::new(&cluster);
    let mut buffer = SeriesPointBuffer::new(MemoryStore::default(), 2);
    let mut report = RunReport::new();

    for ns in ["minio-test", "broken", "billing", "idle"] {
        match aggregator.aggregate(ns).await {
            Ok(usage) => {
                buffer.append(SeriesPoint::from_usage(&usage)).await.unwrap();
                report.add_usage(usage);
            }
            Err(e) => report.add_failure(ns, e),
        }
    }

    // two points auto-flushed, one still pending
    assert_eq!(buffer.writer().batches.lock().unwrap().len(), 1);
    let pending: Vec<SeriesPoint> = serde_json::from_value(buffer.peek_pending_body()).unwrap();
    assert_eq!(tuples(&pending), vec![("idle".to_string(), 0, 0, 0.0, 0)]);

    buffer.flush().await.unwrap();
    assert!(buffer.is_empty());

    let batches = buffer.writer().batches.lock().unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(
        tuples(&batches[0]),
        vec![
            ("minio-test".to_string(), 150, 384, 3.5, 10),
            ("billing".to_string(), 20, 64, 0.0, 0),
        ]
    );

    report.finish();
    let summary = report.summary();
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(report.failures[0].namespace, "broken");
    assert!(report.failures[0].error.contains("STORAGE"));
}

#[test]
fn test_peek_body_round_trip() {
    let usages = vec![
        AggregatedUsage {
            namespace: "a".to_string(),
            cpu_milli: 1,
            mem_mib: 2,
            storage_mib: 0.25,
            pvc_gib: 3,
        },
        AggregatedUsage {
            namespace: "b".to_string(),
            cpu_milli: 400,
            mem_mib: 1024,
            storage_mib: 17.75,
            pvc_gib: 50,
        },
    ];

    let mut buffer = SeriesPointBuffer::new(MemoryStore::default(), 10);
    tokio_test::block_on(async {
        for u in &usages {
            buffer.append(SeriesPoint::from_usage(u)).await.unwrap();
        }
    });

    let decoded: Vec<SeriesPoint> = serde_json::from_value(buffer.peek_pending_body()).unwrap();
    let expected: Vec<_> = usages
        .iter()
        .map(|u| (u.namespace.clone(), u.cpu_milli, u.mem_mib, u.storage_mib, u.pvc_gib))
        .collect();
    assert_eq!(tuples(&decoded), expected);
    assert_eq!(buffer.len(), 2);
    assert!(buffer.writer().batches.lock().unwrap().is_empty());
}

#[test]
fn test_threshold_minus_one_never_flushes() {
    let mut buffer = SeriesPointBuffer::new(MemoryStore::default(), 4);
    tokio_test::block_on(async {
        for i in 0..3 {
            let usage = AggregatedUsage { namespace: format!("ns{}", i), ..Default::default() };
            buffer.append(SeriesPoint::from_usage(&usage)).await.unwrap();
        }
    });
    assert_eq!(buffer.len(), 3);
    assert!(buffer.writer().batches.lock().unwrap().is_empty());

    tokio_test::block_on(async {
        let usage = AggregatedUsage { namespace: "ns3".to_string(), ..Default::default() };
        buffer.append(SeriesPoint::from_usage(&usage)).await.unwrap();
    });
    assert!(buffer.is_empty());
    assert_eq!(buffer.writer().batches.lock().unwrap().len(), 1);
}
