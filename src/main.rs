use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use kube_usage_meter::{
    load_config, InfluxClient, NamespaceReportAggregator, OcCommandRunner, RunReport,
    SeriesPoint, SeriesPointBuffer,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cfg = load_config()?;
    info!("namespaces = {:?}", cfg.namespaces);

    let influx = InfluxClient::new(&cfg.influx)?;
    if cfg.provision_database {
        influx
            .provision(&cfg.retention)
            .await
            .context("provision influx database")?;
    }

    let runner = OcCommandRunner::new(&cfg.oc_binary);
    let aggregator = NamespaceReportAggregator::new(&runner)
        .with_sentinel(cfg.no_resources_phrase.clone());
    let mut buffer = SeriesPointBuffer::new(influx, cfg.bulk_size);
    let mut report = RunReport::new();

    for ns in &cfg.namespaces {
        info!("Collecting usage for namespace: {}", ns);
        let usage = match aggregator.aggregate(ns).await {
            Ok(usage) => usage,
            Err(e) => {
                error!("skipping namespace {}: {}", ns, e);
                report.add_failure(ns, e);
                continue;
            }
        };
        info!(
            "{}: cpu={}m mem={}Mi pvc={}Gi images={}MiB",
            ns, usage.cpu_milli, usage.mem_mib, usage.pvc_gib, usage.storage_mib
        );

        if let Err(e) = buffer.append(SeriesPoint::from_usage(&usage)).await {
            warn!("automatic flush failed, points stay buffered: {}", e);
        }
        report.add_usage(usage);
    }

    debug!("pending body = {}", buffer.peek_pending_body());
    buffer.flush().await.context("flush pending points")?;
    report.finish();

    let summary = report.summary();
    info!(
        "Metering run complete: {} namespaces written, {} failed",
        summary.processed, summary.failed
    );
    for failure in &report.failures {
        warn!("namespace {} failed: {}", failure.namespace, failure.error);
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
