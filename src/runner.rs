use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::MeteringError;
use crate::types::RawReport;

/// The three CLI reports collected per namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Compute,
    Pvc,
    ImageStream,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [ReportKind::Compute, ReportKind::Pvc, ReportKind::ImageStream];

    /// CLI arguments producing this report for `namespace`.
    pub fn args(self, namespace: &str) -> Vec<String> {
        let mut args: Vec<String> = match self {
            ReportKind::Compute => vec!["adm".into(), "top".into(), "pods".into()],
            ReportKind::Pvc => vec!["get".into(), "pvc".into()],
            ReportKind::ImageStream => vec!["adm".into(), "top".into(), "imagestreams".into()],
        };
        args.push("--namespace".into());
        args.push(namespace.to_string());
        if self == ReportKind::Pvc {
            args.push("-o".into());
            args.push(
                "custom-columns=PVC:.metadata.name,STORAGE:.spec.resources.requests.storage".into(),
            );
        }
        args
    }
}

/// Runs one administrative report for a namespace.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, kind: ReportKind, namespace: &str) -> Result<RawReport, MeteringError>;
}

/// Invokes the `oc` binary directly, without a shell.
#[derive(Debug, Clone)]
pub struct OcCommandRunner {
    binary: String,
}

impl OcCommandRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

#[async_trait]
impl CommandRunner for OcCommandRunner {
    async fn run(&self, kind: ReportKind, namespace: &str) -> Result<RawReport, MeteringError> {
        let args = kind.args(namespace);
        debug!("running {} {}", self.binary, args.join(" "));
        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .await
            .map_err(|e| MeteringError::CommandFailed(format!("spawn {}: {}", self.binary, e)))?;

        Ok(RawReport {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            succeeded: output.status.success(),
        })
    }
}
