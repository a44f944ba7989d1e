//! Scanning of whitespace-delimited CLI tables into fixed-width records.
//!
//! The token stream is walked by a small state machine: it seeks the header
//! marker, then groups every `width` tokens into one record until the trailer
//! marker or the end of the stream. A record is only emitted once all of its
//! columns have been seen, so a short row is an error instead of a shifted
//! read of the rows that follow.

use crate::error::MeteringError;
use crate::runner::ReportKind;
use crate::types::{MetricKind, RawReport, ResourceRecord};

/// Phrase printed on stderr by the CLI when a listing is empty.
pub const NO_RESOURCES_PHRASE: &str = "No resources found";

/// Escape prefix left on row names when output is echoed through JSON.
const ESCAPED_NEWLINE: &str = "\\n";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Column {
    Name,
    Value(MetricKind),
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportLayout {
    pub header: &'static str,
    pub trailer: Option<&'static str>,
    pub columns: &'static [Column],
}

pub const COMPUTE_LAYOUT: ReportLayout = ReportLayout {
    header: "MEMORY(bytes)",
    trailer: Some("\"stderr\":"),
    columns: &[
        Column::Name,
        Column::Value(MetricKind::Cpu),
        Column::Value(MetricKind::Memory),
    ],
};

pub const PVC_LAYOUT: ReportLayout = ReportLayout {
    header: "STORAGE",
    trailer: None,
    columns: &[Column::Name, Column::Value(MetricKind::PersistentVolume)],
};

// NAME STORAGE IMAGES LAYERS
pub const IMAGE_STREAM_LAYOUT: ReportLayout = ReportLayout {
    header: "LAYERS",
    trailer: None,
    columns: &[
        Column::Name,
        Column::Value(MetricKind::ImageStorage),
        Column::Ignored,
        Column::Ignored,
    ],
};

impl ReportLayout {
    /// Record stride in tokens.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    fn build_record(&self, fields: &[&str]) -> ResourceRecord {
        let mut name = String::new();
        let mut values = Vec::new();
        for (column, field) in self.columns.iter().zip(fields) {
            match column {
                Column::Name => name = strip_name_prefix(field).to_string(),
                Column::Value(kind) => values.push((*kind, field.to_string())),
                Column::Ignored => {}
            }
        }
        ResourceRecord { name, values }
    }
}

impl ReportKind {
    pub fn layout(self) -> &'static ReportLayout {
        match self {
            ReportKind::Compute => &COMPUTE_LAYOUT,
            ReportKind::Pvc => &PVC_LAYOUT,
            ReportKind::ImageStream => &IMAGE_STREAM_LAYOUT,
        }
    }
}

enum ScanState<'a> {
    SeekingHeader,
    InRecord(Vec<&'a str>),
    Done,
}

/// Lazily split raw output into tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

pub fn strip_name_prefix(name: &str) -> &str {
    name.strip_prefix(ESCAPED_NEWLINE).unwrap_or(name)
}

pub fn has_sentinel(report: &RawReport, sentinel: &str) -> bool {
    !sentinel.is_empty() && report.stderr.contains(sentinel)
}

/// Group tokens after `layout.header` into records of `layout.width()` tokens.
pub fn scan<'a, I>(tokens: I, layout: &ReportLayout) -> Result<Vec<ResourceRecord>, MeteringError>
where
    I: IntoIterator<Item = &'a str>,
{
    let width = layout.width();
    let mut records = Vec::new();
    let mut state = ScanState::SeekingHeader;

    for token in tokens {
        state = match state {
            ScanState::SeekingHeader if token == layout.header => {
                ScanState::InRecord(Vec::with_capacity(width))
            }
            ScanState::SeekingHeader => ScanState::SeekingHeader,
            ScanState::InRecord(fields) if layout.trailer == Some(token) => {
                if !fields.iter().all(|f| is_echo_residue(f)) {
                    ensure_complete(&fields, width)?;
                }
                ScanState::Done
            }
            ScanState::InRecord(mut fields) => {
                fields.push(token);
                if fields.len() == width {
                    records.push(layout.build_record(&fields));
                    fields.clear();
                }
                ScanState::InRecord(fields)
            }
            ScanState::Done => ScanState::Done,
        };
        if matches!(state, ScanState::Done) {
            break;
        }
    }

    match state {
        ScanState::SeekingHeader => Err(MeteringError::HeaderNotFound {
            header: layout.header.to_string(),
        }),
        ScanState::InRecord(fields) => {
            ensure_complete(&fields, width)?;
            Ok(records)
        }
        ScanState::Done => Ok(records),
    }
}

/// String-closing token left before the trailer in JSON-echoed output, e.g. `\n",`.
fn is_echo_residue(token: &str) -> bool {
    token.starts_with(ESCAPED_NEWLINE) && token.ends_with("\",")
}

fn ensure_complete(fields: &[&str], width: usize) -> Result<(), MeteringError> {
    if fields.is_empty() {
        Ok(())
    } else {
        Err(MeteringError::TruncatedRecord {
            expected: width,
            found: fields.len(),
        })
    }
}

/// Records of one report, honouring the "no resources" sentinel first.
pub fn scan_report(
    report: &RawReport,
    layout: &ReportLayout,
    sentinel: &str,
) -> Result<Vec<ResourceRecord>, MeteringError> {
    if has_sentinel(report, sentinel) {
        return Ok(Vec::new());
    }
    if !report.succeeded {
        return Err(MeteringError::CommandFailed(report.stderr.trim().to_string()));
    }
    if report.stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    scan(tokenize(&report.stdout), layout)
}
