use crate::error::MeteringError;
use crate::types::{MetricKind, Quantity};

/// How a matched suffix converts into the canonical unit of its kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    Whole(u64),
    Fractional(f64),
    /// Recognised unit that this metric does not accept; the value is skipped.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitRule {
    pub kind: MetricKind,
    pub suffix: &'static str,
    pub scale: Scale,
}

const fn rule(kind: MetricKind, suffix: &'static str, scale: Scale) -> UnitRule {
    UnitRule { kind, suffix, scale }
}

// Order matters: longer suffixes must come before their tails ("MiB" before "Mi" and "B").
pub const UNIT_RULES: &[UnitRule] = &[
    rule(MetricKind::Cpu, "m", Scale::Whole(1)),
    rule(MetricKind::Memory, "Mi", Scale::Whole(1)),
    rule(MetricKind::Memory, "Gi", Scale::Whole(1024)),
    rule(MetricKind::PersistentVolume, "Gi", Scale::Whole(1)),
    rule(MetricKind::PersistentVolume, "Ti", Scale::Whole(1024)),
    rule(MetricKind::ImageStorage, "MiB", Scale::Fractional(1.0)),
    rule(MetricKind::ImageStorage, "GiB", Scale::Fractional(1024.0)),
    rule(MetricKind::ImageStorage, "KiB", Scale::Fractional(1.0 / 1024.0)),
    rule(MetricKind::ImageStorage, "Mi", Scale::Fractional(1.0)),
    rule(MetricKind::ImageStorage, "B", Scale::Reject),
];

/// Rules that apply to `kind`, in match order.
pub fn rules_for(kind: MetricKind) -> impl Iterator<Item = &'static UnitRule> {
    UNIT_RULES.iter().filter(move |r| r.kind == kind)
}

/// Parse a unit-suffixed token into the canonical unit for `kind`.
///
/// Returns `Ok(None)` when the suffix names a unit the metric rejects.
/// Any other token that fails to parse is reported, never read as zero.
pub fn parse_quantity(kind: MetricKind, token: &str) -> Result<Option<Quantity>, MeteringError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(MeteringError::malformed(kind, token, "empty value"));
    }

    let Some((rule, number)) = rules_for(kind)
        .find_map(|r| token.strip_suffix(r.suffix).map(|n| (r, n)))
    else {
        return Err(MeteringError::malformed(kind, token, "unrecognised unit suffix"));
    };

    match rule.scale {
        Scale::Reject => Ok(None),
        Scale::Whole(mul) => {
            let v: u64 = number
                .parse()
                .map_err(|e| MeteringError::malformed(kind, token, format!("{}", e)))?;
            v.checked_mul(mul)
                .map(|v| Some(Quantity::Whole(v)))
                .ok_or_else(|| MeteringError::malformed(kind, token, "value out of range"))
        }
        Scale::Fractional(mul) => {
            let v: f64 = number
                .parse()
                .map_err(|e| MeteringError::malformed(kind, token, format!("{}", e)))?;
            if !v.is_finite() || v < 0.0 {
                return Err(MeteringError::malformed(kind, token, "not a non-negative number"));
            }
            Ok(Some(Quantity::Fractional(v * mul)))
        }
    }
}
