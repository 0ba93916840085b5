use serde::Serialize;
use thiserror::Error;

pub const THROUGHPUT_MARKER: &str = "Throughput (ops/s)";
pub const INGESTION_MARKER: &str = "Initialization complete in (s)";
pub const CRASH_SIGNATURE: &str = "Exception";

// Word positions on the ingestion timing line when split on single spaces.
const SECONDS_WORD: usize = 4;
const OPERATIONS_WORD: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Throughput,
    IngestionRate,
}

impl MetricKind {
    pub fn marker(self) -> &'static str {
        match self {
            MetricKind::Throughput => THROUGHPUT_MARKER,
            MetricKind::IngestionRate => INGESTION_MARKER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("crash_signature: stdout contains \"Exception\"")]
    CrashSignature,
    #[error("metric_absent: no line contains \"{marker}\"")]
    MetricAbsent { marker: &'static str },
    #[error("metric_unparseable: {reason} in line {line:?}")]
    Unparseable { line: String, reason: String },
}

pub fn extract_metric(stdout: &str, kind: MetricKind) -> Result<f64, ExtractError> {
    if stdout.contains(CRASH_SIGNATURE) {
        return Err(ExtractError::CrashSignature);
    }
    let marker = kind.marker();
    let line = stdout
        .lines()
        .find(|l| l.contains(marker))
        .ok_or(ExtractError::MetricAbsent { marker })?;
    match kind {
        MetricKind::Throughput => parse_tab_metric(line),
        MetricKind::IngestionRate => parse_timing_rate(line),
    }
}

fn parse_tab_metric(line: &str) -> Result<f64, ExtractError> {
    let field = line
        .split('\t')
        .nth(1)
        .ok_or_else(|| unparseable(line, "no tab-separated value".to_string()))?;
    parse_number(line, field)
}

fn parse_timing_rate(line: &str) -> Result<f64, ExtractError> {
    let words: Vec<&str> = line.split(' ').collect();
    let word = |idx: usize| {
        words
            .get(idx)
            .copied()
            .ok_or_else(|| unparseable(line, format!("missing word {}", idx)))
    };
    let seconds = parse_number(line, word(SECONDS_WORD)?)?;
    let operations = parse_number(line, word(OPERATIONS_WORD)?)?;
    let rate = operations / seconds;
    if !rate.is_finite() {
        return Err(unparseable(
            line,
            format!("rate {} / {} is not finite", operations, seconds),
        ));
    }
    Ok(rate)
}

fn parse_number(line: &str, field: &str) -> Result<f64, ExtractError> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|e| unparseable(line, format!("{:?}: {}", field, e)))
}

fn unparseable(line: &str, reason: String) -> ExtractError {
    ExtractError::Unparseable {
        line: line.to_string(),
        reason,
    }
}
