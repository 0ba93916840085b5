use crate::trial::TrialBatch;
use anyhow::Result;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepAxis {
    Threads,
    DataSize,
    Heap,
}

impl SweepAxis {
    pub fn as_str(self) -> &'static str {
        match self {
            SweepAxis::Threads => "threads",
            SweepAxis::DataSize => "data_size",
            SweepAxis::Heap => "heap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepEntry {
    pub key: u64,
    pub aggregated: u8,
    pub batch: TrialBatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResult {
    pub axis: SweepAxis,
    pub entries: Vec<SweepEntry>,
}

impl SweepResult {
    pub fn new(axis: SweepAxis) -> Self {
        Self {
            axis,
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, key: u64, batch: TrialBatch) {
        let aggregated = batch.aggregated();
        self.entries.push(SweepEntry {
            key,
            aggregated,
            batch,
        });
    }

    pub fn get(&self, key: u64) -> Option<u8> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.aggregated)
    }

    pub fn batch(&self, key: u64) -> Option<&TrialBatch> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.batch)
    }

    pub fn keys(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.key).collect()
    }

    pub fn sentinels(&self) -> Vec<(u64, u8)> {
        self.entries.iter().map(|e| (e.key, e.aggregated)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Visits `points` strictly in order and records what `run_point` returns for
/// each. Nothing is kept if the sweep is interrupted.
pub fn run_sweep<P, F>(axis: SweepAxis, points: &[(u64, P)], mut run_point: F) -> Result<SweepResult>
where
    F: FnMut(u64, &P) -> Result<TrialBatch>,
{
    let mut result = SweepResult::new(axis);
    for (i, (key, point)) in points.iter().enumerate() {
        info!(
            axis = axis.as_str(),
            key,
            "sweep point {}/{}",
            i + 1,
            points.len()
        );
        let batch = run_point(*key, point)?;
        result.insert(*key, batch);
    }
    Ok(result)
}
