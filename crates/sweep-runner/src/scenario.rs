use crate::command::{BenchTarget, Configuration, WorkloadParams};
use crate::extract::MetricKind;
use crate::sizing::{OffHeapRule, INGESTION_SIZING, SCAN_PUT_SIZING};
use crate::sweep::SweepAxis;
use thiserror::Error;

const INGESTION_DATA_SIZES: &[u64] = &[
    1_000_000, 5_000_000, 10_000_000, 15_000_000, 20_000_000, 25_000_000,
];
const SCAN_PUT_THREADS: &[u32] = &[1, 2, 4, 8, 12];
const REV_INGESTION_BUDGETS: &[(u64, u64)] = &[(15, 11)];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sweep {
    Threads {
        heap_gb: u64,
        data_size: u64,
        offheap: OffHeapRule,
        threads: &'static [u32],
    },
    DataSizes {
        heap_gb: u64,
        threads: u32,
        offheap: OffHeapRule,
        sizes: &'static [u64],
    },
    /// (heap, off-heap) pairs in GB, always split with `OffHeapRule::Fixed`.
    HeapBudgets {
        data_size: u64,
        threads: u32,
        budgets: &'static [(u64, u64)],
    },
}

impl Sweep {
    pub fn axis(&self) -> SweepAxis {
        match self {
            Sweep::Threads { .. } => SweepAxis::Threads,
            Sweep::DataSizes { .. } => SweepAxis::DataSize,
            Sweep::HeapBudgets { .. } => SweepAxis::Heap,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioDef {
    pub name: &'static str,
    pub about: &'static str,
    pub target: BenchTarget,
    pub metric: MetricKind,
    pub workload: WorkloadParams,
    pub sweep: Sweep,
}

impl ScenarioDef {
    pub fn axis(&self) -> SweepAxis {
        self.sweep.axis()
    }

    fn point(
        &self,
        data_size: u64,
        threads: u32,
        heap_gb: u64,
        offheap: OffHeapRule,
    ) -> Configuration {
        Configuration {
            target: self.target,
            data_size,
            threads,
            heap_gb,
            offheap,
            workload: self.workload.clone(),
        }
    }

    pub fn configurations(&self) -> Vec<(u64, Configuration)> {
        match self.sweep {
            Sweep::Threads {
                heap_gb,
                data_size,
                offheap,
                threads,
            } => threads
                .iter()
                .map(|&t| (t as u64, self.point(data_size, t, heap_gb, offheap)))
                .collect(),
            Sweep::DataSizes {
                heap_gb,
                threads,
                offheap,
                sizes,
            } => sizes
                .iter()
                .map(|&d| (d, self.point(d, threads, heap_gb, offheap)))
                .collect(),
            Sweep::HeapBudgets {
                data_size,
                threads,
                budgets,
            } => budgets
                .iter()
                .map(|&(heap, offheap_gb)| {
                    let rule = OffHeapRule::Fixed { offheap_gb };
                    (heap, self.point(data_size, threads, heap, rule))
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    #[error("unknown_scenario: {name} (known: {known})")]
    Unknown { name: String, known: String },
    #[error("no_scenarios: at least one scenario name is required")]
    Empty,
}

pub fn scenarios() -> Vec<ScenarioDef> {
    vec![
        ScenarioDef {
            name: "ingestion",
            about: "initial load rate across data sizes",
            target: BenchTarget::Oak,
            metric: MetricKind::IngestionRate,
            workload: WorkloadParams::ingestion(10),
            sweep: Sweep::DataSizes {
                heap_gb: 32,
                threads: 1,
                offheap: OffHeapRule::Estimated(INGESTION_SIZING),
                sizes: INGESTION_DATA_SIZES,
            },
        },
        ScenarioDef {
            name: "ingestion_baseline",
            about: "initial load rate of the on-heap reference map",
            target: BenchTarget::Baseline,
            metric: MetricKind::IngestionRate,
            workload: WorkloadParams::ingestion(1000),
            sweep: Sweep::DataSizes {
                heap_gb: 32,
                threads: 1,
                offheap: OffHeapRule::Baseline,
                sizes: INGESTION_DATA_SIZES,
            },
        },
        ScenarioDef {
            name: "rev_ingestion",
            about: "initial load rate with an explicit off-heap budget",
            target: BenchTarget::Oak,
            metric: MetricKind::IngestionRate,
            workload: WorkloadParams::ingestion(10),
            sweep: Sweep::HeapBudgets {
                data_size: 10_000_000,
                threads: 1,
                budgets: REV_INGESTION_BUDGETS,
            },
        },
        ScenarioDef {
            name: "scan_put",
            about: "scan/put throughput across thread counts",
            target: BenchTarget::Oak,
            metric: MetricKind::Throughput,
            workload: WorkloadParams::scan_put(60000),
            sweep: Sweep::Threads {
                heap_gb: 32,
                data_size: 10_000_000,
                offheap: OffHeapRule::Estimated(SCAN_PUT_SIZING),
                threads: SCAN_PUT_THREADS,
            },
        },
        ScenarioDef {
            name: "scan_put_baseline",
            about: "scan/put throughput of the on-heap reference map",
            target: BenchTarget::Baseline,
            metric: MetricKind::Throughput,
            workload: WorkloadParams::scan_put(60000),
            sweep: Sweep::Threads {
                heap_gb: 32,
                data_size: 10_000_000,
                offheap: OffHeapRule::Baseline,
                threads: SCAN_PUT_THREADS,
            },
        },
    ]
}

pub fn lookup(name: &str) -> Result<ScenarioDef, ScenarioError> {
    let all = scenarios();
    let known = all.iter().map(|s| s.name).collect::<Vec<_>>().join(", ");
    all.into_iter()
        .find(|s| s.name == name)
        .ok_or_else(|| ScenarioError::Unknown {
            name: name.to_string(),
            known,
        })
}

pub fn select<S: AsRef<str>>(names: &[S]) -> Result<Vec<ScenarioDef>, ScenarioError> {
    if names.is_empty() {
        return Err(ScenarioError::Empty);
    }
    names.iter().map(|n| lookup(n.as_ref())).collect()
}
