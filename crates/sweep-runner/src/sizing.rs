use serde::Serialize;

// key + value
pub const BYTES_PER_ENTRY: u64 = 1000 + 100;

pub const BASELINE_OFFHEAP_GB: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GigabyteUnit {
    Decimal,
    Binary,
}

impl GigabyteUnit {
    pub fn bytes(self) -> f64 {
        match self {
            GigabyteUnit::Decimal => 1_000_000_000.0,
            GigabyteUnit::Binary => (1u64 << 30) as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizingConstants {
    pub bytes_per_entry: u64,
    pub gigabyte: GigabyteUnit,
    pub safety_factor: f64,
}

pub const SCAN_PUT_SIZING: SizingConstants = SizingConstants {
    bytes_per_entry: BYTES_PER_ENTRY,
    gigabyte: GigabyteUnit::Decimal,
    safety_factor: 1.3,
};

pub const INGESTION_SIZING: SizingConstants = SizingConstants {
    bytes_per_entry: BYTES_PER_ENTRY,
    gigabyte: GigabyteUnit::Binary,
    safety_factor: 1.1,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum OffHeapRule {
    Estimated(SizingConstants),
    Fixed { offheap_gb: u64 },
    Baseline,
}

/// On-heap and off-heap budgets in gigabytes. On-heap may come out
/// non-positive; it is forwarded as-is and the JVM rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedSizing {
    pub onheap_gb: i64,
    pub offheap_gb: i64,
}

pub fn estimate_offheap_gb(dataset_size: u64, constants: &SizingConstants) -> i64 {
    let bytes = dataset_size as f64 * constants.bytes_per_entry as f64;
    ((bytes / constants.gigabyte.bytes()) * constants.safety_factor).ceil() as i64
}

pub fn derive_sizing(dataset_size: u64, heap_gb: u64, rule: &OffHeapRule) -> DerivedSizing {
    let heap = heap_gb as i64;
    match rule {
        OffHeapRule::Estimated(constants) => {
            let offheap_gb = estimate_offheap_gb(dataset_size, constants);
            DerivedSizing {
                onheap_gb: heap - offheap_gb,
                offheap_gb,
            }
        }
        OffHeapRule::Fixed { offheap_gb } => DerivedSizing {
            onheap_gb: heap - *offheap_gb as i64,
            offheap_gb: *offheap_gb as i64,
        },
        OffHeapRule::Baseline => DerivedSizing {
            onheap_gb: heap,
            offheap_gb: BASELINE_OFFHEAP_GB,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_put_estimate_uses_decimal_gigabytes() {
        // 10M * 1100 B = 11 GB, * 1.3 = 14.3 -> 15
        assert_eq!(estimate_offheap_gb(10_000_000, &SCAN_PUT_SIZING), 15);
        let sizing = derive_sizing(10_000_000, 32, &OffHeapRule::Estimated(SCAN_PUT_SIZING));
        assert_eq!(sizing, DerivedSizing { onheap_gb: 17, offheap_gb: 15 });
    }

    #[test]
    fn ingestion_estimate_uses_binary_gigabytes() {
        // 1M * 1100 B / 2^30 = 1.024.., * 1.1 = 1.126.. -> 2
        assert_eq!(estimate_offheap_gb(1_000_000, &INGESTION_SIZING), 2);
        // 25M -> 25.61.. * 1.1 = 28.17.. -> 29
        assert_eq!(estimate_offheap_gb(25_000_000, &INGESTION_SIZING), 29);
    }

    #[test]
    fn budgets_partition_the_heap_when_offheap_fits() {
        let rules = [
            OffHeapRule::Estimated(SCAN_PUT_SIZING),
            OffHeapRule::Estimated(INGESTION_SIZING),
            OffHeapRule::Fixed { offheap_gb: 11 },
        ];
        for rule in rules.iter() {
            for data in [1_000_000u64, 5_000_000, 10_000_000, 15_000_000] {
                for heap in [16u64, 32, 64] {
                    let sizing = derive_sizing(data, heap, rule);
                    if sizing.offheap_gb < heap as i64 {
                        assert_eq!(sizing.onheap_gb + sizing.offheap_gb, heap as i64);
                    }
                }
            }
        }
    }

    #[test]
    fn oversized_dataset_yields_non_positive_onheap() {
        let sizing = derive_sizing(30_000_000, 32, &OffHeapRule::Estimated(SCAN_PUT_SIZING));
        // 33 GB * 1.3 = 42.9 -> 43
        assert_eq!(sizing.offheap_gb, 43);
        assert_eq!(sizing.onheap_gb, -11);
    }

    #[test]
    fn baseline_ignores_dataset_size() {
        for data in [0u64, 1_000_000, 25_000_000] {
            let sizing = derive_sizing(data, 32, &OffHeapRule::Baseline);
            assert_eq!(sizing, DerivedSizing { onheap_gb: 32, offheap_gb: 1 });
        }
    }

    #[test]
    fn fixed_rule_splits_requested_offheap() {
        let sizing = derive_sizing(10_000_000, 15, &OffHeapRule::Fixed { offheap_gb: 11 });
        assert_eq!(sizing, DerivedSizing { onheap_gb: 4, offheap_gb: 11 });
    }
}
