//! Variant Status Engine.
//!
//! The single place where stock status is derived. Rows coming back from the
//! store are normalised through these functions, so a status column written by
//! anyone else is never trusted.
//!
//! Two models coexist and keep separate thresholds:
//!
//! - **Entity variants** carry their own `minimum_threshold`.
//! - **Embedded sizes** on a base item share [`EMBEDDED_SIZES_LOW_WATER_MARK`].

use crate::types::{ItemVariant, SizeStock};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shared low-water mark for items tracked through embedded sizes.
pub const EMBEDDED_SIZES_LOW_WATER_MARK: u32 = 5;

/// Stock sufficiency relative to a threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    /// Above the threshold
    Available,
    /// In stock, at or below the threshold
    Low,
    /// Nothing on hand
    Out,
}

impl StockStatus {
    /// Persisted name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Low => "low",
            Self::Out => "out",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const fn threshold_status(quantity: u64, threshold: u64) -> StockStatus {
    if quantity == 0 {
        StockStatus::Out
    } else if quantity <= threshold {
        StockStatus::Low
    } else {
        StockStatus::Available
    }
}

/// Status of a single variant.
///
/// - `quantity == 0` → [`StockStatus::Out`]
/// - `0 < quantity <= minimum_threshold` → [`StockStatus::Low`]
/// - `quantity > minimum_threshold` → [`StockStatus::Available`]
///
/// # Example
///
/// ```
/// use kitroom_warehouse::status::{derive_variant_status, StockStatus};
///
/// assert_eq!(derive_variant_status(0, 3), StockStatus::Out);
/// assert_eq!(derive_variant_status(2, 3), StockStatus::Low);
/// assert_eq!(derive_variant_status(4, 3), StockStatus::Available);
/// ```
#[must_use]
pub const fn derive_variant_status(quantity: u32, minimum_threshold: u32) -> StockStatus {
    threshold_status(quantity as u64, minimum_threshold as u64)
}

/// Aggregate status over entity variants.
///
/// Total units are compared against the sum of the variants' own thresholds.
/// No variants means nothing on hand.
#[must_use]
pub fn derive_aggregate_status(variants: &[ItemVariant]) -> StockStatus {
    let (total, threshold) = variants.iter().fold((0_u64, 0_u64), |(q, t), v| {
        (q + u64::from(v.quantity), t + u64::from(v.minimum_threshold))
    });
    threshold_status(total, threshold)
}

/// Aggregate status over embedded size records.
///
/// Total units are compared against [`EMBEDDED_SIZES_LOW_WATER_MARK`].
#[must_use]
pub fn derive_sizes_status(sizes: &[SizeStock]) -> StockStatus {
    let total: u64 = sizes.iter().map(|s| u64::from(s.quantity)).sum();
    threshold_status(total, u64::from(EMBEDDED_SIZES_LOW_WATER_MARK))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BaseItemId, VariantId};
    use chrono::Utc;
    use proptest::prelude::*;

    fn variant(quantity: u32, minimum_threshold: u32) -> ItemVariant {
        let now = Utc::now();
        ItemVariant {
            id: VariantId::new(),
            base_item_id: BaseItemId::new(),
            size: "M".to_string(),
            color: "red".to_string(),
            sku: format!("SKU-{quantity}-{minimum_threshold}"),
            quantity,
            minimum_threshold,
            location: None,
            status: derive_variant_status(quantity, minimum_threshold),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn zero_threshold_never_reports_low() {
        assert_eq!(derive_variant_status(0, 0), StockStatus::Out);
        assert_eq!(derive_variant_status(1, 0), StockStatus::Available);
    }

    #[test]
    fn threshold_boundary_is_low() {
        assert_eq!(derive_variant_status(3, 3), StockStatus::Low);
        assert_eq!(derive_variant_status(4, 3), StockStatus::Available);
    }

    #[test]
    fn aggregate_sums_quantities_and_thresholds() {
        // 2 + 2 units against 3 + 3 threshold
        let low = [variant(2, 3), variant(2, 3)];
        assert_eq!(derive_aggregate_status(&low), StockStatus::Low);

        // one variant out does not make the item out
        let mixed = [variant(0, 1), variant(10, 1)];
        assert_eq!(derive_aggregate_status(&mixed), StockStatus::Available);

        let empty = [variant(0, 2), variant(0, 2)];
        assert_eq!(derive_aggregate_status(&empty), StockStatus::Out);
        assert_eq!(derive_aggregate_status(&[]), StockStatus::Out);
    }

    #[test]
    fn sizes_use_the_shared_low_water_mark() {
        let sizes = [SizeStock::new("S", 2), SizeStock::new("M", 3)];
        assert_eq!(derive_sizes_status(&sizes), StockStatus::Low);

        let sizes = [SizeStock::new("S", 2), SizeStock::new("M", 4)];
        assert_eq!(derive_sizes_status(&sizes), StockStatus::Available);

        assert_eq!(derive_sizes_status(&[]), StockStatus::Out);
        assert_eq!(derive_sizes_status(&[SizeStock::new("L", 0)]), StockStatus::Out);
    }

    #[test]
    fn models_do_not_share_thresholds() {
        // 5 units is low for embedded sizes but available for a variant with threshold 1
        assert_eq!(derive_sizes_status(&[SizeStock::new("M", 5)]), StockStatus::Low);
        assert_eq!(derive_aggregate_status(&[variant(5, 1)]), StockStatus::Available);
    }

    proptest! {
        #[test]
        fn zero_is_always_out(t in any::<u32>()) {
            prop_assert_eq!(derive_variant_status(0, t), StockStatus::Out);
        }

        #[test]
        fn at_or_below_threshold_is_low(t in 1_u32..10_000, q in 1_u32..10_000) {
            prop_assume!(q <= t);
            prop_assert_eq!(derive_variant_status(q, t), StockStatus::Low);
        }

        #[test]
        fn above_threshold_is_available(t in 0_u32..10_000, extra in 1_u32..10_000) {
            prop_assert_eq!(derive_variant_status(t + extra, t), StockStatus::Available);
        }

        #[test]
        fn single_variant_aggregate_matches_variant(q in 0_u32..1_000, t in 0_u32..1_000) {
            let v = variant(q, t);
            prop_assert_eq!(derive_aggregate_status(std::slice::from_ref(&v)), v.status);
        }
    }
}
