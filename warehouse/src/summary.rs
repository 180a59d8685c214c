//! Dashboard figures over the item list and the assignments.

use crate::status::StockStatus;
use crate::types::{BaseItem, ItemAssignment};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Stock and loan counts at a point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    /// Base items in the catalog
    pub item_count: usize,
    /// Variants across all items
    pub variant_count: usize,
    /// Units on hand (variants, or embedded sizes for items without variants)
    pub total_units: u64,
    /// Variants at or below their threshold
    pub low_variants: usize,
    /// Variants with nothing on hand
    pub out_variants: usize,
    /// Items whose aggregate status is low
    pub low_items: usize,
    /// Items whose aggregate status is out
    pub out_items: usize,
    /// Loans not yet returned
    pub outstanding_assignments: usize,
    /// Open loans past their expected return date
    pub overdue_assignments: usize,
    /// Units out with players
    pub units_on_loan: u64,
}

impl InventorySummary {
    /// Compute the summary as of `now`.
    #[must_use]
    pub fn compute(items: &[BaseItem], assignments: &[ItemAssignment], now: DateTime<Utc>) -> Self {
        let mut summary = Self {
            item_count: items.len(),
            ..Self::default()
        };

        for item in items {
            summary.total_units += item.total_quantity();
            match item.aggregate_status() {
                StockStatus::Low => summary.low_items += 1,
                StockStatus::Out => summary.out_items += 1,
                StockStatus::Available => {}
            }
            for variant in &item.variants {
                summary.variant_count += 1;
                match variant.status {
                    StockStatus::Low => summary.low_variants += 1,
                    StockStatus::Out => summary.out_variants += 1,
                    StockStatus::Available => {}
                }
            }
        }

        for assignment in assignments.iter().filter(|a| a.is_outstanding()) {
            summary.outstanding_assignments += 1;
            summary.units_on_loan += u64::from(assignment.quantity);
            if assignment.is_overdue(now) {
                summary.overdue_assignments += 1;
            }
        }

        summary
    }
}

impl fmt::Display for InventorySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "items: {} ({} low, {} out)",
            self.item_count, self.low_items, self.out_items
        )?;
        writeln!(
            f,
            "variants: {} ({} low, {} out), {} units on hand",
            self.variant_count, self.low_variants, self.out_variants, self.total_units
        )?;
        write!(
            f,
            "assignments: {} open ({} overdue), {} units on loan",
            self.outstanding_assignments, self.overdue_assignments, self.units_on_loan
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::derive_variant_status;
    use crate::types::{
        AssignmentId, AssignmentStatus, BaseItemId, ItemVariant, PlayerId, SizeStock, VariantId,
    };
    use chrono::Duration;

    fn item(name: &str, variants: Vec<ItemVariant>, sizes: Vec<SizeStock>) -> BaseItem {
        let now = Utc::now();
        BaseItem {
            id: BaseItemId::new(),
            name: name.to_string(),
            category: "kit".to_string(),
            description: None,
            brand: None,
            sku: None,
            image_url: None,
            notes: None,
            sizes,
            variants,
            created_at: now,
            updated_at: now,
        }
    }

    fn variant(quantity: u32, threshold: u32) -> ItemVariant {
        let now = Utc::now();
        ItemVariant {
            id: VariantId::new(),
            base_item_id: BaseItemId::new(),
            size: "M".to_string(),
            color: "red".to_string(),
            sku: format!("V-{quantity}"),
            quantity,
            minimum_threshold: threshold,
            location: None,
            status: derive_variant_status(quantity, threshold),
            created_at: now,
            updated_at: now,
        }
    }

    fn loan(quantity: u32, due_in_days: i64, status: AssignmentStatus, now: DateTime<Utc>) -> ItemAssignment {
        ItemAssignment {
            id: AssignmentId::new(),
            variant_id: VariantId::new(),
            base_item_id: BaseItemId::new(),
            player_id: PlayerId::new(),
            quantity,
            assign_date: now - Duration::days(30),
            expected_return_date: now + Duration::days(due_in_days),
            return_date: None,
            status,
            returned_condition: None,
            notes: None,
        }
    }

    #[test]
    fn counts_items_variants_and_loans() {
        let now = Utc::now();
        let items = [
            item("Maglia", vec![variant(10, 3), variant(2, 3)], Vec::new()),
            item("Calzettoni", vec![variant(0, 1)], Vec::new()),
            item("Borraccia", Vec::new(), vec![SizeStock::new("unica", 4)]),
        ];
        let assignments = [
            loan(1, 5, AssignmentStatus::Assigned, now),
            loan(2, -3, AssignmentStatus::Assigned, now),
            loan(4, -3, AssignmentStatus::Returned, now),
        ];

        let summary = InventorySummary::compute(&items, &assignments, now);

        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.variant_count, 3);
        assert_eq!(summary.total_units, 16);
        assert_eq!(summary.low_variants, 1);
        assert_eq!(summary.out_variants, 1);
        assert_eq!(summary.low_items, 1);
        assert_eq!(summary.out_items, 1);
        assert_eq!(summary.outstanding_assignments, 2);
        assert_eq!(summary.overdue_assignments, 1);
        assert_eq!(summary.units_on_loan, 3);
    }

    #[test]
    fn empty_inventory_is_all_zero() {
        assert_eq!(
            InventorySummary::compute(&[], &[], Utc::now()),
            InventorySummary::default()
        );
    }
}
