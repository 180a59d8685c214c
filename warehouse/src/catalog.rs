//! Variant Catalog: admin edits of base items and their variants.
//!
//! Enforces the per-item uniqueness rules the gateway leaves to its callers:
//! no two variants share both size and color, and no two share a SKU.

use crate::error::{Result, ValidationError};
use crate::gateway::InventoryGateway;
use crate::messages::Messages;
use crate::requests::{
    AssignmentQuery, CreateBaseItemRequest, CreateVariantRequest, UpdateBaseItemRequest,
    UpdateVariantRequest,
};
use crate::types::{AssignmentStatus, BaseItem, BaseItemId, ItemVariant, VariantId, same_label};
use kitroom_core::notify::{NotificationLevel, Notifier};
use std::sync::Arc;

/// Catalog edits with notifications.
#[derive(Clone)]
pub struct CatalogService {
    gateway: InventoryGateway,
    notifier: Arc<dyn Notifier>,
    messages: Messages,
}

impl CatalogService {
    /// Create a catalog service over `gateway`.
    #[must_use]
    pub fn new(gateway: InventoryGateway, notifier: Arc<dyn Notifier>, messages: Messages) -> Self {
        Self {
            gateway,
            notifier,
            messages,
        }
    }

    /// Every base item with its variants.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WarehouseError::Query`] if the store fails.
    pub async fn list_items(&self) -> Result<Vec<BaseItem>> {
        self.gateway.list_items_with_variants().await
    }

    /// One base item with its variants.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WarehouseError::NotFound`] if the id is absent.
    pub async fn get_item(&self, id: BaseItemId) -> Result<BaseItem> {
        self.gateway.get_base_item(id).await
    }

    /// Create a base item.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WarehouseError::Validation`] if name or category is missing.
    pub async fn create_item(&self, request: CreateBaseItemRequest) -> Result<BaseItem> {
        let result = self.gateway.create_base_item(request).await;
        if let Ok(item) = &result {
            tracing::info!(base_item_id = %item.id, name = %item.name, "Base item created");
        }
        self.report(result, Messages::item_saved)
    }

    /// Update a base item.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WarehouseError::NotFound`] if the id is absent.
    pub async fn update_item(
        &self,
        id: BaseItemId,
        request: UpdateBaseItemRequest,
    ) -> Result<BaseItem> {
        let result = self.gateway.update_base_item(id, request).await;
        if result.is_ok() {
            tracing::info!(base_item_id = %id, "Base item updated");
        }
        self.report(result, Messages::item_saved)
    }

    /// Delete a base item and its variants.
    ///
    /// # Errors
    ///
    /// - [`crate::WarehouseError::Validation`] if any variant is still on loan
    /// - [`crate::WarehouseError::NotFound`] if the id is absent
    pub async fn delete_item(&self, id: BaseItemId) -> Result<()> {
        let result = self.drop_item(id).await;
        self.report(result, Messages::item_deleted)
    }

    async fn drop_item(&self, id: BaseItemId) -> Result<()> {
        for variant in self.gateway.list_variants(id).await? {
            self.ensure_not_on_loan(variant.id).await?;
        }
        self.gateway.delete_base_item(id).await?;
        tracing::info!(base_item_id = %id, "Base item deleted");
        Ok(())
    }

    /// Add a variant to a base item.
    ///
    /// # Errors
    ///
    /// - [`crate::WarehouseError::Validation`] for blank fields, negative counts,
    ///   or a size+color pair or SKU already used in the item
    /// - [`crate::WarehouseError::NotFound`] if the base item is absent
    pub async fn add_variant(&self, request: CreateVariantRequest) -> Result<ItemVariant> {
        let result = self.insert_variant(request).await;
        self.report(result, Messages::variant_saved)
    }

    async fn insert_variant(&self, request: CreateVariantRequest) -> Result<ItemVariant> {
        let variant = request.normalize()?;
        let siblings = self.gateway.list_variants(variant.base_item_id).await?;
        ensure_unique(&siblings, None, &variant.size, &variant.color, &variant.sku)?;

        let created = self.gateway.create_variant(variant).await?;
        tracing::info!(
            variant_id = %created.id,
            base_item_id = %created.base_item_id,
            size = %created.size,
            color = %created.color,
            quantity = created.quantity,
            status = %created.status,
            "Variant created"
        );
        Ok(created)
    }

    /// Edit a variant.
    ///
    /// # Errors
    ///
    /// - [`crate::WarehouseError::Validation`] for blank fields, negative counts,
    ///   or a size+color pair or SKU used by another variant of the item
    /// - [`crate::WarehouseError::NotFound`] if the variant is absent
    pub async fn edit_variant(
        &self,
        id: VariantId,
        request: UpdateVariantRequest,
    ) -> Result<ItemVariant> {
        let result = self.rewrite_variant(id, request).await;
        self.report(result, Messages::variant_saved)
    }

    async fn rewrite_variant(
        &self,
        id: VariantId,
        request: UpdateVariantRequest,
    ) -> Result<ItemVariant> {
        let patch = request.normalize()?;
        let current = self.gateway.get_variant(id).await?;

        if patch.size.is_some() || patch.color.is_some() || patch.sku.is_some() {
            let siblings = self.gateway.list_variants(current.base_item_id).await?;
            ensure_unique(
                &siblings,
                Some(id),
                patch.size.as_deref().unwrap_or(&current.size),
                patch.color.as_deref().unwrap_or(&current.color),
                patch.sku.as_deref().unwrap_or(&current.sku),
            )?;
        }

        let updated = self.gateway.update_variant(id, patch).await?;
        tracing::info!(
            variant_id = %updated.id,
            quantity = updated.quantity,
            status = %updated.status,
            "Variant updated"
        );
        Ok(updated)
    }

    /// Remove a variant.
    ///
    /// # Errors
    ///
    /// - [`crate::WarehouseError::Validation`] if the variant is still on loan
    /// - [`crate::WarehouseError::NotFound`] if the variant is absent
    pub async fn remove_variant(&self, id: VariantId) -> Result<()> {
        let result = self.drop_variant(id).await;
        self.report(result, Messages::variant_deleted)
    }

    async fn drop_variant(&self, id: VariantId) -> Result<()> {
        self.ensure_not_on_loan(id).await?;
        self.gateway.delete_variant(id).await?;
        tracing::info!(variant_id = %id, "Variant deleted");
        Ok(())
    }

    /// Reject deletes while the variant has loans not yet returned.
    async fn ensure_not_on_loan(&self, variant_id: VariantId) -> Result<()> {
        let query = AssignmentQuery {
            variant_id: Some(variant_id),
            status: Some(AssignmentStatus::Assigned),
            ..AssignmentQuery::default()
        };
        let open = self.gateway.list_assignments(&query).await?.len();
        if open > 0 {
            tracing::warn!(variant_id = %variant_id, open, "Refusing to delete a variant on loan");
            return Err(ValidationError::OpenAssignments { variant_id, open }.into());
        }
        Ok(())
    }

    fn report<T>(&self, result: Result<T>, success: fn(&Messages) -> String) -> Result<T> {
        match &result {
            Ok(_) => self
                .notifier
                .notify(NotificationLevel::Success, &success(&self.messages)),
            Err(e) => self
                .notifier
                .notify(NotificationLevel::Error, &self.messages.catalog_failed(e)),
        }
        result
    }
}

/// Reject a size+color pair or SKU already used by another variant of the item.
fn ensure_unique(
    siblings: &[ItemVariant],
    exclude: Option<VariantId>,
    size: &str,
    color: &str,
    sku: &str,
) -> std::result::Result<(), ValidationError> {
    let others = || siblings.iter().filter(|v| Some(v.id) != exclude);

    if others().any(|v| v.has_size_and_color(size, color)) {
        return Err(ValidationError::DuplicateVariant {
            size: size.to_string(),
            color: color.to_string(),
        });
    }
    if others().any(|v| same_label(&v.sku, sku)) {
        return Err(ValidationError::DuplicateSku(sku.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::derive_variant_status;
    use chrono::Utc;

    fn sibling(size: &str, color: &str, sku: &str) -> ItemVariant {
        let now = Utc::now();
        ItemVariant {
            id: VariantId::new(),
            base_item_id: BaseItemId::new(),
            size: size.to_string(),
            color: color.to_string(),
            sku: sku.to_string(),
            quantity: 1,
            minimum_threshold: 0,
            location: None,
            status: derive_variant_status(1, 0),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn same_size_and_color_is_a_duplicate() {
        let siblings = [sibling("M", "Blue", "A")];
        assert!(matches!(
            ensure_unique(&siblings, None, "m", " blue", "B"),
            Err(ValidationError::DuplicateVariant { .. })
        ));
    }

    #[test]
    fn accented_labels_collide_regardless_of_case() {
        let siblings = [sibling("Unica", "Écru", "A")];
        assert!(matches!(
            ensure_unique(&siblings, None, "UNICA", "écru", "B"),
            Err(ValidationError::DuplicateVariant { .. })
        ));
    }

    #[test]
    fn one_differing_label_is_enough() {
        let siblings = [sibling("M", "Blue", "A")];
        assert!(ensure_unique(&siblings, None, "M", "Red", "B").is_ok());
        assert!(ensure_unique(&siblings, None, "L", "Blue", "C").is_ok());
    }

    #[test]
    fn sku_must_be_unique_within_the_item() {
        let siblings = [sibling("M", "Blue", "KIT-01")];
        assert_eq!(
            ensure_unique(&siblings, None, "L", "Red", "kit-01"),
            Err(ValidationError::DuplicateSku("kit-01".to_string()))
        );
    }

    #[test]
    fn a_variant_does_not_collide_with_itself() {
        let own = sibling("M", "Blue", "A");
        let id = own.id;
        assert!(ensure_unique(&[own], Some(id), "M", "Blue", "A").is_ok());
    }
}
