//! Inventory Data Gateway.
//!
//! Translates between the store's flat rows and the nested domain shape, and
//! owns cache invalidation: every successful mutation drops the cached list it
//! affects so the next read refetches. The gateway does no cross-row
//! validation; callers check business rules before reaching it.

use crate::error::{Entity, Result, WarehouseError};
use crate::requests::{
    AssignmentQuery, CreateBaseItemRequest, MovementQuery, NewVariant, UpdateBaseItemRequest,
    VariantPatch,
};
use crate::rows::{
    self, AssignmentRow, AssignmentStatePatch, BaseItemPatch, BaseItemRow, MovementRow,
    PlayerRow, VariantPatchRow, VariantRow,
};
use crate::types::{
    AssignmentId, BaseItem, BaseItemId, InventoryMovement, ItemAssignment, ItemVariant, Player,
    PlayerId, ReturnedCondition, VariantId,
};
use chrono::{DateTime, Utc};
use kitroom_core::cache::{CacheKey, QueryCache};
use kitroom_core::environment::Clock;
use kitroom_core::persistence::{Filter, PersistenceClient, QueryError, Table};
use kitroom_runtime::metrics::QueryMetrics;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Typed access to the warehouse tables.
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct InventoryGateway {
    client: Arc<dyn PersistenceClient>,
    cache: Arc<dyn QueryCache>,
    clock: Arc<dyn Clock>,
}

impl InventoryGateway {
    /// Create a gateway over the given store, cache and clock.
    #[must_use]
    pub fn new(
        client: Arc<dyn PersistenceClient>,
        cache: Arc<dyn QueryCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            cache,
            clock,
        }
    }

    /// Current time from the injected clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ========================================================================
    // Base items
    // ========================================================================

    /// Every base item with its variants embedded, ordered by name.
    ///
    /// Two queries (items, then variants) joined in memory. Items without
    /// variants carry an empty list. Served from the cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Query`] if either query fails.
    pub async fn list_items_with_variants(&self) -> Result<Vec<BaseItem>> {
        if let Some(items) = self.cached::<Vec<BaseItem>>(CacheKey::WarehouseItems) {
            return Ok(items);
        }

        let item_rows: Vec<BaseItemRow> = self
            .fetch(Table::BaseItems, Filter::all().order_asc("name"))
            .await?;
        let variant_rows: Vec<VariantRow> = self
            .fetch(Table::ItemVariants, Filter::all().order_asc("created_at"))
            .await?;

        let mut by_item: HashMap<BaseItemId, Vec<ItemVariant>> = HashMap::new();
        for row in variant_rows {
            by_item
                .entry(row.base_item_id)
                .or_default()
                .push(row.into_domain());
        }

        let items: Vec<BaseItem> = item_rows
            .into_iter()
            .map(|row| {
                let variants = by_item.remove(&row.id).unwrap_or_default();
                row.into_domain(variants)
            })
            .collect();

        if !by_item.is_empty() {
            tracing::warn!(
                orphans = by_item.values().map(Vec::len).sum::<usize>(),
                "Variants reference base items that no longer exist"
            );
        }

        self.remember(CacheKey::WarehouseItems, &items);
        Ok(items)
    }

    /// A single base item with its variants.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::NotFound`] if the id is absent, or
    /// [`WarehouseError::Query`] if the store fails.
    pub async fn get_base_item(&self, id: BaseItemId) -> Result<BaseItem> {
        let row: BaseItemRow = self
            .fetch_by_id(Table::BaseItems, &id.to_string())
            .await?
            .ok_or_else(|| WarehouseError::not_found(Entity::BaseItem, id))?;
        let variants = self.list_variants(id).await?;
        Ok(row.into_domain(variants))
    }

    /// Create a base item with no variants.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Validation`] if name or category is missing,
    /// or [`WarehouseError::Query`] if the insert fails.
    pub async fn create_base_item(&self, request: CreateBaseItemRequest) -> Result<BaseItem> {
        let request = request.normalize()?;
        let now = self.now();
        let row = BaseItemRow {
            id: BaseItemId::new(),
            name: request.name,
            category: request.category,
            description: request.description,
            brand: request.brand,
            sku: request.sku,
            image_url: request.image_url,
            notes: request.notes,
            sizes: request.sizes,
            created_at: now,
            updated_at: now,
        };

        let stored: BaseItemRow = self.insert_row(Table::BaseItems, &row).await?;
        self.invalidate(CacheKey::WarehouseItems);

        tracing::debug!(base_item_id = %stored.id, name = %stored.name, "Base item inserted");
        Ok(stored.into_domain(Vec::new()))
    }

    /// Apply a partial update to a base item.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Validation`] for blank required fields,
    /// [`WarehouseError::NotFound`] if the id is absent, or
    /// [`WarehouseError::Query`] if the store fails.
    pub async fn update_base_item(
        &self,
        id: BaseItemId,
        request: UpdateBaseItemRequest,
    ) -> Result<BaseItem> {
        let patch = BaseItemPatch::from_request(request.normalize()?, self.now());
        let stored: BaseItemRow = self
            .update_row(Table::BaseItems, &id.to_string(), &patch)
            .await?
            .ok_or_else(|| WarehouseError::not_found(Entity::BaseItem, id))?;
        self.invalidate(CacheKey::WarehouseItems);

        let variants = self.list_variants(id).await?;
        Ok(stored.into_domain(variants))
    }

    /// Delete a base item and its variants.
    ///
    /// Not idempotent: a repeated call after success fails with not found.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::NotFound`] if the id is absent, or
    /// [`WarehouseError::Query`] if the store fails.
    pub async fn delete_base_item(&self, id: BaseItemId) -> Result<()> {
        let key = id.to_string();
        if self
            .fetch_by_id::<BaseItemRow>(Table::BaseItems, &key)
            .await?
            .is_none()
        {
            return Err(WarehouseError::not_found(Entity::BaseItem, id));
        }

        let variants = self.list_variants(id).await?;
        for variant in &variants {
            if let Err(e) = self
                .delete_row(Table::ItemVariants, &variant.id.to_string())
                .await
            {
                // Earlier variants may already be gone.
                self.invalidate(CacheKey::WarehouseItems);
                return Err(e.into());
            }
        }

        let removed = self.delete_row(Table::BaseItems, &key).await;
        self.invalidate(CacheKey::WarehouseItems);
        if removed? == 0 {
            return Err(WarehouseError::not_found(Entity::BaseItem, id));
        }

        tracing::debug!(base_item_id = %id, variants = variants.len(), "Base item deleted");
        Ok(())
    }

    // ========================================================================
    // Variants
    // ========================================================================

    /// A single variant.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::NotFound`] if the id is absent, or
    /// [`WarehouseError::Query`] if the store fails.
    pub async fn get_variant(&self, id: VariantId) -> Result<ItemVariant> {
        self.fetch_by_id::<VariantRow>(Table::ItemVariants, &id.to_string())
            .await?
            .map(VariantRow::into_domain)
            .ok_or_else(|| WarehouseError::not_found(Entity::Variant, id))
    }

    /// Variants of one base item, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Query`] if the store fails.
    pub async fn list_variants(&self, base_item_id: BaseItemId) -> Result<Vec<ItemVariant>> {
        let filter = Filter::eq("base_item_id", base_item_id.to_string()).order_asc("created_at");
        let rows: Vec<VariantRow> = self.fetch(Table::ItemVariants, filter).await?;
        Ok(rows.into_iter().map(VariantRow::into_domain).collect())
    }

    /// Insert a variant. Uniqueness within the item is the caller's check.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::NotFound`] if the base item is absent, or
    /// [`WarehouseError::Query`] if the store fails.
    pub async fn create_variant(&self, variant: NewVariant) -> Result<ItemVariant> {
        let base_item_id = variant.base_item_id;
        if self
            .fetch_by_id::<BaseItemRow>(Table::BaseItems, &base_item_id.to_string())
            .await?
            .is_none()
        {
            return Err(WarehouseError::not_found(Entity::BaseItem, base_item_id));
        }

        let row = VariantRow::new(variant, self.now());
        let stored: VariantRow = self.insert_row(Table::ItemVariants, &row).await?;
        self.invalidate(CacheKey::WarehouseItems);

        tracing::debug!(variant_id = %stored.id, base_item_id = %base_item_id, "Variant inserted");
        Ok(stored.into_domain())
    }

    /// Apply a partial update to a variant, recomputing its status.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::NotFound`] if the id is absent, or
    /// [`WarehouseError::Query`] if the store fails.
    pub async fn update_variant(&self, id: VariantId, patch: VariantPatch) -> Result<ItemVariant> {
        let current = self.get_variant(id).await?;
        self.write_variant(&current, patch).await
    }

    /// Overwrite a variant's stock count, given the variant as last read.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::NotFound`] if the variant disappeared, or
    /// [`WarehouseError::Query`] if the store fails.
    pub async fn update_variant_stock(
        &self,
        current: &ItemVariant,
        quantity: u32,
    ) -> Result<ItemVariant> {
        self.write_variant(current, VariantPatch::quantity(quantity))
            .await
    }

    async fn write_variant(&self, current: &ItemVariant, patch: VariantPatch) -> Result<ItemVariant> {
        let patch = VariantPatchRow::merge(current, patch, self.now());
        let stored: VariantRow = self
            .update_row(Table::ItemVariants, &current.id.to_string(), &patch)
            .await?
            .ok_or_else(|| WarehouseError::not_found(Entity::Variant, current.id))?;
        self.invalidate(CacheKey::WarehouseItems);
        Ok(stored.into_domain())
    }

    /// Delete a variant.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::NotFound`] if the id is absent, or
    /// [`WarehouseError::Query`] if the store fails.
    pub async fn delete_variant(&self, id: VariantId) -> Result<()> {
        let removed = self.delete_row(Table::ItemVariants, &id.to_string()).await?;
        if removed == 0 {
            return Err(WarehouseError::not_found(Entity::Variant, id));
        }
        self.invalidate(CacheKey::WarehouseItems);
        Ok(())
    }

    // ========================================================================
    // Movements
    // ========================================================================

    /// Append a ledger entry.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Query`] if the insert fails.
    pub async fn append_movement(&self, movement: InventoryMovement) -> Result<InventoryMovement> {
        let stored: MovementRow = self
            .insert_row(Table::InventoryMovements, &MovementRow::from(movement))
            .await?;
        self.invalidate(CacheKey::InventoryMovements);
        Ok(stored.into())
    }

    /// Ledger entries matching `query`, newest first.
    ///
    /// The unfiltered ledger is served from the cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Query`] if the store fails.
    pub async fn list_movements(&self, query: &MovementQuery) -> Result<Vec<InventoryMovement>> {
        let cacheable = query.is_unfiltered();
        if cacheable {
            if let Some(movements) = self.cached(CacheKey::InventoryMovements) {
                return Ok(movements);
            }
        }

        let mut filter = Filter::all().order_desc("date");
        if let Some(kind) = query.movement_type {
            filter = filter.and_eq("type", kind.as_str());
        }
        if let Some(id) = query.base_item_id {
            filter = filter.and_eq("base_item_id", id.to_string());
        }
        if let Some(id) = query.variant_id {
            filter = filter.and_eq("variant_id", id.to_string());
        }
        if let Some(id) = query.player_id {
            filter = filter.and_eq("player_id", id.to_string());
        }

        let rows: Vec<MovementRow> = self.fetch(Table::InventoryMovements, filter).await?;
        let movements: Vec<InventoryMovement> = rows.into_iter().map(Into::into).collect();

        if cacheable {
            self.remember(CacheKey::InventoryMovements, &movements);
        }
        Ok(movements)
    }

    // ========================================================================
    // Assignments
    // ========================================================================

    /// Insert an assignment.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Query`] if the insert fails.
    pub async fn insert_assignment(&self, assignment: ItemAssignment) -> Result<ItemAssignment> {
        let stored: AssignmentRow = self
            .insert_row(Table::ItemAssignments, &AssignmentRow::from(assignment))
            .await?;
        self.invalidate(CacheKey::ItemAssignments);
        Ok(stored.into())
    }

    /// A single assignment in any state.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::NotFound`] if the id is absent, or
    /// [`WarehouseError::Query`] if the store fails.
    pub async fn get_assignment(&self, id: AssignmentId) -> Result<ItemAssignment> {
        self.fetch_by_id::<AssignmentRow>(Table::ItemAssignments, &id.to_string())
            .await?
            .map(Into::into)
            .ok_or_else(|| WarehouseError::not_found(Entity::Assignment, id))
    }

    /// Mark an assignment returned.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::NotFound`] if the id is absent, or
    /// [`WarehouseError::Query`] if the store fails.
    pub async fn close_assignment(
        &self,
        id: AssignmentId,
        at: DateTime<Utc>,
        condition: ReturnedCondition,
    ) -> Result<ItemAssignment> {
        self.write_assignment_state(id, &AssignmentStatePatch::returned(at, condition))
            .await
    }

    /// Put a returned assignment back to assigned, clearing the return columns.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::NotFound`] if the id is absent, or
    /// [`WarehouseError::Query`] if the store fails.
    pub async fn reopen_assignment(&self, id: AssignmentId) -> Result<ItemAssignment> {
        self.write_assignment_state(id, &AssignmentStatePatch::reopened())
            .await
    }

    async fn write_assignment_state(
        &self,
        id: AssignmentId,
        patch: &AssignmentStatePatch,
    ) -> Result<ItemAssignment> {
        let stored: AssignmentRow = self
            .update_row(Table::ItemAssignments, &id.to_string(), patch)
            .await?
            .ok_or_else(|| WarehouseError::not_found(Entity::Assignment, id))?;
        self.invalidate(CacheKey::ItemAssignments);
        Ok(stored.into())
    }

    /// Remove an assignment. Only used to undo a half-applied assign.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::NotFound`] if the id is absent, or
    /// [`WarehouseError::Query`] if the store fails.
    pub async fn delete_assignment(&self, id: AssignmentId) -> Result<()> {
        let removed = self
            .delete_row(Table::ItemAssignments, &id.to_string())
            .await?;
        if removed == 0 {
            return Err(WarehouseError::not_found(Entity::Assignment, id));
        }
        self.invalidate(CacheKey::ItemAssignments);
        Ok(())
    }

    /// Assignments matching `query`, newest first.
    ///
    /// The unfiltered list is served from the cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Query`] if the store fails.
    pub async fn list_assignments(&self, query: &AssignmentQuery) -> Result<Vec<ItemAssignment>> {
        let cacheable = query.is_unfiltered();
        if cacheable {
            if let Some(assignments) = self.cached(CacheKey::ItemAssignments) {
                return Ok(assignments);
            }
        }

        let mut filter = Filter::all().order_desc("assign_date");
        if let Some(id) = query.player_id {
            filter = filter.and_eq("player_id", id.to_string());
        }
        if let Some(id) = query.variant_id {
            filter = filter.and_eq("variant_id", id.to_string());
        }
        if let Some(status) = query.status {
            filter = filter.and_eq("status", status.as_str());
        }

        let rows: Vec<AssignmentRow> = self.fetch(Table::ItemAssignments, filter).await?;
        let assignments: Vec<ItemAssignment> = rows.into_iter().map(Into::into).collect();

        if cacheable {
            self.remember(CacheKey::ItemAssignments, &assignments);
        }
        Ok(assignments)
    }

    // ========================================================================
    // Players (read-only)
    // ========================================================================

    /// Roster, ordered by last name.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Query`] if the store fails.
    pub async fn list_players(&self) -> Result<Vec<Player>> {
        let rows: Vec<PlayerRow> = self
            .fetch(Table::Players, Filter::all().order_asc("last_name"))
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// A single player.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::NotFound`] if the id is absent, or
    /// [`WarehouseError::Query`] if the store fails.
    pub async fn get_player(&self, id: PlayerId) -> Result<Player> {
        self.fetch_by_id::<PlayerRow>(Table::Players, &id.to_string())
            .await?
            .map(Into::into)
            .ok_or_else(|| WarehouseError::not_found(Entity::Player, id))
    }

    // ========================================================================
    // Store plumbing
    // ========================================================================

    async fn fetch<T: DeserializeOwned>(
        &self,
        table: Table,
        filter: Filter,
    ) -> std::result::Result<Vec<T>, QueryError> {
        let started = Instant::now();
        let result = self.client.select(table, filter).await;
        observe(table, started, &result);
        result?
            .into_iter()
            .map(|row| rows::decode(table, row))
            .collect()
    }

    async fn fetch_by_id<T: DeserializeOwned>(
        &self,
        table: Table,
        id: &str,
    ) -> std::result::Result<Option<T>, QueryError> {
        let mut found = self.fetch(table, Filter::eq("id", id)).await?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    async fn insert_row<S: Serialize, T: DeserializeOwned>(
        &self,
        table: Table,
        value: &S,
    ) -> std::result::Result<T, QueryError> {
        let row = rows::encode(table, value)?;
        let started = Instant::now();
        let result = self.client.insert(table, row).await;
        observe(table, started, &result);
        rows::decode(table, result?)
    }

    async fn update_row<S: Serialize, T: DeserializeOwned>(
        &self,
        table: Table,
        id: &str,
        patch: &S,
    ) -> std::result::Result<Option<T>, QueryError> {
        let patch = rows::encode(table, patch)?;
        let started = Instant::now();
        let result = self.client.update(table, id, patch).await;
        observe(table, started, &result);
        result?.map(|row| rows::decode(table, row)).transpose()
    }

    async fn delete_row(&self, table: Table, id: &str) -> std::result::Result<u64, QueryError> {
        let started = Instant::now();
        let result = self.client.delete(table, id).await;
        observe(table, started, &result);
        result
    }

    fn cached<T: DeserializeOwned>(&self, key: CacheKey) -> Option<T> {
        let value = self.cache.get(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Dropping unreadable cache entry");
                self.cache.invalidate(key);
                None
            }
        }
    }

    fn remember<T: Serialize>(&self, key: CacheKey, value: &T) {
        match serde_json::to_value(value) {
            Ok(snapshot) => self.cache.put(key, snapshot),
            Err(e) => tracing::warn!(key = %key, error = %e, "Could not cache read result"),
        }
    }

    fn invalidate(&self, key: CacheKey) {
        self.cache.invalidate(key);
    }
}

fn observe<T>(table: Table, started: Instant, result: &std::result::Result<T, QueryError>) {
    QueryMetrics::record_query(table.name(), started.elapsed());
    if let Err(e) = result {
        QueryMetrics::record_error(table.name());
        tracing::warn!(table = %table, error = %e, "Store operation failed");
    }
}
