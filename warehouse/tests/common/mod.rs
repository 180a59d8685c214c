//! Shared fixtures for the warehouse integration tests.

#![allow(dead_code)] // Each test binary uses a different subset

use chrono::{DateTime, Utc};
use kitroom_core::environment::Clock;
use kitroom_core::persistence::Table;
use kitroom_testing::{FixedClock, InMemoryPersistence, RecordingNotifier, test_clock};
use kitroom_warehouse::requests::{CreateBaseItemRequest, CreateVariantRequest};
use kitroom_warehouse::types::{BaseItem, ItemVariant, Player, PlayerId};
use kitroom_warehouse::{Locale, WarehouseApp, player_row};
use std::sync::Arc;

/// An app over an in-memory store, with handles on its collaborators.
pub struct Harness {
    pub store: InMemoryPersistence,
    pub notifier: RecordingNotifier,
    pub clock: FixedClock,
    pub app: WarehouseApp,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_locale(Locale::It)
    }

    pub fn with_locale(locale: Locale) -> Self {
        let store = InMemoryPersistence::new();
        let notifier = RecordingNotifier::new();
        let clock = test_clock();
        let app = WarehouseApp::builder(Arc::new(store.clone()))
            .clock(Arc::new(clock.clone()))
            .notifier(Arc::new(notifier.clone()))
            .locale(locale)
            .build();
        Self {
            store,
            notifier,
            clock,
            app,
        }
    }

    /// Time on the shared test clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Put a player on the roster.
    pub fn seed_player(&self, first_name: &str, last_name: &str) -> PlayerId {
        let player = Player {
            id: PlayerId::new(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            jersey_number: None,
        };
        self.store.seed(Table::Players, player_row(&player).unwrap());
        player.id
    }

    /// Create a base item with one variant.
    pub async fn item_with_variant(
        &self,
        name: &str,
        quantity: i64,
        threshold: i64,
    ) -> (BaseItem, ItemVariant) {
        let item = self
            .app
            .catalog
            .create_item(CreateBaseItemRequest::new(name, "kit"))
            .await
            .unwrap();
        let variant = self
            .app
            .catalog
            .add_variant(CreateVariantRequest::new(
                item.id,
                "M",
                "#1976d2",
                format!("{name}-M"),
                quantity,
                threshold,
            ))
            .await
            .unwrap();
        (item, variant)
    }

    /// Current stock of a variant, read from the store.
    pub async fn stock(&self, variant: &ItemVariant) -> u32 {
        self.app
            .gateway
            .get_variant(variant.id)
            .await
            .unwrap()
            .quantity
    }
}
