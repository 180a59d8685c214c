//! Application context bundling the warehouse services.
//!
//! One [`WarehouseApp`] per session. Every service shares the same gateway,
//! so a mutation through any of them invalidates the cache the others read.

use crate::assignments::AssignmentTracker;
use crate::catalog::CatalogService;
use crate::error::Result;
use crate::gateway::InventoryGateway;
use crate::messages::{Locale, Messages};
use crate::movements::MovementProcessor;
use crate::requests::AssignmentQuery;
use crate::summary::InventorySummary;
use kitroom_core::cache::QueryCache;
use kitroom_core::environment::{Clock, SystemClock};
use kitroom_core::notify::Notifier;
use kitroom_core::persistence::PersistenceClient;
use kitroom_runtime::{InMemoryQueryCache, TracingNotifier};
use std::sync::Arc;

/// The warehouse services wired to one store.
#[derive(Clone)]
pub struct WarehouseApp {
    /// Typed store access and cache
    pub gateway: InventoryGateway,
    /// Base item and variant edits
    pub catalog: CatalogService,
    /// Stock movements
    pub movements: MovementProcessor,
    /// Player loans
    pub assignments: AssignmentTracker,
}

impl WarehouseApp {
    /// Start building an app over `client`.
    #[must_use]
    pub fn builder(client: Arc<dyn PersistenceClient>) -> WarehouseAppBuilder {
        WarehouseAppBuilder {
            client,
            cache: None,
            clock: None,
            notifier: None,
            locale: Locale::default(),
        }
    }

    /// Stock and loan figures as of now.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WarehouseError::Query`] if the store fails.
    pub async fn summary(&self) -> Result<InventorySummary> {
        let items = self.gateway.list_items_with_variants().await?;
        let assignments = self.gateway.list_assignments(&AssignmentQuery::all()).await?;
        Ok(InventorySummary::compute(
            &items,
            &assignments,
            self.gateway.now(),
        ))
    }
}

/// Builder for [`WarehouseApp`].
///
/// Defaults: [`InMemoryQueryCache`], [`SystemClock`], [`TracingNotifier`],
/// Italian messages.
pub struct WarehouseAppBuilder {
    client: Arc<dyn PersistenceClient>,
    cache: Option<Arc<dyn QueryCache>>,
    clock: Option<Arc<dyn Clock>>,
    notifier: Option<Arc<dyn Notifier>>,
    locale: Locale,
}

impl WarehouseAppBuilder {
    /// Use `cache` for list reads.
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use `clock` for timestamps.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Send user-facing messages to `notifier`.
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Language of user-facing messages.
    #[must_use]
    pub const fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Wire the services.
    #[must_use]
    pub fn build(self) -> WarehouseApp {
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(InMemoryQueryCache::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier));
        let messages = Messages::new(self.locale);

        let gateway = InventoryGateway::new(self.client, cache, clock);
        let catalog = CatalogService::new(gateway.clone(), Arc::clone(&notifier), messages);
        let movements = MovementProcessor::new(gateway.clone(), Arc::clone(&notifier), messages);
        let assignments =
            AssignmentTracker::new(gateway.clone(), movements.clone(), notifier, messages);

        WarehouseApp {
            gateway,
            catalog,
            movements,
            assignments,
        }
    }
}
