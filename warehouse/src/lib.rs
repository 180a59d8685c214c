//! # Kitroom Warehouse
//!
//! Inventory for a sports club's kit room: catalog items, their size and
//! color variants, the stock movement ledger and loans of kit to players.
//!
//! ## Components
//!
//! - [`status`]: derives `available` / `low` / `out` from stock counts
//! - [`InventoryGateway`]: typed reads and writes over a generic
//!   [`PersistenceClient`](kitroom_core::persistence::PersistenceClient), with
//!   cache invalidation after every mutation
//! - [`CatalogService`]: base item and variant edits, with uniqueness checks
//! - [`MovementProcessor`]: records movements and keeps stock in step
//! - [`AssignmentTracker`]: opens and closes player loans
//! - [`WarehouseApp`]: the services wired to one store
//!
//! ## Example
//!
//! ```no_run
//! use chrono::Utc;
//! use kitroom_testing::InMemoryPersistence;
//! use kitroom_warehouse::requests::{CreateBaseItemRequest, CreateVariantRequest, RecordMovementRequest};
//! use kitroom_warehouse::types::MovementType;
//! use kitroom_warehouse::WarehouseApp;
//! use std::sync::Arc;
//!
//! # async fn example() -> kitroom_warehouse::Result<()> {
//! let app = WarehouseApp::builder(Arc::new(InMemoryPersistence::new())).build();
//!
//! let item = app.catalog.create_item(CreateBaseItemRequest::new("Maglia", "kit")).await?;
//! let variant = app
//!     .catalog
//!     .add_variant(CreateVariantRequest::new(item.id, "M", "#1976d2", "MAG-M-BLU", 10, 3))
//!     .await?;
//!
//! app.movements
//!     .record_movement(RecordMovementRequest::new(
//!         item.id,
//!         variant.id,
//!         MovementType::Out,
//!         8,
//!         Utc::now(),
//!     ))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod assignments;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gateway;
pub mod messages;
pub mod movements;
pub mod requests;
pub(crate) mod rows;
pub mod status;
pub mod summary;
pub mod types;

pub use app::{WarehouseApp, WarehouseAppBuilder};
pub use assignments::AssignmentTracker;
pub use catalog::CatalogService;
pub use config::{Backend, PostgresConfig, WarehouseConfig};
pub use error::{Entity, Result, ValidationError, WarehouseError};
pub use gateway::InventoryGateway;
pub use messages::{Locale, Messages};
pub use movements::{MovementOutcome, MovementProcessor, StockChange, apply_stock_change};
pub use rows::player_row;
pub use status::StockStatus;
pub use summary::InventorySummary;
