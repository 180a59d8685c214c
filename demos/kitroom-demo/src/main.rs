//! Kitroom demo: walks a kit item through its stock life cycle.
//!
//! Creates a shirt with one variant, sells it down to zero, restocks it, lends
//! a unit to a player and takes it back, then prints the stock summary.
//!
//! # Running
//!
//! ```bash
//! # In-memory store
//! cargo run -p kitroom-demo
//!
//! # PostgreSQL
//! KITROOM_BACKEND=postgres DATABASE_URL=postgres://... cargo run -p kitroom-demo
//! ```
//!
//! Set `KITROOM_LOCALE=en` for English notifications and `RUST_LOG` to tune
//! the log output.

use anyhow::Context;
use chrono::Duration;
use kitroom_core::persistence::{PersistenceClient, Table};
use kitroom_postgres::PostgresPersistence;
use kitroom_runtime::metrics::MetricsServer;
use kitroom_testing::InMemoryPersistence;
use kitroom_warehouse::requests::{
    AssignItemRequest, CreateBaseItemRequest, CreateVariantRequest, MovementQuery,
    RecordMovementRequest,
};
use kitroom_warehouse::types::{MovementType, Player, PlayerId, ReturnedCondition};
use kitroom_warehouse::{Backend, WarehouseApp, WarehouseConfig, player_row};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kitroom_warehouse=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WarehouseConfig::from_env();
    tracing::info!(backend = %config.backend, locale = %config.locale, "Starting kitroom demo");

    let mut metrics = MetricsServer::new(config.metrics_addr);
    if config.metrics_enabled {
        metrics.start().context("installing metrics recorder")?;
    }

    let client = connect(&config).await?;

    let player = Player {
        id: PlayerId::new(),
        first_name: "Giulia".to_string(),
        last_name: "Bianchi".to_string(),
        jersey_number: Some(7),
    };
    client
        .insert(Table::Players, player_row(&player)?)
        .await
        .context("seeding the roster")?;

    let app = WarehouseApp::builder(client).locale(config.locale).build();
    let now = app.gateway.now();

    let item = app
        .catalog
        .create_item(CreateBaseItemRequest::new("Maglia", "kit"))
        .await?;
    let variant = app
        .catalog
        .add_variant(CreateVariantRequest::new(
            item.id, "M", "#1976d2", "MAG-M-1976D2", 10, 3,
        ))
        .await?;
    println!(
        "{} {} / {}: {} units, {}",
        item.name, variant.size, variant.color, variant.quantity, variant.status
    );

    for quantity in [8, 2] {
        app.movements
            .record_movement(
                RecordMovementRequest::new(item.id, variant.id, MovementType::Out, quantity, now)
                    .with_note("match day"),
            )
            .await?;
        let current = app.gateway.get_variant(variant.id).await?;
        println!("out {quantity}: {} units, {}", current.quantity, current.status);
    }

    app.movements
        .record_movement(RecordMovementRequest::new(
            item.id,
            variant.id,
            MovementType::In,
            5,
            now,
        ))
        .await?;

    let loan = app
        .assignments
        .assign(AssignItemRequest::new(
            variant.id,
            player.id,
            1,
            now + Duration::days(14),
        ))
        .await?;
    println!(
        "lent 1 to {} until {}",
        player.display_name(),
        loan.expected_return_date.date_naive()
    );

    let returned = app
        .assignments
        .mark_returned(loan.id, ReturnedCondition::Good)
        .await?;
    println!("returned: {}", returned.status);

    println!("{}", app.summary().await?);

    let ledger = app.movements.list_movements(&MovementQuery::all()).await?;
    println!("{} movements recorded", ledger.len());

    if let Some(text) = metrics.render() {
        println!("{text}");
    }

    Ok(())
}

async fn connect(config: &WarehouseConfig) -> anyhow::Result<Arc<dyn PersistenceClient>> {
    match config.backend {
        Backend::Memory => Ok(Arc::new(InMemoryPersistence::new())),
        Backend::Postgres => {
            let store = PostgresPersistence::connect(
                &config.postgres.url,
                config.postgres.max_connections,
                config.postgres.connect_timeout,
            )
            .await
            .context("connecting to PostgreSQL")?;
            if config.postgres.run_migrations {
                store.migrate().await.context("applying the warehouse schema")?;
            }
            Ok(Arc::new(store))
        }
    }
}
