//! Operational smoke entry point: connects to the configured store and
//! prints each kind's partition years and today's voucher counts.

use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use voucherbook::config;
use voucherbook::core::aggregate::{list_partition_years, todays_vouchers};
use voucherbook::entities::VoucherKind;
use voucherbook::errors::Result;
use voucherbook::registry::CollectionRegistry;
use voucherbook::store::MongoStore;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (non-fatal, env vars can be set externally)
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()?;
    info!(
        database = app_config.store.database,
        "loaded application configuration"
    );

    // 4. Connect the store and build the registry
    let store = MongoStore::connect(&app_config.store.uri, &app_config.store.database)
        .await
        .inspect_err(|e| error!("failed to connect to the document store: {e}"))?;
    let registry = CollectionRegistry::new(Arc::new(store));

    // 5. Report partition years and today's activity per kind
    let options = app_config.aggregation.to_options();
    for kind in VoucherKind::ALL {
        let years = list_partition_years(&registry, kind).await?;
        let today = todays_vouchers(&registry, kind, &options).await?;
        info!(
            %kind,
            years = ?years,
            todays_vouchers = today.vouchers.len(),
            failed_years = today.failed_years.len(),
            "partition status"
        );
    }

    Ok(())
}
