use std::sync::Arc;

use crate::{clients::IpLocationClient, config::Config};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use xm_messaging::{BrokerConnection, ConnectionState, EventDispatcher};
use xm_storage_sqlite::companies::CompanyRepository;
use xm_storage_sqlite::db::{self, DbPool};

pub struct AppState {
    pub pool: Arc<DbPool>,
    pub company_repository: CompanyRepository,
    pub dispatcher: Arc<EventDispatcher>,
    pub ip_location: Arc<dyn IpLocationClient>,
    pub origin_country: String,
}

pub fn init_tracing() {
    let fmt_layer = fmt::layer().json().with_current_span(false);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Opens the database, applies migrations and starts the event dispatcher.
///
/// Fails if the exchange cannot be declared on `broker`; the process must not
/// start serving in that case.
pub async fn build_state(
    config: &Config,
    broker: Arc<dyn BrokerConnection>,
    ip_location: Arc<dyn IpLocationClient>,
) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);
    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;

    watch_connection(&*broker);
    let dispatcher = EventDispatcher::start(broker, config.dispatcher_config()).await?;
    tracing::info!(
        "Event dispatcher publishing to exchange '{}'",
        config.exchange
    );

    Ok(Arc::new(AppState {
        pool,
        company_repository: CompanyRepository::new(),
        dispatcher: Arc::new(dispatcher),
        ip_location,
        origin_country: config.origin_country.clone(),
    }))
}

/// Logs broker connection state transitions until the broker goes away.
fn watch_connection(broker: &dyn BrokerConnection) {
    let mut events = broker.connection_events();
    tokio::spawn(async move {
        while events.changed().await.is_ok() {
            let state = *events.borrow_and_update();
            match state {
                ConnectionState::Connected => tracing::info!("Broker connected"),
                ConnectionState::Disconnected => {
                    tracing::warn!("Broker disconnected; events published meanwhile are lost")
                }
                ConnectionState::Closed => {
                    tracing::warn!("Broker connection closed");
                    break;
                }
            }
        }
    });
}
