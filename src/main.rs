use spotwatch::analysis::binary_v2::BinaryV2Scorer;
use spotwatch::analysis::create_scorer;
use spotwatch::api;
use spotwatch::config;
use spotwatch::events::Processor;
use spotwatch::notify::LogNotifier;
use spotwatch::state::AppState;
use spotwatch::store::memory::InMemoryStore;
use std::net::SocketAddr;
use std::sync::Arc;

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt().with_target(false).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    tracing::info!(
        config_path = config::DEFAULT_CONFIG_PATH,
        "spotwatch starting"
    );
    let config = config::load_default()?;

    let scorer = match create_scorer(config.scoring_name(), config.deduction_params()) {
        Ok(scorer) => {
            tracing::info!(scoring = config.scoring_name(), "Quality scorer loaded");
            scorer
        }
        Err(err) => {
            tracing::warn!(error = %err, "Unknown scoring strategy, using default");
            Box::new(BinaryV2Scorer)
        }
    };
    let processor = Processor::new(config.classifier_config(), scorer, config.penalty_amount());

    // Seed the in-memory registry; a hosted deployment would connect to its
    // database here instead.
    let store = InMemoryStore::new();
    for lot in &config.lots {
        store.insert_lot(lot.clone())?;
    }
    for sensor in &config.sensors {
        store.insert_sensor(sensor.clone())?;
    }
    if config.sensors.is_empty() {
        tracing::warn!("No sensors configured in [[sensors]]");
    } else {
        tracing::info!(
            lots = config.lots.len(),
            sensors = config.sensors.len(),
            "Registry seeded"
        );
    }

    let state = Arc::new(AppState::new(
        Arc::new(store),
        Arc::new(LogNotifier),
        processor,
    ));

    let app = api::router(Arc::clone(&state));
    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use spotwatch::config;

    #[test]
    fn default_config_is_valid_toml() -> Result<(), Box<dyn std::error::Error>> {
        let _config = config::load_default()?;
        Ok(())
    }
}
