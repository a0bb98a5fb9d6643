#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use edutrack::{AppConfig, SlotMap, http_api};
    use tracing::{info, warn};
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let tabular = config.tabular_store()?;
    let files = config.file_store()?;
    let slots = Arc::new(SlotMap::new());

    if config.rehydrate_slots {
        let listing = files.clone();
        let target = slots.clone();
        let classes = config.classes.clone();
        let restored =
            tokio::task::spawn_blocking(move || target.rehydrate(listing.as_ref(), &classes))
                .await?;
        match restored {
            Ok(count) => info!(count, "restored timetable slots"),
            Err(err) => warn!(error = %err, "could not restore timetable slots; starting empty"),
        }
    }

    info!(
        addr = %config.http_addr,
        tabular = ?config.tabular_backend,
        files = ?config.file_backend,
        "starting edutrack"
    );
    let state = http_api::AppState::new(tabular, files, slots, config.classes.clone());
    http_api::serve(config.http_addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
