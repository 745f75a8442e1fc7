pub mod backing;
pub mod checkout;
pub mod commands;
pub mod comments;
pub mod config;
pub mod error;
pub mod identity;
pub mod mock;
pub mod models;
pub mod search;
pub mod stats;
pub mod store;
pub mod tickets;
mod utils;

use anyhow::Context;
use chrono::Utc;

pub use backing::{KeyValueStore, MemoryBacking, SqliteBacking};
pub use commands::App;
pub use config::{AppConfig, ConfigStore};
pub use error::{Result, StoreError};
pub use mock::{EventSource, MockEventGenerator};
pub use models::{Comment, Event, NewEvent, Reply, SavedEvent, TicketType, User};
pub use store::EventStore;

use checkout::{format_price, Currency};

const UPCOMING_PREVIEW: usize = 5;

/// Opens the on-disk store (seeding it on first launch) and prints the next
/// few events with prices in both currencies.
pub fn run() -> anyhow::Result<()> {
    let config = ConfigStore::load().read();
    let backing = SqliteBacking::open_default(&config.database_file)
        .with_context(|| format!("failed to open database {}", config.database_file))?;

    let mut generator = MockEventGenerator::new(config.mock_event_count, config.mock_seed);
    let app = App::open(backing, config, &mut generator).map_err(anyhow::Error::msg)?;
    let store = app.store();

    log::info!(
        "{} events, {} saved, {} attending",
        store.events().len(),
        store.saved_events_count(),
        store.attended_events().len()
    );
    if let Some(user) = app.current_user() {
        log::info!("signed in as {}", user.display_name());
    }

    let now = Utc::now();
    let mut upcoming: Vec<&Event> = store
        .events()
        .iter()
        .filter(|e| e.start_date >= now)
        .collect();
    upcoming.sort_by_key(|e| e.start_date);

    let converter = app.converter();
    for event in upcoming.into_iter().take(UPCOMING_PREVIEW) {
        println!(
            "{}  {:<40} {:<28} {} / {}",
            event.start_date.format("%Y-%m-%d %H:%M"),
            event.title,
            event.location,
            format_price(event.price, Currency::Usd),
            format_price(converter.to_sll(event.price), Currency::Sll),
        );
    }
    Ok(())
}
