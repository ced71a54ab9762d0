//! App Core for Tabsleep.
//!
//! Owns the database and the event router, and runs the event loop: browser
//! events arrive over a channel, and a periodic tick fires due triggers.

use std::fs;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::context::Clock;
use crate::database::Database;
use crate::host::BrowserHost;
use crate::router::EventRouter;
use crate::services::config::CoreConfig;
use crate::types::event::BrowserEvent;

/// Central application struct.
pub struct App {
    pub db: Arc<Database>,
    pub config: CoreConfig,
    pub router: EventRouter,
}

impl App {
    /// Opens the database at `config.database_path` and wires the router.
    pub fn new(
        config: CoreConfig,
        host: Arc<dyn BrowserHost>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(parent) = config.database_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let db = Arc::new(Database::open(&config.database_path)?);
        Ok(Self::with_database(config, db, host, Clock::System))
    }

    /// Wires the router over an already opened database.
    pub fn with_database(
        config: CoreConfig,
        db: Arc<Database>,
        host: Arc<dyn BrowserHost>,
        clock: Clock,
    ) -> Self {
        let router = EventRouter::new(&config, db.clone(), host, clock);
        Self { db, config, router }
    }

    /// Processes events until the sender side of `events` is dropped.
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<BrowserEvent>) {
        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(database = %self.config.database_path.display(), "Event loop started");

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        debug!(?event, "Dispatching event");
                        self.router.handle(event).await;
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    self.router.tick().await;
                }
            }
        }
        info!("Event loop stopped");
    }
}
