pub mod audio;
pub mod config;
pub mod page;
pub mod session;

use std::rc::Rc;

use chrono::{DateTime, Utc};
use curtain_core::storage::Database;
use curtain_core::{AutoplayPolicy, Config, HeadlessProvider, Scheduler, StorageBridge};

/// Durations reported for the configured tracks. Nothing is decoded, so the
/// simulator has to be told.
pub struct TrackLengths {
    pub main_secs: f64,
    pub countdown_secs: f64,
}

impl Default for TrackLengths {
    fn default() -> Self {
        Self {
            main_secs: 180.0,
            countdown_secs: 30.0,
        }
    }
}

/// The persistent store, the config and a headless page host on one clock.
pub struct Host {
    pub storage: Rc<StorageBridge>,
    pub config: Config,
    pub scheduler: Scheduler,
    pub provider: HeadlessProvider,
}

impl Host {
    pub fn open(
        now: DateTime<Utc>,
        policy: AutoplayPolicy,
        lengths: TrackLengths,
    ) -> curtain_core::Result<Self> {
        let db = Database::open()?;
        let storage = Rc::new(db.bridge());
        let config = Config::load()?;
        let scheduler = Scheduler::new(now);
        let provider = HeadlessProvider::new(scheduler.clock(), policy)
            .with_track(&config.audio.main_track, lengths.main_secs)
            .with_track(&config.audio.countdown_track, lengths.countdown_secs);
        Ok(Self {
            storage,
            config,
            scheduler,
            provider,
        })
    }
}
