//! # Curtain Core Library
//!
//! Page-lifetime logic for a site that plays one shared piece of music across
//! page loads and keeps its entry page behind a countdown until a fixed
//! instant.
//!
//! ## Architecture
//!
//! - **Storage**: a failure-tolerant bridge over a durable scope and a
//!   session scope (SQLite-backed or in-memory), plus TOML configuration
//! - **Audio**: one shared audio resource per page, restored from storage,
//!   switched between the main loop and the countdown track
//! - **Countdown**: a wall-clock-derived engine that the caller ticks
//! - **Reveal**: a Locked/Unlocked gate on the entry page that persists the
//!   unlock decision
//! - **Page**: the composition root and its single ordered dispatcher, driven
//!   by a simulated clock
//!
//! ## Key Components
//!
//! - [`Page`]: one page evaluation
//! - [`AudioSessionController`]: the shared audio session
//! - [`RevealGate`]: the countdown gate
//! - [`StorageBridge`]: typed access to both storage scopes

pub mod audio;
pub mod countdown;
pub mod error;
pub mod events;
pub mod page;
pub mod reveal;
pub mod scheduler;
pub mod storage;

pub use audio::{
    AudioCapabilities, AudioResource, AudioSessionController, AutoplayPolicy, ControlSurface,
    HeadlessProvider, MediaNotification, PlayRequest, ResourceProvider, SimulatedAudio, Track,
};
pub use countdown::{CountdownEngine, CountdownState, CountdownTick};
pub use error::{ConfigError, CoreError, PlaybackError, Result, StorageError};
pub use events::Event;
pub use page::{Page, PageEvent};
pub use reveal::{PageLocation, RevealGate, RevealPhase, RevealTrigger};
pub use scheduler::{Scheduler, SimClock, TimerId, TimerKind};
pub use storage::{
    AudioConfig, Config, CountdownConfig, Database, KeyValueStore, MemoryStore, RevealConfig,
    StorageBridge, StorageScope,
};
