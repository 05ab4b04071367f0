//! Reveal gate.
//!
//! Blocks the entry page until the countdown target, then opens for good.
//!
//! ## State Transitions
//!
//! ```text
//! Locked --(timer expiry | manual after target | ?reveal=1)--> Unlocked
//! ```
//!
//! `Unlocked` is terminal for the page. The unlock decision is persisted as
//! `revealed = "1"` in the durable scope and is never cleared here.
//!
//! A manual request before the target keeps the gate locked and plays a
//! short engagement snippet instead, bounded by a single replaceable timeout.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::location::PageLocation;
use crate::audio::AudioCapabilities;
use crate::countdown::{CountdownEngine, CountdownTick};
use crate::events::Event;
use crate::scheduler::{Scheduler, TimerId, TimerKind};
use crate::storage::{keys, CountdownConfig, RevealConfig, StorageBridge, StorageScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevealPhase {
    Locked,
    Unlocked,
}

/// What opened the gate. Kept for the page's lifetime only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealTrigger {
    TimerExpiry,
    ManualAfterTarget,
    QueryOverride,
}

pub struct RevealGate {
    storage: Rc<StorageBridge>,
    config: RevealConfig,
    tick_interval: chrono::Duration,
    engine: CountdownEngine,
    phase: RevealPhase,
    trigger: Option<RevealTrigger>,
    tick_timer: Option<TimerId>,
    snippet_timer: Option<TimerId>,
    /// Set while an engagement snippet is playing.
    user_triggered: bool,
    outbox: Vec<Event>,
}

impl RevealGate {
    /// Activates the gate for this page, or returns `None` without touching
    /// anything when the page is not the entry page.
    ///
    /// A `?reveal=1` override opens the gate here, before any tick. Otherwise
    /// the gate locks, switches audio to the countdown track and starts the
    /// tick timer; the caller is expected to run the first tick right away.
    /// A `revealed` flag left by an earlier visit does not skip the lock.
    pub fn activate(
        location: &PageLocation,
        storage: Rc<StorageBridge>,
        countdown: &CountdownConfig,
        config: RevealConfig,
        scheduler: &mut Scheduler,
        audio: &mut dyn AudioCapabilities,
    ) -> Option<Self> {
        if !location.is_entry_page() {
            debug!(path = location.path(), "not the entry page, gate inactive");
            return None;
        }

        let mut gate = Self {
            storage,
            config,
            tick_interval: countdown.tick_interval(),
            engine: CountdownEngine::new(countdown.target),
            phase: RevealPhase::Locked,
            trigger: None,
            tick_timer: None,
            snippet_timer: None,
            user_triggered: false,
            outbox: Vec::new(),
        };

        if location.query_param(&gate.config.query_param).as_deref() == Some("1") {
            gate.unlock(RevealTrigger::QueryOverride, scheduler, audio);
            return Some(gate);
        }

        audio.set_mode(true);
        audio.request_play();
        gate.tick_timer =
            Some(scheduler.schedule_interval(TimerKind::CountdownTick, gate.tick_interval));
        info!(target = %gate.engine.target(), "gate locked");
        Some(gate)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    pub fn trigger(&self) -> Option<RevealTrigger> {
        self.trigger
    }

    pub fn is_locked(&self) -> bool {
        self.phase == RevealPhase::Locked
    }

    pub fn target(&self) -> DateTime<Utc> {
        self.engine.target()
    }

    pub fn user_triggered(&self) -> bool {
        self.user_triggered
    }

    pub fn tick_timer(&self) -> Option<TimerId> {
        self.tick_timer
    }

    pub fn snippet_timer(&self) -> Option<TimerId> {
        self.snippet_timer
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Countdown tick. Returns the expiry instant the first time the target
    /// is reached; the caller dispatches it back through [`on_expired`].
    ///
    /// [`on_expired`]: RevealGate::on_expired
    pub fn on_tick(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.engine.tick(now) {
            CountdownTick::Running(state) => {
                self.outbox.push(Event::CountdownUpdated { state });
                None
            }
            CountdownTick::Expired { at } => {
                self.outbox.push(Event::CountdownExpired { at });
                Some(at)
            }
            CountdownTick::Stopped => None,
        }
    }

    pub fn on_expired(&mut self, scheduler: &mut Scheduler, audio: &mut dyn AudioCapabilities) {
        self.unlock(RevealTrigger::TimerExpiry, scheduler, audio);
    }

    /// Explicit reveal request from the page. Opens the gate once the target
    /// has passed; before that it plays the engagement snippet.
    pub fn request_reveal(&mut self, scheduler: &mut Scheduler, audio: &mut dyn AudioCapabilities) {
        let now = scheduler.now();
        if self.phase == RevealPhase::Unlocked || now >= self.engine.target() {
            self.unlock(RevealTrigger::ManualAfterTarget, scheduler, audio);
            return;
        }

        self.user_triggered = true;
        audio.set_mode(true);
        audio.play_snippet();
        if let Some(previous) = self.snippet_timer.take() {
            scheduler.cancel(previous);
        }
        self.snippet_timer = Some(
            scheduler.schedule_timeout(TimerKind::SnippetTimeout, self.config.snippet_duration()),
        );
        debug!("reveal requested early, playing snippet");
        self.outbox.push(Event::RevealDenied {
            remaining_ms: self.engine.remaining_ms(now),
            at: now,
        });
    }

    /// Ends the engagement snippet. Stale timer ids are ignored.
    pub fn on_snippet_timeout(
        &mut self,
        id: TimerId,
        now: DateTime<Utc>,
        audio: &mut dyn AudioCapabilities,
    ) {
        if self.snippet_timer != Some(id) {
            return;
        }
        self.snippet_timer = None;
        self.user_triggered = false;
        audio.resource().pause();
        self.outbox.push(Event::SnippetStopped { at: now });
    }

    /// The Locked→Unlocked transition. Always re-affirms the durable flag;
    /// everything else happens only on the first call.
    pub fn unlock(
        &mut self,
        trigger: RevealTrigger,
        scheduler: &mut Scheduler,
        audio: &mut dyn AudioCapabilities,
    ) {
        self.storage
            .set(StorageScope::Durable, keys::REVEALED, keys::REVEALED_VALUE);
        if self.phase == RevealPhase::Unlocked {
            return;
        }

        self.phase = RevealPhase::Unlocked;
        self.trigger = Some(trigger);
        self.engine.stop();
        self.cancel_timers(scheduler);
        self.user_triggered = false;

        audio.set_mode(false);
        audio.request_play();

        let at = scheduler.now();
        info!(?trigger, "gate unlocked");
        self.outbox.push(Event::Revealed { trigger, at });
    }

    fn cancel_timers(&mut self, scheduler: &mut Scheduler) {
        if let Some(id) = self.tick_timer.take() {
            scheduler.cancel(id);
        }
        if let Some(id) = self.snippet_timer.take() {
            scheduler.cancel(id);
        }
    }

    pub fn teardown(&mut self, scheduler: &mut Scheduler) {
        self.cancel_timers(scheduler);
    }
}
