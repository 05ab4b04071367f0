//! One page evaluation.
//!
//! [`Page`] owns everything that lives between load and unload: the
//! scheduler, the audio controller, the optional reveal gate and the sound
//! prompt. Timer callbacks, media notifications and user input all become
//! [`PageEvent`]s and run to completion, one at a time, in arrival order.
//! Handlers may enqueue follow-up events (a countdown expiry, a play
//! outcome); those run before control returns to the host.

use std::collections::VecDeque;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::audio::{AudioResource, AudioSessionController, MediaNotification, ResourceProvider};
use crate::events::Event;
use crate::reveal::{PageLocation, RevealGate, RevealPhase};
use crate::scheduler::{Scheduler, TimerId, TimerKind};
use crate::storage::{Config, StorageBridge};

/// Input to the page dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    Timer(TimerId, TimerKind),
    CountdownExpired { at: DateTime<Utc> },
    Media(MediaNotification),
    Gesture,
    RevealRequested,
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SoundPrompt {
    /// Not offered on this page.
    Off,
    Pending(TimerId),
    Shown,
    Dismissed,
}

pub struct Page<R: AudioResource> {
    location: PageLocation,
    scheduler: Scheduler,
    audio: AudioSessionController<R>,
    gate: Option<RevealGate>,
    sound_prompt: SoundPrompt,
    queue: VecDeque<PageEvent>,
    events: Vec<Event>,
    torn_down: bool,
}

impl<R: AudioResource> Page<R> {
    /// Loads a page on `scheduler`'s clock. The provider's resources should
    /// read the same clock.
    ///
    /// The audio session restores first, then the gate activates (entry page
    /// only). Exactly one play attempt is made per load: by the gate when it
    /// takes over playback, otherwise by autoplay of the main loop.
    pub fn load<P>(
        location: PageLocation,
        config: &Config,
        provider: &mut P,
        storage: Rc<StorageBridge>,
        mut scheduler: Scheduler,
    ) -> Self
    where
        P: ResourceProvider<Resource = R>,
    {
        let mut audio = AudioSessionController::initialize(
            provider,
            Rc::clone(&storage),
            config.audio.clone(),
            &mut scheduler,
        );
        let gate = RevealGate::activate(
            &location,
            storage,
            &config.countdown,
            config.reveal.clone(),
            &mut scheduler,
            &mut audio,
        );

        let sound_prompt = if location.is_index_document() {
            SoundPrompt::Pending(
                scheduler.schedule_timeout(TimerKind::SoundPrompt, config.audio.sound_prompt_delay()),
            )
        } else {
            SoundPrompt::Off
        };

        let mut page = Self {
            location,
            scheduler,
            audio,
            gate,
            sound_prompt,
            queue: VecDeque::new(),
            events: Vec::new(),
            torn_down: false,
        };
        page.collect();

        match &page.gate {
            Some(gate) => {
                if let Some(id) = gate.tick_timer() {
                    // First reading without waiting a full interval.
                    page.queue.push_back(PageEvent::Timer(id, TimerKind::CountdownTick));
                }
            }
            None => page.audio.autoplay(),
        }

        info!(location = %page.location, phase = ?page.reveal_phase(), "page loaded");
        page.run_queue();
        page
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn now(&self) -> DateTime<Utc> {
        self.scheduler.now()
    }

    pub fn location(&self) -> &PageLocation {
        &self.location
    }

    pub fn audio(&self) -> &AudioSessionController<R> {
        &self.audio
    }

    pub fn gate(&self) -> Option<&RevealGate> {
        self.gate.as_ref()
    }

    /// `None` when the gate is not active on this page.
    pub fn reveal_phase(&self) -> Option<RevealPhase> {
        self.gate.as_ref().map(RevealGate::phase)
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn music_indicator_visible(&self) -> bool {
        self.audio.music_indicator_visible()
    }

    pub fn sound_prompt_visible(&self) -> bool {
        self.sound_prompt == SoundPrompt::Shown
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Host input ───────────────────────────────────────────────────

    /// Fires every timer due up to `horizon`, in due order, then leaves the
    /// clock at `horizon`.
    pub fn advance_to(&mut self, horizon: DateTime<Utc>) {
        if self.torn_down {
            return;
        }
        while let Some((id, kind)) = self.scheduler.pop_due(horizon) {
            self.queue.push_back(PageEvent::Timer(id, kind));
            self.run_queue();
        }
        self.run_queue();
    }

    pub fn advance_by(&mut self, delta: Duration) {
        let horizon = self.now() + delta;
        self.advance_to(horizon);
    }

    /// A click or touch anywhere on the page.
    pub fn gesture(&mut self) {
        self.dispatch(PageEvent::Gesture);
    }

    pub fn request_reveal(&mut self) {
        self.dispatch(PageEvent::RevealRequested);
    }

    pub fn toggle_play_pause(&mut self) {
        if self.torn_down {
            return;
        }
        self.audio.toggle_play_pause();
        self.run_queue();
    }

    pub fn set_volume(&mut self, volume: f64) {
        if self.torn_down {
            return;
        }
        self.audio.set_volume(volume);
        self.run_queue();
    }

    pub fn toggle_mute(&mut self) {
        if self.torn_down {
            return;
        }
        self.audio.toggle_mute();
        self.run_queue();
    }

    /// Stops music for good on this page and forgets the gesture grant.
    pub fn disable_music(&mut self) {
        if self.torn_down {
            return;
        }
        self.audio.disable();
        self.close_sound_prompt();
        self.sound_prompt = SoundPrompt::Off;
        self.run_queue();
    }

    /// Unload. Cancels every timer and writes the final snapshot; later
    /// calls do nothing.
    pub fn teardown(&mut self) {
        self.dispatch(PageEvent::Teardown);
    }

    // ── Dispatcher ───────────────────────────────────────────────────

    fn dispatch(&mut self, event: PageEvent) {
        if self.torn_down {
            return;
        }
        self.queue.push_back(event);
        self.run_queue();
    }

    fn run_queue(&mut self) {
        self.pump_media();
        while let Some(event) = self.queue.pop_front() {
            if self.torn_down {
                self.queue.clear();
                break;
            }
            self.handle(event);
            self.pump_media();
        }
        self.collect();
    }

    fn pump_media(&mut self) {
        if self.torn_down {
            return;
        }
        self.queue
            .extend(self.audio.poll_resource().into_iter().map(PageEvent::Media));
    }

    fn handle(&mut self, event: PageEvent) {
        debug!(?event, "dispatch");
        let now = self.scheduler.now();
        match event {
            PageEvent::Timer(_, TimerKind::CountdownTick) => {
                if let Some(at) = self.gate.as_mut().and_then(|gate| gate.on_tick(now)) {
                    self.queue.push_back(PageEvent::CountdownExpired { at });
                }
            }
            PageEvent::Timer(_, TimerKind::Snapshot) => self.audio.snapshot(),
            PageEvent::Timer(id, TimerKind::SnippetTimeout) => {
                if let Some(gate) = self.gate.as_mut() {
                    gate.on_snippet_timeout(id, now, &mut self.audio);
                }
            }
            PageEvent::Timer(_, TimerKind::SoundPrompt) => self.on_sound_prompt(),
            PageEvent::CountdownExpired { .. } => {
                if let Some(gate) = self.gate.as_mut() {
                    gate.on_expired(&mut self.scheduler, &mut self.audio);
                }
            }
            PageEvent::Media(notification) => {
                if matches!(
                    notification,
                    MediaNotification::PlaySettled { outcome: Ok(()), .. }
                ) {
                    self.close_sound_prompt();
                }
                self.audio.on_notification(notification);
            }
            PageEvent::Gesture => {
                self.audio.resource_mut().user_activated();
                self.audio.on_first_gesture();
                self.close_sound_prompt();
            }
            PageEvent::RevealRequested => match self.gate.as_mut() {
                Some(gate) => gate.request_reveal(&mut self.scheduler, &mut self.audio),
                None => debug!("reveal requested off the entry page, ignored"),
            },
            PageEvent::Teardown => self.on_teardown(now),
        }
        self.collect();
    }

    fn on_sound_prompt(&mut self) {
        if !matches!(self.sound_prompt, SoundPrompt::Pending(_)) {
            return;
        }
        if self.audio.resource_ref().is_paused() {
            self.sound_prompt = SoundPrompt::Shown;
            self.events.push(Event::SoundPromptShown);
        } else {
            self.sound_prompt = SoundPrompt::Dismissed;
        }
    }

    /// Hides the prompt if shown; a prompt not yet shown never will be.
    fn close_sound_prompt(&mut self) {
        match self.sound_prompt {
            SoundPrompt::Pending(id) => {
                self.scheduler.cancel(id);
                self.sound_prompt = SoundPrompt::Dismissed;
            }
            SoundPrompt::Shown => {
                self.sound_prompt = SoundPrompt::Dismissed;
                self.events.push(Event::SoundPromptDismissed);
            }
            SoundPrompt::Off | SoundPrompt::Dismissed => {}
        }
    }

    fn on_teardown(&mut self, now: DateTime<Utc>) {
        if let Some(gate) = self.gate.as_mut() {
            gate.teardown(&mut self.scheduler);
        }
        self.audio.teardown(&mut self.scheduler);
        if let SoundPrompt::Pending(id) = self.sound_prompt {
            self.scheduler.cancel(id);
            self.sound_prompt = SoundPrompt::Off;
        }
        self.collect();
        self.events.push(Event::PageTornDown { at: now });
        self.torn_down = true;
        info!("page torn down");
    }

    /// Moves component events into the page log, audio first.
    fn collect(&mut self) {
        self.events.extend(self.audio.drain_events());
        if let Some(gate) = self.gate.as_mut() {
            self.events.extend(gate.drain_events());
        }
    }
}
