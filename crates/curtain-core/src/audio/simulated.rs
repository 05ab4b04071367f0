//! Headless stand-ins for the rendering layer.
//!
//! [`SimulatedAudio`] behaves like a media element driven by the
//! [`SimClock`]: loading a known source reports its duration, play requests
//! settle on the next notification drain according to an [`AutoplayPolicy`],
//! and the position advances with simulated time while playing.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AudioResource, ControlSurface, MediaNotification, PlayRequest, ResourceProvider};
use crate::error::PlaybackError;
use crate::scheduler::SimClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoplayPolicy {
    /// Every play request succeeds.
    Allowed,
    /// Requests succeed only after a user gesture.
    Gesture,
    /// Every request is rejected.
    Denied,
}

#[derive(Debug, Clone)]
pub struct SimulatedAudio {
    id: String,
    clock: SimClock,
    policy: AutoplayPolicy,
    activated: bool,
    durations: Rc<HashMap<String, f64>>,
    src: String,
    duration: Option<f64>,
    /// Duration reported at the next notification drain.
    loading: Option<f64>,
    /// Known sources report their duration synchronously from `load`.
    metadata_cached: bool,
    /// Position at `playing_since` (or the frozen position while paused).
    position: f64,
    playing_since: Option<DateTime<Utc>>,
    volume: f64,
    muted: bool,
    looping: bool,
    next_request: u64,
    pending_plays: Vec<PlayRequest>,
    queued: Vec<MediaNotification>,
}

impl SimulatedAudio {
    pub fn new(id: &str, clock: SimClock, policy: AutoplayPolicy) -> Self {
        Self {
            id: id.to_string(),
            clock,
            policy,
            activated: false,
            durations: Rc::new(HashMap::new()),
            src: String::new(),
            duration: None,
            loading: None,
            metadata_cached: false,
            position: 0.0,
            playing_since: None,
            volume: 1.0,
            muted: false,
            looping: false,
            next_request: 0,
            pending_plays: Vec::new(),
            queued: Vec::new(),
        }
    }

    /// Declares the duration metadata `load` will report for a source.
    pub fn with_track(mut self, src: &str, duration: f64) -> Self {
        Rc::make_mut(&mut self.durations).insert(src.to_string(), duration);
        self
    }

    /// As if the browser already had the file's metadata cached.
    pub fn with_cached_metadata(mut self) -> Self {
        self.metadata_cached = true;
        self
    }

    fn with_durations(mut self, durations: Rc<HashMap<String, f64>>) -> Self {
        self.durations = durations;
        self
    }

    fn elapsed_position(&self) -> f64 {
        let Some(since) = self.playing_since else {
            return self.position;
        };
        let elapsed = (self.clock.now() - since).num_milliseconds().max(0) as f64 / 1000.0;
        let raw = self.position + elapsed;
        match self.duration {
            Some(d) if d > 0.0 && self.looping => raw % d,
            Some(d) => raw.min(d),
            None => raw,
        }
    }

    fn ended(&self) -> bool {
        matches!(self.duration, Some(d) if !self.looping && self.elapsed_position() >= d)
    }

    fn allows_play(&self) -> bool {
        match self.policy {
            AutoplayPolicy::Allowed => true,
            AutoplayPolicy::Gesture => self.activated,
            AutoplayPolicy::Denied => false,
        }
    }

    fn stop(&mut self) {
        if self.playing_since.is_some() {
            self.position = self.elapsed_position();
            self.playing_since = None;
            self.queued.push(MediaNotification::Paused);
        }
    }

    fn interrupt_pending(&mut self) {
        for request in self.pending_plays.drain(..) {
            self.queued.push(MediaNotification::PlaySettled {
                request,
                outcome: Err(PlaybackError::Interrupted),
            });
        }
    }
}

impl AudioResource for SimulatedAudio {
    fn id(&self) -> &str {
        &self.id
    }

    fn source(&self) -> &str {
        &self.src
    }

    fn set_source(&mut self, src: &str) {
        self.src = src.to_string();
    }

    fn load(&mut self) {
        self.interrupt_pending();
        self.stop();
        self.position = 0.0;
        self.duration = None;
        self.loading = self.durations.get(&self.src).copied();
        if let Some(d) = self.loading {
            if self.metadata_cached {
                self.duration = Some(d);
            }
            self.queued.push(MediaNotification::MetadataLoaded { duration: d });
        }
    }

    fn play(&mut self) -> PlayRequest {
        let request = PlayRequest(self.next_request);
        self.next_request += 1;
        self.pending_plays.push(request);
        request
    }

    fn pause(&mut self) {
        self.interrupt_pending();
        self.stop();
    }

    fn is_paused(&self) -> bool {
        self.playing_since.is_none() || self.ended()
    }

    fn current_time(&self) -> f64 {
        self.elapsed_position()
    }

    fn set_current_time(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        let d = self.duration.ok_or(PlaybackError::MetadataNotReady)?;
        self.position = seconds.clamp(0.0, d);
        if self.playing_since.is_some() {
            self.playing_since = Some(self.clock.now());
        }
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_looping(&self) -> bool {
        self.looping
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn take_notifications(&mut self) -> Vec<MediaNotification> {
        if self.ended() {
            self.stop();
        }
        if let Some(d) = self.loading.take() {
            self.duration = Some(d);
        }
        // Metadata is reported before any play outcome, as a real element
        // cannot start before it knows what it is playing.
        let pending: Vec<PlayRequest> = self.pending_plays.drain(..).collect();
        for request in pending {
            let outcome = if self.allows_play() {
                if self.playing_since.is_none() {
                    if matches!(self.duration, Some(d) if self.position >= d) {
                        self.position = 0.0;
                    }
                    self.playing_since = Some(self.clock.now());
                }
                Ok(())
            } else {
                Err(PlaybackError::Blocked)
            };
            self.queued.push(MediaNotification::PlaySettled { request, outcome });
        }
        std::mem::take(&mut self.queued)
    }

    fn user_activated(&mut self) {
        self.activated = true;
    }
}

/// Last values shown by a [`RecordingControls`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlsState {
    pub playing: bool,
    pub volume: f64,
    pub muted: bool,
}

/// A control surface that only remembers what it was told to show.
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct RecordingControls {
    state: Rc<RefCell<ControlsState>>,
}

impl RecordingControls {
    pub fn snapshot(&self) -> ControlsState {
        self.state.borrow().clone()
    }
}

impl ControlSurface for RecordingControls {
    fn show_playing(&mut self, playing: bool) {
        self.state.borrow_mut().playing = playing;
    }

    fn show_volume(&mut self, volume: f64) {
        self.state.borrow_mut().volume = volume;
    }

    fn show_muted(&mut self, muted: bool) {
        self.state.borrow_mut().muted = muted;
    }
}

/// Resource provider for pages rendered nowhere.
#[derive(Debug, Clone)]
pub struct HeadlessProvider {
    clock: SimClock,
    policy: AutoplayPolicy,
    durations: Rc<HashMap<String, f64>>,
    existing: HashSet<String>,
    metadata_cached: bool,
    controls: RecordingControls,
    created: Vec<String>,
}

impl HeadlessProvider {
    pub fn new(clock: SimClock, policy: AutoplayPolicy) -> Self {
        Self {
            clock,
            policy,
            durations: Rc::new(HashMap::new()),
            existing: HashSet::new(),
            metadata_cached: false,
            controls: RecordingControls::default(),
            created: Vec::new(),
        }
    }

    pub fn with_track(mut self, src: &str, duration: f64) -> Self {
        Rc::make_mut(&mut self.durations).insert(src.to_string(), duration);
        self
    }

    /// Pretends the page markup already contains an element with this id.
    pub fn with_existing_element(mut self, id: &str) -> Self {
        self.existing.insert(id.to_string());
        self
    }

    pub fn with_cached_metadata(mut self) -> Self {
        self.metadata_cached = true;
        self
    }

    pub fn controls(&self) -> RecordingControls {
        self.controls.clone()
    }

    /// Identifiers of elements this provider had to create.
    pub fn created(&self) -> &[String] {
        &self.created
    }

    fn build(&self, id: &str) -> SimulatedAudio {
        let audio = SimulatedAudio::new(id, self.clock.clone(), self.policy)
            .with_durations(Rc::clone(&self.durations));
        if self.metadata_cached {
            audio.with_cached_metadata()
        } else {
            audio
        }
    }
}

impl ResourceProvider for HeadlessProvider {
    type Resource = SimulatedAudio;

    fn locate_audio(&mut self, id: &str) -> Option<SimulatedAudio> {
        self.existing.contains(id).then(|| self.build(id))
    }

    fn create_audio(&mut self, id: &str) -> SimulatedAudio {
        self.created.push(id.to_string());
        self.existing.insert(id.to_string());
        self.build(id)
    }

    fn control_surface(&mut self) -> Box<dyn ControlSurface> {
        Box::new(self.controls.clone())
    }
}
