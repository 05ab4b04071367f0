//! Audio session controller.
//!
//! Owns the shared audio resource for one page evaluation. All continuity
//! across reloads lives in storage:
//!
//! ```text
//! durable:  volume, muted, userGestureGranted
//! session:  lastPosition, lastPlaying, userGestureGranted
//! ```
//!
//! The controller is restored from storage in [`initialize`], snapshots the
//! session keys on a fixed interval and at teardown, and never surfaces a
//! storage or playback failure to its caller.
//!
//! [`initialize`]: AudioSessionController::initialize

use std::rc::Rc;

use tracing::{debug, info, warn};

use super::{
    AudioCapabilities, AudioResource, ControlSurface, MediaNotification, PlayRequest,
    ResourceProvider, Track,
};
use crate::error::PlaybackError;
use crate::events::Event;
use crate::scheduler::{Scheduler, TimerId, TimerKind};
use crate::storage::{keys, AudioConfig, StorageBridge, StorageScope};

/// One-shot retry armed at load, spent by the first gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureHook {
    Armed,
    Spent,
}

pub struct AudioSessionController<R: AudioResource> {
    resource: R,
    controls: Box<dyn ControlSurface>,
    storage: Rc<StorageBridge>,
    config: AudioConfig,
    resource_created: bool,
    active_track: Track,
    countdown_mode: bool,
    /// Restored position waiting for duration metadata.
    pending_position: Option<f64>,
    gesture: GestureHook,
    gesture_request: Option<PlayRequest>,
    /// Outstanding play requests, so repeated triggers don't stack requests.
    in_flight: Vec<PlayRequest>,
    /// Observed, not authoritative.
    playing: bool,
    snapshot_timer: Option<TimerId>,
    outbox: Vec<Event>,
}

impl<R: AudioResource> AudioSessionController<R> {
    /// Locate or create the shared resource, load the main track, restore
    /// preferences and position, and start the snapshot timer.
    pub fn initialize<P>(
        provider: &mut P,
        storage: Rc<StorageBridge>,
        config: AudioConfig,
        scheduler: &mut Scheduler,
    ) -> Self
    where
        P: ResourceProvider<Resource = R>,
    {
        let located = config
            .resource_ids
            .iter()
            .find_map(|id| provider.locate_audio(id));
        let (mut resource, resource_created) = match located {
            Some(resource) => (resource, false),
            None => {
                let id = config
                    .resource_ids
                    .last()
                    .map(String::as_str)
                    .unwrap_or("global-audio");
                let mut resource = provider.create_audio(id);
                resource.set_looping(true);
                (resource, true)
            }
        };
        let controls = provider.control_surface();

        resource.set_source(&config.main_track);
        resource.load();

        let snapshot_timer =
            Some(scheduler.schedule_interval(TimerKind::Snapshot, config.snapshot_interval()));

        let mut controller = Self {
            resource,
            controls,
            storage,
            config,
            resource_created,
            active_track: Track::Main,
            countdown_mode: false,
            pending_position: None,
            gesture: GestureHook::Armed,
            gesture_request: None,
            in_flight: Vec::new(),
            playing: false,
            snapshot_timer,
            outbox: Vec::new(),
        };
        controller.restore();
        controller
    }

    fn restore(&mut self) {
        if let Some(volume) = self.storage.get_f64(StorageScope::Durable, keys::VOLUME) {
            if (0.0..=1.0).contains(&volume) {
                self.resource.set_volume(volume);
            } else {
                debug!(volume, "ignoring out-of-range persisted volume");
            }
        }
        if self.storage.get_bool(StorageScope::Durable, keys::MUTED) == Some(true) {
            self.resource.set_muted(true);
        }

        if let Some(position) = self
            .storage
            .get_f64(StorageScope::Session, keys::LAST_POSITION)
            .filter(|p| *p > 0.0)
        {
            match self.resource.duration() {
                Some(duration) => self.apply_position(position, duration),
                None => {
                    debug!(position, "deferring position until metadata is loaded");
                    self.pending_position = Some(position);
                }
            }
        }

        let was_playing = self.storage.get_bool(StorageScope::Session, keys::LAST_PLAYING);
        debug!(?was_playing, "audio session restored");

        self.controls.show_volume(self.resource.volume());
        self.controls.show_muted(self.resource.is_muted());
        self.controls.show_playing(false);
        self.outbox.push(Event::AudioRestored {
            volume: self.resource.volume(),
            muted: self.resource.is_muted(),
            pending_position: self.pending_position,
            resource_created: self.resource_created,
        });
    }

    /// Applies a restored position if it lies in `(0, duration)`; anything
    /// else is discarded rather than clamped.
    fn apply_position(&mut self, position: f64, duration: f64) {
        if position > 0.0 && position < duration {
            match self.resource.set_current_time(position) {
                Ok(()) => {
                    debug!(position, "position restored");
                    self.outbox.push(Event::PositionRestored { position });
                }
                Err(e) => {
                    warn!(position, error = %e, "position could not be applied, discarding");
                    self.outbox.push(Event::PositionDiscarded { position, duration });
                }
            }
        } else {
            debug!(position, duration, "persisted position out of range, discarding");
            self.outbox.push(Event::PositionDiscarded { position, duration });
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn resource_ref(&self) -> &R {
        &self.resource
    }

    pub fn resource_mut(&mut self) -> &mut R {
        &mut self.resource
    }

    pub fn active_track(&self) -> Track {
        self.active_track
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn pending_position(&self) -> Option<f64> {
        self.pending_position
    }

    pub fn gesture_hook_armed(&self) -> bool {
        self.gesture == GestureHook::Armed
    }

    pub fn has_play_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// The "music enabled" indicator shows once a gesture unlocked playback
    /// in this session or any earlier one.
    pub fn music_indicator_visible(&self) -> bool {
        self.storage.get_bool(StorageScope::Session, keys::USER_GESTURE_GRANTED) == Some(true)
            || self.storage.get_bool(StorageScope::Durable, keys::USER_GESTURE_GRANTED)
                == Some(true)
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    // ── Commands ─────────────────────────────────────────────────────

    fn load_track(&mut self, track: Track) {
        let src = match track {
            Track::Main => self.config.main_track.clone(),
            Track::Countdown => self.config.countdown_track.clone(),
        };
        self.resource.pause();
        self.resource.set_source(&src);
        self.resource.load();
        // Fails until metadata arrives; load already starts at zero.
        let _ = self.resource.set_current_time(0.0);
        self.active_track = track;
        self.in_flight.clear();
    }

    /// Autoplay attempt made once per page load.
    pub fn autoplay(&mut self) {
        if self.resource.is_paused() {
            self.request_play();
        }
    }

    /// Play/pause affordance. While the countdown is showing it previews the
    /// countdown track instead.
    pub fn toggle_play_pause(&mut self) {
        if self.countdown_mode {
            self.play_snippet();
        } else if self.resource.is_paused() {
            self.request_play();
        } else {
            self.resource.pause();
        }
    }

    /// Clamped into `[0, 1]`; NaN is ignored. Written through immediately.
    pub fn set_volume(&mut self, volume: f64) {
        if volume.is_nan() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.resource.set_volume(volume);
        self.storage
            .set_f64(StorageScope::Durable, keys::VOLUME, self.resource.volume());
        self.controls.show_volume(self.resource.volume());
        self.outbox.push(Event::VolumeChanged {
            volume: self.resource.volume(),
        });
    }

    pub fn toggle_mute(&mut self) {
        let muted = !self.resource.is_muted();
        self.resource.set_muted(muted);
        self.storage.set_bool(StorageScope::Durable, keys::MUTED, muted);
        self.controls.show_muted(muted);
        self.outbox.push(Event::MuteChanged { muted });
    }

    /// First click/touch after load. Retries playback once if paused; later
    /// gestures do nothing here. While a play request is still settling the
    /// hook stays armed, so a request that then comes back blocked can still
    /// be retried.
    pub fn on_first_gesture(&mut self) {
        if self.gesture == GestureHook::Spent {
            return;
        }
        if self.resource.is_paused() && !self.in_flight.is_empty() {
            debug!("play request still settling, gesture hook stays armed");
            return;
        }
        self.gesture = GestureHook::Spent;
        let attempted = self.resource.is_paused();
        if attempted {
            self.gesture_request = self.request_play();
        }
        self.outbox.push(Event::GestureRetry { attempted });
    }

    /// Clears the gesture preference in both scopes and stops playback.
    /// The reveal flag is not this controller's to touch.
    pub fn disable(&mut self) {
        self.storage
            .remove(StorageScope::Session, keys::USER_GESTURE_GRANTED);
        self.storage
            .remove(StorageScope::Durable, keys::USER_GESTURE_GRANTED);
        self.storage
            .set_bool(StorageScope::Session, keys::LAST_PLAYING, false);
        self.resource.pause();
        info!("music disabled");
        self.outbox.push(Event::MusicDisabled);
    }

    /// Writes the session snapshot. A position still waiting for metadata
    /// is written back as-is so a quick reload does not lose it.
    pub fn snapshot(&self) {
        let position = self
            .pending_position
            .unwrap_or_else(|| self.resource.current_time());
        self.storage
            .set_f64(StorageScope::Session, keys::LAST_POSITION, position);
        self.storage
            .set_bool(StorageScope::Session, keys::LAST_PLAYING, !self.resource.is_paused());
    }

    /// Final snapshot and timer cancellation. Safe to call twice.
    pub fn teardown(&mut self, scheduler: &mut Scheduler) {
        if let Some(id) = self.snapshot_timer.take() {
            scheduler.cancel(id);
            self.snapshot();
        }
    }

    // ── Notifications ────────────────────────────────────────────────

    /// Pulls pending notifications off the resource for the dispatcher.
    pub fn poll_resource(&mut self) -> Vec<MediaNotification> {
        self.resource.take_notifications()
    }

    pub fn on_notification(&mut self, notification: MediaNotification) {
        match notification {
            MediaNotification::MetadataLoaded { duration } => self.on_metadata_loaded(duration),
            MediaNotification::PlaySettled { request, outcome } => {
                self.on_play_settled(request, outcome)
            }
            MediaNotification::Paused => {
                if self.playing {
                    self.playing = false;
                    self.controls.show_playing(false);
                    self.outbox.push(Event::PlaybackPaused {
                        track: self.active_track,
                    });
                }
            }
        }
    }

    /// Applies a deferred position exactly once.
    pub fn on_metadata_loaded(&mut self, duration: f64) {
        if let Some(position) = self.pending_position.take() {
            self.apply_position(position, duration);
        }
    }

    fn on_play_settled(&mut self, request: PlayRequest, outcome: Result<(), PlaybackError>) {
        self.in_flight.retain(|r| *r != request);
        let from_gesture = self.gesture_request == Some(request);
        if from_gesture {
            self.gesture_request = None;
        }

        match outcome {
            Ok(()) => {
                if !self.playing {
                    self.playing = true;
                    self.controls.show_playing(true);
                    self.outbox.push(Event::PlaybackStarted {
                        track: self.active_track,
                    });
                }
                if from_gesture {
                    self.storage
                        .set_bool(StorageScope::Session, keys::USER_GESTURE_GRANTED, true);
                    self.storage
                        .set_bool(StorageScope::Durable, keys::USER_GESTURE_GRANTED, true);
                }
            }
            Err(PlaybackError::Blocked) => {
                warn!(track = ?self.active_track, "playback blocked, waiting for a gesture");
                self.playing = false;
                self.controls.show_playing(false);
                self.outbox.push(Event::PlaybackBlocked {
                    track: self.active_track,
                });
            }
            Err(e) => {
                debug!(error = %e, "play request did not complete");
                self.playing = !self.resource.is_paused();
                self.controls.show_playing(self.playing);
            }
        }
    }
}

impl<R: AudioResource> AudioCapabilities for AudioSessionController<R> {
    fn resource(&mut self) -> &mut dyn AudioResource {
        &mut self.resource
    }

    fn request_play(&mut self) -> Option<PlayRequest> {
        if !self.in_flight.is_empty() {
            return None;
        }
        let request = self.resource.play();
        self.in_flight.push(request);
        Some(request)
    }

    fn set_mode(&mut self, countdown: bool) {
        self.countdown_mode = countdown;
        self.pending_position = None;
        let track = if countdown { Track::Countdown } else { Track::Main };
        self.load_track(track);
        self.resource.set_looping(!countdown);
        info!(?track, "audio mode switched");
        self.outbox.push(Event::TrackChanged {
            track,
            looping: !countdown,
        });
    }

    fn play_snippet(&mut self) {
        self.load_track(Track::Countdown);
        self.request_play();
    }

    fn is_countdown_mode(&self) -> bool {
        self.countdown_mode
    }
}
