//! Shared page audio.
//!
//! The platform audio element, the control affordances and the way both are
//! found or created are traits here, so the controller can run against a
//! browser binding, the headless simulator, or a test double.

mod controller;
pub mod simulated;

pub use controller::AudioSessionController;
pub use simulated::{AutoplayPolicy, HeadlessProvider, RecordingControls, SimulatedAudio};

use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

/// Which source the shared resource is loaded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Main,
    Countdown,
}

/// Handle for one asynchronous play request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayRequest(pub u64);

/// Asynchronous notifications raised by an audio resource.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaNotification {
    MetadataLoaded { duration: f64 },
    PlaySettled {
        request: PlayRequest,
        outcome: Result<(), PlaybackError>,
    },
    /// Playback stopped (explicit pause, or a non-looping track ended).
    Paused,
}

/// The platform audio element.
///
/// `play` only starts a request; its outcome arrives later through
/// [`take_notifications`](AudioResource::take_notifications), so
/// `is_paused` may still report `true` right after a successful request.
pub trait AudioResource {
    fn id(&self) -> &str;
    fn source(&self) -> &str;
    fn set_source(&mut self, src: &str);
    fn load(&mut self);
    fn play(&mut self) -> PlayRequest;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn current_time(&self) -> f64;
    /// Fails with [`PlaybackError::MetadataNotReady`] while duration is unknown.
    fn set_current_time(&mut self, seconds: f64) -> Result<(), PlaybackError>;
    fn duration(&self) -> Option<f64>;
    fn volume(&self) -> f64;
    fn set_volume(&mut self, volume: f64);
    fn is_muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
    fn is_looping(&self) -> bool;
    fn set_looping(&mut self, looping: bool);
    fn take_notifications(&mut self) -> Vec<MediaNotification>;

    /// Host notice that a user gesture happened. Platforms that track
    /// activation on their own ignore it.
    fn user_activated(&mut self) {}
}

/// The play/pause and volume affordances owned by the rendering layer.
pub trait ControlSurface {
    fn show_playing(&mut self, playing: bool);
    fn show_volume(&mut self, volume: f64);
    fn show_muted(&mut self, muted: bool);
}

/// Locate-or-create access to rendering resources.
pub trait ResourceProvider {
    type Resource: AudioResource;

    /// An existing element with this identifier, if the page has one.
    fn locate_audio(&mut self, id: &str) -> Option<Self::Resource>;
    fn create_audio(&mut self, id: &str) -> Self::Resource;
    /// Existing controls, or freshly created ones. Called once per page.
    fn control_surface(&mut self) -> Box<dyn ControlSurface>;
}

/// Everything the reveal gate may do to audio.
pub trait AudioCapabilities {
    /// Direct handle to the shared resource.
    fn resource(&mut self) -> &mut dyn AudioResource;
    /// Requests playback of whatever is loaded, unless a request is already
    /// waiting to settle.
    fn request_play(&mut self) -> Option<PlayRequest>;
    /// Switch tracks. Destructive to in-progress playback.
    fn set_mode(&mut self, countdown: bool);
    /// Play the countdown track from the start, whatever the mode.
    fn play_snippet(&mut self);
    fn is_countdown_mode(&self) -> bool;
}
