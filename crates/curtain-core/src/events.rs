use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audio::Track;
use crate::countdown::CountdownState;
use crate::reveal::RevealTrigger;

/// Every observable state change on a page produces an Event.
/// The rendering layer consumes them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Preferences and snapshot applied at startup.
    AudioRestored {
        volume: f64,
        muted: bool,
        /// Position waiting for duration metadata, if any.
        pending_position: Option<f64>,
        resource_created: bool,
    },
    TrackChanged {
        track: Track,
        looping: bool,
    },
    PlaybackStarted {
        track: Track,
    },
    /// Play request rejected; the gesture hook will retry once.
    PlaybackBlocked {
        track: Track,
    },
    PlaybackPaused {
        track: Track,
    },
    PositionRestored {
        position: f64,
    },
    /// Persisted position fell outside `[0, duration)` and was dropped.
    PositionDiscarded {
        position: f64,
        duration: f64,
    },
    VolumeChanged {
        volume: f64,
    },
    MuteChanged {
        muted: bool,
    },
    GestureRetry {
        attempted: bool,
    },
    MusicDisabled,
    SoundPromptShown,
    SoundPromptDismissed,
    CountdownUpdated {
        state: CountdownState,
    },
    CountdownExpired {
        at: DateTime<Utc>,
    },
    /// Gate opened. `at` is the transition instant.
    Revealed {
        trigger: RevealTrigger,
        at: DateTime<Utc>,
    },
    /// Manual reveal before the target: the engagement snippet plays instead.
    RevealDenied {
        remaining_ms: i64,
        at: DateTime<Utc>,
    },
    SnippetStopped {
        at: DateTime<Utc>,
    },
    PageTornDown {
        at: DateTime<Utc>,
    },
}
