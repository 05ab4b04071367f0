//! Storage key names shared by the audio controller and the reveal gate.

// Durable scope
pub const VOLUME: &str = "volume";
pub const MUTED: &str = "muted";
pub const USER_GESTURE_GRANTED: &str = "userGestureGranted";
pub const REVEALED: &str = "revealed";

// Session scope (USER_GESTURE_GRANTED is mirrored here too)
pub const LAST_POSITION: &str = "lastPosition";
pub const LAST_PLAYING: &str = "lastPlaying";

/// Value written to [`REVEALED`] once the gate opens.
pub const REVEALED_VALUE: &str = "1";
