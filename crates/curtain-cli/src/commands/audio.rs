use chrono::Utc;
use clap::Subcommand;

use curtain_core::{AudioSessionController, AutoplayPolicy};

use super::{Host, TrackLengths};

#[derive(Subcommand)]
pub enum AudioAction {
    /// Set the persisted volume (clamped into 0..=1)
    Volume {
        /// New volume
        value: f64,
    },
    /// Toggle the persisted mute flag
    Mute,
    /// Disable music: forget the gesture grant and stop playback
    Disable,
}

pub fn run(action: AudioAction) -> curtain_core::Result<()> {
    let mut host = Host::open(Utc::now(), AutoplayPolicy::Denied, TrackLengths::default())?;
    let mut controller = AudioSessionController::initialize(
        &mut host.provider,
        host.storage.clone(),
        host.config.audio.clone(),
        &mut host.scheduler,
    );
    controller.drain_events();

    match action {
        AudioAction::Volume { value } => controller.set_volume(value),
        AudioAction::Mute => controller.toggle_mute(),
        AudioAction::Disable => controller.disable(),
    }

    println!("{}", serde_json::to_string_pretty(&controller.drain_events())?);
    Ok(())
}
