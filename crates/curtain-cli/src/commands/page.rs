use chrono::{DateTime, Duration, Utc};
use clap::{Subcommand, ValueEnum};
use serde::Serialize;
use tracing::warn;

use curtain_core::storage::keys;
use curtain_core::{
    AutoplayPolicy, CoreError, CountdownEngine, CountdownState, CountdownTick, Page,
    PageLocation, StorageScope,
};

use super::{Host, TrackLengths};

#[derive(Subcommand)]
pub enum PageAction {
    /// Run one page lifetime on a simulated clock and print its events
    Simulate {
        /// Page URL or path
        #[arg(long, default_value = "/")]
        url: String,
        /// Load instant (RFC 3339), defaults to the current time
        #[arg(long)]
        now: Option<DateTime<Utc>>,
        /// How long the page stays open, in milliseconds
        #[arg(long, default_value = "0")]
        for_ms: u64,
        /// Offset (ms) of a click on the page
        #[arg(long)]
        gesture_at: Option<u64>,
        /// Offset (ms) of a reveal request; repeatable
        #[arg(long)]
        reveal_at: Vec<u64>,
        /// How the simulated element treats play requests
        #[arg(long, value_enum, default_value = "allowed")]
        autoplay: AutoplayArg,
        /// Duration reported for the main track, in seconds
        #[arg(long, default_value = "180")]
        main_secs: f64,
        /// Duration reported for the countdown track, in seconds
        #[arg(long, default_value = "30")]
        countdown_secs: f64,
    },
    /// Print the countdown reading and persisted preferences as JSON
    Status {
        /// Instant to evaluate at (RFC 3339), defaults to the current time
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum AutoplayArg {
    Allowed,
    Gesture,
    Denied,
}

impl From<AutoplayArg> for AutoplayPolicy {
    fn from(arg: AutoplayArg) -> Self {
        match arg {
            AutoplayArg::Allowed => AutoplayPolicy::Allowed,
            AutoplayArg::Gesture => AutoplayPolicy::Gesture,
            AutoplayArg::Denied => AutoplayPolicy::Denied,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Input {
    Gesture,
    Reveal,
}

#[derive(Serialize)]
struct Status {
    now: DateTime<Utc>,
    target: DateTime<Utc>,
    remaining_ms: i64,
    countdown: Option<CountdownState>,
    revealed: bool,
    volume: Option<f64>,
    muted: Option<bool>,
    user_gesture_granted: bool,
    last_position: Option<f64>,
    last_playing: Option<bool>,
}

/// `start + ms`, or an error when the sum leaves chrono's calendar.
fn at_offset(start: DateTime<Utc>, ms: u64) -> curtain_core::Result<DateTime<Utc>> {
    i64::try_from(ms)
        .ok()
        .and_then(|ms| start.checked_add_signed(Duration::milliseconds(ms)))
        .ok_or_else(|| {
            CoreError::InvalidInput(format!("offset of {ms} ms from {start} is out of range"))
        })
}

pub fn run(action: PageAction) -> curtain_core::Result<()> {
    match action {
        PageAction::Simulate {
            url,
            now,
            for_ms,
            gesture_at,
            reveal_at,
            autoplay,
            main_secs,
            countdown_secs,
        } => {
            let location = PageLocation::parse(&url)?;
            let start = now.unwrap_or_else(Utc::now);
            let end = at_offset(start, for_ms)?;
            let host = Host::open(
                start,
                autoplay.into(),
                TrackLengths {
                    main_secs,
                    countdown_secs,
                },
            )?;
            let Host {
                storage,
                config,
                scheduler,
                mut provider,
                ..
            } = host;

            let mut inputs: Vec<(u64, Input)> = reveal_at
                .into_iter()
                .map(|ms| (ms, Input::Reveal))
                .chain(gesture_at.map(|ms| (ms, Input::Gesture)))
                .collect();
            inputs.sort();

            let mut page = Page::load(location, &config, &mut provider, storage, scheduler);
            for (offset, input) in inputs {
                if offset > for_ms {
                    warn!(offset, for_ms, "input after the page closes, skipped");
                    continue;
                }
                page.advance_to(at_offset(start, offset)?);
                match input {
                    Input::Gesture => page.gesture(),
                    Input::Reveal => page.request_reveal(),
                }
            }
            page.advance_to(end);
            page.teardown();

            println!("{}", serde_json::to_string_pretty(&page.drain_events())?);
        }
        PageAction::Status { now } => {
            let now = now.unwrap_or_else(Utc::now);
            let host = Host::open(now, AutoplayPolicy::Allowed, TrackLengths::default())?;
            let storage = &host.storage;
            let target = host.config.countdown.target;

            let mut engine = CountdownEngine::new(target);
            let countdown = match engine.tick(now) {
                CountdownTick::Running(state) => Some(state),
                _ => None,
            };
            let granted = |scope: StorageScope| storage.get_bool(scope, keys::USER_GESTURE_GRANTED) == Some(true);

            let status = Status {
                now,
                target,
                remaining_ms: engine.remaining_ms(now),
                countdown,
                revealed: storage.get(StorageScope::Durable, keys::REVEALED).as_deref()
                    == Some(keys::REVEALED_VALUE),
                volume: storage.get_f64(StorageScope::Durable, keys::VOLUME),
                muted: storage.get_bool(StorageScope::Durable, keys::MUTED),
                user_gesture_granted: granted(StorageScope::Durable) || granted(StorageScope::Session),
                last_position: storage.get_f64(StorageScope::Session, keys::LAST_POSITION),
                last_playing: storage.get_bool(StorageScope::Session, keys::LAST_PLAYING),
            };
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}
