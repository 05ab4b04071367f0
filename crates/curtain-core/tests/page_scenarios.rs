//! Integration tests for whole page lifetimes.
//!
//! Each test drives a [`Page`] on a simulated clock against in-memory
//! storage that outlives the page, so reloads see what the previous page
//! persisted.

use std::rc::Rc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use curtain_core::{
    AudioResource, AutoplayPolicy, Config, Event, HeadlessProvider, MemoryStore, Page,
    PageLocation, RevealPhase, RevealTrigger, Scheduler, SimulatedAudio, StorageBridge, Track,
};

fn target() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 12, 23, 40, 0).unwrap()
}

/// Browser storage that survives page loads.
struct Site {
    durable: MemoryStore,
    session: MemoryStore,
    config: Config,
    main_secs: Option<f64>,
}

impl Site {
    fn new() -> Self {
        Self {
            durable: MemoryStore::new(),
            session: MemoryStore::new(),
            config: Config::default(),
            main_secs: Some(200.0),
        }
    }

    fn open(&self, url: &str, now: DateTime<Utc>, policy: AutoplayPolicy) -> Page<SimulatedAudio> {
        let storage = Rc::new(StorageBridge::new(
            Box::new(self.durable.clone()),
            Box::new(self.session.clone()),
        ));
        let scheduler = Scheduler::new(now);
        let mut provider = HeadlessProvider::new(scheduler.clock(), policy)
            .with_track(&self.config.audio.countdown_track, 30.0);
        if let Some(secs) = self.main_secs {
            provider = provider.with_track(&self.config.audio.main_track, secs);
        }
        Page::load(
            PageLocation::parse(url).unwrap(),
            &self.config,
            &mut provider,
            storage,
            scheduler,
        )
    }
}

fn count(events: &[Event], pred: impl Fn(&Event) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

#[test]
fn test_countdown_expires_into_reveal() {
    let site = Site::new();
    let start = Utc.with_ymd_and_hms(2026, 1, 12, 23, 39, 58).unwrap();
    let mut page = site.open("/", start, AutoplayPolicy::Allowed);

    let first = page.drain_events();
    let state = first
        .iter()
        .find_map(|e| match e {
            Event::CountdownUpdated { state } => Some(state.clone()),
            _ => None,
        })
        .expect("first tick runs at load");
    assert_eq!(state.remaining_ms, 2000);
    assert!(!state.units.days_visible);
    assert_eq!(state.units.days.value, "--");
    assert_eq!(state.units.hours.value, "00");
    assert_eq!(state.units.minutes.value, "00");
    assert_eq!(state.units.seconds.value, "02");

    page.advance_to(target());
    page.advance_by(Duration::seconds(10));
    let events = page.drain_events();
    assert_eq!(count(&events, |e| matches!(e, Event::CountdownExpired { .. })), 1);
    assert!(events.contains(&Event::Revealed {
        trigger: RevealTrigger::TimerExpiry,
        at: target(),
    }));
    assert_eq!(page.reveal_phase(), Some(RevealPhase::Unlocked));
    assert_eq!(site.durable.peek("revealed").as_deref(), Some("1"));
}

#[test]
fn test_reveal_switches_to_main_loop() {
    let site = Site::new();
    let mut page = site.open("/", target() - Duration::seconds(3), AutoplayPolicy::Allowed);
    assert_eq!(page.audio().active_track(), Track::Countdown);
    assert!(!page.audio().resource_ref().is_looping());
    assert!(page.audio().is_playing());

    page.advance_by(Duration::seconds(3));
    assert_eq!(page.audio().active_track(), Track::Main);
    assert!(page.audio().resource_ref().is_looping());
    assert!(page.audio().is_playing());
    let events = page.drain_events();
    assert!(events.contains(&Event::PlaybackStarted { track: Track::Main }));
}

#[test]
fn test_early_manual_reveal_stays_locked() {
    let site = Site::new();
    let mut page = site.open("/", target() - Duration::hours(2), AutoplayPolicy::Allowed);
    page.request_reveal();
    assert_eq!(page.reveal_phase(), Some(RevealPhase::Locked));
    assert_eq!(site.durable.peek("revealed"), None);
    assert!(page
        .drain_events()
        .iter()
        .any(|e| matches!(e, Event::RevealDenied { remaining_ms: 7_200_000, .. })));
}

#[test]
fn test_manual_reveal_after_target() {
    let site = Site::new();
    let mut page = site.open("/", target() - Duration::milliseconds(500), AutoplayPolicy::Allowed);
    // Past the target but before the next tick notices.
    page.advance_by(Duration::milliseconds(600));
    page.request_reveal();
    assert_eq!(page.gate().and_then(|g| g.trigger()), Some(RevealTrigger::ManualAfterTarget));
    assert_eq!(site.durable.peek("revealed").as_deref(), Some("1"));

    page.advance_by(Duration::seconds(5));
    let events = page.drain_events();
    assert_eq!(count(&events, |e| matches!(e, Event::Revealed { .. })), 1);
}

#[test]
fn test_reveal_twice_switches_tracks_once() {
    let site = Site::new();
    let mut page = site.open("/", target() - Duration::seconds(1), AutoplayPolicy::Allowed);
    page.advance_by(Duration::seconds(2));
    assert_eq!(site.durable.peek("revealed").as_deref(), Some("1"));

    site.durable.clear();
    page.request_reveal();
    assert_eq!(site.durable.peek("revealed").as_deref(), Some("1"));

    let events = page.drain_events();
    let to_main = count(&events, |e| {
        matches!(e, Event::TrackChanged { track: Track::Main, .. })
    });
    assert_eq!(to_main, 1);
    assert_eq!(count(&events, |e| matches!(e, Event::Revealed { .. })), 1);
}

#[test]
fn test_snippet_retrigger_moves_the_stop() {
    let site = Site::new();
    let mut page = site.open("/", target() - Duration::hours(1), AutoplayPolicy::Allowed);
    page.advance_by(Duration::seconds(1));
    let t0 = page.now();

    page.request_reveal();
    page.advance_by(Duration::milliseconds(500));
    page.request_reveal();

    page.advance_to(t0 + Duration::milliseconds(2000));
    assert!(!page.audio().resource_ref().is_paused());
    assert!(page.gate().unwrap().user_triggered());
    assert_eq!(
        count(&page.drain_events(), |e| matches!(e, Event::SnippetStopped { .. })),
        0
    );

    page.advance_to(t0 + Duration::milliseconds(2500));
    assert!(page.audio().resource_ref().is_paused());
    assert!(!page.gate().unwrap().user_triggered());
    assert!(page.drain_events().contains(&Event::SnippetStopped {
        at: t0 + Duration::milliseconds(2500)
    }));
}

#[test]
fn test_query_override_unlocks_before_first_tick() {
    let site = Site::new();
    let mut page = site.open("/?reveal=1", target() - Duration::days(4), AutoplayPolicy::Allowed);
    assert_eq!(page.reveal_phase(), Some(RevealPhase::Unlocked));
    assert_eq!(page.gate().unwrap().tick_timer(), None);
    assert_eq!(site.durable.peek("revealed").as_deref(), Some("1"));

    page.advance_by(Duration::seconds(3));
    let events = page.drain_events();
    assert_eq!(count(&events, |e| matches!(e, Event::CountdownUpdated { .. })), 0);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Revealed {
            trigger: RevealTrigger::QueryOverride,
            ..
        }
    )));
}

#[test]
fn test_earlier_reveal_still_shows_the_countdown() {
    let site = Site::new();
    site.durable.insert("revealed", "1");
    let mut page = site.open("/index.html", target() - Duration::days(1), AutoplayPolicy::Allowed);
    assert_eq!(page.reveal_phase(), Some(RevealPhase::Locked));
    assert_eq!(page.audio().active_track(), Track::Countdown);

    page.advance_by(Duration::seconds(5));
    page.request_reveal();
    let events = page.drain_events();
    assert_eq!(count(&events, |e| matches!(e, Event::CountdownUpdated { .. })), 6);
    assert_eq!(count(&events, |e| matches!(e, Event::Revealed { .. })), 0);
    assert_eq!(count(&events, |e| matches!(e, Event::RevealDenied { .. })), 1);
    assert_eq!(page.reveal_phase(), Some(RevealPhase::Locked));
    assert_eq!(site.durable.peek("revealed").as_deref(), Some("1"));
}

#[test]
fn test_reveal_request_off_entry_page_is_ignored() {
    let site = Site::new();
    let mut page = site.open("/gallery.html", target() + Duration::days(1), AutoplayPolicy::Allowed);
    page.request_reveal();
    assert_eq!(page.reveal_phase(), None);
    assert_eq!(site.durable.peek("revealed"), None);
}

#[test]
fn test_position_carries_across_reload() {
    let site = Site::new();
    let start = target() + Duration::days(1);
    let mut first = site.open("/gallery.html", start, AutoplayPolicy::Allowed);
    first.advance_by(Duration::milliseconds(42_500));
    first.teardown();
    assert_eq!(site.session.peek("lastPosition").as_deref(), Some("42.5"));
    assert_eq!(site.session.peek("lastPlaying").as_deref(), Some("true"));

    let mut second = site.open("/gallery.html", start + Duration::minutes(1), AutoplayPolicy::Allowed);
    let events = second.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::AudioRestored {
            pending_position: Some(p),
            ..
        } if (*p - 42.5).abs() < 1e-9
    )));
    assert!(events.contains(&Event::PositionRestored { position: 42.5 }));
    assert!((second.audio().resource_ref().current_time() - 42.5).abs() < 1e-9);
}

#[test]
fn test_out_of_range_position_is_discarded() {
    let site = Site::new();
    site.session.insert("lastPosition", "250");
    let mut page = site.open("/gallery.html", target(), AutoplayPolicy::Allowed);
    let events = page.drain_events();
    assert!(events.contains(&Event::PositionDiscarded {
        position: 250.0,
        duration: 200.0,
    }));
    assert_eq!(page.audio().resource_ref().current_time(), 0.0);
}

#[test]
fn test_snapshot_keeps_position_waiting_for_metadata() {
    let mut site = Site::new();
    site.main_secs = None;
    site.session.insert("lastPosition", "17");
    let mut page = site.open("/gallery.html", target(), AutoplayPolicy::Denied);
    assert_eq!(page.audio().pending_position(), Some(17.0));

    page.advance_by(Duration::seconds(2));
    page.teardown();
    assert_eq!(site.session.peek("lastPosition").as_deref(), Some("17"));
    assert_eq!(site.session.peek("lastPlaying").as_deref(), Some("false"));
}

#[test]
fn test_blocked_autoplay_retried_by_first_gesture_only() {
    let site = Site::new();
    let mut page = site.open("/gallery.html", target(), AutoplayPolicy::Gesture);
    assert!(!page.audio().is_playing());
    assert!(!page.music_indicator_visible());

    page.gesture();
    assert!(page.audio().is_playing());
    assert!(page.music_indicator_visible());
    assert_eq!(site.durable.peek("userGestureGranted").as_deref(), Some("true"));

    page.toggle_play_pause();
    page.gesture();
    assert!(!page.audio().is_playing());
    let events = page.drain_events();
    assert_eq!(count(&events, |e| matches!(e, Event::GestureRetry { .. })), 1);
}

#[test]
fn test_disable_music_never_touches_reveal() {
    let site = Site::new();
    let mut page = site.open("/?reveal=1", target(), AutoplayPolicy::Allowed);
    page.gesture();
    page.disable_music();
    assert_eq!(site.durable.peek("revealed").as_deref(), Some("1"));
    assert_eq!(site.durable.peek("userGestureGranted"), None);
    assert!(page.audio().resource_ref().is_paused());
    assert!(page.drain_events().contains(&Event::MusicDisabled));
}

#[test]
fn test_teardown_cancels_everything() {
    let site = Site::new();
    let mut page = site.open("/", target() - Duration::minutes(1), AutoplayPolicy::Allowed);
    page.request_reveal();
    assert!(page.pending_timers() >= 3);
    page.teardown();
    assert_eq!(page.pending_timers(), 0);
    assert!(page.is_torn_down());

    page.advance_by(Duration::minutes(5));
    assert_eq!(site.durable.peek("revealed"), None);
}

#[test]
fn test_page_runs_with_storage_disabled() {
    let storage = Rc::new(StorageBridge::new(
        Box::new(MemoryStore::unavailable()),
        Box::new(MemoryStore::unavailable()),
    ));
    let config = Config::default();
    let scheduler = Scheduler::new(target() - Duration::seconds(1));
    let mut provider = HeadlessProvider::new(scheduler.clock(), AutoplayPolicy::Allowed)
        .with_track(&config.audio.main_track, 200.0)
        .with_track(&config.audio.countdown_track, 30.0);
    let mut page = Page::load(
        PageLocation::parse("/").unwrap(),
        &config,
        &mut provider,
        storage,
        scheduler,
    );

    page.set_volume(0.3);
    page.advance_by(Duration::seconds(2));
    assert_eq!(page.reveal_phase(), Some(RevealPhase::Unlocked));
    assert_eq!(page.audio().resource_ref().volume(), 0.3);
    page.teardown();
}
