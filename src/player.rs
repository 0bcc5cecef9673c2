use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::listeners::{ListenerId, Subscription};
use crate::media::{MediaElement, MediaEvent, MediaEventKind};

/// Mirror of a media element's transport state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_time_seconds: f64,
    /// 0 until metadata reports a usable duration.
    pub duration_seconds: f64,
    pub volume: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_time_seconds: 0.0,
            duration_seconds: 0.0,
            volume: 1.0,
        }
    }
}

impl PlaybackState {
    /// Fold one transport event into the mirror.
    pub fn apply(&mut self, event: &MediaEvent) {
        match event {
            MediaEvent::LoadedMetadata { duration } => {
                self.duration_seconds = finite_or_zero(*duration);
            }
            MediaEvent::TimeUpdate { current_time } => {
                self.current_time_seconds = finite_or_zero(*current_time);
            }
            MediaEvent::Play => self.is_playing = true,
            MediaEvent::Pause | MediaEvent::Ended => self.is_playing = false,
            MediaEvent::PlaybackRejected { reason, paused } => {
                log::debug!("Play request rejected: {}", reason);
                self.is_playing = !paused;
            }
        }
    }
}

pub type SharedPlayback = Arc<RwLock<PlaybackState>>;

/// Drives one media element and keeps a `PlaybackState` in sync with it.
///
/// `is_playing` is set optimistically by `toggle_playback`, but the element's
/// own events always have the last word, so a refused play request or a pause
/// from outside the page is reflected once the element reports it.
pub struct PlaybackController<E: MediaElement + 'static> {
    element: Arc<E>,
    state: SharedPlayback,
    subscription: Subscription,
}

impl<E: MediaElement + 'static> PlaybackController<E> {
    pub fn new(element: Arc<E>, src: &str) -> Self {
        let state: SharedPlayback = Arc::new(RwLock::new(PlaybackState::default()));

        element.set_src(src);
        element.set_volume(state.read().volume);
        let subscription = Self::subscribe(&element, &state);
        log::debug!("Playback controller attached to {}", src);

        Self {
            element,
            state,
            subscription,
        }
    }

    fn subscribe(element: &Arc<E>, state: &SharedPlayback) -> Subscription {
        let ids: Vec<ListenerId> = MediaEventKind::ALL
            .into_iter()
            .map(|kind| {
                let state = Arc::clone(state);
                element.add_listener(
                    kind,
                    Arc::new(move |event: &MediaEvent| state.write().apply(event)),
                )
            })
            .collect();

        let element = Arc::clone(element);
        Subscription::new(move || {
            for id in ids {
                element.remove_listener(id);
            }
            log::debug!("Playback controller detached");
        })
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.read()
    }

    pub fn is_playing(&self) -> bool {
        self.state.read().is_playing
    }

    pub fn element(&self) -> &Arc<E> {
        &self.element
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_active()
    }

    /// Pause when playing, otherwise ask the element to start.
    pub fn toggle_playback(&self) {
        // state is written before the element call so that an element which
        // reports synchronously still overrides the optimistic value
        if self.is_playing() {
            self.state.write().is_playing = false;
            self.element.pause();
        } else {
            self.state.write().is_playing = true;
            self.element.play();
        }
    }

    /// Jump to `seconds`; the mirror moves immediately instead of waiting for
    /// the next time update.
    pub fn seek_to(&self, seconds: f64) {
        if !seconds.is_finite() {
            log::warn!("Ignoring seek to non-finite position {}", seconds);
            return;
        }
        let position = seconds.max(0.0);
        self.state.write().current_time_seconds = position;
        self.element.set_current_time(position);
    }

    /// Seek from a range control spanning `0..=seek_max()`.
    pub fn seek_from_range(&self, value: f64) {
        if !value.is_finite() {
            log::warn!("Ignoring seek to non-finite position {}", value);
            return;
        }
        self.seek_to(value.clamp(0.0, self.seek_max()));
    }

    /// Upper bound of the seek control; never below 1 so the range stays usable
    /// before metadata loads.
    pub fn seek_max(&self) -> f64 {
        self.state.read().duration_seconds.max(1.0)
    }

    pub fn set_volume(&self, volume: f64) {
        if !volume.is_finite() {
            log::warn!("Ignoring non-finite volume {}", volume);
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.state.write().volume = volume;
        self.element.set_volume(volume);
    }

    /// Point the element at a new resource. Transport state goes back to
    /// paused at 0 with an unknown duration; the volume carries over.
    pub fn set_source(&self, src: &str) {
        self.element.set_src(src);
        let volume = self.state.read().volume;
        *self.state.write() = PlaybackState {
            volume,
            ..PlaybackState::default()
        };
        log::debug!("Playback source changed to {}", src);
    }

    /// Detach from the element's events. Safe to call more than once; after
    /// it returns no element event reaches this controller.
    pub fn teardown(&mut self) {
        self.subscription.release();
    }

    pub fn view(&self) -> PlayerView {
        PlayerView::from_state(&self.state())
    }
}

impl<E: MediaElement + 'static> fmt::Debug for PlaybackController<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackController")
            .field("state", &self.state())
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Render-ready projection of a `PlaybackState`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub class: &'static str,
    pub toggle_label: &'static str,
    pub toggle_glyph: &'static str,
    pub time_text: String,
    pub seek_value: f64,
    pub seek_max: f64,
    pub progress_percent: f64,
    pub volume: f64,
    pub show_equalizer: bool,
}

impl PlayerView {
    pub fn from_state(state: &PlaybackState) -> Self {
        let duration = state.duration_seconds;
        let progress_percent = if duration > 0.0 {
            (state.current_time_seconds / duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        Self {
            class: if state.is_playing {
                "audio-player playing"
            } else {
                "audio-player"
            },
            toggle_label: if state.is_playing { "Pause" } else { "Play" },
            toggle_glyph: if state.is_playing { "❚❚" } else { "►" },
            time_text: format!(
                "{} / {}",
                format_time(state.current_time_seconds),
                format_time(duration)
            ),
            seek_value: state.current_time_seconds,
            seek_max: duration.max(1.0),
            progress_percent,
            volume: state.volume,
            show_equalizer: state.is_playing,
        }
    }
}

/// `M:SS`, minutes unpadded, floored, negative and non-finite input shown as `0:00`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() {
        seconds.max(0.0).floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{PlayPolicy, SimulatedMediaElement};

    const SRC: &str = "http://localhost:8000/api/files/audio/story.mp3";

    fn controller(policy: PlayPolicy) -> PlaybackController<SimulatedMediaElement> {
        PlaybackController::new(Arc::new(SimulatedMediaElement::with_policy(policy)), SRC)
    }

    #[test]
    fn format_time_examples() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(-3.0), "0:00");
        assert_eq!(format_time(3599.0), "59:59");
        assert_eq!(format_time(3600.0), "60:00");
        assert_eq!(format_time(59.999), "0:59");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
    }

    #[test]
    fn starts_paused_with_unknown_duration() {
        let player = controller(PlayPolicy::Allow);

        assert_eq!(player.state(), PlaybackState::default());
        assert_eq!(player.element().src(), SRC);
        assert_eq!(player.element().listener_count(), MediaEventKind::ALL.len());
        assert_eq!(player.view().time_text, "0:00 / 0:00");
        assert_eq!(player.seek_max(), 1.0);
    }

    #[test]
    fn toggle_is_optimistic_then_confirmed() {
        let player = controller(PlayPolicy::Allow);

        player.toggle_playback();
        assert!(player.is_playing());
        player.element().flush();
        assert!(player.is_playing());

        player.toggle_playback();
        assert!(!player.is_playing());
        player.element().flush();
        assert!(!player.is_playing());
        assert!(player.element().paused());
    }

    #[test]
    fn rejected_play_reconciles_to_paused() {
        let player = controller(PlayPolicy::Reject);

        player.toggle_playback();
        assert!(player.is_playing());

        player.element().flush();
        assert!(!player.is_playing());
    }

    #[test]
    fn deferred_play_settles_from_events() {
        let player = controller(PlayPolicy::Defer);

        player.toggle_playback();
        assert!(player.is_playing());
        player.element().flush();
        assert!(player.is_playing());

        player.element().resolve_pending_play(false);
        player.element().flush();
        assert!(!player.is_playing());
    }

    #[test]
    fn media_key_play_outlives_a_late_rejection() {
        let player = controller(PlayPolicy::Defer);

        player.toggle_playback();
        player.element().flush();
        player.element().external_play();
        player.element().flush();
        player.element().resolve_pending_play(false);
        player.element().flush();
        player.element().advance(5.0);
        player.element().flush();

        assert!(!player.element().paused());
        assert!(player.is_playing());
        assert_eq!(player.state().current_time_seconds, 5.0);
    }

    #[test]
    fn rejection_follows_the_reported_paused_state() {
        let mut state = PlaybackState {
            is_playing: true,
            ..PlaybackState::default()
        };

        state.apply(&MediaEvent::PlaybackRejected {
            reason: "NotAllowedError".to_string(),
            paused: false,
        });
        assert!(state.is_playing);

        state.apply(&MediaEvent::PlaybackRejected {
            reason: "NotAllowedError".to_string(),
            paused: true,
        });
        assert!(!state.is_playing);
    }

    #[test]
    fn ended_always_stops_playing() {
        let player = controller(PlayPolicy::Allow);
        player.element().load_metadata(3.0);
        player.toggle_playback();
        player.element().flush();
        assert!(player.is_playing());

        player.element().advance(5.0);
        player.element().flush();
        assert!(!player.is_playing());
        assert_eq!(player.state().current_time_seconds, 3.0);

        // ended with nothing playing
        let mut state = PlaybackState::default();
        state.apply(&MediaEvent::Ended);
        assert!(!state.is_playing);
        state.is_playing = true;
        state.apply(&MediaEvent::Ended);
        assert!(!state.is_playing);
    }

    #[test]
    fn external_pause_and_play_are_mirrored() {
        let player = controller(PlayPolicy::Allow);

        player.element().external_play();
        player.element().flush();
        assert!(player.is_playing());

        player.element().external_pause();
        player.element().flush();
        assert!(!player.is_playing());
    }

    #[test]
    fn seek_updates_position_immediately() {
        let player = controller(PlayPolicy::Allow);
        player.element().load_metadata(120.0);
        player.element().flush();

        player.seek_to(30.0);
        assert_eq!(player.state().current_time_seconds, 30.0);
        assert_eq!(player.element().current_time(), 30.0);

        player.element().flush();
        assert_eq!(player.state().current_time_seconds, 30.0);

        player.seek_to(-5.0);
        assert_eq!(player.state().current_time_seconds, 0.0);

        player.seek_to(f64::NAN);
        assert_eq!(player.state().current_time_seconds, 0.0);
    }

    #[test]
    fn range_seek_clamps_to_range() {
        let player = controller(PlayPolicy::Allow);

        player.seek_from_range(10.0);
        assert_eq!(player.state().current_time_seconds, 1.0);

        player.element().load_metadata(90.0);
        player.element().flush();
        player.seek_from_range(200.0);
        assert_eq!(player.state().current_time_seconds, 90.0);
    }

    #[test]
    fn volume_is_stored_exactly() {
        let player = controller(PlayPolicy::Allow);

        for volume in [0.0, 0.01, 0.1, 0.33, 0.5, 0.7, 0.99, 1.0, 1.0 / 3.0] {
            player.set_volume(volume);
            assert_eq!(player.state().volume, volume);
            assert_eq!(player.element().volume(), volume);
        }

        player.set_volume(1.5);
        assert_eq!(player.state().volume, 1.0);
        player.set_volume(f64::NAN);
        assert_eq!(player.state().volume, 1.0);
    }

    #[test]
    fn metadata_duration_falls_back_to_zero() {
        let player = controller(PlayPolicy::Allow);

        player.element().load_metadata(f64::NAN);
        player.element().flush();
        assert_eq!(player.state().duration_seconds, 0.0);

        player.element().load_metadata(f64::INFINITY);
        player.element().flush();
        assert_eq!(player.state().duration_seconds, 0.0);

        player.element().load_metadata(125.5);
        player.element().flush();
        assert_eq!(player.state().duration_seconds, 125.5);
        assert_eq!(player.view().time_text, "0:00 / 2:05");
    }

    #[test]
    fn changing_source_resets_everything_but_volume() {
        let player = controller(PlayPolicy::Allow);
        player.set_volume(0.4);
        player.element().load_metadata(60.0);
        player.toggle_playback();
        player.element().advance(12.0);
        player.element().flush();

        player.set_source("http://localhost:8000/api/files/audio/other.mp3");

        let state = player.state();
        assert!(!state.is_playing);
        assert_eq!(state.current_time_seconds, 0.0);
        assert_eq!(state.duration_seconds, 0.0);
        assert_eq!(state.volume, 0.4);

        // nothing from the previous source arrives afterwards
        player.element().flush();
        assert_eq!(player.state(), state);
    }

    #[test]
    fn teardown_stops_event_delivery() {
        let mut player = controller(PlayPolicy::Allow);
        player.teardown();
        player.teardown();

        assert!(!player.is_attached());
        assert_eq!(player.element().listener_count(), 0);

        player.element().external_play();
        player.element().flush();
        assert!(!player.is_playing());
    }

    #[test]
    fn dropping_the_controller_detaches() {
        let element = Arc::new(SimulatedMediaElement::new());
        {
            let _player = PlaybackController::new(Arc::clone(&element), SRC);
            assert_eq!(element.listener_count(), MediaEventKind::ALL.len());
        }
        assert_eq!(element.listener_count(), 0);
    }

    #[test]
    fn view_follows_playing_state() {
        let mut state = PlaybackState {
            is_playing: false,
            current_time_seconds: 30.0,
            duration_seconds: 120.0,
            volume: 0.8,
        };

        let paused = PlayerView::from_state(&state);
        assert!(!paused.show_equalizer);
        assert_eq!(paused.toggle_label, "Play");
        assert_eq!(paused.class, "audio-player");
        assert_eq!(paused.progress_percent, 25.0);
        assert_eq!(paused.seek_max, 120.0);
        assert_eq!(paused.time_text, "0:30 / 2:00");

        state.is_playing = true;
        let playing = PlayerView::from_state(&state);
        assert!(playing.show_equalizer);
        assert_eq!(playing.toggle_label, "Pause");
        assert_eq!(playing.class, "audio-player playing");
    }
}
