use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;

use crate::listeners::{Listener, ListenerId, ListenerRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEventKind {
    LoadedMetadata,
    TimeUpdate,
    Play,
    Pause,
    Ended,
    PlaybackRejected,
}

impl MediaEventKind {
    pub const ALL: [MediaEventKind; 6] = [
        MediaEventKind::LoadedMetadata,
        MediaEventKind::TimeUpdate,
        MediaEventKind::Play,
        MediaEventKind::Pause,
        MediaEventKind::Ended,
        MediaEventKind::PlaybackRejected,
    ];
}

/// Transport signals emitted by a media element.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Duration may be NaN or infinite when the resource does not report one.
    LoadedMetadata { duration: f64 },
    TimeUpdate { current_time: f64 },
    Play,
    Pause,
    Ended,
    /// The host refused or aborted a play request (autoplay policy, source
    /// change). `paused` is the element's state when the request settled.
    PlaybackRejected { reason: String, paused: bool },
}

impl MediaEvent {
    pub fn kind(&self) -> MediaEventKind {
        match self {
            MediaEvent::LoadedMetadata { .. } => MediaEventKind::LoadedMetadata,
            MediaEvent::TimeUpdate { .. } => MediaEventKind::TimeUpdate,
            MediaEvent::Play => MediaEventKind::Play,
            MediaEvent::Pause => MediaEventKind::Pause,
            MediaEvent::Ended => MediaEventKind::Ended,
            MediaEvent::PlaybackRejected { .. } => MediaEventKind::PlaybackRejected,
        }
    }
}

/// A playable element with standard transport semantics.
///
/// `play` is a request: the host may start, defer or refuse playback, and
/// reports the outcome only through events.
pub trait MediaElement: Send + Sync {
    fn set_src(&self, url: &str);
    fn src(&self) -> String;
    fn play(&self);
    fn pause(&self);
    fn set_current_time(&self, seconds: f64);
    fn set_volume(&self, volume: f64);
    fn add_listener(&self, kind: MediaEventKind, listener: Listener<MediaEvent>) -> ListenerId;
    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// How a `SimulatedMediaElement` answers play requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayPolicy {
    #[default]
    Allow,
    Reject,
    /// Hold the request until `resolve_pending_play`.
    Defer,
}

struct Transport {
    src: String,
    paused: bool,
    current_time: f64,
    duration: f64,
    volume: f64,
    policy: PlayPolicy,
    pending_play: bool,
    queue: VecDeque<MediaEvent>,
}

/// In-memory media element.
///
/// Events are queued the way a browser queues media tasks and delivered by
/// `flush`, so callers observe the same ordering gap between a request and
/// its confirming event.
pub struct SimulatedMediaElement {
    transport: Mutex<Transport>,
    listeners: ListenerRegistry<MediaEventKind, MediaEvent>,
}

impl SimulatedMediaElement {
    pub fn new() -> Self {
        Self::with_policy(PlayPolicy::Allow)
    }

    pub fn with_policy(policy: PlayPolicy) -> Self {
        Self {
            transport: Mutex::new(Transport {
                src: String::new(),
                paused: true,
                current_time: 0.0,
                duration: f64::NAN,
                volume: 1.0,
                policy,
                pending_play: false,
                queue: VecDeque::new(),
            }),
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn set_play_policy(&self, policy: PlayPolicy) {
        self.transport.lock().policy = policy;
    }

    /// Metadata for the current source became available.
    pub fn load_metadata(&self, duration: f64) {
        let mut transport = self.transport.lock();
        transport.duration = duration;
        transport.queue.push_back(MediaEvent::LoadedMetadata { duration });
    }

    /// Let the clock run for `seconds`. Reaching the end pauses and fires
    /// timeupdate, pause and ended, in that order.
    pub fn advance(&self, seconds: f64) {
        let mut transport = self.transport.lock();
        if transport.paused || !seconds.is_finite() || seconds <= 0.0 {
            return;
        }

        let mut position = transport.current_time + seconds;
        let reached_end = transport.duration.is_finite() && position >= transport.duration;
        if reached_end {
            position = transport.duration;
        }
        transport.current_time = position;
        transport.queue.push_back(MediaEvent::TimeUpdate {
            current_time: position,
        });

        if reached_end {
            transport.paused = true;
            transport.queue.push_back(MediaEvent::Pause);
            transport.queue.push_back(MediaEvent::Ended);
        }
    }

    /// Pause from outside the page (media keys, OS controls).
    pub fn external_pause(&self) {
        let mut transport = self.transport.lock();
        if !transport.paused {
            transport.paused = true;
            transport.queue.push_back(MediaEvent::Pause);
        }
    }

    /// Resume from outside the page; not subject to the play policy.
    pub fn external_play(&self) {
        let mut transport = self.transport.lock();
        Self::start(&mut transport);
    }

    /// Settle a play request held by `PlayPolicy::Defer`.
    pub fn resolve_pending_play(&self, allowed: bool) {
        let mut transport = self.transport.lock();
        if !transport.pending_play {
            return;
        }
        transport.pending_play = false;
        if allowed {
            Self::start(&mut transport);
        } else {
            let paused = transport.paused;
            transport.queue.push_back(MediaEvent::PlaybackRejected {
                reason: "NotAllowedError".to_string(),
                paused,
            });
        }
    }

    /// Deliver queued events in order. Returns how many were delivered.
    pub fn flush(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.transport.lock().queue.pop_front();
            let Some(event) = next else {
                break;
            };
            self.listeners.dispatch(event.kind(), &event);
            delivered += 1;
        }
        delivered
    }

    pub fn pending_events(&self) -> usize {
        self.transport.lock().queue.len()
    }

    pub fn paused(&self) -> bool {
        self.transport.lock().paused
    }

    pub fn current_time(&self) -> f64 {
        self.transport.lock().current_time
    }

    pub fn duration(&self) -> f64 {
        self.transport.lock().duration
    }

    pub fn volume(&self) -> f64 {
        self.transport.lock().volume
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Playback starting settles any play request still held.
    fn start(transport: &mut Transport) {
        transport.pending_play = false;
        if transport.paused {
            transport.paused = false;
            transport.queue.push_back(MediaEvent::Play);
        }
    }
}

impl Default for SimulatedMediaElement {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaElement for SimulatedMediaElement {
    fn set_src(&self, url: &str) {
        let mut transport = self.transport.lock();
        transport.src = url.to_string();
        transport.paused = true;
        transport.current_time = 0.0;
        transport.duration = f64::NAN;
        // events still queued for the previous source are dropped
        transport.queue.clear();
        if transport.pending_play {
            transport.pending_play = false;
            transport.queue.push_back(MediaEvent::PlaybackRejected {
                reason: "AbortError".to_string(),
                paused: true,
            });
        }
    }

    fn src(&self) -> String {
        self.transport.lock().src.clone()
    }

    fn play(&self) {
        let mut transport = self.transport.lock();
        let policy = transport.policy;
        match policy {
            PlayPolicy::Allow => Self::start(&mut transport),
            PlayPolicy::Reject => {
                let paused = transport.paused;
                transport.queue.push_back(MediaEvent::PlaybackRejected {
                    reason: "NotAllowedError".to_string(),
                    paused,
                });
            }
            PlayPolicy::Defer => transport.pending_play = true,
        }
    }

    fn pause(&self) {
        let mut transport = self.transport.lock();
        transport.pending_play = false;
        if !transport.paused {
            transport.paused = true;
            transport.queue.push_back(MediaEvent::Pause);
        }
    }

    fn set_current_time(&self, seconds: f64) {
        let mut transport = self.transport.lock();
        let mut position = seconds.max(0.0);
        if transport.duration.is_finite() {
            position = position.min(transport.duration);
        }
        transport.current_time = position;
        transport.queue.push_back(MediaEvent::TimeUpdate {
            current_time: position,
        });
    }

    fn set_volume(&self, volume: f64) {
        self.transport.lock().volume = volume;
    }

    fn add_listener(&self, kind: MediaEventKind, listener: Listener<MediaEvent>) -> ListenerId {
        self.listeners.add(kind, listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl fmt::Debug for SimulatedMediaElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let transport = self.transport.lock();
        f.debug_struct("SimulatedMediaElement")
            .field("src", &transport.src)
            .field("paused", &transport.paused)
            .field("current_time", &transport.current_time)
            .field("duration", &transport.duration)
            .field("volume", &transport.volume)
            .field("queued", &transport.queue.len())
            .finish()
    }
}
