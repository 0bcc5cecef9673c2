//! Headless interactive core of the fabula story client: the status
//! taxonomy, the dismissible selection widget and the narration player.

pub mod api;
pub mod config;
pub mod dom;
pub mod error;
pub mod listeners;
pub mod media;
pub mod player;
pub mod select;
pub mod status;
pub mod story;

pub use api::ApiEndpoints;
pub use config::Config;
pub use dom::{Document, DomEvent, DomEventKind, NodeId, ESCAPE_KEY};
pub use error::{Error, Result};
pub use listeners::{Listener, ListenerId, ListenerRegistry, Subscription};
pub use media::{MediaElement, MediaEvent, MediaEventKind, PlayPolicy, SimulatedMediaElement};
pub use player::{format_time, PlaybackController, PlaybackState, PlayerView, SharedPlayback};
pub use select::{SelectOption, SelectView, SelectWidget};
pub use status::{badge_class, presentation_for, LifecycleCode, StatusPresentation, StatusStyle};
pub use story::{
    flavor_options, format_generation_time, page_size_options, total_pages, FlavorCode, Pager,
    StoryFlavor, StoryGenerationRequest, StoryGenerationResponse, StoryListItem,
    StoryListResponse, DEFAULT_PAGE_SIZE, PAGE_SIZES,
};
