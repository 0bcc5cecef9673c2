use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::select::SelectOption;
use crate::status::LifecycleCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryFlavor {
    #[default]
    FairyTale,
    Thriller,
    Romance,
    ScienceFiction,
}

impl StoryFlavor {
    pub const ALL: [StoryFlavor; 4] = [
        StoryFlavor::FairyTale,
        StoryFlavor::Thriller,
        StoryFlavor::Romance,
        StoryFlavor::ScienceFiction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StoryFlavor::FairyTale => "fairy_tale",
            StoryFlavor::Thriller => "thriller",
            StoryFlavor::Romance => "romance",
            StoryFlavor::ScienceFiction => "science_fiction",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StoryFlavor::FairyTale => "Fairy Tale",
            StoryFlavor::Thriller => "Thriller",
            StoryFlavor::Romance => "Romance",
            StoryFlavor::ScienceFiction => "Science Fiction",
        }
    }
}

impl fmt::Display for StoryFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoryFlavor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        StoryFlavor::ALL
            .into_iter()
            .find(|flavor| flavor.as_str() == s)
            .ok_or_else(|| Error::UnknownFlavor(s.to_string()))
    }
}

/// A story's flavor as reported by the service.
///
/// Flavors this client does not offer are kept verbatim in `Other`, so one
/// unfamiliar story does not hide the rest of an archive page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FlavorCode {
    Known(StoryFlavor),
    Other(String),
}

impl FlavorCode {
    pub fn as_str(&self) -> &str {
        match self {
            FlavorCode::Known(flavor) => flavor.as_str(),
            FlavorCode::Other(code) => code,
        }
    }

    pub fn known(&self) -> Option<StoryFlavor> {
        match self {
            FlavorCode::Known(flavor) => Some(*flavor),
            FlavorCode::Other(_) => None,
        }
    }

    /// Menu label for offered flavors, the raw code with spaces otherwise.
    pub fn label(&self) -> Cow<'_, str> {
        match self {
            FlavorCode::Known(flavor) => Cow::Borrowed(flavor.label()),
            FlavorCode::Other(code) => Cow::Owned(code.replace('_', " ")),
        }
    }
}

impl From<StoryFlavor> for FlavorCode {
    fn from(flavor: StoryFlavor) -> Self {
        FlavorCode::Known(flavor)
    }
}

impl From<String> for FlavorCode {
    fn from(code: String) -> Self {
        match code.parse::<StoryFlavor>() {
            Ok(flavor) => FlavorCode::Known(flavor),
            Err(_) => FlavorCode::Other(code),
        }
    }
}

impl From<FlavorCode> for String {
    fn from(code: FlavorCode) -> Self {
        match code {
            FlavorCode::Known(flavor) => flavor.as_str().to_string(),
            FlavorCode::Other(code) => code,
        }
    }
}

impl fmt::Display for FlavorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn flavor_options() -> Vec<SelectOption<StoryFlavor>> {
    StoryFlavor::ALL
        .into_iter()
        .map(|flavor| SelectOption::new(flavor, flavor.label()))
        .collect()
}

pub const PAGE_SIZES: [u64; 4] = [5, 10, 20, 50];
pub const DEFAULT_PAGE_SIZE: u64 = 10;

pub fn page_size_options() -> Vec<SelectOption<u64>> {
    PAGE_SIZES
        .into_iter()
        .map(|size| SelectOption::new(size, size.to_string()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryGenerationRequest {
    pub flavor: StoryFlavor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    /// Whether mature (18+) content is allowed.
    #[serde(default)]
    pub eighting_plus_enabled: bool,
}

impl StoryGenerationRequest {
    /// Blank context is sent as absent.
    pub fn new(flavor: StoryFlavor, additional_context: &str, eighting_plus_enabled: bool) -> Self {
        let additional_context = if additional_context.is_empty() {
            None
        } else {
            Some(additional_context.to_string())
        };

        Self {
            flavor,
            additional_context,
            eighting_plus_enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryGenerationResponse {
    pub id: String,
    pub flavor: FlavorCode,
    pub title: String,
    pub story_text: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub audio_duration_seconds: Option<f64>,
    #[serde(default)]
    pub generation_time_seconds: Option<f64>,
    pub created_at: String,
    pub status: LifecycleCode,
}

impl StoryGenerationResponse {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The title only means something once generation has completed.
    pub fn display_title(&self) -> &str {
        if self.status == LifecycleCode::Completed {
            self.title.as_str()
        } else {
            "Story generation in progress..."
        }
    }

    pub fn generation_time_text(&self) -> Option<String> {
        self.generation_time_seconds.map(format_generation_time)
    }

    pub fn audio_duration_text(&self) -> Option<String> {
        self.audio_duration_seconds
            .map(|seconds| format!("Audio duration: {}s", round_seconds(seconds)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryListItem {
    pub id: String,
    pub flavor: FlavorCode,
    pub title: String,
    pub story_preview: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    pub created_at: String,
    pub status: LifecycleCode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryListResponse {
    pub stories: Vec<StoryListItem>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl StoryListResponse {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn total_pages(&self) -> u64 {
        total_pages(self.total, self.page_size)
    }
}

/// Never less than one page, even for an empty archive.
pub fn total_pages(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 1;
    }
    total.div_ceil(page_size).max(1)
}

/// `"1m 5s"` above a minute, `"42s"` below; rounded to whole seconds.
pub fn format_generation_time(seconds: f64) -> String {
    let total = round_seconds(seconds);
    let minutes = total / 60;
    let rest = total % 60;
    if minutes > 0 {
        format!("{}m {}s", minutes, rest)
    } else {
        format!("{}s", rest)
    }
}

fn round_seconds(seconds: f64) -> u64 {
    if seconds.is_finite() {
        seconds.max(0.0).round() as u64
    } else {
        0
    }
}

/// Paging position over the story archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pager {
    page: u64,
    page_size: u64,
    total: u64,
}

impl Pager {
    pub fn new(page_size: u64) -> Self {
        Self {
            page: 1,
            page_size,
            total: 0,
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn total_pages(&self) -> u64 {
        total_pages(self.total, self.page_size)
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = total;
    }

    /// The current page is kept; `next`/`prev` clamp on the following move.
    pub fn set_page_size(&mut self, page_size: u64) {
        self.page_size = page_size;
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn prev(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    pub fn next(&mut self) {
        self.page = (self.page + 1).min(self.total_pages());
    }

    pub fn label(&self) -> String {
        format!("Page {} / {}", self.page, self.total_pages())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flavors_parse_and_label() {
        assert_eq!("science_fiction".parse::<StoryFlavor>().unwrap(), StoryFlavor::ScienceFiction);
        assert!(matches!(
            "horror".parse::<StoryFlavor>(),
            Err(Error::UnknownFlavor(flavor)) if flavor == "horror"
        ));

        let options = flavor_options();
        assert_eq!(options.len(), 4);
        assert_eq!(options[0], SelectOption::new(StoryFlavor::FairyTale, "Fairy Tale"));
        assert_eq!(options[3].label, "Science Fiction");
    }

    #[test]
    fn page_size_options_use_numbers_as_labels() {
        let labels: Vec<String> = page_size_options().into_iter().map(|o| o.label).collect();
        assert_eq!(labels, vec!["5", "10", "20", "50"]);
        assert!(PAGE_SIZES.contains(&DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn request_omits_blank_context() {
        let request = StoryGenerationRequest::new(StoryFlavor::Thriller, "", false);
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"flavor":"thriller","eightingPlusEnabled":false}"#
        );

        let request = StoryGenerationRequest::new(StoryFlavor::Romance, "by the sea", true);
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"flavor":"romance","additionalContext":"by the sea","eightingPlusEnabled":true}"#
        );
    }

    #[test]
    fn decodes_generation_response() {
        let json = r#"{
            "id": "abc",
            "flavor": "fairy_tale",
            "title": "The Lantern",
            "storyText": "Once upon a time",
            "imageUrl": "files/images/abc.png",
            "audioUrl": null,
            "generationTimeSeconds": 65.2,
            "createdAt": "2024-05-01T10:00:00Z",
            "status": "generating_audio"
        }"#;

        let story = StoryGenerationResponse::from_json(json).unwrap();
        assert_eq!(story.flavor.known(), Some(StoryFlavor::FairyTale));
        assert_eq!(story.flavor.label(), "Fairy Tale");
        assert_eq!(story.status, LifecycleCode::GeneratingAudio);
        assert_eq!(story.display_title(), "Story generation in progress...");
        assert_eq!(story.generation_time_text().as_deref(), Some("1m 5s"));
        assert_eq!(story.audio_url, None);
        assert_eq!(story.audio_duration_text(), None);

        let done = StoryGenerationResponse {
            status: LifecycleCode::Completed,
            audio_duration_seconds: Some(93.6),
            ..story
        };
        assert_eq!(done.display_title(), "The Lantern");
        assert_eq!(done.audio_duration_text().as_deref(), Some("Audio duration: 94s"));
    }

    #[test]
    fn decodes_list_with_unknown_status() {
        let json = r#"{
            "stories": [{
                "id": "1",
                "flavor": "thriller",
                "title": "Night Train",
                "story_preview": "The train...",
                "created_at": "2024-05-01T10:00:00Z",
                "status": "queued_for_review"
            }],
            "total": 21,
            "page": 1,
            "page_size": 10
        }"#;

        let list = StoryListResponse::from_json(json).unwrap();
        assert_eq!(list.total_pages(), 3);
        assert_eq!(list.stories[0].audio_url, None);
        assert_eq!(
            list.stories[0].status.presentation().label,
            "Queued For Review"
        );
    }

    #[test]
    fn unknown_flavor_keeps_the_page() {
        let json = r#"{
            "stories": [
                {
                    "id": "1",
                    "flavor": "cosmic_horror",
                    "title": "The Deep",
                    "story_preview": "Below...",
                    "created_at": "2024-05-01T10:00:00Z",
                    "status": "completed"
                },
                {
                    "id": "2",
                    "flavor": "romance",
                    "title": "Harbour Lights",
                    "story_preview": "She waited...",
                    "created_at": "2024-05-02T10:00:00Z",
                    "status": "failed"
                }
            ],
            "total": 2,
            "page": 1,
            "page_size": 10
        }"#;

        let list = StoryListResponse::from_json(json).unwrap();
        assert_eq!(list.stories.len(), 2);

        let unknown = &list.stories[0].flavor;
        assert_eq!(*unknown, FlavorCode::Other("cosmic_horror".to_string()));
        assert_eq!(unknown.known(), None);
        assert_eq!(unknown.label(), "cosmic horror");
        assert_eq!(list.stories[1].flavor, FlavorCode::from(StoryFlavor::Romance));

        let encoded = serde_json::to_value(&list.stories[0]).unwrap();
        assert_eq!(encoded["flavor"], "cosmic_horror");
    }

    #[test]
    fn bad_payload_is_a_decode_error() {
        assert!(matches!(
            StoryListResponse::from_json("{\"stories\": 3}"),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn generation_time_formatting() {
        assert_eq!(format_generation_time(65.0), "1m 5s");
        assert_eq!(format_generation_time(42.4), "42s");
        assert_eq!(format_generation_time(59.6), "1m 0s");
        assert_eq!(format_generation_time(0.0), "0s");
        assert_eq!(format_generation_time(-8.0), "0s");
    }

    #[test]
    fn total_pages_never_below_one() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(11, 0), 1);
    }

    #[test]
    fn pager_clamps_moves() {
        let mut pager = Pager::new(DEFAULT_PAGE_SIZE);
        pager.prev();
        assert_eq!(pager.page(), 1);
        assert!(!pager.has_prev());

        pager.set_total(25);
        assert_eq!(pager.label(), "Page 1 / 3");
        pager.next();
        pager.next();
        pager.next();
        assert_eq!(pager.page(), 3);
        assert!(!pager.has_next());

        pager.set_page_size(50);
        assert_eq!(pager.label(), "Page 3 / 1");
        pager.next();
        assert_eq!(pager.page(), 1);
    }
}
