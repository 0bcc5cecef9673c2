use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Visual treatment of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusStyle {
    Info,
    Accent,
    Success,
    Danger,
    Warning,
}

impl StatusStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusStyle::Info => "info",
            StatusStyle::Accent => "accent",
            StatusStyle::Success => "success",
            StatusStyle::Danger => "danger",
            StatusStyle::Warning => "warning",
        }
    }
}

impl fmt::Display for StatusStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a story generation stands, as reported by the generation service.
///
/// Codes the client does not know yet are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LifecycleCode {
    JustCreated,
    GeneratingStory,
    GeneratingAudio,
    Completed,
    Failed,
    RestrictedContentDetected,
    AudioTooLong,
    Other(String),
}

impl LifecycleCode {
    pub fn as_str(&self) -> &str {
        match self {
            LifecycleCode::JustCreated => "just_created",
            LifecycleCode::GeneratingStory => "generating_story",
            LifecycleCode::GeneratingAudio => "generating_audio",
            LifecycleCode::Completed => "completed",
            LifecycleCode::Failed => "failed",
            LifecycleCode::RestrictedContentDetected => "restricted_content_detected",
            LifecycleCode::AudioTooLong => "audio_too_long",
            LifecycleCode::Other(code) => code,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, LifecycleCode::Other(_))
    }

    pub fn presentation(&self) -> StatusPresentation {
        presentation_for(self.as_str())
    }
}

impl From<&str> for LifecycleCode {
    fn from(code: &str) -> Self {
        match code {
            "just_created" => LifecycleCode::JustCreated,
            "generating_story" => LifecycleCode::GeneratingStory,
            "generating_audio" => LifecycleCode::GeneratingAudio,
            "completed" => LifecycleCode::Completed,
            "failed" => LifecycleCode::Failed,
            "restricted_content_detected" => LifecycleCode::RestrictedContentDetected,
            "audio_too_long" => LifecycleCode::AudioTooLong,
            other => LifecycleCode::Other(other.to_string()),
        }
    }
}

impl From<String> for LifecycleCode {
    fn from(code: String) -> Self {
        match LifecycleCode::from(code.as_str()) {
            LifecycleCode::Other(_) => LifecycleCode::Other(code),
            known => known,
        }
    }
}

impl From<LifecycleCode> for String {
    fn from(code: LifecycleCode) -> Self {
        match code {
            LifecycleCode::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for LifecycleCode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(LifecycleCode::from(s))
    }
}

impl fmt::Display for LifecycleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusPresentation {
    pub label: Cow<'static, str>,
    pub style: StatusStyle,
}

const STATUS_TABLE: &[(&str, &str, StatusStyle)] = &[
    ("just_created", "Queued", StatusStyle::Info),
    ("generating_story", "Generating Story", StatusStyle::Info),
    ("generating_audio", "Generating Audio", StatusStyle::Accent),
    ("completed", "Completed", StatusStyle::Success),
    ("failed", "Failed", StatusStyle::Danger),
    ("audio_too_long", "Audio is too long", StatusStyle::Warning),
    ("restricted_content_detected", "Restricted", StatusStyle::Warning),
];

/// Label and style for any lifecycle code. Never fails: unknown codes get a
/// label derived from the code itself and the `info` style.
pub fn presentation_for(code: &str) -> StatusPresentation {
    match STATUS_TABLE.iter().find(|(known, _, _)| *known == code) {
        Some(&(_, label, style)) => StatusPresentation {
            label: Cow::Borrowed(label),
            style,
        },
        None => StatusPresentation {
            label: Cow::Owned(humanize_code(code)),
            style: StatusStyle::Info,
        },
    }
}

/// CSS class list for a status badge, e.g. `"badge success"`.
pub fn badge_class(code: &str) -> String {
    format!("badge {}", presentation_for(code).style)
}

// "new_unknown_code" -> "New Unknown Code". Only the first character of each
// word changes; the rest keeps its case.
fn humanize_code(code: &str) -> String {
    let mut label = String::with_capacity(code.len());
    let mut in_word = false;

    for ch in code.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        let is_word = ch.is_ascii_alphanumeric();
        if is_word && !in_word {
            label.push(ch.to_ascii_uppercase());
        } else {
            label.push(ch);
        }
        in_word = is_word;
    }

    label
}
