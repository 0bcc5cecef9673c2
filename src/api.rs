use url::Url;

use crate::error::{Error, Result};

/// URLs of the story service, rooted at the configured base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    base: Url,
}

impl ApiEndpoints {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `GET` one page of the archive.
    pub fn stories(&self, page: u64, page_size: u64) -> Result<Url> {
        let mut url = self.join(&["api", "stories"])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("page_size", &page_size.to_string());
        Ok(url)
    }

    /// `GET`/`DELETE` one story. The id is percent-encoded as a single segment.
    pub fn story(&self, id: &str) -> Result<Url> {
        self.join(&["api", "stories", id])
    }

    /// `POST` multipart generation request.
    pub fn generate(&self) -> Result<Url> {
        self.join(&["api", "stories", "generate"])
    }

    /// Resolve a stored file path (image or narration) to a fetchable URL.
    ///
    /// Absolute http(s) URLs pass through, a leading `files/` is dropped and
    /// an empty path has no URL.
    pub fn file_url(&self, path: &str) -> Option<String> {
        if path.is_empty() {
            return None;
        }
        if starts_with_ignore_case(path, "http://") || starts_with_ignore_case(path, "https://") {
            return Some(path.to_string());
        }

        let unrooted = path.strip_prefix('/').unwrap_or(path);
        let clean = match unrooted.strip_prefix("files") {
            Some(rest) => rest.strip_prefix('/').unwrap_or(rest),
            None => path,
        };

        Some(format!(
            "{}/api/files/{}",
            self.base.as_str().trim_end_matches('/'),
            clean
        ))
    }

    fn join(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::CannotBeABase(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .map_or(false, |head| head.eq_ignore_ascii_case(prefix))
}
