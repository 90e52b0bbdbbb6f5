//! Educational video library

use crate::list::{ListResource, PaginatedList};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use telecare_client::{AdminApi, ApiRequest, ClientError, VideoFilters};
use telecare_core::utils::convert_youtube_url;

/// Longest accepted title
pub const MAX_TITLE_LEN: usize = 200;
/// Longest accepted description
pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// `/videos`; pagination sits at the top level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Videos;

impl ListResource for Videos {
    type Filters = VideoFilters;
    type Extra = ();

    const NAME: &'static str = "videos";

    fn request(filters: &VideoFilters, page: u32, limit: u32) -> ApiRequest {
        AdminApi::videos_request(filters, page, limit)
    }
}

/// A video as typed into the form; `url` may be any YouTube link form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDraft {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Watch, short, embed or bare-id link
    pub url: String,
}

impl VideoDraft {
    /// Validate and turn into the payload the server stores
    pub fn into_payload(self) -> Result<Value, ClientError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ClientError::invalid_request("Title is required"));
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(ClientError::invalid_request(format!(
                "Title must be less than {MAX_TITLE_LEN} characters"
            )));
        }

        let description = self.description.trim();
        if description.is_empty() {
            return Err(ClientError::invalid_request("Description is required"));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ClientError::invalid_request(format!(
                "Description must be less than {MAX_DESCRIPTION_LEN} characters"
            )));
        }

        let video = convert_youtube_url(&self.url)
            .map_err(|err| ClientError::invalid_request(err.to_string()))?;

        Ok(json!({
            "title": self.title,
            "description": self.description,
            "embedLink": video.embed_link,
        }))
    }
}

impl PaginatedList<Videos> {
    /// Add a video after normalizing its link, then refresh the library
    pub async fn create_video(&self, draft: VideoDraft) -> bool {
        match draft.into_payload() {
            Ok(payload) => {
                self.mutate("createVideo", self.api().upload_video(payload))
                    .await
            }
            Err(err) => {
                self.reporter().report("createVideo", &err);
                false
            }
        }
    }

    /// Edit a video after normalizing its link, then refresh the library
    pub async fn update_video(&self, id: &str, draft: VideoDraft) -> bool {
        match draft.into_payload() {
            Ok(payload) => {
                self.mutate("updateVideo", self.api().update_video(id, payload))
                    .await
            }
            Err(err) => {
                self.reporter().report("updateVideo", &err);
                false
            }
        }
    }

    /// Delete a video, then refresh the library
    pub async fn delete_video(&self, id: &str) -> bool {
        self.mutate("deleteVideo", self.api().delete_video(id)).await
    }

    /// One video record
    pub async fn video_by_id(&self, id: &str) -> Option<Value> {
        self.run_action("videoById", self.api().video_by_id(id))
            .await
            .map(|envelope| envelope.data)
    }

    /// Library size as reported by the server
    pub async fn video_count(&self) -> Option<Value> {
        self.run_action("videoCount", self.api().video_count())
            .await
            .map(|envelope| envelope.data)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn draft(url: &str) -> VideoDraft {
        VideoDraft {
            title: "Sleep hygiene".to_string(),
            description: "Ten minutes on better sleep".to_string(),
            url: url.to_string(),
        }
    }

    #[rstest]
    #[case("https://www.youtube.com/watch?v=dQw4w9WgXcQ")]
    #[case("https://youtu.be/dQw4w9WgXcQ")]
    #[case("https://www.youtube.com/embed/dQw4w9WgXcQ")]
    fn test_payload_uses_embed_link(#[case] url: &str) {
        let payload = draft(url).into_payload().unwrap();
        assert_eq!(
            payload["embedLink"],
            json!("https://www.youtube.com/embed/dQw4w9WgXcQ")
        );
        assert_eq!(payload["title"], json!("Sleep hygiene"));
    }

    #[test]
    fn test_payload_validation() {
        let err = VideoDraft {
            title: "  ".to_string(),
            ..draft("https://youtu.be/dQw4w9WgXcQ")
        }
        .into_payload()
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid request: Title is required");

        let err = VideoDraft {
            description: "x".repeat(MAX_DESCRIPTION_LEN + 1),
            ..draft("https://youtu.be/dQw4w9WgXcQ")
        }
        .into_payload()
        .unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest { .. }));

        let err = draft("https://vimeo.com/123").into_payload().unwrap_err();
        assert!(err.to_string().contains("Invalid YouTube URL"));
    }
}
