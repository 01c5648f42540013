//! JSON shapes exchanged through the durable store.
//!
//! Field names are part of the external contract (`topicId`, `imageURL`,
//! `upscaledURL`) and are fixed with explicit serde renames. Records
//! written by older producers used `topic_id`; it is accepted on read.

use serde::{Deserialize, Serialize};
use superres_core::job_events::{MSG_TYPE_COMPLETE, MSG_TYPE_PROGRESS};

/// Published on the progress channel once per finished tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "topicId", alias = "topic_id")]
    pub topic_id: String,
    pub progress: u8,
}

impl ProgressMessage {
    pub fn new(topic_id: impl Into<String>, progress: u8) -> Self {
        Self {
            kind: MSG_TYPE_PROGRESS.to_string(),
            topic_id: topic_id.into(),
            progress,
        }
    }
}

/// Written to the metadata projection and published on the completion
/// channel when a job completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "topicId", alias = "topic_id")]
    pub topic_id: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    #[serde(rename = "upscaledURL")]
    pub upscaled_url: String,
}

impl CompletionRecord {
    pub fn new(
        topic_id: impl Into<String>,
        image_url: impl Into<String>,
        upscaled_url: impl Into<String>,
    ) -> Self {
        Self {
            kind: MSG_TYPE_COMPLETE.to_string(),
            topic_id: topic_id.into(),
            image_url: image_url.into(),
            upscaled_url: upscaled_url.into(),
        }
    }
}

/// Any record found under a metadata key.
///
/// Covers both the submission-time record (no `upscaledURL` yet, carries
/// `imagePath`) and the completion record. Missing fields read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMetadata {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "topicId", alias = "topic_id", default)]
    pub topic_id: String,
    #[serde(rename = "imageURL", default)]
    pub image_url: String,
    #[serde(rename = "imagePath", default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(rename = "upscaledURL", default, skip_serializing_if = "Option::is_none")]
    pub upscaled_url: Option<String>,
}

impl TopicMetadata {
    /// Record written when a job is submitted.
    pub fn submitted(
        topic_id: impl Into<String>,
        image_url: impl Into<String>,
        image_path: impl Into<String>,
    ) -> Self {
        Self {
            kind: MSG_TYPE_COMPLETE.to_string(),
            topic_id: topic_id.into(),
            image_url: image_url.into(),
            image_path: Some(image_path.into()),
            upscaled_url: None,
        }
    }
}

/// A job request arriving on the intake channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    #[serde(rename = "topicName", default)]
    pub topic_name: String,
    #[serde(rename = "imageURL", default)]
    pub image_url: String,
    #[serde(rename = "imagePath", default)]
    pub image_path: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn progress_wire_shape() {
        let value = serde_json::to_value(ProgressMessage::new("cat", 55)).unwrap();
        assert_eq!(value, json!({"type": "progress", "topicId": "cat", "progress": 55}));
    }

    #[test]
    fn completion_wire_shape() {
        let record = CompletionRecord::new("cat", "http://img/cat.png", "http://h/results/1.png");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "complete",
                "topicId": "cat",
                "imageURL": "http://img/cat.png",
                "upscaledURL": "http://h/results/1.png"
            })
        );
    }

    #[test]
    fn metadata_reads_completion_record() {
        let record = CompletionRecord::new("cat", "http://img/cat.png", "http://h/r.png");
        let text = serde_json::to_string(&record).unwrap();
        let meta: TopicMetadata = serde_json::from_str(&text).unwrap();
        assert_eq!(meta.topic_id, "cat");
        assert_eq!(meta.image_url, "http://img/cat.png");
        assert_eq!(meta.upscaled_url.as_deref(), Some("http://h/r.png"));
        assert!(meta.image_path.is_none());
    }

    #[test]
    fn metadata_accepts_legacy_snake_case_id() {
        let meta: TopicMetadata =
            serde_json::from_str(r#"{"type":"complete","topic_id":"dog","imageURL":"u"}"#).unwrap();
        assert_eq!(meta.topic_id, "dog");
        assert!(meta.upscaled_url.is_none());
    }

    #[test]
    fn submitted_metadata_omits_upscaled_url() {
        let value =
            serde_json::to_value(TopicMetadata::submitted("cat", "u", "/up/cat.png")).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "complete",
                "topicId": "cat",
                "imageURL": "u",
                "imagePath": "/up/cat.png"
            })
        );
    }

    #[test]
    fn submit_request_missing_fields_default_to_empty() {
        let req: SubmitRequest = serde_json::from_str(r#"{"imageURL":"u"}"#).unwrap();
        assert_eq!(req.topic_name, "");
        assert_eq!(req.image_url, "u");
    }
}
