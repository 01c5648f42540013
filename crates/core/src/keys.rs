//! Versioned naming of durable-store keys and channels.
//!
//! All key strings are produced here so the in-memory [`JobId`] and the
//! durable naming can evolve independently. `V1` reproduces the layout
//! already present in deployed stores.

use crate::types::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeySchema {
    #[default]
    V1,
}

impl KeySchema {
    pub fn version(self) -> u32 {
        match self {
            Self::V1 => 1,
        }
    }

    /// Pub/sub channel carrying per-tile progress messages.
    pub fn progress_channel(self) -> &'static str {
        match self {
            Self::V1 => "progress_updates",
        }
    }

    /// Pub/sub channel carrying completion records.
    pub fn completion_channel(self) -> &'static str {
        match self {
            Self::V1 => "task_completed",
        }
    }

    /// Hash of job name -> integer percent.
    pub fn progress_map(self) -> &'static str {
        match self {
            Self::V1 => "processingTopics",
        }
    }

    /// Append-only list of completion records.
    pub fn processed_list(self) -> &'static str {
        match self {
            Self::V1 => "processedTopics",
        }
    }

    /// Keyed metadata record for one job name.
    pub fn metadata_key(self, topic_name: &str) -> String {
        match self {
            Self::V1 => format!("topic_metadata:{topic_name}"),
        }
    }

    /// Index entry mapping a job id to the name it was submitted under.
    pub fn index_key(self, id: JobId) -> String {
        match self {
            Self::V1 => format!("topic_index:{id}"),
        }
    }

    /// Name assumed for a job whose index entry is missing.
    pub fn fallback_topic_name(self, id: JobId) -> String {
        match self {
            Self::V1 => format!("topic_{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_layout() {
        let schema = KeySchema::V1;
        assert_eq!(schema.version(), 1);
        assert_eq!(schema.progress_channel(), "progress_updates");
        assert_eq!(schema.completion_channel(), "task_completed");
        assert_eq!(schema.progress_map(), "processingTopics");
        assert_eq!(schema.processed_list(), "processedTopics");
        assert_eq!(schema.metadata_key("cat"), "topic_metadata:cat");
    }

    #[test]
    fn id_derived_names() {
        let schema = KeySchema::default();
        assert_eq!(schema.index_key(JobId::new(12)), "topic_index:12");
        assert_eq!(schema.fallback_topic_name(JobId::new(12)), "topic_12");
    }
}
