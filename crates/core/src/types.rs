use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Process-local job identifier.
///
/// Assigned from a monotonic counter at submission time and never reused
/// while the process lives. Not derived from the job name:
/// durable-store naming goes through [`crate::keys::KeySchema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_display_and_parse() {
        let id = JobId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(" 42 ".parse::<JobId>().unwrap(), id);
    }

    #[test]
    fn job_id_rejects_non_numeric() {
        assert!("topic_7".parse::<JobId>().is_err());
    }

    #[test]
    fn job_id_serializes_as_bare_number() {
        let json = serde_json::to_string(&JobId::new(9)).unwrap();
        assert_eq!(json, "9");
    }
}
