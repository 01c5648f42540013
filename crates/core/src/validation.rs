//! Submission validation. Runs before any job is created.

use crate::error::CoreError;

/// Maximum length of a source URL.
const MAX_URL_LEN: usize = 2048;

/// Validate a job name. Any non-blank name is accepted.
pub fn validate_job_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("Job name is required".to_string()));
    }
    Ok(())
}

/// Validate a source URL: non-empty and no longer than `MAX_URL_LEN`.
pub fn validate_source_url(url: &str) -> Result<(), CoreError> {
    if url.trim().is_empty() {
        return Err(CoreError::Validation("Source URL is required".to_string()));
    }
    if url.len() > MAX_URL_LEN {
        return Err(CoreError::Validation(format!(
            "Source URL must not exceed {MAX_URL_LEN} bytes"
        )));
    }
    Ok(())
}

/// Validate every client-supplied field of a submission.
pub fn validate_submission(name: &str, source_url: &str) -> Result<(), CoreError> {
    validate_job_name(name)?;
    validate_source_url(source_url)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn valid_submission() {
        assert!(validate_submission("cat", "http://example.com/cat.png").is_ok());
    }

    #[test]
    fn missing_name_rejected() {
        assert_matches!(
            validate_submission("", "http://example.com/cat.png"),
            Err(CoreError::Validation(_))
        );
        assert!(validate_submission("   ", "http://example.com/cat.png").is_err());
    }

    #[test]
    fn missing_url_rejected() {
        assert_matches!(validate_submission("cat", ""), Err(CoreError::Validation(_)));
    }

    #[test]
    fn any_non_blank_name_accepted() {
        assert!(validate_job_name("a:b").is_ok());
        assert!(validate_job_name(&"n".repeat(500)).is_ok());
        assert!(validate_job_name("chat noir").is_ok());
    }
}
