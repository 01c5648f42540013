//! Request intake: turns pub/sub payloads into job submissions.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use superres_core::types::JobId;
use superres_events::SubmitRequest;
use superres_pipeline::JobManager;

/// Submit one request payload. Rejections are logged and yield `None`.
pub fn handle_request(manager: &Arc<JobManager>, payload: &str) -> Option<JobId> {
    let request: SubmitRequest = match serde_json::from_str(payload) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding malformed request");
            return None;
        }
    };

    match manager.submit(&request.topic_name, &request.image_url, &request.image_path) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(topic = %request.topic_name, error = %e, "Request rejected");
            None
        }
    }
}

/// Drain `requests` until the stream ends.
pub async fn run<S>(manager: Arc<JobManager>, mut requests: S)
where
    S: Stream<Item = String> + Unpin,
{
    while let Some(payload) = requests.next().await {
        handle_request(&manager, &payload);
    }
    tracing::warn!("Request stream closed");
}
