//! The activity pattern shared by every manager: increment `started`,
//! dispatch with the workflow-supplied deadline, increment
//! `activity_succeeded`/`activity_failed`. One function instead of
//! sixteen copies of the same five-step dance.

use std::future::Future;
use std::time::Duration;

use prost::Message;
use site_agent_core::{ActivityCounters, ResourceKind, SiteAgentError, SiteAgentResult};

/// Decodes `payload` as `Req`, runs `f` under `deadline`, and encodes the
/// result as bytes, bumping `counters` around the call. `f` is expected to
/// close over the manager's `AtomicClient` and issue exactly one gRPC
/// call.
pub async fn run_activity<Req, Resp, F, Fut>(
    counters: &ActivityCounters,
    kind: ResourceKind,
    operation: &str,
    payload: Vec<u8>,
    deadline: Duration,
    f: F,
) -> SiteAgentResult<Vec<u8>>
where
    Req: Message + Default,
    Resp: Message,
    F: FnOnce(Req) -> Fut,
    Fut: Future<Output = SiteAgentResult<Resp>>,
{
    counters.record_started();

    let request = match Req::decode(payload.as_slice()) {
        Ok(request) => request,
        Err(e) => {
            counters.record_activity_result(false);
            return Err(SiteAgentError::Validation {
                kind: kind.as_str().to_string(),
                operation: operation.to_string(),
                message: format!("failed to decode request: {e}"),
            });
        }
    };

    let outcome = tokio::time::timeout(deadline, f(request)).await;
    match outcome {
        Ok(Ok(response)) => {
            counters.record_activity_result(true);
            Ok(response.encode_to_vec())
        }
        Ok(Err(err)) => {
            counters.record_activity_result(false);
            Err(err)
        }
        Err(_elapsed) => {
            counters.record_activity_result(false);
            Err(SiteAgentError::Timeout {
                kind: kind.as_str().to_string(),
                operation: operation.to_string(),
            })
        }
    }
}

/// For activities the caller never expects to invoke (e.g. `UpdateVpc` sent
/// to a kind whose site-of-record is discovery-only) — a clear `Validation`
/// error rather than a panic, since nothing here should fail silently.
pub fn unsupported_activity(kind: ResourceKind, operation: &str) -> SiteAgentError {
    SiteAgentError::Validation {
        kind: kind.as_str().to_string(),
        operation: operation.to_string(),
        message: format!("{operation} is not a supported activity for {}", kind.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_agent_proto::bootstrap::DownloadCredentialsRequest;

    #[tokio::test]
    async fn decode_failure_counts_as_activity_failed_not_a_panic() {
        let counters = ActivityCounters::new();
        let bad_payload = vec![0xFF, 0xFF, 0xFF];

        let result = run_activity::<DownloadCredentialsRequest, DownloadCredentialsRequest, _, _>(
            &counters,
            ResourceKind::Vpc,
            "CreateVpc",
            bad_payload,
            Duration::from_secs(1),
            |_req| async move { unreachable!("decode should have failed first") },
        )
        .await;

        assert!(result.is_err());
        let snap = counters.snapshot();
        assert_eq!(snap.started, 1);
        assert_eq!(snap.activity_failed, 1);
    }
}
