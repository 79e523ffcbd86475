use std::time::Instant;

use chrono::Utc;
use tracing::info;

/// Wraps one generation call with request/response timing events on the
/// `studio.timing` target, routed to its own log file.
pub async fn log_generation_timing<T, E, F, Fut>(
    provider: &str,
    model: &str,
    operation: &str,
    call: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let started_at = Utc::now();
    let started_perf = Instant::now();
    info!(
        target: "studio.timing",
        "event=generation_request provider={} model={} operation={} started_at={}",
        provider,
        model,
        operation,
        started_at.to_rfc3339()
    );

    let result = call().await;
    let status = if result.is_ok() { "success" } else { "error" };

    let completed_at = Utc::now();
    let duration = started_perf.elapsed().as_secs_f64();
    info!(
        target: "studio.timing",
        "event=generation_response provider={} model={} operation={} completed_at={} duration_s={:.3} status={}",
        provider,
        model,
        operation,
        completed_at.to_rfc3339(),
        duration,
        status
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_the_call_result_through() {
        let ok: Result<u32, String> =
            log_generation_timing("gemini", "model", "op", || async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let err: Result<u32, String> =
            log_generation_timing("gemini", "model", "op", || async { Err("boom".to_string()) })
                .await;
        assert_eq!(err, Err("boom".to_string()));
    }
}
