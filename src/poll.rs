use std::future::Future;
use std::time::Duration;

/// Linear readiness retry: run `probe` up to `max_attempts` times with a
/// fixed `delay` between attempts. Returns `true` on the first successful
/// probe without scheduling further attempts, `false` once the cap is
/// exhausted. The probe receives the 1-based attempt number so callers
/// can log progress.
pub async fn wait_until_ready<F, Fut>(max_attempts: u32, delay: Duration, mut probe: F) -> bool
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 1..=max_attempts {
        if probe(attempt).await {
            return true;
        }
        if attempt < max_attempts {
            tokio::time::sleep(delay).await;
        }
    }
    false
}
