//! HTTP readiness polling.
//!
//! Grounded on `gglib-runtime::process::health::wait_for_http_health`: poll
//! a `/health` endpoint at a fixed interval until it answers or a deadline
//! passes.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The `/health` wire contract (§6): a `200 OK` alone isn't readiness, the
/// body must also report `"status": "healthy"`.
#[derive(Deserialize)]
struct HealthBody {
    status: String,
}

/// Poll `http://{host}:{port}/health` once a second until it reports
/// `{"status": "healthy"}` or `timeout` elapses.
pub async fn wait_for_ready(client: &reqwest::Client, host: &str, port: u16, timeout: Duration) -> bool {
    let url = format!("http://{host}:{port}/health");
    let deadline = Instant::now() + timeout;

    loop {
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<HealthBody>().await {
                Ok(body) if body.status == "healthy" => return true,
                Ok(body) => debug!(url, status = %body.status, "not ready yet"),
                Err(e) => debug!(url, "unparseable health body: {e}"),
            },
            Ok(resp) => debug!(url, status = %resp.status(), "not ready yet"),
            Err(e) => debug!(url, "not ready yet: {e}"),
        }

        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_body_parses() {
        let body: HealthBody = serde_json::from_str(r#"{"status":"healthy"}"#).unwrap();
        assert_eq!(body.status, "healthy");
    }

    #[test]
    fn unhealthy_body_parses_but_is_not_the_healthy_string() {
        let body: HealthBody = serde_json::from_str(r#"{"status":"unhealthy"}"#).unwrap();
        assert_ne!(body.status, "healthy");
    }
}
