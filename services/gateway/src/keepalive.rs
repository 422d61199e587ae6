//! Periodic self-ping that keeps the hosting instance from idling

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::metrics;

const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// URL of this service's own health endpoint
pub fn health_url(hostname: &str) -> String {
    format!("https://{}/health", hostname.trim_end_matches('/'))
}

/// Ping `url` every `period` until the task is dropped; failures are only logged
pub async fn run_keepalive(url: String, period: Duration) {
    info!(%url, interval_secs = period.as_secs(), "Starting keep-alive");

    let client = match reqwest::Client::builder().timeout(PING_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            warn!("Keep-alive disabled, cannot build HTTP client: {}", e);
            return;
        }
    };

    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;

        if let Err(e) = ping(&client, &url).await {
            metrics::KEEPALIVE_FAILURES_TOTAL.inc();
            warn!(%url, "Keep-alive ping failed: {}", e);
        }
    }
}

async fn ping(client: &reqwest::Client, url: &str) -> reqwest::Result<()> {
    let response = client.get(url).send().await?.error_for_status()?;
    debug!(status = %response.status(), "Keep-alive ping");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_health_url() {
        assert_eq!(
            health_url("warriors.onrender.com"),
            "https://warriors.onrender.com/health"
        );
        assert_eq!(health_url("host/"), "https://host/health");
    }

    #[tokio::test]
    async fn test_pings_repeatedly() {
        let server = MockServer::start_async().await;
        let health = server
            .mock_async(|when, then| {
                when.method(GET).path("/health");
                then.status(200).json_body(json!({ "status": "alive" }));
            })
            .await;

        let task = tokio::spawn(run_keepalive(
            server.url("/health"),
            Duration::from_millis(50),
        ));
        tokio::time::sleep(Duration::from_millis(400)).await;
        task.abort();

        assert!(health.hits_async().await >= 2);
    }

    #[tokio::test]
    async fn test_error_status_counts_as_failure() {
        let server = MockServer::start_async().await;
        let health = server
            .mock_async(|when, then| {
                when.method(GET).path("/health");
                then.status(503);
            })
            .await;
        let before = metrics::KEEPALIVE_FAILURES_TOTAL.get();

        let task = tokio::spawn(run_keepalive(
            server.url("/health"),
            Duration::from_millis(50),
        ));
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(!task.is_finished());
        task.abort();
        assert!(health.hits_async().await >= 1);
        assert!(metrics::KEEPALIVE_FAILURES_TOTAL.get() > before);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_loop() {
        // Nothing listens here, every ping fails
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let task = tokio::spawn(run_keepalive(
            format!("http://{addr}/health"),
            Duration::from_millis(20),
        ));
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!task.is_finished());
        task.abort();
    }
}
