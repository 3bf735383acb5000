//! Built-in reporting client: fetches each feed URL and reports the outcome
//! through the registry like any other caller.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::stream::StreamExt;
use log::{debug, info, warn};
use rand::{Rng, rng};
use reqwest::Client;
use tokio::time;
use url::Url;

use crate::config::ProbeSettings;
use crate::models::Status;
use crate::registry::StreamRegistry;

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub id: String,
    pub status: Status,
    pub reason: Option<String>,
}

pub fn build_client(settings: &ProbeSettings) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(&settings.user_agent)
        .timeout(settings.timeout)
        .build()?)
}

/// Only http(s) feeds can be probed; RTSP and friends are left to external clients.
fn probe_target(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

async fn fetch_once(client: &Client, url: &Url) -> Result<()> {
    client.get(url.clone()).send().await?.error_for_status()?;
    Ok(())
}

async fn probe_stream(client: &Client, url: &Url, attempts: u32) -> Result<()> {
    let mut attempt = 0;
    let mut delay = Duration::from_millis(500);

    loop {
        attempt += 1;
        match fetch_once(client, url).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => debug!("Probe attempt {} for {} failed: {}", attempt, url, e),
        }

        time::sleep(delay).await;
        let jitter_ms: u64 = rng().random_range(0u64..250u64);
        delay = delay
            .saturating_mul(2)
            .saturating_add(Duration::from_millis(jitter_ms));
    }
}

/// Probes every registered http(s) feed once and reports each result.
pub async fn run_probe_once(
    settings: &ProbeSettings,
    client: &Client,
    registry: &StreamRegistry,
) -> Vec<ProbeOutcome> {
    let targets: Vec<(String, Url)> = registry
        .list()
        .into_iter()
        .filter_map(|stream| match probe_target(&stream.info.url) {
            Some(url) => Some((stream.info.id, url)),
            None => {
                debug!("Skipping stream {}: no http(s) url", stream.info.id);
                None
            }
        })
        .collect();

    let attempts = settings.attempts.max(1);
    let tasks = targets.into_iter().map(|(id, url)| async move {
        let result = probe_stream(client, &url, attempts).await;
        (id, result)
    });
    let results = futures::stream::iter(tasks)
        .buffer_unordered(settings.max_concurrent.max(1))
        .collect::<Vec<_>>()
        .await;

    let mut outcomes = Vec::with_capacity(results.len());
    for (id, result) in results {
        let outcome = match result {
            Ok(()) => ProbeOutcome {
                id,
                status: Status::Online,
                reason: None,
            },
            Err(e) => {
                warn!("Probe for stream {} failed: {}", id, e);
                ProbeOutcome {
                    id,
                    status: Status::Offline,
                    reason: Some(e.to_string()),
                }
            }
        };
        if let Err(e) =
            registry.report_status(&outcome.id, outcome.status.as_str(), outcome.reason.clone())
        {
            warn!("Failed to report probe result for {}: {}", outcome.id, e);
        }
        outcomes.push(outcome);
    }
    outcomes
}

/// Probes on `settings.interval` until the task is dropped.
pub async fn run_prober(settings: ProbeSettings, client: Client, registry: Arc<StreamRegistry>) {
    info!(
        "Starting prober: every {}, timeout {}, {} attempt(s)",
        humantime::format_duration(settings.interval),
        humantime::format_duration(settings.timeout),
        settings.attempts
    );

    let mut interval = time::interval(settings.interval);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let outcomes = run_probe_once(&settings, &client, &registry).await;
        let offline = outcomes
            .iter()
            .filter(|o| o.status == Status::Offline)
            .count();
        debug!(
            "Probe round finished: {} checked, {} offline",
            outcomes.len(),
            offline
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_http_urls_are_probed() {
        assert!(probe_target("https://cctv.example.net/cam/index.m3u8").is_some());
        assert!(probe_target("http://10.0.0.5:8080/live").is_some());
        assert!(probe_target("rtsp://10.0.0.5/stream1").is_none());
        assert!(probe_target("url yang kamu dapatkan").is_none());
        assert!(probe_target("").is_none());
    }
}
