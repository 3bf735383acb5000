use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedwatch::config::ProbeSettings;
use feedwatch::models::{Status, StreamInfo};
use feedwatch::probe::{build_client, run_probe_once};
use feedwatch::{ManualClock, StreamRegistry};

fn stream(id: &str, url: String) -> StreamInfo {
    StreamInfo {
        id: id.to_string(),
        name: id.to_uppercase(),
        url,
        location: String::new(),
        region: String::new(),
        code: String::new(),
    }
}

fn settings() -> ProbeSettings {
    ProbeSettings {
        enabled: true,
        timeout: Duration::from_secs(2),
        attempts: 2,
        ..ProbeSettings::default()
    }
}

#[tokio::test]
async fn reports_each_feed_by_its_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/healthy/index.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken/index.m3u8"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
    ));
    let registry = StreamRegistry::new(clock.clone());
    registry
        .register(stream("healthy", format!("{}/healthy/index.m3u8", server.uri())))
        .unwrap();
    registry
        .register(stream("broken", format!("{}/broken/index.m3u8", server.uri())))
        .unwrap();
    registry
        .register(stream("rtsp", "rtsp://10.0.0.9/stream1".to_string()))
        .unwrap();
    clock.advance(60);

    let settings = settings();
    let client = build_client(&settings).unwrap();
    let mut outcomes = run_probe_once(&settings, &client, &registry).await;
    outcomes.sort_by(|a, b| a.id.cmp(&b.id));

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].id, "broken");
    assert_eq!(outcomes[0].status, Status::Offline);
    assert!(outcomes[0].reason.as_deref().unwrap().contains("503"));
    assert_eq!(outcomes[1].id, "healthy");
    assert_eq!(outcomes[1].status, Status::Online);

    let broken = registry.get("broken").unwrap();
    assert_eq!(broken.record.status, Status::Offline);
    assert_eq!(broken.record.uptime_history[0].duration, 60);
    assert!(broken.record.last_error.is_some());

    let healthy = registry.get("healthy").unwrap();
    assert_eq!(healthy.record.status, Status::Online);
    assert!(healthy.record.uptime_history.is_empty());

    let rtsp = registry.get("rtsp").unwrap();
    assert_eq!(rtsp.record.status, Status::Online);
}

#[tokio::test]
async fn recovered_feed_closes_its_downtime() {
    let server = MockServer::start().await;
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
    ));
    let registry = StreamRegistry::new(clock.clone());
    registry
        .register(stream("cam", format!("{}/cam/index.m3u8", server.uri())))
        .unwrap();
    registry
        .report_status("cam", "offline", Some("player stalled".into()))
        .unwrap();
    clock.advance(45);

    Mock::given(method("GET"))
        .and(path("/cam/index.m3u8"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let settings = settings();
    let client = build_client(&settings).unwrap();
    run_probe_once(&settings, &client, &registry).await;

    let record = registry.get("cam").unwrap().record;
    assert_eq!(record.status, Status::Online);
    assert_eq!(record.total_downtime_seconds, 45);
    assert_eq!(
        record.downtime_history[0].reason.as_deref(),
        Some("player stalled")
    );
}
