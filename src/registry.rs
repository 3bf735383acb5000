use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use log::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::RegistryError;
use crate::models::{AvailabilityRecord, EnrichedRecord, Status, StreamAnalytics, StreamInfo};
use crate::tracker::Transition;

struct TrackedStream {
    info: StreamInfo,
    record: Mutex<AvailabilityRecord>,
}

impl TrackedStream {
    fn lock(&self) -> MutexGuard<'_, AvailabilityRecord> {
        // Records are only written after validation, so a poisoned guard still holds consistent data.
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory availability records for every registered feed.
///
/// Each record has its own lock; every mutation reads the clock and updates the
/// record inside that lock, so concurrent reports for one feed are applied one
/// after another. No operation holds more than one record lock at a time.
pub struct StreamRegistry {
    clock: Arc<dyn Clock>,
    streams: RwLock<BTreeMap<String, Arc<TrackedStream>>>,
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl StreamRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            streams: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn register(&self, info: StreamInfo) -> Result<EnrichedRecord, RegistryError> {
        let mut streams = self.streams.write().unwrap_or_else(PoisonError::into_inner);
        if streams.contains_key(&info.id) {
            return Err(RegistryError::AlreadyRegistered(info.id));
        }

        let now = self.clock.now();
        let record = AvailabilityRecord::new(now);
        let enriched = record.enrich(&info, now);
        info!("Registered stream {} ({})", info.id, info.name);
        streams.insert(
            info.id.clone(),
            Arc::new(TrackedStream {
                info,
                record: Mutex::new(record),
            }),
        );
        Ok(enriched)
    }

    pub fn len(&self) -> usize {
        self.streams.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find(&self, id: &str) -> Result<Arc<TrackedStream>, RegistryError> {
        self.streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Every record, enriched, ordered by id.
    pub fn list(&self) -> Vec<EnrichedRecord> {
        let handles: Vec<Arc<TrackedStream>> = self
            .streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        handles
            .iter()
            .map(|stream| {
                let record = stream.lock();
                record.enrich(&stream.info, self.clock.now())
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Result<EnrichedRecord, RegistryError> {
        let stream = self.find(id)?;
        let record = stream.lock();
        Ok(record.enrich(&stream.info, self.clock.now()))
    }

    /// Applies a status report for `id`. `status` must be `online` or `offline`.
    pub fn report_status(
        &self,
        id: &str,
        status: &str,
        reason: Option<String>,
    ) -> Result<EnrichedRecord, RegistryError> {
        let stream = self.find(id)?;
        let status: Status = status.parse()?;

        let mut record = stream.lock();
        let now = self.clock.now();
        match record.transition(status, reason, now) {
            Transition::Unchanged => debug!("Stream {} already {}", id, status),
            Transition::WentOffline { uptime } => info!(
                "Stream {} went offline after {} of uptime: {}",
                id,
                humantime::format_duration(std::time::Duration::from_secs(uptime)),
                record.last_error.as_deref().unwrap_or("no reason given")
            ),
            Transition::WentOnline { downtime } => info!(
                "Stream {} back online after {} of downtime",
                id,
                humantime::format_duration(std::time::Duration::from_secs(downtime))
            ),
        }
        Ok(record.enrich(&stream.info, now))
    }

    pub fn reset(&self, id: &str) -> Result<EnrichedRecord, RegistryError> {
        let stream = self.find(id)?;
        let mut record = stream.lock();
        let now = self.clock.now();
        record.reset(now);
        info!("Reset availability statistics for stream {}", id);
        Ok(record.enrich(&stream.info, now))
    }

    pub fn analytics(&self, id: &str) -> Result<StreamAnalytics, RegistryError> {
        let stream = self.find(id)?;
        let record = stream.lock();
        Ok(record.analytics(&stream.info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use std::thread;

    fn camera(id: &str) -> StreamInfo {
        StreamInfo {
            id: id.to_string(),
            name: format!("Camera {}", id),
            url: format!("https://cctv.example.net/{}/index.m3u8", id),
            location: "Jl. Sudirman".to_string(),
            region: "Indonesia".to_string(),
            code: "001".to_string(),
        }
    }

    fn registry() -> (Arc<ManualClock>, StreamRegistry) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        ));
        let registry = StreamRegistry::new(clock.clone());
        registry.register(camera("cam-1")).unwrap();
        (clock, registry)
    }

    #[test]
    fn fresh_record_is_online_with_full_uptime() {
        let (_, registry) = registry();
        let record = registry.get("cam-1").unwrap();

        assert_eq!(record.record.status, Status::Online);
        assert_eq!(record.uptime_percentage, 100.0);
        assert_eq!(record.downtime_percentage, 0.0);
        assert_eq!(record.current_duration_seconds, 0);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let (_, registry) = registry();
        assert_eq!(
            registry.register(camera("cam-1")).unwrap_err(),
            RegistryError::AlreadyRegistered("cam-1".into())
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn offline_report_closes_uptime_session() {
        let (clock, registry) = registry();
        clock.advance(300);

        let record = registry
            .report_status("cam-1", "offline", Some("timeout".into()))
            .unwrap();

        assert_eq!(record.record.status, Status::Offline);
        assert_eq!(record.record.error_count, 1);
        assert_eq!(record.record.last_error.as_deref(), Some("timeout"));
        assert_eq!(record.record.uptime_history.len(), 1);
        assert_eq!(record.record.uptime_history[0].duration, 300);
    }

    #[test]
    fn online_report_after_ten_seconds_records_downtime() {
        let (clock, registry) = registry();
        clock.advance(60);
        registry
            .report_status("cam-1", "offline", Some("timeout".into()))
            .unwrap();
        clock.advance(10);

        let record = registry.report_status("cam-1", "online", None).unwrap();

        let downtime = &record.record.downtime_history;
        assert_eq!(downtime.len(), 1);
        assert_eq!(downtime[0].duration, 10);
        assert_eq!(downtime[0].reason.as_deref(), Some("timeout"));
        assert_eq!(record.record.total_downtime_seconds, 10);
        assert_eq!(record.record.last_error, None);
    }

    #[test]
    fn unknown_stream_is_not_found() {
        let (_, registry) = registry();
        let missing = RegistryError::NotFound("missing".into());

        assert_eq!(registry.get("missing").unwrap_err(), missing);
        assert_eq!(
            registry.report_status("missing", "offline", None).unwrap_err(),
            missing
        );
        assert_eq!(registry.reset("missing").unwrap_err(), missing);
        assert_eq!(registry.analytics("missing").unwrap_err(), missing);
    }

    #[test]
    fn invalid_status_leaves_record_untouched() {
        let (clock, registry) = registry();
        clock.advance(5);
        let before = registry.get("cam-1").unwrap();

        let err = registry
            .report_status("cam-1", "paused", Some("maintenance".into()))
            .unwrap_err();

        assert_eq!(err, RegistryError::InvalidStatus("paused".into()));
        assert_eq!(registry.get("cam-1").unwrap().record, before.record);
    }

    #[test]
    fn repeated_report_changes_nothing() {
        let (clock, registry) = registry();
        clock.advance(5);
        let first = registry.report_status("cam-1", "offline", None).unwrap();
        clock.advance(5);
        let second = registry.report_status("cam-1", "offline", None).unwrap();

        assert_eq!(first.record, second.record);
    }

    #[test]
    fn reset_clears_statistics_but_keeps_the_stream() {
        let (clock, registry) = registry();
        clock.advance(30);
        registry.report_status("cam-1", "offline", Some("timeout".into())).unwrap();
        clock.advance(30);

        let record = registry.reset("cam-1").unwrap();

        assert_eq!(record.record.status, Status::Online);
        assert_eq!(record.record.total_uptime_seconds, 0);
        assert_eq!(record.record.total_downtime_seconds, 0);
        assert!(record.record.uptime_history.is_empty());
        assert!(record.record.downtime_history.is_empty());
        assert_eq!(record.record.error_count, 0);
        assert_eq!(record.record.created_at, clock.now());
        assert_eq!(record.info.name, "Camera cam-1");
    }

    #[test]
    fn list_is_ordered_by_id() {
        let (_, registry) = registry();
        registry.register(camera("cam-0")).unwrap();
        registry.register(camera("cam-7")).unwrap();

        let ids: Vec<String> = registry.list().into_iter().map(|r| r.info.id).collect();
        assert_eq!(ids, vec!["cam-0", "cam-1", "cam-7"]);
    }

    #[test]
    fn analytics_returns_history_and_totals() {
        let (clock, registry) = registry();
        clock.advance(40);
        registry.report_status("cam-1", "offline", None).unwrap();
        clock.advance(20);
        registry.report_status("cam-1", "online", None).unwrap();

        let analytics = registry.analytics("cam-1").unwrap();

        assert_eq!(analytics.id, "cam-1");
        assert_eq!(analytics.total_uptime, 40);
        assert_eq!(analytics.total_downtime, 20);
        assert_eq!(analytics.uptime_history.len(), 1);
        assert_eq!(analytics.downtime_history.len(), 1);
        assert_eq!(analytics.error_count, 1);
    }

    #[test]
    fn concurrent_offline_reports_transition_once() {
        let (clock, registry) = registry();
        clock.advance(15);
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    registry
                        .report_status("cam-1", "offline", Some(format!("probe {}", i)))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let record = registry.get("cam-1").unwrap();
        assert_eq!(record.record.status, Status::Offline);
        assert_eq!(record.record.uptime_history.len(), 1);
        assert_eq!(record.record.error_count, 1);
        assert_eq!(record.record.total_uptime_seconds, 15);
    }
}
