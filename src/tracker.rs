use chrono::{DateTime, Utc};

use crate::models::{
    AvailabilityRecord, DurationBreakdown, EnrichedRecord, Session, Status, StreamAnalytics,
    StreamInfo,
};

/// What a status report did to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    /// An offline session of `downtime` seconds closed.
    WentOnline { downtime: u64 },
    /// An online session of `uptime` seconds closed.
    WentOffline { uptime: u64 },
}

/// Whole seconds from `start` to `end`, floored, 0 when `end` precedes `start`.
pub fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    u64::try_from((end - start).num_seconds()).unwrap_or(0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Uptime and downtime shares in percent, two decimals. 100/0 before any session closed.
pub fn percentages(total_uptime: u64, total_downtime: u64) -> (f64, f64) {
    let total = total_uptime + total_downtime;
    if total == 0 {
        return (100.0, 0.0);
    }
    let uptime = round2(total_uptime as f64 / total as f64 * 100.0);
    (uptime, round2(100.0 - uptime))
}

/// Mean session length in whole seconds; 0 for an empty history.
pub fn average_duration(history: &[Session]) -> u64 {
    if history.is_empty() {
        return 0;
    }
    history.iter().map(|s| s.duration).sum::<u64>() / history.len() as u64
}

impl DurationBreakdown {
    pub fn from_seconds(total: u64) -> Self {
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }
}

impl AvailabilityRecord {
    /// A fresh record: online since `now`, no history.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            status: Status::Online,
            session_start: now,
            last_online: now,
            last_offline: None,
            total_uptime_seconds: 0,
            total_downtime_seconds: 0,
            uptime_history: Vec::new(),
            downtime_history: Vec::new(),
            error_count: 0,
            last_error: None,
            created_at: now,
        }
    }

    /// Applies a status report. `reason` is only kept for transitions into offline.
    pub fn transition(
        &mut self,
        status: Status,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Transition {
        if status == self.status {
            return Transition::Unchanged;
        }

        let duration = elapsed_seconds(self.session_start, now);
        let closed = Session {
            start: self.session_start,
            end: now,
            duration,
            reason: None,
        };

        match status {
            Status::Online => {
                self.downtime_history.push(Session {
                    reason: self.last_error.take(),
                    ..closed
                });
                self.total_downtime_seconds += duration;
                self.last_online = now;
                self.status = Status::Online;
                self.session_start = now;
                Transition::WentOnline { downtime: duration }
            }
            Status::Offline => {
                self.uptime_history.push(closed);
                self.total_uptime_seconds += duration;
                self.last_offline = Some(now);
                self.status = Status::Offline;
                self.session_start = now;
                self.last_error = reason;
                self.error_count += 1;
                Transition::WentOffline { uptime: duration }
            }
        }
    }

    pub fn reset(&mut self, now: DateTime<Utc>) {
        *self = Self::new(now);
    }

    /// Length of the still-open session.
    pub fn current_duration(&self, now: DateTime<Utc>) -> u64 {
        elapsed_seconds(self.session_start, now)
    }

    pub fn enrich(&self, info: &StreamInfo, now: DateTime<Utc>) -> EnrichedRecord {
        let current = self.current_duration(now);
        let (uptime_percentage, downtime_percentage) =
            percentages(self.total_uptime_seconds, self.total_downtime_seconds);

        EnrichedRecord {
            info: info.clone(),
            record: self.clone(),
            current_duration_seconds: current,
            current_duration_formatted: DurationBreakdown::from_seconds(current),
            uptime_percentage,
            downtime_percentage,
            avg_uptime_formatted: DurationBreakdown::from_seconds(average_duration(
                &self.uptime_history,
            )),
            avg_downtime_formatted: DurationBreakdown::from_seconds(average_duration(
                &self.downtime_history,
            )),
        }
    }

    pub fn analytics(&self, info: &StreamInfo) -> StreamAnalytics {
        StreamAnalytics {
            id: info.id.clone(),
            name: info.name.clone(),
            uptime_history: self.uptime_history.clone(),
            downtime_history: self.downtime_history.clone(),
            total_uptime: self.total_uptime_seconds,
            total_downtime: self.total_downtime_seconds,
            error_count: self.error_count,
        }
    }
}
