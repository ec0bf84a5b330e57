//! Time source seam.
//!
//! Reconciliation compares due dates against "today" and the mutator
//! stamps audit entries with "now"; both take the time source through
//! this trait so tests can pin it.

/// Supplies the current instant and the current date.
///
/// Both are ISO 8601 strings: dates order lexicographically, so overdue
/// checks are plain string comparisons.
pub trait Clock: Send + Sync {
    /// RFC 3339 timestamp, e.g. `2026-08-06T09:30:00Z`.
    fn now_rfc3339(&self) -> String;

    /// Calendar date, e.g. `2026-08-06`.
    fn today_iso(&self) -> String;
}

/// Wall-clock UTC time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default()
    }

    fn today_iso(&self) -> String {
        let d = time::OffsetDateTime::now_utc().date();
        format!("{:04}-{:02}-{:02}", d.year(), d.month() as u8, d.day())
    }
}

/// A pinned clock for tests.
pub struct FixedClock {
    pub now: String,
    pub today: String,
}

impl FixedClock {
    pub fn at(now: &str, today: &str) -> Self {
        Self {
            now: now.to_string(),
            today: today.to_string(),
        }
    }
}

impl Clock for FixedClock {
    fn now_rfc3339(&self) -> String {
        self.now.clone()
    }

    fn today_iso(&self) -> String {
        self.today.clone()
    }
}
