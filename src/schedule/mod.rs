//! Daily and on-demand triggering of digest batches.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::Notify;

use crate::core::DigestError;
use crate::digest::{BatchResult, DigestOrchestrator, RecipientSource};

/// A fixed time of day, in a given timezone, at which the daily digest runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
    tz: Tz,
}

impl Default for DailySchedule {
    /// Noon UTC.
    fn default() -> Self {
        Self {
            at: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN),
            tz: Tz::UTC,
        }
    }
}

impl DailySchedule {
    #[must_use]
    pub const fn new(at: NaiveTime, tz: Tz) -> Self {
        Self { at, tz }
    }

    #[must_use]
    pub const fn at(&self) -> NaiveTime {
        self.at
    }

    #[must_use]
    pub const fn tz(&self) -> Tz {
        self.tz
    }

    /// The first fire time strictly after `now`.
    ///
    /// A fire time that falls into a DST gap moves forward by an hour; one that falls into
    /// a repeated hour uses the earlier instant.
    #[must_use]
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = self.local_date(now);
        (0..=2)
            .filter_map(|d| today.checked_add_days(Days::new(d)))
            .filter_map(|day| self.fire_on(day))
            .find(|t| *t > now)
            .unwrap_or(now + TimeDelta::days(1))
    }

    /// The calendar day, in the schedule's timezone, that `instant` falls on.
    #[must_use]
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    fn fire_on(&self, day: NaiveDate) -> Option<DateTime<Utc>> {
        let local = day.and_time(self.at);
        self.tz
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(local + TimeDelta::hours(1)))
                    .earliest()
            })
            .map(|t| t.with_timezone(&Utc))
    }
}

/// What started a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduled,
    OnDemand,
}

/// Cloneable handle for requesting an immediate run from a running [`DigestScheduler`].
///
/// A request made while a batch is in flight is kept and served once that batch ends.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    notify: Arc<Notify>,
}

impl TriggerHandle {
    pub fn trigger(&self) {
        self.notify.notify_one();
    }
}

/// Runs the digest batch once per calendar day at a fixed time, and whenever asked.
pub struct DigestScheduler {
    orchestrator: DigestOrchestrator,
    source: Arc<dyn RecipientSource>,
    schedule: DailySchedule,
    notify: Arc<Notify>,
}

impl DigestScheduler {
    pub fn new(
        orchestrator: DigestOrchestrator,
        source: Arc<dyn RecipientSource>,
        schedule: DailySchedule,
    ) -> Self {
        Self {
            orchestrator,
            source,
            schedule,
            notify: Arc::new(Notify::new()),
        }
    }

    #[must_use]
    pub fn handle(&self) -> TriggerHandle {
        TriggerHandle {
            notify: Arc::clone(&self.notify),
        }
    }

    /// Runs one batch right away, outside the loop.
    ///
    /// # Errors
    ///
    /// Returns `DigestError::RecipientSource` when recipients cannot be listed.
    pub async fn run_once(&self, trigger: Trigger) -> Result<BatchResult, DigestError> {
        tracing::info!(?trigger, "digest run requested");
        self.orchestrator.run_from_source(self.source.as_ref()).await
    }

    /// Waits for the daily fire time or an on-demand trigger, runs a batch, and repeats
    /// until `shutdown` resolves. A batch in flight at shutdown is cancelled.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = std::pin::pin!(shutdown);
        let mut last_scheduled_day: Option<NaiveDate> = None;

        loop {
            let now = Utc::now();
            let mut next = self.schedule.next_after(now);
            if last_scheduled_day == Some(self.schedule.local_date(next)) {
                next = self.schedule.next_after(next);
            }
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::debug!(%next, ?wait, "next scheduled digest");

            let trigger = tokio::select! {
                () = tokio::time::sleep(wait) => Trigger::Scheduled,
                () = self.notify.notified() => Trigger::OnDemand,
                () = &mut shutdown => break,
            };
            if trigger == Trigger::Scheduled {
                last_scheduled_day = Some(self.schedule.local_date(next));
            }

            match self
                .orchestrator
                .run_from_source_until(self.source.as_ref(), &mut shutdown)
                .await
            {
                Ok(report) if report.cancelled => break,
                Ok(report) => tracing::info!(
                    ?trigger,
                    attempted = report.attempted,
                    summarized = report.summarized,
                    sent = report.sent,
                    "digest run complete"
                ),
                Err(e) => tracing::error!(?trigger, error = %e, "digest run failed"),
            }
        }
        tracing::info!("digest scheduler stopped");
    }
}
