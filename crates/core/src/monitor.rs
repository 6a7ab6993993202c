// crates/core/src/monitor.rs
//! Per-poll decision logic for observing a job.
//!
//! One call of [`Monitor::poll`] answers one observer request: is the job done,
//! how far along is it, what new log lines are there, and when should the
//! observer ask again. Failed jobs additionally get their failure cause
//! classified and their retention extended so the failure stays inspectable.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jobwatch_types::{DetailResponse, FailureInfo, JobHandle, PollResult};

use crate::config::MonitorConfig;
use crate::diagnostics::{clip, extract_error_message};
use crate::error::MonitorError;
use crate::session::ObserverSession;
use crate::status::{JobLookup, JobStatus};

/// Job state as seen by one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    /// Running without a known total; no percentage is available.
    Indeterminate,
    /// Running with a known total. `factor` is `processed / total`, `"0.00"`.
    Determinate { factor: String },
    /// The job is done; the observer stops polling.
    Finished(Completion),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Success,
    Failure(FailureReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    /// Failure cause clipped for a one-line display.
    pub summary: String,
    /// Full failure cause.
    pub detail: String,
    /// Whether the cause was logged as an exception, which is worth a detail view.
    pub has_detail: bool,
}

/// Everything one poll produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub status: PollStatus,
    /// Single-line summary: the latest message, or the failure title.
    pub summary: String,
    /// Messages delivered by this poll; empty unless the session is expanded.
    pub new_lines: Vec<String>,
    /// The session cursor after this poll.
    pub cursor: usize,
    /// When to poll next; `None` once finished.
    pub next_poll: Option<Duration>,
}

impl PollOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self.status, PollStatus::Finished(_))
    }
}

impl From<PollOutcome> for PollResult {
    fn from(outcome: PollOutcome) -> Self {
        let next_poll_delay_ms = outcome
            .next_poll
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        let (progress_factor, finished, failure_info) = match outcome.status {
            PollStatus::Indeterminate => (None, false, None),
            PollStatus::Determinate { factor } => (Some(factor), false, None),
            PollStatus::Finished(Completion::Success) => (None, true, None),
            PollStatus::Finished(Completion::Failure(report)) => (
                None,
                true,
                Some(FailureInfo {
                    summary_text: report.summary,
                    has_detail: report.has_detail,
                    detail_text: report.has_detail.then_some(report.detail),
                }),
            ),
        };
        PollResult {
            progress_factor,
            summary_text: outcome.summary,
            new_log_lines: outcome.new_lines,
            cursor: outcome.cursor,
            next_poll_delay_ms,
            finished,
            failure_info,
        }
    }
}

/// Format `processed / total` with two decimals and a `.` separator.
///
/// Midpoints round away from zero, so 1/8 is `"0.13"`.
pub fn format_factor(processed: i64, total: i64) -> String {
    let fraction = processed as f64 / total as f64;
    format!("{:.2}", (fraction * 100.0).round() / 100.0)
}

fn cursor_out_of_range(job: &JobStatus, session: &ObserverSession, len: usize) -> MonitorError {
    tracing::warn!(
        job = %job.handle(),
        cursor = session.last_delivered(),
        len,
        "Poll with cursor past end of log"
    );
    MonitorError::CursorOutOfRange {
        handle: job.handle(),
        cursor: session.last_delivered(),
        len,
    }
}

/// Stateless poll handler.
///
/// Holds only configuration and the executor's [`JobLookup`]; all per-observer
/// state lives in the [`ObserverSession`] the caller passes in.
#[derive(Clone)]
pub struct Monitor {
    jobs: Arc<dyn JobLookup>,
    config: MonitorConfig,
}

impl Monitor {
    pub fn new(jobs: Arc<dyn JobLookup>, config: MonitorConfig) -> Self {
        Self { jobs, config }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn resolve(&self, handle: JobHandle) -> Result<Arc<JobStatus>, MonitorError> {
        self.jobs.get_job(handle).ok_or_else(|| {
            tracing::error!(job = %handle, "Poll for unknown or reclaimed job");
            MonitorError::JobNotFound { handle }
        })
    }

    /// Answer one poll for the session's job.
    ///
    /// Returns `JobNotFound` if the handle does not resolve and
    /// `CursorOutOfRange` if the session's cursor is past the end of the log;
    /// no partial result is produced in either case.
    pub fn poll(&self, session: &mut ObserverSession) -> Result<PollOutcome, MonitorError> {
        self.poll_at(session, Utc::now())
    }

    pub fn poll_at(
        &self,
        session: &mut ObserverSession,
        now: DateTime<Utc>,
    ) -> Result<PollOutcome, MonitorError> {
        let job = self.resolve(session.handle())?;
        self.poll_job(&job, session, now)
    }

    fn poll_job(
        &self,
        job: &JobStatus,
        session: &mut ObserverSession,
        now: DateTime<Utc>,
    ) -> Result<PollOutcome, MonitorError> {
        // The log only grows, so a cursor in range now stays in range.
        let len = job.messages().len();
        if session.last_delivered() > len {
            return Err(cursor_out_of_range(job, session, len));
        }

        if job.is_finished() {
            // Lines logged between the last running poll and completion are
            // still delivered once.
            let new_lines = self.deliver(job, session)?;
            let completion = self.finalize_job(job, now);
            let summary = match completion {
                Completion::Success => job.messages().latest().unwrap_or_default(),
                Completion::Failure(_) => self.config.fallback_error.clone(),
            };
            return Ok(PollOutcome {
                status: PollStatus::Finished(completion),
                summary,
                new_lines,
                cursor: session.last_delivered(),
                next_poll: None,
            });
        }

        let total = job.total();
        let (status, next_poll) = if total <= 0 {
            (PollStatus::Indeterminate, self.config.indeterminate_poll())
        } else {
            let factor = format_factor(job.processed(), total);
            (PollStatus::Determinate { factor }, self.config.determinate_poll())
        };
        let summary = job.messages().latest().unwrap_or_default();
        let new_lines = self.deliver(job, session)?;

        Ok(PollOutcome {
            status,
            summary,
            new_lines,
            cursor: session.last_delivered(),
            next_poll: Some(next_poll),
        })
    }

    /// Copy undelivered messages and advance the cursor, in expanded mode only.
    fn deliver(&self, job: &JobStatus, session: &mut ObserverSession) -> Result<Vec<String>, MonitorError> {
        if !session.is_expanded() {
            return Ok(Vec::new());
        }
        let Some(batch) = job.messages().read_from(session.last_delivered()) else {
            return Err(cursor_out_of_range(job, session, job.messages().len()));
        };
        session.advance_to(batch.end);
        Ok(batch.lines)
    }

    /// Classify a finished job's outcome.
    ///
    /// For failed jobs this also applies the retention floor. Calling it again
    /// is harmless: the expiry is only ever extended.
    pub fn finalize(&self, handle: JobHandle) -> Result<Completion, MonitorError> {
        let job = self.resolve(handle)?;
        Ok(self.finalize_job(&job, Utc::now()))
    }

    pub fn finalize_at(&self, handle: JobHandle, now: DateTime<Utc>) -> Result<Completion, MonitorError> {
        let job = self.resolve(handle)?;
        Ok(self.finalize_job(&job, now))
    }

    fn finalize_job(&self, job: &JobStatus, now: DateTime<Utc>) -> Completion {
        if !job.failed() {
            return Completion::Success;
        }
        self.enforce_retention_floor(job, now);

        let messages = job.messages().snapshot();
        let found = extract_error_message(&messages, &self.config.error_markers());
        Completion::Failure(FailureReport {
            summary: clip(&found.text, self.config.summary_clip_limit),
            has_detail: found.is_exception,
            detail: found.text,
        })
    }

    /// Keep a failed job around for at least the retention floor.
    ///
    /// Only applies while `now - expiry` is under the floor; an expiry that
    /// lapsed longer ago than that is left alone.
    fn enforce_retention_floor(&self, job: &JobStatus, now: DateTime<Utc>) {
        let floor = self.config.failure_retention();
        if now - job.expiry() < floor && job.extend_expiry(now + floor) {
            tracing::debug!(
                job = %job.handle(),
                expiry = %job.expiry(),
                "Extended failed job retention"
            );
        }
    }

    /// The observer abandons the job. Grants a short grace period before the
    /// executor may reclaim it and consumes the session.
    pub fn close(&self, session: ObserverSession) -> Result<(), MonitorError> {
        self.close_at(session, Utc::now())
    }

    pub fn close_at(&self, session: ObserverSession, now: DateTime<Utc>) -> Result<(), MonitorError> {
        let job = self.resolve(session.handle())?;
        job.extend_expiry(now + self.config.close_grace());
        tracing::info!(
            job = %job.handle(),
            delivered = session.last_delivered(),
            "Observer closed"
        );
        Ok(())
    }

    /// Flip incremental mode, or hand out the full failure detail if the job
    /// has already failed.
    pub fn toggle_detail(&self, session: &mut ObserverSession) -> Result<DetailResponse, MonitorError> {
        let job = self.resolve(session.handle())?;
        if job.is_finished() && job.failed() {
            let messages = job.messages().snapshot();
            let found = extract_error_message(&messages, &self.config.error_markers());
            return Ok(DetailResponse::Detail { text: found.text });
        }
        let expanded = session.toggle_expanded();
        Ok(DetailResponse::Toggled { expanded })
    }

    /// Render a delivered batch as one text block using the configured break.
    pub fn render_lines(&self, lines: &[String]) -> String {
        let mut out = String::new();
        for line in lines {
            out.push_str(line);
            out.push_str(&self.config.line_break);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as TimeDelta;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Jobs(HashMap<JobHandle, Arc<JobStatus>>);

    impl JobLookup for Jobs {
        fn get_job(&self, handle: JobHandle) -> Option<Arc<JobStatus>> {
            self.0.get(&handle).cloned()
        }
    }

    fn setup(total: i64) -> (Monitor, Arc<JobStatus>) {
        let job = Arc::new(JobStatus::new(JobHandle(1), "job", total, Utc::now()));
        let mut jobs = Jobs::default();
        jobs.0.insert(JobHandle(1), Arc::clone(&job));
        (Monitor::new(Arc::new(jobs), MonitorConfig::default()), job)
    }

    #[test]
    fn unknown_handle_is_an_error() {
        let (monitor, _job) = setup(0);
        let mut session = ObserverSession::new(JobHandle(99));
        let err = monitor.poll(&mut session).unwrap_err();
        assert_eq!(err, MonitorError::JobNotFound { handle: JobHandle(99) });
        assert_eq!(session.last_delivered(), 0);
    }

    #[test]
    fn indeterminate_job_polls_every_second() {
        let (monitor, job) = setup(0);
        job.append_message("scanning");
        let mut session = ObserverSession::new(JobHandle(1));

        let outcome = monitor.poll(&mut session).unwrap();
        assert_eq!(outcome.status, PollStatus::Indeterminate);
        assert_eq!(outcome.summary, "scanning");
        assert_eq!(outcome.next_poll, Some(Duration::from_millis(1000)));

        let result = PollResult::from(outcome);
        assert_eq!(result.progress_factor, None);
        assert_eq!(result.next_poll_delay_ms, Some(1000));
        assert!(!result.finished);
    }

    #[test]
    fn negative_total_is_indeterminate() {
        let (monitor, _job) = setup(-5);
        let mut session = ObserverSession::new(JobHandle(1));
        let outcome = monitor.poll(&mut session).unwrap();
        assert_eq!(outcome.status, PollStatus::Indeterminate);
        assert_eq!(outcome.summary, "");
    }

    #[test]
    fn determinate_job_reports_factor() {
        let (monitor, job) = setup(200);
        job.set_processed(84);
        job.append_message("item 84");
        let mut session = ObserverSession::new(JobHandle(1));

        let outcome = monitor.poll(&mut session).unwrap();
        assert_eq!(
            outcome.status,
            PollStatus::Determinate {
                factor: "0.42".to_string()
            }
        );
        assert_eq!(outcome.summary, "item 84");
        assert_eq!(outcome.next_poll, Some(Duration::from_millis(500)));
    }

    #[test]
    fn factor_formatting() {
        assert_eq!(format_factor(0, 3), "0.00");
        assert_eq!(format_factor(1, 3), "0.33");
        assert_eq!(format_factor(2, 3), "0.67");
        assert_eq!(format_factor(3, 3), "1.00");
        assert_eq!(format_factor(25, 2), "12.50");
        assert_eq!(format_factor(1, 8), "0.13");
        assert_eq!(format_factor(3, 8), "0.38");
        assert_eq!(format_factor(5, 8), "0.63");
        assert_eq!(format_factor(7, 8), "0.88");
    }

    #[test]
    fn cursor_past_end_is_rejected() {
        let (monitor, job) = setup(0);
        job.append_message("m0");

        let mut session = ObserverSession::resume(JobHandle(1), 5, true);
        let err = monitor.poll(&mut session).unwrap_err();
        assert_eq!(
            err,
            MonitorError::CursorOutOfRange {
                handle: JobHandle(1),
                cursor: 5,
                len: 1,
            }
        );
        assert_eq!(session.last_delivered(), 5);

        // Collapsed sessions are checked too.
        let mut session = ObserverSession::resume(JobHandle(1), 2, false);
        assert!(matches!(
            monitor.poll(&mut session),
            Err(MonitorError::CursorOutOfRange { cursor: 2, len: 1, .. })
        ));
    }

    #[test]
    fn cursor_at_end_is_accepted() {
        let (monitor, job) = setup(0);
        job.append_message("m0");
        let mut session = ObserverSession::resume(JobHandle(1), 1, true);

        let outcome = monitor.poll(&mut session).unwrap();
        assert!(outcome.new_lines.is_empty());
        assert_eq!(outcome.cursor, 1);

        for i in 1..=3 {
            job.append_message(format!("m{i}"));
        }
        let outcome = monitor.poll(&mut session).unwrap();
        assert_eq!(outcome.new_lines, vec!["m1", "m2", "m3"]);
        assert_eq!(outcome.cursor, 4);
    }

    #[test]
    fn collapsed_session_never_moves_cursor() {
        let (monitor, job) = setup(0);
        job.append_message("a");
        job.append_message("b");
        let mut session = ObserverSession::new(JobHandle(1));

        for _ in 0..3 {
            let outcome = monitor.poll(&mut session).unwrap();
            assert!(outcome.new_lines.is_empty());
            assert_eq!(outcome.cursor, 0);
        }
        assert_eq!(session.last_delivered(), 0);
    }

    #[test]
    fn expanding_later_delivers_full_history() {
        let (monitor, job) = setup(0);
        job.append_message("a");
        let mut session = ObserverSession::new(JobHandle(1));
        monitor.poll(&mut session).unwrap();
        job.append_message("b");

        session.set_expanded(true);
        let outcome = monitor.poll(&mut session).unwrap();
        assert_eq!(outcome.new_lines, vec!["a", "b"]);
        assert_eq!(outcome.cursor, 2);
    }

    #[test]
    fn expanded_session_gets_each_line_once() {
        let (monitor, job) = setup(3);
        let mut session = ObserverSession::new(JobHandle(1)).with_expanded(true);

        job.append_message("one");
        assert_eq!(monitor.poll(&mut session).unwrap().new_lines, vec!["one"]);
        assert!(monitor.poll(&mut session).unwrap().new_lines.is_empty());

        job.append_message("two");
        job.append_message("three");
        let outcome = monitor.poll(&mut session).unwrap();
        assert_eq!(outcome.new_lines, vec!["two", "three"]);
        assert_eq!(session.last_delivered(), 3);
    }

    #[test]
    fn finished_success_stops_polling() {
        let (monitor, job) = setup(2);
        job.append_message("done");
        job.finish(false, Utc::now());
        let mut session = ObserverSession::new(JobHandle(1));

        let outcome = monitor.poll(&mut session).unwrap();
        assert_eq!(outcome.status, PollStatus::Finished(Completion::Success));
        assert!(outcome.is_finished());
        assert_eq!(outcome.next_poll, None);

        let result = PollResult::from(outcome);
        assert!(result.finished);
        assert_eq!(result.failure_info, None);
        assert_eq!(result.next_poll_delay_ms, None);
    }

    #[test]
    fn finished_poll_flushes_remaining_lines() {
        let (monitor, job) = setup(0);
        let mut session = ObserverSession::new(JobHandle(1)).with_expanded(true);
        job.append_message("a");
        monitor.poll(&mut session).unwrap();
        job.append_message("b");
        job.finish(false, Utc::now());

        let outcome = monitor.poll(&mut session).unwrap();
        assert!(outcome.is_finished());
        assert_eq!(outcome.new_lines, vec!["b"]);
    }

    #[test]
    fn failed_job_reports_clipped_cause() {
        let (monitor, job) = setup(0);
        let long = "x".repeat(150);
        job.append_message("working");
        job.append_message(format!("Exception: {long}"));
        job.append_message("cleanup");
        job.finish(true, Utc::now());
        let mut session = ObserverSession::new(JobHandle(1));

        let outcome = monitor.poll(&mut session).unwrap();
        assert_eq!(outcome.summary, "An error occurred.");
        let result = PollResult::from(outcome);
        let info = result.failure_info.unwrap();
        assert_eq!(info.summary_text, format!("{}...", "x".repeat(120)));
        assert!(info.has_detail);
        assert_eq!(info.detail_text, Some(long));
    }

    #[test]
    fn plain_error_has_no_detail() {
        let (monitor, job) = setup(0);
        job.append_message("Error: disk full");
        job.finish(true, Utc::now());

        match monitor.finalize(JobHandle(1)).unwrap() {
            Completion::Failure(report) => {
                assert_eq!(report.summary, "disk full");
                assert!(!report.has_detail);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        let result = PollResult::from(monitor.poll(&mut ObserverSession::new(JobHandle(1))).unwrap());
        assert_eq!(result.failure_info.unwrap().detail_text, None);
    }

    #[test]
    fn failure_expiry_ratchet() {
        let now = Utc::now();
        let (monitor, job) = setup(0);
        job.finish(true, now);
        job.extend_expiry(now);

        monitor.finalize_at(JobHandle(1), now).unwrap();
        let first = job.expiry();
        assert!(first >= now + TimeDelta::minutes(30));

        monitor.finalize_at(JobHandle(1), now).unwrap();
        assert!(job.expiry() >= first);
    }

    #[test]
    fn retention_never_shortens_a_later_expiry() {
        let now = Utc::now();
        let (monitor, job) = setup(0);
        job.finish(true, now + TimeDelta::hours(2));

        monitor.finalize_at(JobHandle(1), now).unwrap();
        assert_eq!(job.expiry(), now + TimeDelta::hours(2));
    }

    #[test]
    fn retention_skips_long_lapsed_expiry() {
        let now = Utc::now();
        let job = Arc::new(JobStatus::new(JobHandle(1), "old", 0, now - TimeDelta::hours(1)));
        job.finish(true, now - TimeDelta::hours(1));
        let mut jobs = Jobs::default();
        jobs.0.insert(JobHandle(1), Arc::clone(&job));
        let monitor = Monitor::new(Arc::new(jobs), MonitorConfig::default());

        monitor.finalize_at(JobHandle(1), now).unwrap();
        assert_eq!(job.expiry(), now - TimeDelta::hours(1));
    }

    #[test]
    fn successful_job_keeps_expiry() {
        let now = Utc::now();
        let (monitor, job) = setup(0);
        job.finish(false, now);
        monitor.finalize_at(JobHandle(1), now).unwrap();
        assert!(job.expiry() < now + TimeDelta::minutes(30));
    }

    #[test]
    fn close_grants_grace_period() {
        let now = Utc::now();
        let (monitor, job) = setup(0);
        monitor.close_at(ObserverSession::new(JobHandle(1)), now).unwrap();
        assert_eq!(job.expiry(), now + TimeDelta::minutes(1));

        let err = monitor.close(ObserverSession::new(JobHandle(5))).unwrap_err();
        assert_eq!(err, MonitorError::JobNotFound { handle: JobHandle(5) });
    }

    #[test]
    fn close_does_not_cut_failure_retention() {
        let now = Utc::now();
        let (monitor, job) = setup(0);
        job.finish(true, now);
        monitor.poll_at(&mut ObserverSession::new(JobHandle(1)), now).unwrap();
        monitor.close_at(ObserverSession::new(JobHandle(1)), now).unwrap();
        assert!(job.expiry() >= now + TimeDelta::minutes(30));
    }

    #[test]
    fn toggle_detail_flips_while_running() {
        let (monitor, _job) = setup(0);
        let mut session = ObserverSession::new(JobHandle(1));
        assert_eq!(
            monitor.toggle_detail(&mut session).unwrap(),
            DetailResponse::Toggled { expanded: true }
        );
        assert!(session.is_expanded());
        assert_eq!(
            monitor.toggle_detail(&mut session).unwrap(),
            DetailResponse::Toggled { expanded: false }
        );
    }

    #[test]
    fn toggle_detail_on_failure_returns_full_text() {
        let (monitor, job) = setup(0);
        let long = "y".repeat(200);
        job.append_message(format!("exception: {long}"));
        job.finish(true, Utc::now());
        let mut session = ObserverSession::new(JobHandle(1));

        assert_eq!(
            monitor.toggle_detail(&mut session).unwrap(),
            DetailResponse::Detail { text: long }
        );
        assert!(!session.is_expanded());
    }

    #[test]
    fn toggle_detail_on_success_still_toggles() {
        let (monitor, job) = setup(0);
        job.finish(false, Utc::now());
        let mut session = ObserverSession::new(JobHandle(1));
        assert_eq!(
            monitor.toggle_detail(&mut session).unwrap(),
            DetailResponse::Toggled { expanded: true }
        );
    }

    #[test]
    fn render_lines_uses_configured_break() {
        let jobs: Arc<dyn JobLookup> = Arc::new(Jobs::default());
        let config = MonitorConfig {
            line_break: "<br />".to_string(),
            ..MonitorConfig::default()
        };
        let monitor = Monitor::new(jobs, config);
        let lines = vec!["a".to_string(), "b".to_string()];
        assert_eq!(monitor.render_lines(&lines), "a<br />b<br />");
    }
}
