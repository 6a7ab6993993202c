//! Delivery guarantees of the polling protocol under concurrent appends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use jobwatch_core::{JobLookup, JobStatus, Monitor, MonitorConfig, ObserverSession, PollStatus};
use jobwatch_types::{JobHandle, PollResult};
use proptest::prelude::*;

struct Jobs(HashMap<JobHandle, Arc<JobStatus>>);

impl JobLookup for Jobs {
    fn get_job(&self, handle: JobHandle) -> Option<Arc<JobStatus>> {
        self.0.get(&handle).cloned()
    }
}

fn monitor_with(job: &Arc<JobStatus>) -> Monitor {
    let mut jobs = HashMap::new();
    jobs.insert(job.handle(), Arc::clone(job));
    Monitor::new(Arc::new(Jobs(jobs)), MonitorConfig::default())
}

#[test]
fn concurrent_appender_and_poller_see_every_line_once() {
    const LINES: usize = 20_000;

    let job = Arc::new(JobStatus::new(JobHandle(1), "stress", LINES as i64, Utc::now()));
    let monitor = monitor_with(&job);

    let appender = {
        let job = Arc::clone(&job);
        std::thread::spawn(move || {
            for i in 0..LINES {
                job.append_message(format!("line {i}"));
                job.increment_processed();
            }
            job.finish(false, Utc::now());
        })
    };

    let mut session = ObserverSession::new(JobHandle(1)).with_expanded(true);
    let mut received = Vec::with_capacity(LINES);
    loop {
        let outcome = monitor.poll(&mut session).expect("job is registered");
        assert_eq!(outcome.cursor, received.len() + outcome.new_lines.len());
        received.extend(outcome.new_lines.iter().cloned());
        if outcome.is_finished() {
            break;
        }
        std::thread::yield_now();
    }
    appender.join().expect("appender panicked");

    let expected: Vec<String> = (0..LINES).map(|i| format!("line {i}")).collect();
    assert_eq!(received, expected);
    assert_eq!(session.last_delivered(), LINES);
}

#[test]
fn several_appenders_keep_per_writer_order() {
    const WRITERS: usize = 4;
    const PER_WRITER: usize = 2_000;

    let job = Arc::new(JobStatus::new(JobHandle(1), "stress", 0, Utc::now()));
    let monitor = monitor_with(&job);
    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let job = Arc::clone(&job);
            std::thread::spawn(move || {
                for i in 0..PER_WRITER {
                    job.append_message(format!("{w}:{i}"));
                }
            })
        })
        .collect();

    let poller = {
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            let mut session = ObserverSession::new(JobHandle(1)).with_expanded(true);
            let mut received = Vec::new();
            loop {
                let finished = done.load(Ordering::Acquire);
                let outcome = monitor.poll(&mut session).expect("job is registered");
                assert_eq!(outcome.status, PollStatus::Indeterminate);
                received.extend(outcome.new_lines);
                if finished {
                    break received;
                }
            }
        })
    };

    for w in writers {
        w.join().expect("writer panicked");
    }
    done.store(true, Ordering::Release);
    let received = poller.join().expect("poller panicked");

    assert_eq!(received, job.messages().snapshot());
    assert_eq!(received.len(), WRITERS * PER_WRITER);
    for w in 0..WRITERS {
        let own: Vec<usize> = received
            .iter()
            .filter_map(|line| line.strip_prefix(&format!("{w}:")))
            .map(|n| n.parse().expect("numeric suffix"))
            .collect();
        assert_eq!(own, (0..PER_WRITER).collect::<Vec<_>>());
    }
}

#[derive(Debug, Clone)]
enum Step {
    Append(u8),
    Poll,
    Toggle,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (1u8..5).prop_map(Step::Append),
        2 => Just(Step::Poll),
        1 => Just(Step::Toggle),
    ]
}

proptest! {
    /// Interleaved appends, polls and mode switches: whatever the observer
    /// received, it is exactly a prefix of the log, and a final expanded poll
    /// completes it.
    #[test]
    fn delivery_is_gapless_and_duplicate_free(steps in prop::collection::vec(step(), 0..60)) {
        let job = Arc::new(JobStatus::new(JobHandle(1), "prop", 0, Utc::now()));
        let monitor = monitor_with(&job);
        let mut session = ObserverSession::new(JobHandle(1));
        let mut received: Vec<String> = Vec::new();
        let mut appended = 0usize;

        for step in steps {
            match step {
                Step::Append(count) => {
                    for _ in 0..count {
                        job.append_message(format!("m{appended}"));
                        appended += 1;
                    }
                }
                Step::Poll => {
                    let before = session.last_delivered();
                    let expanded = session.is_expanded();
                    let result = PollResult::from(monitor.poll(&mut session).unwrap());
                    if !expanded {
                        prop_assert!(result.new_log_lines.is_empty());
                        prop_assert_eq!(session.last_delivered(), before);
                    }
                    prop_assert_eq!(result.next_poll_delay_ms, Some(1000));
                    prop_assert!(result.progress_factor.is_none());
                    received.extend(result.new_log_lines);
                }
                Step::Toggle => {
                    monitor.toggle_detail(&mut session).unwrap();
                }
            }
            prop_assert_eq!(received.len(), session.last_delivered());
            prop_assert!(session.last_delivered() <= job.messages().len());
        }

        session.set_expanded(true);
        received.extend(monitor.poll(&mut session).unwrap().new_lines);
        prop_assert_eq!(received, job.messages().snapshot());
    }

    #[test]
    fn determinate_factor_shape(total in 1i64..1_000_000, pct in 0u32..=100) {
        let processed = total * i64::from(pct) / 100;
        let job = Arc::new(JobStatus::new(JobHandle(1), "prop", total, Utc::now()));
        job.set_processed(processed);
        let monitor = monitor_with(&job);

        let result = PollResult::from(monitor.poll(&mut ObserverSession::new(JobHandle(1))).unwrap());
        let factor = result.progress_factor.expect("determinate jobs report a factor");
        let shape = regex_lite::Regex::new(r"^\d\.\d\d$").unwrap();
        prop_assert!(shape.is_match(&factor), "bad factor {}", factor);
        prop_assert!(!factor.contains(','));
        prop_assert_eq!(result.next_poll_delay_ms, Some(500));
    }
}
