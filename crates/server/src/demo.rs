// crates/server/src/demo.rs
//! Sample jobs for `jobwatch --demo`, one per progress mode.

use std::time::Duration;

use jobwatch_server_jobs::JobRunner;
use jobwatch_types::JobHandle;

/// Start a determinate job, an indeterminate job and a job that panics
/// partway through. Returns their handles in that order.
pub fn seed_demo_jobs(runner: &JobRunner) -> Vec<JobHandle> {
    let step = Duration::from_millis(400);

    let copy = runner.start_job("copy-items", 25, move |ctx| async move {
        for i in 1..=25 {
            tokio::time::sleep(step).await;
            ctx.log(format!("Copied item {i} of 25"));
            ctx.increment();
        }
        ctx.log("Copy complete.");
        Ok(())
    });

    let rebuild = runner.start_job("rebuild-index", 0, move |ctx| async move {
        for phase in ["Scanning", "Tokenizing", "Merging segments", "Optimizing"] {
            ctx.log(format!("{phase}..."));
            tokio::time::sleep(step * 5).await;
        }
        ctx.log("Index rebuilt.");
        Ok(())
    });

    let publish = runner.start_job("publish-site", 8, move |ctx| async move {
        for i in 1..=8 {
            tokio::time::sleep(step).await;
            if i == 4 {
                panic!("page {i} is locked by another user");
            }
            ctx.log(format!("Published page {i}"));
            ctx.increment();
        }
        Ok(())
    });

    tracing::info!(copy = %copy, rebuild = %rebuild, publish = %publish, "Demo jobs started");
    vec![copy, rebuild, publish]
}
