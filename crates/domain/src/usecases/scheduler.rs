//! Scheduler loop - the interval trigger around the publish engine
//!
//! Ticks fire on a fixed period. Each tick re-reads the stored scheduler
//! configuration, so flipping `is_active` takes effect at the next tick
//! without a restart. Manual triggers share the engine's run guard but
//! ignore `is_active` entirely.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::{
    model::RunTrigger,
    ports::{Clock, ConfigStore, Ledger, ProductSource},
    usecases::publish::{PublishEngine, RunError, RunReport},
};

/// What an interval tick did
#[derive(Debug)]
pub enum TickOutcome {
    /// `is_active` was false; nothing ran and no run was recorded
    Inactive,
    Ran(RunReport),
}

/// Interval trigger wrapping a publish engine
pub struct Scheduler<S, L, C, Cl>
where
    S: ProductSource + ?Sized,
    L: Ledger + ?Sized,
    C: ConfigStore + ?Sized,
    Cl: Clock + ?Sized,
{
    engine: PublishEngine<S, L, C, Cl>,
    config_store: Arc<C>,
    admin_id: String,
    interval: Duration,
}

impl<S, L, C, Cl> Scheduler<S, L, C, Cl>
where
    S: ProductSource + ?Sized,
    L: Ledger + ?Sized,
    C: ConfigStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(
        engine: PublishEngine<S, L, C, Cl>,
        config_store: Arc<C>,
        admin_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            config_store,
            admin_id: admin_id.into(),
            interval,
        }
    }

    /// One interval tick: run the engine if the scheduler is active
    pub async fn tick(&self) -> Result<TickOutcome, RunError> {
        let config = self.config_store.scheduler_config(&self.admin_id).await?;
        if !config.is_active {
            tracing::debug!(admin_id = %self.admin_id, "Scheduler inactive, skipping tick");
            return Ok(TickOutcome::Inactive);
        }
        let report = self.engine.run_once(RunTrigger::Interval).await?;
        Ok(TickOutcome::Ran(report))
    }

    /// Operator-initiated run; ignores `is_active` but not the run guard
    pub async fn trigger_now(&self) -> Result<RunReport, RunError> {
        self.engine.run_once(RunTrigger::Manual).await
    }

    /// Drive ticks until the shutdown future resolves.
    ///
    /// The interval's immediate first tick is consumed, so the first run
    /// lands one full period after startup.
    pub async fn run_until_shutdown(&self, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        tracing::info!(
            admin_id = %self.admin_id,
            interval_secs = self.interval.as_secs(),
            "Scheduler loop started"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(TickOutcome::Inactive) => {}
                        Ok(TickOutcome::Ran(report)) => {
                            tracing::info!(
                                run_id = %report.run_id,
                                posted = report.posted,
                                failed = report.failed,
                                "Scheduled run finished"
                            );
                        }
                        Err(RunError::AlreadyRunning) => {
                            tracing::warn!("Skipping tick, a run is still in progress");
                        }
                        Err(error) => {
                            tracing::error!(error = %error, "Scheduled run failed");
                        }
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Scheduler loop stopped");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Platform, RunStatus};
    use crate::usecases::publish::testkit::*;
    use crate::usecases::publish::{EngineOptions, PublisherSet};
    use crate::ports::Publisher;
    use time::macros::datetime;

    const FOUR_HOURS: Duration = Duration::from_secs(4 * 60 * 60);

    struct Rig {
        source: Arc<FakeSource>,
        ledger: Arc<FakeLedger>,
        config: Arc<FakeConfigStore>,
        clock: Arc<FakeClock>,
    }

    impl Rig {
        fn new() -> Self {
            let products = vec![product("A", "Product A"), product("B", "Product B")];
            Self {
                source: Arc::new(FakeSource::with_products(products)),
                ledger: Arc::new(FakeLedger::new()),
                config: Arc::new(FakeConfigStore::active_instagram()),
                clock: Arc::new(FakeClock::at(datetime!(2025-06-15 10:00:00 UTC))),
            }
        }

        fn scheduler(&self) -> Scheduler<FakeSource, FakeLedger, FakeConfigStore, FakeClock> {
            let publishers = PublisherSet::new()
                .with(Arc::new(FakePublisher::new(Platform::Instagram)) as Arc<dyn Publisher>);
            let engine = PublishEngine::new(
                Arc::clone(&self.source),
                Arc::clone(&self.ledger),
                Arc::clone(&self.config),
                Arc::clone(&self.clock),
                publishers,
                EngineOptions::default(),
            );
            Scheduler::new(engine, Arc::clone(&self.config), "default", FOUR_HOURS)
        }
    }

    #[tokio::test]
    async fn inactive_tick_records_no_run() {
        let rig = Rig::new();
        rig.config.set_active(false);

        let outcome = rig.scheduler().tick().await.unwrap();

        assert!(matches!(outcome, TickOutcome::Inactive));
        assert!(rig.ledger.runs.lock().unwrap().is_empty());
        assert!(rig.ledger.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn active_tick_runs_with_interval_trigger() {
        let rig = Rig::new();

        let outcome = rig.scheduler().tick().await.unwrap();

        assert!(matches!(outcome, TickOutcome::Ran(_)));
        let runs = rig.ledger.runs.lock().unwrap().clone();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].trigger, RunTrigger::Interval);
        assert_eq!(runs[0].status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn manual_trigger_ignores_the_inactive_gate() {
        let rig = Rig::new();
        rig.config.set_active(false);

        let report = rig.scheduler().trigger_now().await.unwrap();

        assert_eq!(report.posted, 2);
        let runs = rig.ledger.runs.lock().unwrap().clone();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].trigger, RunTrigger::Manual);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_loop_picks_up_activation_at_the_next_tick() {
        let rig = Rig::new();
        rig.config.set_active(false);
        let scheduler = rig.scheduler();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            scheduler
                .run_until_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await;
        });
        tokio::task::yield_now().await;

        // First period elapses while inactive: tick fires, nothing runs.
        tokio::time::advance(FOUR_HOURS).await;
        tokio::task::yield_now().await;
        assert!(rig.ledger.runs.lock().unwrap().is_empty());

        // Enable without restarting; the next tick picks it up.
        rig.config.set_active(true);
        tokio::time::advance(FOUR_HOURS).await;
        tokio::task::yield_now().await;

        {
            let runs = rig.ledger.runs.lock().unwrap();
            assert_eq!(runs.len(), 1);
            assert_eq!(runs[0].trigger, RunTrigger::Interval);
        }

        // Deactivate before stopping so a racing final tick cannot run.
        rig.config.set_active(false);
        let _ = stop_tx.send(());
        handle.await.unwrap();

        assert_eq!(rig.ledger.runs.lock().unwrap().len(), 1);
    }
}
