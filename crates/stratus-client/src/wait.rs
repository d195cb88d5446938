//! Poll-until-condition engine
//!
//! Every mutating API call is asynchronous on the server side: create a
//! server, attach a volume, resize a database instance, and the resource
//! drifts towards its target state while you watch. This module is the one
//! generic "watch" loop all service crates share: refresh the resource on an
//! interval, evaluate a predicate, stop on match, deadline or cancellation.
//!
//! Failure policy: a failed refresh skips that tick and polling continues.
//! Transient network blips are invisible to the caller; only the overall
//! deadline is fatal, and it is reported as a timeout rather than whatever
//! error the last refresh produced. [`WaitOptions::failure_limit`] is the
//! opt-in bound on that silence.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{oneshot, watch};
use tokio::time::MissedTickBehavior;

use crate::error::{Error, Result};

/// Default deadline for a wait: 30 minutes.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(1800);

/// Default polling interval used by the `*_with_wait` convenience operations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// The one capability the engine needs from a resource: re-fetch its remote
/// state in place, and expose named attributes for map predicates.
#[async_trait]
pub trait Refresh: Send {
    /// Re-fetch the resource, mutating `self` to the latest remote state.
    async fn refresh(&mut self) -> Result<()>;

    /// Look up a named attribute of the current state. Unknown keys return
    /// `None` and therefore never satisfy an attribute predicate.
    fn attribute(&self, key: &str) -> Option<String>;
}

/// Condition that ends a wait, fixed at start time: either an
/// attribute-equality map or an arbitrary function of the refreshed resource.
pub enum Predicate<R> {
    Attributes {
        expected: HashMap<String, String>,
        /// Some resource types compare status strings case-insensitively;
        /// that is a property of the resource, not of the engine.
        fold_case: bool,
    },
    Custom(Box<dyn Fn(&R) -> bool + Send + 'static>),
}

impl<R: Refresh> Predicate<R> {
    pub fn attributes<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Predicate::Attributes {
            expected: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            fold_case: false,
        }
    }

    /// Attribute matching with ASCII case folding on both sides.
    pub fn attributes_fold_case<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Predicate::Attributes {
            expected: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            fold_case: true,
        }
    }

    /// Shorthand for the overwhelmingly common `{status: ...}` wait.
    pub fn status(value: impl Into<String>) -> Self {
        Self::attributes([("status", value.into())])
    }

    pub fn custom(check: impl Fn(&R) -> bool + Send + 'static) -> Self {
        Predicate::Custom(Box::new(check))
    }

    /// Evaluate the predicate against a refreshed resource.
    pub fn matches(&self, resource: &R) -> bool {
        match self {
            Predicate::Attributes {
                expected,
                fold_case,
            } => expected.iter().all(|(key, want)| {
                match resource.attribute(key) {
                    Some(have) if *fold_case => have.eq_ignore_ascii_case(want),
                    Some(have) => have == *want,
                    None => false,
                }
            }),
            Predicate::Custom(check) => check(resource),
        }
    }
}

/// Tuning and progress callbacks for one wait operation.
pub struct WaitOptions {
    /// Polling period. Must be non-zero.
    pub interval: Duration,
    /// Overall deadline; the wait ends in `TimedOut` when it elapses.
    pub max_wait: Duration,
    /// End the wait with `RefreshFailed` after this many consecutive failed
    /// refreshes. `None` (the default) retries silently until the deadline.
    pub failure_limit: Option<u32>,
    on_tick: Option<Box<dyn Fn() + Send + 'static>>,
    on_finish: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl WaitOptions {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_wait: DEFAULT_MAX_WAIT,
            failure_limit: None,
            on_tick: None,
            on_finish: None,
        }
    }

    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn failure_limit(mut self, limit: u32) -> Self {
        self.failure_limit = Some(limit);
        self
    }

    /// Called after every successful refresh, before the predicate runs.
    pub fn on_tick(mut self, callback: impl Fn() + Send + 'static) -> Self {
        self.on_tick = Some(Box::new(callback));
        self
    }

    /// Called once when the wait ends in `Satisfied`, `TimedOut` or
    /// `RefreshFailed`. Not called on cancellation.
    pub fn on_finish(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_finish = Some(Box::new(callback));
        self
    }
}

/// Wait state machine. `Satisfied`, `TimedOut`, `Cancelled` and
/// `RefreshFailed` are terminal; exactly one terminal transition happens per
/// wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WaitState {
    Idle = 0,
    Polling = 1,
    Satisfied = 2,
    TimedOut = 3,
    Cancelled = 4,
    RefreshFailed = 5,
}

impl WaitState {
    fn from_u8(value: u8) -> WaitState {
        match value {
            1 => WaitState::Polling,
            2 => WaitState::Satisfied,
            3 => WaitState::TimedOut,
            4 => WaitState::Cancelled,
            5 => WaitState::RefreshFailed,
            _ => WaitState::Idle,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, WaitState::Idle | WaitState::Polling)
    }
}

/// How a wait ended, together with the resource in its last observed state.
#[derive(Debug)]
pub enum WaitOutcome<R> {
    /// The predicate matched.
    Satisfied(R),
    /// `max_wait` elapsed first; the resource is as of the last good refresh.
    TimedOut(R),
    /// Only produced when [`WaitOptions::failure_limit`] is set.
    RefreshFailed(R),
}

impl<R> WaitOutcome<R> {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied(_))
    }

    pub fn into_resource(self) -> R {
        match self {
            WaitOutcome::Satisfied(resource)
            | WaitOutcome::TimedOut(resource)
            | WaitOutcome::RefreshFailed(resource) => resource,
        }
    }
}

/// Handle to a running wait. Dropping it detaches the wait (polling
/// continues unobserved); [`WaitHandle::cancel`] abandons it silently.
pub struct WaitHandle<R> {
    state: Arc<AtomicU8>,
    cancel: watch::Sender<bool>,
    outcome: oneshot::Receiver<WaitOutcome<R>>,
}

impl<R> WaitHandle<R> {
    pub fn state(&self) -> WaitState {
        WaitState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Abandon the wait. No further refresh, predicate evaluation or
    /// callback happens; a refresh already in flight is discarded when it
    /// lands. Cancelling an already-finished wait is a no-op.
    pub fn cancel(&self) {
        if try_finish(&self.state, WaitState::Cancelled) {
            tracing::debug!("wait cancelled");
            let _ = self.cancel.send(true);
        }
    }

    /// Wait for completion. `None` means the wait was cancelled and no
    /// outcome will ever be produced.
    pub async fn join(self) -> Option<WaitOutcome<R>> {
        self.outcome.await.ok()
    }
}

fn try_finish(state: &AtomicU8, to: WaitState) -> bool {
    state
        .compare_exchange(
            WaitState::Polling as u8,
            to as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        )
        .is_ok()
}

fn fire_finish(callback: &mut Option<Box<dyn FnOnce() + Send>>) {
    if let Some(finish) = callback.take() {
        finish();
    }
}

/// Start polling `resource` until `predicate` matches, the deadline elapses
/// or the handle is cancelled. Returns immediately; the wait runs as a
/// background task and is observed through the returned [`WaitHandle`].
///
/// Ticks are strictly sequential: the next refresh is only scheduled after
/// the previous one completed, so a slow refresh never overlaps with the
/// next (missed ticks are delayed, not bunched).
pub fn start_wait<R>(
    resource: R,
    predicate: Predicate<R>,
    options: WaitOptions,
) -> Result<WaitHandle<R>>
where
    R: Refresh + 'static,
{
    if options.interval.is_zero() {
        return Err(Error::MissingArgument("interval"));
    }

    let state = Arc::new(AtomicU8::new(WaitState::Idle as u8));
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let (outcome_tx, outcome_rx) = oneshot::channel();

    state.store(WaitState::Polling as u8, Ordering::Release);
    tokio::spawn(run_wait(
        resource,
        predicate,
        options,
        Arc::clone(&state),
        cancel_rx,
        outcome_tx,
    ));

    Ok(WaitHandle {
        state,
        cancel: cancel_tx,
        outcome: outcome_rx,
    })
}

async fn run_wait<R>(
    mut resource: R,
    predicate: Predicate<R>,
    options: WaitOptions,
    state: Arc<AtomicU8>,
    mut cancel_rx: watch::Receiver<bool>,
    outcome_tx: oneshot::Sender<WaitOutcome<R>>,
) where
    R: Refresh,
{
    let WaitOptions {
        interval,
        max_wait,
        failure_limit,
        on_tick,
        mut on_finish,
    } = options;

    let mut consecutive_failures: u32 = 0;

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of `interval` resolves immediately; consume it so the
    // first refresh happens one interval in.
    ticker.tick().await;

    let deadline = tokio::time::sleep(max_wait);
    tokio::pin!(deadline);

    // Set once the handle is dropped; the cancel branch is then disabled so
    // the closed channel does not busy-loop the select.
    let mut detached = false;

    loop {
        tokio::select! {
            // Biased: cancellation beats a due tick, and a due tick beats a
            // simultaneously-due deadline, so the satisfied-vs-timed-out tie
            // resolves deterministically in favor of the tick.
            biased;

            changed = cancel_rx.changed(), if !detached => {
                if changed.is_ok() {
                    // cancel() already made the terminal transition.
                    return;
                }
                // The handle was dropped, not cancelled: polling continues
                // unobserved until a terminal state.
                tracing::debug!("wait handle dropped, polling detached");
                detached = true;
            }

            _ = ticker.tick() => {
                match resource.refresh().await {
                    Err(error) => {
                        consecutive_failures += 1;
                        tracing::debug!(
                            %error,
                            consecutive_failures,
                            "refresh failed, skipping tick"
                        );
                        if let Some(limit) = failure_limit {
                            if consecutive_failures >= limit {
                                if try_finish(&state, WaitState::RefreshFailed) {
                                    tracing::info!(limit, "wait gave up after consecutive refresh failures");
                                    fire_finish(&mut on_finish);
                                    let _ = outcome_tx.send(WaitOutcome::RefreshFailed(resource));
                                }
                                return;
                            }
                        }
                    }
                    Ok(()) => {
                        consecutive_failures = 0;
                        if *cancel_rx.borrow() {
                            // Cancelled while the refresh was in flight;
                            // discard the result.
                            return;
                        }
                        if let Some(tick) = &on_tick {
                            tick();
                        }
                        if predicate.matches(&resource) {
                            if try_finish(&state, WaitState::Satisfied) {
                                tracing::debug!("wait satisfied");
                                fire_finish(&mut on_finish);
                                let _ = outcome_tx.send(WaitOutcome::Satisfied(resource));
                            }
                            return;
                        }
                    }
                }
            }

            _ = &mut deadline => {
                if try_finish(&state, WaitState::TimedOut) {
                    tracing::info!(?max_wait, "wait deadline elapsed");
                    fire_finish(&mut on_finish);
                    let _ = outcome_tx.send(WaitOutcome::TimedOut(resource));
                }
                return;
            }
        }
    }
}

/// Start a wait and block on its outcome. Timeouts map to
/// [`Error::WaitTimeout`]; this is what the `*_with_wait` operations use.
pub async fn wait_for<R>(resource: R, predicate: Predicate<R>, options: WaitOptions) -> Result<R>
where
    R: Refresh + 'static,
{
    let handle = start_wait(resource, predicate, options)?;
    match handle.join().await {
        Some(WaitOutcome::Satisfied(resource)) => Ok(resource),
        Some(WaitOutcome::TimedOut(_)) => Err(Error::WaitTimeout),
        // The handle is owned here and never cancelled, so a missing outcome
        // can only mean the failure limit tripped.
        Some(WaitOutcome::RefreshFailed(_)) | None => Err(Error::WaitFailed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::{Duration, Instant, advance, sleep};

    /// Scripted resource: optionally fails the first N refreshes, then walks
    /// through `statuses` (the last entry repeats forever).
    #[derive(Debug)]
    struct FakeResource {
        statuses: Vec<&'static str>,
        fail_first: usize,
        refreshes: Arc<AtomicUsize>,
        status: String,
    }

    impl FakeResource {
        fn new(statuses: Vec<&'static str>) -> Self {
            Self::flaky(statuses, 0)
        }

        fn flaky(statuses: Vec<&'static str>, fail_first: usize) -> Self {
            Self {
                statuses,
                fail_first,
                refreshes: Arc::new(AtomicUsize::new(0)),
                status: "UNKNOWN".to_string(),
            }
        }

        fn refresh_counter(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.refreshes)
        }
    }

    #[async_trait]
    impl Refresh for FakeResource {
        async fn refresh(&mut self) -> Result<()> {
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(Error::UnexpectedResponse("transient".to_string()));
            }
            let step = (n - self.fail_first).min(self.statuses.len() - 1);
            self.status = self.statuses[step].to_string();
            Ok(())
        }

        fn attribute(&self, key: &str) -> Option<String> {
            (key == "status").then(|| self.status.clone())
        }
    }

    fn fifty_ms_one_sec() -> WaitOptions {
        WaitOptions::new(Duration::from_millis(50)).max_wait(Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_satisfied_on_matching_tick() {
        let resource = FakeResource::new(vec!["BUILD", "BUILD", "ACTIVE"]);
        let refreshes = resource.refresh_counter();

        let started = Instant::now();
        let handle =
            start_wait(resource, Predicate::status("ACTIVE"), fifty_ms_one_sec()).unwrap();
        let outcome = handle.join().await.expect("not cancelled");

        assert!(outcome.is_satisfied());
        assert_eq!(outcome.into_resource().status, "ACTIVE");
        // Third tick at 3 * 50ms.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(150));
        assert!(elapsed < Duration::from_millis(250));

        // No polling after satisfaction.
        assert_eq!(refreshes.load(Ordering::SeqCst), 3);
        advance(Duration::from_secs(2)).await;
        assert_eq!(refreshes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_never_satisfied() {
        let resource = FakeResource::new(vec!["BUILD"]);
        let refreshes = resource.refresh_counter();

        let started = Instant::now();
        let handle =
            start_wait(resource, Predicate::status("ACTIVE"), fifty_ms_one_sec()).unwrap();
        let outcome = handle.join().await.expect("not cancelled");

        let resource = match outcome {
            WaitOutcome::TimedOut(resource) => resource,
            other => panic!("expected TimedOut, got {other:?}"),
        };
        // Last known state is preserved on timeout.
        assert_eq!(resource.status, "BUILD");
        assert!(started.elapsed() >= Duration::from_secs(1));

        // Tick timer confirmed stopped.
        let ticks_at_deadline = refreshes.load(Ordering::SeqCst);
        advance(Duration::from_secs(2)).await;
        assert_eq!(refreshes.load(Ordering::SeqCst), ticks_at_deadline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_satisfaction_is_silent() {
        let finished = Arc::new(AtomicUsize::new(0));
        let finished_cb = Arc::clone(&finished);

        let resource = FakeResource::new(vec!["BUILD"]);
        let refreshes = resource.refresh_counter();

        let options = fifty_ms_one_sec().on_finish(move || {
            finished_cb.fetch_add(1, Ordering::SeqCst);
        });
        let handle = start_wait(resource, Predicate::status("ACTIVE"), options).unwrap();

        sleep(Duration::from_millis(120)).await;
        handle.cancel();
        assert_eq!(handle.state(), WaitState::Cancelled);
        let ticks_at_cancel = refreshes.load(Ordering::SeqCst);

        // Delay-then-assert: nothing fires after cancellation, ever.
        sleep(Duration::from_secs(3)).await;
        assert_eq!(refreshes.load(Ordering::SeqCst), ticks_at_cancel);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
        assert!(handle.join().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_detaches_polling() {
        let finished = Arc::new(AtomicUsize::new(0));
        let finished_cb = Arc::clone(&finished);

        let resource = FakeResource::new(vec!["BUILD", "BUILD", "ACTIVE"]);
        let refreshes = resource.refresh_counter();

        let options = fifty_ms_one_sec().on_finish(move || {
            finished_cb.fetch_add(1, Ordering::SeqCst);
        });
        let handle = start_wait(resource, Predicate::status("ACTIVE"), options).unwrap();
        drop(handle);

        // Unlike cancel, dropping the handle leaves the wait running: it
        // keeps refreshing, satisfies on the third tick and fires on_finish.
        sleep(Duration::from_millis(400)).await;
        assert_eq!(refreshes.load(Ordering::SeqCst), 3);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_wins_deadline_tie_exactly_once() {
        let finished = Arc::new(AtomicUsize::new(0));
        let finished_cb = Arc::clone(&finished);

        // Interval and deadline both due at t = 100ms, and the first refresh
        // already satisfies the predicate.
        let resource = FakeResource::new(vec!["ACTIVE"]);
        let options = WaitOptions::new(Duration::from_millis(100))
            .max_wait(Duration::from_millis(100))
            .on_finish(move || {
                finished_cb.fetch_add(1, Ordering::SeqCst);
            });

        let handle = start_wait(resource, Predicate::status("ACTIVE"), options).unwrap();
        let outcome = handle.join().await.expect("not cancelled");

        assert!(outcome.is_satisfied());
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_refresh_errors_are_skipped() {
        let resource = FakeResource::flaky(vec!["ACTIVE"], 2);
        let refreshes = resource.refresh_counter();

        let handle =
            start_wait(resource, Predicate::status("ACTIVE"), fifty_ms_one_sec()).unwrap();
        let outcome = handle.join().await.expect("not cancelled");

        // Two failed ticks swallowed, satisfied on the third.
        assert!(outcome.is_satisfied());
        assert_eq!(refreshes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_limit_ends_the_wait() {
        let resource = FakeResource::flaky(vec!["ACTIVE"], usize::MAX);
        let refreshes = resource.refresh_counter();

        let options = fifty_ms_one_sec().failure_limit(3);
        let handle = start_wait(resource, Predicate::status("ACTIVE"), options).unwrap();

        match handle.join().await.expect("not cancelled") {
            WaitOutcome::RefreshFailed(_) => {}
            other => panic!("expected RefreshFailed, got {other:?}"),
        }
        assert_eq!(refreshes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_tick_fires_per_successful_refresh_only() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticks_cb = Arc::clone(&ticks);

        // First refresh fails, then BUILD, then ACTIVE: two good refreshes.
        let resource = FakeResource::flaky(vec!["BUILD", "ACTIVE"], 1);
        let options = fifty_ms_one_sec().on_tick(move || {
            ticks_cb.fetch_add(1, Ordering::SeqCst);
        });

        let handle = start_wait(resource, Predicate::status("ACTIVE"), options).unwrap();
        let outcome = handle.join().await.expect("not cancelled");

        assert!(outcome.is_satisfied());
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_maps_timeout_to_error() {
        let resource = FakeResource::new(vec!["BUILD"]);
        let result = wait_for(resource, Predicate::status("ACTIVE"), fifty_ms_one_sec()).await;
        assert!(matches!(result, Err(Error::WaitTimeout)));
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let resource = FakeResource::new(vec!["ACTIVE"]);
        let result = start_wait(
            resource,
            Predicate::status("ACTIVE"),
            WaitOptions::new(Duration::ZERO),
        );
        assert!(matches!(result, Err(Error::MissingArgument("interval"))));
    }

    #[test]
    fn test_attribute_predicate_matching() {
        let mut resource = FakeResource::new(vec!["ACTIVE"]);
        resource.status = "ACTIVE".to_string();

        assert!(Predicate::attributes([("status", "ACTIVE")]).matches(&resource));
        assert!(!Predicate::attributes([("status", "BUILD")]).matches(&resource));
        // Exact equality unless folding is requested.
        assert!(!Predicate::attributes([("status", "active")]).matches(&resource));
        assert!(Predicate::attributes_fold_case([("status", "active")]).matches(&resource));
        // Unknown keys never match.
        assert!(!Predicate::attributes([("status", "ACTIVE"), ("progress", "100")])
            .matches(&resource));
    }

    #[test]
    fn test_custom_predicate() {
        let mut resource = FakeResource::new(vec![]);
        resource.status = "ERROR".to_string();

        let not_pending = Predicate::custom(|r: &FakeResource| {
            r.status != "RUNNING" && r.status != "INITIALIZED"
        });
        assert!(not_pending.matches(&resource));

        resource.status = "RUNNING".to_string();
        assert!(!not_pending.matches(&resource));
    }
}
