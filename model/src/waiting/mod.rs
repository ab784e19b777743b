/*!

Blocking waits on state that the assisted service owns. A wait repeatedly fetches the current
statuses of a cluster or of its hosts, and returns once a target condition holds, fails fast when
a forbidden status (typically `error`) shows up, or fails when its time budget runs out.

Fetch failures are never fatal on their own: a failed fetch is a missed tick and polling goes on
until the same overall deadline.

!*/

mod error;
mod installer;

pub use error::{Error, Result, Snapshot};
pub use installer::{
    is_cluster_in_status, wait_till_all_hosts_are_in_status,
    wait_till_at_least_one_host_is_in_status, wait_till_cluster_is_in_status,
};

use crate::constants::HOSTS_POLL_INTERVAL;
use crate::ObservedStatus;
use log::{debug, error, info, warn};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

/// How long to wait, how often to poll, and whether an `error` status ends the wait early.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct WaitSettings {
    pub timeout: Duration,
    pub interval: Duration,
    pub fall_on_error_status: bool,
}

impl WaitSettings {
    /// Poll every 5 seconds for up to `timeout`, failing fast on `error`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: HOSTS_POLL_INTERVAL,
            fall_on_error_status: true,
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn fall_on_error_status(mut self, fall_on_error_status: bool) -> Self {
        self.fall_on_error_status = fall_on_error_status;
        self
    }
}

/// One member of an observed collection (a host, or the cluster itself) and its status.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Observation<S> {
    pub name: String,
    pub status: S,
}

impl<S> Observation<S> {
    pub fn new<N: Into<String>>(name: N, status: S) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// How many members must be in a target status for the wait to succeed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Expected {
    /// All `nodes_count` expected members.
    All(usize),
    /// At least this many members, regardless of the others.
    AtLeast(usize),
}

impl Expected {
    fn count(&self) -> usize {
        match self {
            Expected::All(count) | Expected::AtLeast(count) => *count,
        }
    }
}

/// The outcome of a single poll tick.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Tick {
    Done,
    Pending(Snapshot),
    Abort { offending: Snapshot, observed: Snapshot },
}

/// Decide what one fetched snapshot means. Success is checked before the abort conditions, so a
/// wait whose condition holds is never failed by an unrelated member in `error`. Members in an
/// unrecognized status count neither toward the target nor as offending.
pub fn classify<S>(
    observed: &[Observation<S>],
    targets: &[S],
    expected: Expected,
    fall_on_error_status: bool,
    break_statuses: &[S],
) -> Tick
where
    S: ObservedStatus,
{
    let in_target = observed
        .iter()
        .filter(|member| !member.status.is_unknown() && targets.contains(&member.status))
        .count();
    if in_target >= expected.count() {
        return Tick::Done;
    }

    let offending: Vec<&Observation<S>> = observed
        .iter()
        .filter(|member| !member.status.is_unknown() && !targets.contains(&member.status))
        .filter(|member| {
            (fall_on_error_status && member.status.is_error())
                || break_statuses.contains(&member.status)
        })
        .collect();
    if !offending.is_empty() {
        return Tick::Abort {
            offending: snapshot(offending),
            observed: snapshot(observed),
        };
    }

    Tick::Pending(snapshot(observed))
}

fn snapshot<'a, S, I>(members: I) -> Snapshot
where
    S: ObservedStatus,
    I: IntoIterator<Item = &'a Observation<S>>,
{
    Snapshot(
        members
            .into_iter()
            .map(|member| (member.name.clone(), member.status.to_string()))
            .collect(),
    )
}

/// The poll skeleton: run `tick` until it reports `Done` or `Abort`, or until `settings.timeout`
/// has elapsed. `tick` errors are logged and count as a missed tick. A tick that is still running
/// when the budget runs out is dropped and counted the same way.
pub async fn poll<F, Fut, E>(waiting_for: &str, settings: &WaitSettings, mut tick: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<Tick, E>>,
    E: Display,
{
    info!(
        "Waiting up to {:?} for {} (polling every {:?})",
        settings.timeout, waiting_for, settings.interval
    );
    let deadline = Instant::now() + settings.timeout;
    let mut last_observed = Snapshot::default();
    let mut last_fetch_error = None;
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, tick()).await {
            Ok(Ok(Tick::Done)) => {
                info!("Done waiting for {} after {} polls", waiting_for, attempt);
                return Ok(());
            }
            Ok(Ok(Tick::Abort {
                offending,
                observed,
            })) => {
                error!(
                    "Aborting wait for {}, unexpected status: {}",
                    waiting_for, offending
                );
                return error::UnexpectedStatusSnafu {
                    waiting_for,
                    offending,
                    observed,
                }
                .fail();
            }
            Ok(Ok(Tick::Pending(observed))) => {
                debug!("Still waiting for {}: {}", waiting_for, observed);
                last_observed = observed;
                last_fetch_error = None;
            }
            Ok(Err(e)) => {
                warn!("Poll {} for {} failed: {}", attempt, waiting_for, e);
                last_fetch_error = Some(e.to_string());
            }
            Err(_) => {
                warn!(
                    "Poll {} for {} did not finish before the deadline",
                    attempt, waiting_for
                );
                last_fetch_error = Some("poll did not finish before the deadline".to_string());
            }
        }

        let now = Instant::now();
        if now >= deadline {
            error!(
                "Timed out waiting for {}, last observed: {}",
                waiting_for, last_observed
            );
            return error::TimeoutSnafu {
                waiting_for,
                timeout: settings.timeout,
                last_observed,
                last_fetch_error,
            }
            .fail();
        }
        sleep(settings.interval.min(deadline - now)).await;
    }
}

/// Wait until `fetch` reports at least `nodes_count` members in one of `targets`.
pub async fn wait_till_all_in_status<S, F, Fut, E>(
    waiting_for: &str,
    targets: &[S],
    nodes_count: usize,
    settings: &WaitSettings,
    fetch: F,
) -> Result<()>
where
    S: ObservedStatus,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<Vec<Observation<S>>, E>>,
    E: Display,
{
    wait_for_members(
        waiting_for,
        targets,
        Expected::All(nodes_count),
        &[],
        settings,
        fetch,
    )
    .await
}

/// Wait until `fetch` reports at least `min_count` members in one of `targets`, regardless of
/// what the other members are doing.
pub async fn wait_till_at_least_in_status<S, F, Fut, E>(
    waiting_for: &str,
    targets: &[S],
    min_count: usize,
    settings: &WaitSettings,
    fetch: F,
) -> Result<()>
where
    S: ObservedStatus,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<Vec<Observation<S>>, E>>,
    E: Display,
{
    wait_for_members(
        waiting_for,
        targets,
        Expected::AtLeast(min_count),
        &[],
        settings,
        fetch,
    )
    .await
}

/// Wait until a single resource reaches one of `targets`. Any of `break_statuses` (that is not
/// itself a target) aborts the wait, as does `error` when `settings.fall_on_error_status` is set.
pub async fn wait_till_in_status<S, F, Fut, E>(
    waiting_for: &str,
    targets: &[S],
    break_statuses: &[S],
    settings: &WaitSettings,
    mut fetch: F,
) -> Result<()>
where
    S: ObservedStatus,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<Observation<S>, E>>,
    E: Display,
{
    wait_for_members(
        waiting_for,
        targets,
        Expected::All(1),
        break_statuses,
        settings,
        || {
            let fut = fetch();
            async move { fut.await.map(|member| vec![member]) }
        },
    )
    .await
}

async fn wait_for_members<S, F, Fut, E>(
    waiting_for: &str,
    targets: &[S],
    expected: Expected,
    break_statuses: &[S],
    settings: &WaitSettings,
    mut fetch: F,
) -> Result<()>
where
    S: ObservedStatus,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<Vec<Observation<S>>, E>>,
    E: Display,
{
    let fall_on_error_status = settings.fall_on_error_status;
    poll(waiting_for, settings, || {
        let fut = fetch();
        async move {
            fut.await.map(|observed| {
                classify(
                    &observed,
                    targets,
                    expected,
                    fall_on_error_status,
                    break_statuses,
                )
            })
        }
    })
    .await
}

/// Wait until `check` returns `true`. Used for conditions that are not status enumerations, such
/// as a pod reaching `Running`.
pub async fn wait_until<F, Fut, E>(waiting_for: &str, settings: &WaitSettings, mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<bool, E>>,
    E: Display,
{
    poll(waiting_for, settings, || {
        let fut = check();
        async move {
            fut.await.map(|done| {
                if done {
                    Tick::Done
                } else {
                    Tick::Pending(Snapshot::default())
                }
            })
        }
    })
    .await
}
