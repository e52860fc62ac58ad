//! Convergence polling
//!
//! After a mutation is accepted the cluster goes through transitional states
//! (`CREATING`, `UPDATING`, ...) before it settles. [`await_state`] polls the
//! cluster until it reaches a target state, fails on a state that should not
//! occur, or gives up when the time budget is spent.
//!
//! Fetch results are first classified into an [`Observation`]:
//! - a dropped connection is reported as `REPEATING` (transient)
//! - HTTP 404 is reported as `DELETED`
//! - HTTP 503 is reported as `PENDING` (transient)
//! - any other error is fatal

use clusterform_core::{ClusterDescription, OperationState};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{ApiError, ProviderError, Result};

/// Upper bound for the doubling poll interval, unless the minimum is larger
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(10);

/// Pending and target states plus timing for one kind of operation
#[derive(Debug, Clone, PartialEq)]
pub struct WaitProfile {
    pub pending: Vec<OperationState>,
    pub target: Vec<OperationState>,
    /// Total budget, measured from the first poll
    pub timeout: Duration,
    /// Lower bound for the delay between polls
    pub min_interval: Duration,
    /// Delay before the first poll
    pub initial_delay: Duration,
    pub max_interval: Duration,
}

impl WaitProfile {
    /// Wait for a newly created cluster
    pub fn create(timeout: Duration) -> Self {
        use OperationState::*;
        Self {
            pending: vec![Creating, Updating, Repairing, Repeating, Pending],
            target: vec![Idle],
            timeout,
            min_interval: Duration::from_secs(60),
            initial_delay: Duration::from_secs(180),
            max_interval: DEFAULT_MAX_INTERVAL,
        }
    }

    /// Wait for an update to settle
    pub fn update(timeout: Duration) -> Self {
        use OperationState::*;
        Self {
            pending: vec![Creating, Updating, Repairing],
            target: vec![Idle],
            timeout,
            min_interval: Duration::from_secs(30),
            initial_delay: Duration::from_secs(60),
            max_interval: DEFAULT_MAX_INTERVAL,
        }
    }

    /// Wait for a cluster to disappear
    pub fn delete(timeout: Duration) -> Self {
        use OperationState::*;
        Self {
            pending: vec![Idle, Creating, Updating, Repairing, Deleting],
            target: vec![Deleted],
            timeout,
            min_interval: Duration::from_secs(30),
            initial_delay: Duration::from_secs(60),
            max_interval: DEFAULT_MAX_INTERVAL,
        }
    }

    /// Wait for a shared-tier upgrade to settle
    pub fn upgrade(timeout: Duration) -> Self {
        Self::update(timeout)
    }

    /// Same profile with a different budget
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Same profile with different poll timing
    pub fn with_intervals(mut self, min_interval: Duration, initial_delay: Duration) -> Self {
        self.min_interval = min_interval;
        self.initial_delay = initial_delay;
        self
    }

    /// Delay before the poll following one that waited `previous`
    fn next_interval(&self, previous: Duration) -> Duration {
        let cap = self.max_interval.max(self.min_interval);
        (previous * 2).clamp(self.min_interval, cap)
    }

    fn expected(&self) -> String {
        self.pending
            .iter()
            .chain(&self.target)
            .map(OperationState::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One classified poll result
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub state: OperationState,
    /// Snapshot, when the fetch returned one
    pub cluster: Option<ClusterDescription>,
    /// Synthesized from a recoverable error rather than reported by the cluster
    pub transient: bool,
}

impl Observation {
    fn synthesized(state: OperationState, transient: bool) -> Self {
        Self {
            state,
            cluster: None,
            transient,
        }
    }
}

/// Classify a single fetch result
pub fn classify(
    name: &str,
    result: std::result::Result<ClusterDescription, ApiError>,
) -> Result<Observation> {
    match result {
        Ok(cluster) => {
            let state = cluster
                .state()
                .map_err(|_| ProviderError::UnknownState {
                    name: name.to_string(),
                    state: cluster.state_name.clone(),
                })?;
            Ok(Observation {
                state,
                cluster: Some(cluster),
                transient: false,
            })
        }
        Err(e) if e.is_connection_reset() => {
            Ok(Observation::synthesized(OperationState::Repeating, true))
        }
        Err(e) if e.is_not_found() => Ok(Observation::synthesized(OperationState::Deleted, false)),
        Err(e) if e.is_service_unavailable() => {
            Ok(Observation::synthesized(OperationState::Pending, true))
        }
        Err(e) => Err(e.into()),
    }
}

/// Poll until the cluster reaches one of the profile's target states
///
/// Returns the last snapshot (`None` when the target was reached through a
/// 404, i.e. `DELETED`). The budget is measured from the first poll, and the
/// timeout error is returned no later than one `min_interval` past it.
pub async fn await_state<F, Fut>(
    name: &str,
    profile: &WaitProfile,
    cancel: &CancellationToken,
    mut fetch: F,
) -> Result<Option<ClusterDescription>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<ClusterDescription, ApiError>>,
{
    let cancelled = || ProviderError::Cancelled {
        name: name.to_string(),
    };

    sleep_or_cancel(profile.initial_delay, cancel)
        .await
        .map_err(|_| cancelled())?;

    let started = Instant::now();
    let mut interval = profile.min_interval;

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(cancelled()),
            result = fetch() => result,
        };

        let observation = classify(name, result)?;
        debug!(cluster = name, state = %observation.state, "polled cluster state");

        if profile.target.contains(&observation.state) {
            info!(cluster = name, state = %observation.state, elapsed = ?started.elapsed(), "cluster settled");
            return Ok(observation.cluster);
        }
        if !observation.transient && !profile.pending.contains(&observation.state) {
            return Err(ProviderError::UnexpectedState {
                name: name.to_string(),
                state: observation.state,
                expected: profile.expected(),
            });
        }
        let elapsed = started.elapsed();
        if elapsed >= profile.timeout {
            return Err(ProviderError::Timeout {
                name: name.to_string(),
                elapsed,
                budget: profile.timeout,
                detail: Some(format!("last observed state {}", observation.state)),
            });
        }

        let remaining = profile.timeout - elapsed;
        let delay = interval.min(remaining).max(profile.min_interval);
        sleep_or_cancel(delay, cancel)
            .await
            .map_err(|_| cancelled())?;

        if !observation.transient {
            interval = profile.next_interval(interval);
        }
    }
}

/// Sleep unless the token fires first
pub(crate) async fn sleep_or_cancel(
    duration: Duration,
    cancel: &CancellationToken,
) -> std::result::Result<(), ()> {
    if duration.is_zero() {
        return if cancel.is_cancelled() { Err(()) } else { Ok(()) };
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(()),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
