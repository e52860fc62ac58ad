//! Conflict-aware cluster updates
//!
//! An update patch can be rejected because the cluster is paused. The updater
//! resumes the cluster, waits for it to settle, and retries the patch, all
//! within one time budget. Requested pausing is applied last, once every
//! other change has settled.

use clusterform_core::{ClusterDescription, ClusterRequest};
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::ClusterApi;
use crate::error::{ApiError, ProviderError, Result};
use crate::poller::{WaitProfile, await_state, sleep_or_cancel};

/// Backoff between retries of a failed update submission
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

/// Outcome of a single update attempt
#[derive(Debug)]
pub enum Attempt {
    /// The patch was accepted and the cluster settled
    Settled(ClusterDescription),
    /// The cluster was paused; it has been resumed and the patch should be resubmitted
    Resumed,
    /// The submission failed in a way worth retrying
    Retry(ApiError),
}

/// Applies update patches to one cluster
pub struct Updater<'a, A: ClusterApi + ?Sized> {
    api: &'a A,
    project_id: &'a str,
    name: &'a str,
    cancel: &'a CancellationToken,
    profile: WaitProfile,
    retry: RetryPolicy,
}

impl<'a, A: ClusterApi + ?Sized> Updater<'a, A> {
    pub fn new(
        api: &'a A,
        project_id: &'a str,
        name: &'a str,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            api,
            project_id,
            name,
            cancel,
            profile: WaitProfile::update(Duration::ZERO),
            retry: RetryPolicy::default(),
        }
    }

    /// Poll timing used while waiting for each step to settle
    pub fn with_profile(mut self, profile: WaitProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Submit `patch` once and wait for the cluster to settle
    ///
    /// A paused-cluster rejection is corrected by resuming the cluster. A bad
    /// request or a missing response is fatal. Errors while waiting are fatal.
    pub async fn try_update(&self, patch: &ClusterRequest, budget: Duration) -> Result<Attempt> {
        match self.api.update(self.project_id, self.name, patch).await {
            Ok(accepted) => {
                let settled = self.wait(budget).await?;
                Ok(Attempt::Settled(settled.unwrap_or(accepted)))
            }
            Err(e) if e.is_paused_conflict() => {
                info!(cluster = self.name, "cluster is paused, resuming before retrying update");
                self.set_paused(false, budget)
                    .await
                    .map_err(|source| ProviderError::CorrectionFailed {
                        name: self.name.to_string(),
                        source: Box::new(source),
                    })?;
                Ok(Attempt::Resumed)
            }
            Err(e) if e.is_bad_request() || e.status().is_none() => Err(e.into()),
            Err(e) => Ok(Attempt::Retry(e)),
        }
    }

    /// Apply `patch` and, when `pause_after` is set, pause the cluster afterwards
    ///
    /// Retries until the patch settles or `timeout` runs out. An empty patch
    /// skips straight to pausing.
    pub async fn apply(
        &self,
        patch: &ClusterRequest,
        pause_after: bool,
        timeout: Duration,
    ) -> Result<Option<ClusterDescription>> {
        let deadline = Instant::now() + timeout;
        let mut settled = None;

        if !patch.is_empty() {
            settled = Some(self.apply_until(patch, deadline, timeout).await?);
        }

        if pause_after {
            let remaining = deadline.saturating_duration_since(Instant::now());
            info!(cluster = self.name, "pausing cluster");
            settled = Some(self.set_paused(true, remaining).await?);
        }

        Ok(settled)
    }

    async fn apply_until(
        &self,
        patch: &ClusterRequest,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<ClusterDescription> {
        let mut delay = self.retry.initial_delay;
        let mut last_error: Option<String> = None;
        let mut attempt = 0u32;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ProviderError::Timeout {
                    name: self.name.to_string(),
                    elapsed: timeout,
                    budget: timeout,
                    detail: last_error,
                });
            }

            attempt += 1;
            match self.try_update(patch, remaining).await? {
                Attempt::Settled(cluster) => return Ok(cluster),
                Attempt::Resumed => {
                    last_error = Some("cluster was paused".to_string());
                }
                Attempt::Retry(e) => {
                    let jitter = rand::rng().random_range(0.5..1.5);
                    let jittered = Duration::from_secs_f64(delay.as_secs_f64() * jitter);
                    let wait = jittered.min(deadline.saturating_duration_since(Instant::now()));

                    warn!(
                        cluster = self.name,
                        attempt = attempt,
                        error = %e,
                        delay_ms = wait.as_millis(),
                        "update failed, retrying"
                    );
                    last_error = Some(e.to_string());

                    sleep_or_cancel(wait, self.cancel)
                        .await
                        .map_err(|_| ProviderError::Cancelled {
                            name: self.name.to_string(),
                        })?;

                    delay = Duration::from_secs_f64(
                        delay.as_secs_f64() * self.retry.backoff_multiplier,
                    )
                    .min(self.retry.max_delay);
                }
            }
        }
    }

    /// Toggle the pause state and wait for the cluster to settle
    pub async fn set_paused(&self, paused: bool, budget: Duration) -> Result<ClusterDescription> {
        let accepted = self
            .api
            .update(self.project_id, self.name, &ClusterRequest::paused(paused))
            .await?;
        let settled = self.wait(budget).await?;
        Ok(settled.unwrap_or(accepted))
    }

    async fn wait(&self, budget: Duration) -> Result<Option<ClusterDescription>> {
        let profile = self.profile.clone().with_timeout(budget);
        await_state(self.name, &profile, self.cancel, || {
            self.api.get(self.project_id, self.name)
        })
        .await
    }
}
