//! Failover pipeline.
//!
//! One cycle walks the providers in configured order. Each provider gets up
//! to its attempt bound; a candidate URL only becomes the session once it
//! has passed verification. The cycle stops at the first verified tunnel.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use tunnelkeeper_core::{AttemptOutcome, AttemptRecord, TunnelState};

use crate::context::TunnelContext;
use crate::error::{AttemptError, CycleError};
use crate::probe::verify;
use crate::provider::{Candidate, ProviderInfo, TunnelProvider};
use crate::retry::CycleState;
use crate::session::SessionState;

// ============================================================================
// Cycle Outcome
// ============================================================================

/// A verified tunnel installed by a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    /// Provider serving the tunnel.
    pub provider_id: String,
    /// Verified public URL.
    pub url: String,
}

/// The outcome of one failover cycle.
#[derive(Debug)]
pub struct CycleOutcome {
    /// The activation, or why the cycle failed.
    pub result: Result<Activation, CycleError>,
    /// All attempts made.
    pub attempts: Vec<AttemptRecord>,
    /// Total duration of the cycle.
    pub duration: Duration,
}

impl CycleOutcome {
    /// Returns true if a tunnel was activated.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Number of attempts made on `provider_id`, availability checks excluded.
    pub fn attempts_for(&self, provider_id: &str) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.provider_id == provider_id && a.attempt > 0)
            .count()
    }

    /// Returns the activated provider, if any.
    pub fn successful_provider(&self) -> Option<&str> {
        self.result.as_ref().ok().map(|a| a.provider_id.as_str())
    }

    /// Returns all errors that occurred.
    pub fn errors(&self) -> Vec<&str> {
        self.attempts
            .iter()
            .filter_map(|a| a.error.as_deref())
            .collect()
    }
}

// ============================================================================
// Failover Pipeline
// ============================================================================

/// Providers in priority order.
pub struct FailoverPipeline {
    providers: Vec<Arc<dyn TunnelProvider>>,
}

impl FailoverPipeline {
    /// Creates a pipeline trying `providers` in the given order.
    pub fn new(providers: Vec<Arc<dyn TunnelProvider>>) -> Self {
        Self { providers }
    }

    /// Returns the number of providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if no providers are configured.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider ids in order.
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Returns information about all providers.
    pub async fn provider_info(&self, ctx: &TunnelContext) -> Vec<ProviderInfo> {
        let mut info = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            info.push(ProviderInfo::from_provider(provider.as_ref(), ctx).await);
        }
        info
    }

    /// Runs one failover cycle.
    ///
    /// `cycle` is reset first, so every cycle starts with zeroed counters.
    /// On success the tunnel is installed in `session` and published.
    #[instrument(skip_all, fields(providers = self.providers.len()))]
    pub async fn run_cycle(
        &self,
        ctx: &TunnelContext,
        session: &SessionState,
        cycle: &mut CycleState,
    ) -> CycleOutcome {
        let start = Instant::now();
        let mut attempts = Vec::new();
        cycle.reset();

        if self.providers.is_empty() {
            return CycleOutcome {
                result: Err(CycleError::NoProviders),
                attempts,
                duration: start.elapsed(),
            };
        }

        info!(cycle = cycle.cycle(), "Starting failover cycle");

        for provider in &self.providers {
            let id = provider.id();

            if !provider.is_available(ctx).await {
                warn!(provider = %id, "Provider not installed, skipping");
                attempts.push(AttemptRecord::failure(
                    id,
                    0,
                    AttemptOutcome::Unavailable,
                    "Not installed",
                    Duration::ZERO,
                ));
                continue;
            }

            let max_attempts = ctx.settings.retry.attempts_for(provider.max_attempts());

            while cycle.attempts(id) < max_attempts {
                let n = cycle.record_attempt(id);
                session.set_state(TunnelState::Attempting {
                    provider: id.to_string(),
                    attempt: n,
                });
                debug!(provider = %id, attempt = n, max_attempts, "Attempting provider");

                let attempt_start = Instant::now();
                let result = match provider.connect(ctx).await {
                    Ok(candidate) => Self::promote(provider.as_ref(), ctx, session, candidate).await,
                    Err(e) => Err(e),
                };
                let duration = attempt_start.elapsed();

                match result {
                    Ok(activation) => {
                        info!(
                            provider = %id,
                            attempt = n,
                            url = %activation.url,
                            duration = ?duration,
                            "Tunnel established"
                        );
                        attempts.push(AttemptRecord::success(id, n, &activation.url, duration));
                        return CycleOutcome {
                            result: Ok(activation),
                            attempts,
                            duration: start.elapsed(),
                        };
                    }
                    Err(e) => {
                        warn!(provider = %id, attempt = n, error = %e, "Attempt failed");
                        let mut record =
                            AttemptRecord::failure(id, n, e.outcome(), e.to_string(), duration);
                        if let AttemptError::VerificationFailed { url, .. } = &e {
                            record = record.with_url(url);
                        }
                        attempts.push(record);
                        session.record_error(e.to_string());

                        if e.is_unavailable() {
                            debug!(provider = %id, "Provider unavailable, moving on");
                            break;
                        }
                    }
                }

                if cycle.attempts(id) < max_attempts {
                    tokio::time::sleep(ctx.settings.retry.inter_attempt_delay).await;
                }
            }
        }

        let total = attempts.iter().filter(|a| a.attempt > 0).count();
        warn!(attempts = total, "All providers exhausted");
        CycleOutcome {
            result: Err(CycleError::AllProvidersExhausted { attempts: total }),
            attempts,
            duration: start.elapsed(),
        }
    }

    /// Verifies a candidate and installs it, or tears it down.
    async fn promote(
        provider: &dyn TunnelProvider,
        ctx: &TunnelContext,
        session: &SessionState,
        candidate: Candidate,
    ) -> Result<Activation, AttemptError> {
        let settings = &ctx.settings;

        if provider.requires_verification() {
            session.set_state(TunnelState::Verifying {
                provider: candidate.provider_id.clone(),
                url: candidate.url.clone(),
            });

            if !settings.verify_delay.is_zero() {
                tokio::time::sleep(settings.verify_delay).await;
            }

            let health_path = provider.health_path().unwrap_or(&settings.health_path);
            let probe = verify(ctx.probe.as_ref(), &candidate.url, health_path).await;

            if !probe.success {
                let url = candidate.url.clone();
                candidate.discard(settings.terminate_grace).await;
                return Err(AttemptError::VerificationFailed {
                    url,
                    reason: probe.failure_reason(),
                });
            }
        }

        let Candidate {
            provider_id,
            url,
            process,
        } = candidate;

        session.activate(&provider_id, &url, process).await;

        if let Err(e) = ctx.publisher.publish(&url).await {
            error!(url = %url, error = %e, "Failed to publish tunnel URL");
            session.record_error(format!("publish failed: {e}"));
        }

        Ok(Activation { provider_id, url })
    }
}

// ============================================================================
// Tests
// ============================================================================
