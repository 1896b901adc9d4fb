//! Deadline-bound tool invocation with retries for idempotent tools.

use crate::conversation::domain::{ToolCallId, ToolCallRequest, ToolErrorKind, ToolResultStatus};
use crate::invoker::{
    domain::{InvocationOutcome, InvokerConfig, ToolCallEnvelope, ToolInvocation, ToolResponse},
    ports::{ToolTransport, TransportError},
};
use crate::tool_registry::{
    domain::{ToolCapability, ToolProvider},
    ports::{ResolveError, ToolResolver},
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep_until, timeout as within};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Longest deadline honoured for a single call.
const MAX_TOOL_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on waiting for a provider to acknowledge a cancellation.
const CANCEL_GRACE: Duration = Duration::from_secs(1);

enum Attempt {
    Answered(Result<ToolResponse, TransportError>),
    Stopped(&'static str),
}

/// Executes tool calls against providers.
///
/// Every call races a deadline and the caller's cancellation token. A
/// stopped call is cancelled at the provider on a best-effort basis and
/// reported as [`InvocationOutcome::TimedOut`]; its response future is
/// dropped, so a late result can never reach the caller.
pub struct ToolInvoker<T, R>
where
    T: ToolTransport,
    R: ToolResolver,
{
    transport: Arc<T>,
    resolver: Arc<R>,
    config: InvokerConfig,
}

impl<T, R> ToolInvoker<T, R>
where
    T: ToolTransport,
    R: ToolResolver,
{
    /// Creates an invoker.
    #[must_use]
    pub const fn new(transport: Arc<T>, resolver: Arc<R>, config: InvokerConfig) -> Self {
        Self {
            transport,
            resolver,
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Returns every tool reachable through the registry.
    #[must_use]
    pub fn capabilities(&self) -> Vec<ToolCapability> {
        self.resolver.capabilities()
    }

    /// Resolves the requested tool and invokes it.
    ///
    /// Resolution failures become failed outcomes for this call only.
    pub async fn dispatch(
        &self,
        request: &ToolCallRequest,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> InvocationOutcome {
        let provider = match self.resolver.resolve(request.tool_name()) {
            Ok(provider) => provider,
            Err(err) => {
                let error_kind = match &err {
                    ResolveError::Unknown(_) => ToolErrorKind::UnknownTool,
                    ResolveError::Ambiguous { .. } => ToolErrorKind::AmbiguousTool,
                };
                warn!(
                    call_id = %request.id(),
                    tool = request.tool_name(),
                    error = %err,
                    "tool_resolution_failed"
                );
                return InvocationOutcome::failed(error_kind, err.to_string());
            }
        };
        let deadline = timeout.unwrap_or(self.config.default_timeout);
        self.invoke(request, provider, deadline, cancel).await
    }

    /// Invokes `request` on `provider` within `timeout`.
    ///
    /// Provider-reported errors fail immediately. Transport failures are
    /// retried with backoff only when the capability is idempotent, and
    /// the provider is re-validated through the registry before each retry.
    pub async fn invoke(
        &self,
        request: &ToolCallRequest,
        provider: Arc<ToolProvider>,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> InvocationOutcome {
        let started = Instant::now();
        let deadline = started
            .checked_add(timeout.min(MAX_TOOL_TIMEOUT))
            .unwrap_or(started);
        let idempotent = provider
            .capability(request.tool_name())
            .is_some_and(ToolCapability::is_idempotent);
        let mut invocation = ToolInvocation::new(request.id().clone(), provider.id(), deadline);
        let mut current = provider;

        loop {
            if !current.is_available() {
                return invocation.finish(unavailable(&current));
            }

            let failure = match self.attempt(request, &current, deadline, cancel).await {
                Attempt::Stopped(reason) => {
                    self.stop(&current, request.id(), reason).await;
                    return invocation.finish(InvocationOutcome::TimedOut);
                }
                Attempt::Answered(Ok(response)) if response.call_id != *request.id() => {
                    TransportError::Protocol(format!(
                        "response for call {} answered call {}",
                        request.id(),
                        response.call_id
                    ))
                }
                Attempt::Answered(Ok(response)) => {
                    debug!(
                        call_id = %request.id(),
                        provider = %current.name(),
                        retries = invocation.retry_count(),
                        "tool_call_answered"
                    );
                    return invocation.finish(outcome_from(response));
                }
                Attempt::Answered(Err(err)) => err,
            };

            let retries = invocation.retry_count();
            if !idempotent || !self.config.retry.allows_retry(retries) {
                warn!(
                    call_id = %request.id(),
                    provider = %current.name(),
                    retries,
                    error = %failure,
                    "tool_call_failed"
                );
                return invocation.finish(InvocationOutcome::failed(
                    ToolErrorKind::Execution,
                    failure.to_string(),
                ));
            }

            let delay = self.config.retry.delay_for(retries);
            warn!(
                call_id = %request.id(),
                provider = %current.name(),
                retry = retries.saturating_add(1),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %failure,
                "tool_call_retrying"
            );
            if !back_off(delay, deadline, cancel).await {
                return invocation.finish(InvocationOutcome::TimedOut);
            }

            let Some(revalidated) = self.resolver.current(current.id()) else {
                warn!(call_id = %request.id(), provider = %current.name(), "tool_provider_deregistered");
                return invocation.finish(InvocationOutcome::failed(
                    ToolErrorKind::ProviderUnavailable,
                    format!("provider {} was deregistered", current.name()),
                ));
            };
            invocation.record_retry(revalidated.id());
            current = revalidated;
        }
    }

    async fn attempt(
        &self,
        request: &ToolCallRequest,
        provider: &ToolProvider,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Attempt {
        let envelope = ToolCallEnvelope::for_request(request);
        tokio::select! {
            biased;
            () = cancel.cancelled() => Attempt::Stopped("cancelled"),
            () = sleep_until(deadline) => Attempt::Stopped("deadline"),
            response = self.transport.send(provider, envelope) => Attempt::Answered(response),
        }
    }

    async fn stop(&self, provider: &ToolProvider, call_id: &ToolCallId, reason: &'static str) {
        warn!(call_id = %call_id, provider = %provider.name(), reason, "tool_call_stopped");
        match within(CANCEL_GRACE, self.transport.cancel(provider, call_id)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                debug!(call_id = %call_id, error = %err, "tool_cancel_failed");
            }
            Err(_) => debug!(call_id = %call_id, "tool_cancel_unacknowledged"),
        }
    }
}

/// Waits out a retry delay. Returns `false` when the deadline or the
/// cancellation token fires first.
async fn back_off(delay: Duration, deadline: Instant, cancel: &CancellationToken) -> bool {
    let now = Instant::now();
    let wake = now.checked_add(delay).unwrap_or(deadline);
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = sleep_until(deadline) => false,
        () = sleep_until(wake) => true,
    }
}

fn unavailable(provider: &ToolProvider) -> InvocationOutcome {
    let detail = provider.liveness().message().map_or_else(
        || format!("provider {} is unreachable", provider.name()),
        |message| format!("provider {} is unreachable: {message}", provider.name()),
    );
    InvocationOutcome::failed(ToolErrorKind::ProviderUnavailable, detail)
}

fn outcome_from(response: ToolResponse) -> InvocationOutcome {
    match response.status {
        ToolResultStatus::Ok => InvocationOutcome::Succeeded {
            result: response.payload,
        },
        ToolResultStatus::Error => {
            InvocationOutcome::failed(ToolErrorKind::Execution, describe(&response.payload))
        }
    }
}

fn describe(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        Value::Null => "the tool reported an error".to_owned(),
        other => other.to_string(),
    }
}
