//! Invoker service tests.

use std::sync::Arc;
use std::time::Duration;

use super::ToolInvoker;
use crate::conversation::domain::{ToolCallId, ToolCallRequest, ToolErrorKind, TurnId};
use crate::invoker::{
    adapters::memory::{ScriptStep, ScriptedToolTransport},
    domain::{InvocationOutcome, InvokerConfig},
    ports::TransportError,
};
use crate::retry::RetryPolicy;
use crate::tool_registry::{
    adapters::memory::InMemoryCapabilitySource,
    domain::{ProviderName, ProviderTransport, ToolCapability, ToolProvider},
    services::ToolRegistry,
};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::json;
use tokio_util::sync::CancellationToken;

type TestRegistry = ToolRegistry<InMemoryCapabilitySource, DefaultClock>;

struct Harness {
    transport: Arc<ScriptedToolTransport>,
    registry: Arc<TestRegistry>,
    invoker: ToolInvoker<ScriptedToolTransport, TestRegistry>,
}

#[fixture]
fn harness() -> Harness {
    let transport = Arc::new(ScriptedToolTransport::new());
    let registry = Arc::new(ToolRegistry::new(
        Arc::new(InMemoryCapabilitySource::new()),
        Arc::new(DefaultClock),
    ));
    let config = InvokerConfig::default().with_retry(RetryPolicy::new(
        2,
        Duration::from_millis(100),
        Duration::from_secs(1),
    ));
    let invoker = ToolInvoker::new(Arc::clone(&transport), Arc::clone(&registry), config);
    Harness {
        transport,
        registry,
        invoker,
    }
}

fn provider(name: &str, capability: ToolCapability) -> ToolProvider {
    ToolProvider::new(
        ProviderName::new(name).expect("valid name"),
        ProviderTransport::stdio(format!("{name}-mcp")).expect("valid transport"),
        vec![capability],
        &DefaultClock,
    )
    .expect("valid provider")
}

fn registered(harness: &Harness, name: &str, capability: ToolCapability) -> Arc<ToolProvider> {
    harness
        .registry
        .register(provider(name, capability))
        .expect("register")
}

fn tool(name: &str) -> ToolCapability {
    ToolCapability::new(name, "test tool").expect("valid capability")
}

fn request(call_id: &str, tool_name: &str) -> ToolCallRequest {
    ToolCallRequest::new(
        ToolCallId::new(call_id).expect("valid call id"),
        tool_name,
        json!({"city": "Paris"}),
        TurnId::new(),
    )
}

async fn invoke(
    harness: &Harness,
    call: &ToolCallRequest,
    target: Arc<ToolProvider>,
    timeout: Duration,
) -> InvocationOutcome {
    harness
        .invoker
        .invoke(call, target, timeout, &CancellationToken::new())
        .await
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn successful_call_returns_the_payload(harness: Harness) {
    let weather = registered(&harness, "weather", tool("get_weather"));
    harness
        .transport
        .push("get_weather", ScriptStep::ok(json!({"tempC": 18})))
        .expect("script");

    let call = request("c1", "get_weather");
    let outcome = invoke(&harness, &call, weather, Duration::from_secs(10)).await;

    assert_eq!(
        outcome,
        InvocationOutcome::Succeeded {
            result: json!({"tempC": 18})
        }
    );
    let sent = harness.transport.sent().expect("sent");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent.first().map(|e| e.call_id.as_str()), Some("c1"));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn provider_error_fails_without_retry(harness: Harness) {
    let weather = registered(&harness, "weather", tool("get_weather").idempotent());
    harness
        .transport
        .always("get_weather", ScriptStep::error("city not found"))
        .expect("script");

    let call = request("c1", "get_weather");
    let outcome = invoke(&harness, &call, weather, Duration::from_secs(10)).await;

    assert_eq!(
        outcome,
        InvocationOutcome::failed(ToolErrorKind::Execution, "city not found")
    );
    assert_eq!(harness.transport.sent().expect("sent").len(), 1);
}

#[rstest]
#[case::hung_provider(ScriptStep::Hang)]
#[case::late_reply(ScriptStep::ok(json!("late")).after(Duration::from_secs(30)))]
#[tokio::test(start_paused = true)]
async fn deadline_stops_the_call_and_cancels_it(harness: Harness, #[case] step: ScriptStep) {
    let weather = registered(&harness, "weather", tool("get_weather"));
    harness.transport.push("get_weather", step).expect("script");

    let call = request("c1", "get_weather");
    let outcome = invoke(&harness, &call, weather, Duration::from_secs(10)).await;

    assert_eq!(outcome, InvocationOutcome::TimedOut);
    let cancelled = harness.transport.cancelled().expect("cancelled");
    assert_eq!(cancelled, vec![call.id().clone()]);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn cancellation_is_reported_as_timeout(harness: Harness) {
    let weather = registered(&harness, "weather", tool("get_weather"));
    harness
        .transport
        .push("get_weather", ScriptStep::Hang)
        .expect("script");
    let token = CancellationToken::new();
    token.cancel();

    let call = request("c1", "get_weather");
    let outcome = harness
        .invoker
        .invoke(&call, weather, Duration::from_secs(10), &token)
        .await;

    assert_eq!(outcome, InvocationOutcome::TimedOut);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn idempotent_tool_is_retried_after_transport_failures(harness: Harness) {
    let weather = registered(&harness, "weather", tool("get_weather").idempotent());
    for step in [
        ScriptStep::TransportFailure(TransportError::Unreachable(weather.id())),
        ScriptStep::TransportFailure(TransportError::Protocol("garbled".to_owned())),
        ScriptStep::ok(json!({"tempC": 18})),
    ] {
        harness.transport.push("get_weather", step).expect("script");
    }

    let call = request("c1", "get_weather");
    let outcome = invoke(&harness, &call, weather, Duration::from_secs(10)).await;

    assert!(outcome.is_success());
    assert_eq!(harness.transport.sent().expect("sent").len(), 3);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn retries_stop_at_the_policy_bound(harness: Harness) {
    let weather = registered(&harness, "weather", tool("get_weather").idempotent());
    harness
        .transport
        .always(
            "get_weather",
            ScriptStep::TransportFailure(TransportError::Unreachable(weather.id())),
        )
        .expect("script");

    let call = request("c1", "get_weather");
    let outcome = invoke(&harness, &call, weather, Duration::from_secs(10)).await;

    assert_eq!(outcome.error_kind(), Some(ToolErrorKind::Execution));
    assert_eq!(harness.transport.sent().expect("sent").len(), 3);
}

#[rstest]
#[case::transport_failure(ScriptStep::TransportFailure(TransportError::Protocol("garbled".to_owned())))]
#[case::mismatched_call_id(ScriptStep::WrongCallId)]
#[tokio::test(start_paused = true)]
async fn non_idempotent_tool_fails_fast(harness: Harness, #[case] step: ScriptStep) {
    let mailer = registered(&harness, "mailer", tool("send_email"));
    harness.transport.always("send_email", step).expect("script");

    let call = request("c1", "send_email");
    let outcome = invoke(&harness, &call, mailer, Duration::from_secs(10)).await;

    assert_eq!(outcome.error_kind(), Some(ToolErrorKind::Execution));
    assert_eq!(harness.transport.sent().expect("sent").len(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn retry_against_deregistered_provider_is_unavailable(harness: Harness) {
    let weather = registered(&harness, "weather", tool("get_weather").idempotent());
    harness
        .transport
        .always(
            "get_weather",
            ScriptStep::TransportFailure(TransportError::Unreachable(weather.id())),
        )
        .expect("script");
    assert!(harness.registry.deregister(weather.id()));

    let call = request("c1", "get_weather");
    let outcome = invoke(&harness, &call, weather, Duration::from_secs(10)).await;

    assert_eq!(
        outcome.error_kind(),
        Some(ToolErrorKind::ProviderUnavailable)
    );
    assert_eq!(harness.transport.sent().expect("sent").len(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn unreachable_provider_fails_without_sending(harness: Harness) {
    let weather = provider("weather", tool("get_weather")).marked_unreachable("down", &DefaultClock);

    let call = request("c1", "get_weather");
    let outcome = invoke(&harness, &call, Arc::new(weather), Duration::from_secs(10)).await;

    assert_eq!(
        outcome.error_kind(),
        Some(ToolErrorKind::ProviderUnavailable)
    );
    assert!(harness.transport.sent().expect("sent").is_empty());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn dispatch_classifies_resolution_failures(harness: Harness) {
    registered(&harness, "alpha", tool("search"));
    registered(&harness, "beta", tool("search"));
    let token = CancellationToken::new();

    let unknown = harness
        .invoker
        .dispatch(&request("c1", "translate"), None, &token)
        .await;
    let ambiguous = harness
        .invoker
        .dispatch(&request("c2", "search"), None, &token)
        .await;

    assert_eq!(unknown.error_kind(), Some(ToolErrorKind::UnknownTool));
    assert_eq!(ambiguous.error_kind(), Some(ToolErrorKind::AmbiguousTool));
    assert!(harness.transport.sent().expect("sent").is_empty());
}
