//! Correlator service tests.

use std::sync::Arc;

use super::{CorrelatorError, TurnCorrelator};
use crate::conversation::{
    adapters::memory::InMemoryTurnStore,
    domain::{
        ConversationId, Role, SequenceNumber, ToolCallId, ToolCallRequest, ToolErrorKind,
        ToolResult, TurnDraft,
    },
    ports::TurnStore,
};
use crate::correlator::domain::{AnomalyKind, RoundState};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::json;

struct Harness {
    store: Arc<InMemoryTurnStore>,
    correlator: TurnCorrelator<InMemoryTurnStore, DefaultClock>,
    conversation_id: ConversationId,
}

#[fixture]
fn harness() -> Harness {
    let store = Arc::new(InMemoryTurnStore::new());
    let correlator = TurnCorrelator::new(Arc::clone(&store), Arc::new(DefaultClock));
    Harness {
        store,
        correlator,
        conversation_id: ConversationId::new(),
    }
}

fn call_id(raw: &str) -> ToolCallId {
    ToolCallId::new(raw).expect("valid call id")
}

/// Writes a user turn and an assistant turn requesting `calls`, returning
/// the committed requests.
async fn seed_round(harness: &Harness, calls: &[&str]) -> Vec<ToolCallRequest> {
    let user = TurnDraft::user(harness.conversation_id, "do things", &DefaultClock)
        .expect("user draft");
    let user_turn = harness.store.append(user).await.expect("user turn");
    let assistant = calls
        .iter()
        .fold(
            TurnDraft::assistant(harness.conversation_id, "", &DefaultClock),
            |draft, id| draft.with_tool_call(call_id(id), "lookup", json!({})),
        )
        .after(Some(user_turn.sequence_number()));
    harness
        .store
        .append(assistant)
        .await
        .expect("assistant turn")
        .tool_calls()
        .to_vec()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn round_completes_exactly_once(harness: Harness) {
    let requests = seed_round(&harness, &["c1", "c2", "c3"]).await;
    harness
        .correlator
        .open_round(harness.conversation_id, requests)
        .expect("open round");
    let conversation = harness.conversation_id;

    let first = harness
        .correlator
        .resolve(conversation, &call_id("c1"), ToolResult::ok(json!(1)));
    let second = harness.correlator.resolve(
        conversation,
        &call_id("c3"),
        ToolResult::error(ToolErrorKind::Execution, "boom"),
    );
    let third = harness
        .correlator
        .resolve(conversation, &call_id("c2"), ToolResult::ok(json!(2)));
    let replay = harness
        .correlator
        .resolve(conversation, &call_id("c2"), ToolResult::ok(json!(2)));
    let stray = harness
        .correlator
        .resolve(conversation, &call_id("zz"), ToolResult::ok(json!(0)));

    assert_eq!(
        [first, second, third, replay, stray],
        [false, false, true, false, false]
    );
    assert_eq!(
        harness.correlator.round_state(conversation),
        Some(RoundState::Complete)
    );
    let kinds: Vec<_> = harness
        .correlator
        .anomalies(conversation)
        .iter()
        .map(|anomaly| anomaly.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![AnomalyKind::DuplicateResult, AnomalyKind::LateResult]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn duplicate_and_unknown_results_are_anomalies(harness: Harness) {
    let requests = seed_round(&harness, &["c1", "c2"]).await;
    harness
        .correlator
        .open_round(harness.conversation_id, requests)
        .expect("open round");
    let conversation = harness.conversation_id;

    assert!(!harness
        .correlator
        .resolve(conversation, &call_id("c1"), ToolResult::ok(json!(1))));
    assert!(!harness
        .correlator
        .resolve(conversation, &call_id("c1"), ToolResult::ok(json!(1))));
    assert!(!harness
        .correlator
        .resolve(conversation, &call_id("zz"), ToolResult::ok(json!(0))));
    assert!(!harness
        .correlator
        .resolve(ConversationId::new(), &call_id("c1"), ToolResult::ok(json!(0))));

    let kinds: Vec<_> = harness
        .correlator
        .anomalies(conversation)
        .iter()
        .map(|anomaly| anomaly.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![AnomalyKind::DuplicateResult, AnomalyKind::UnknownCall]
    );
    assert_eq!(
        harness.correlator.round_state(conversation),
        Some(RoundState::Open)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_open_round_is_rejected_while_first_is_open(harness: Harness) {
    let requests = seed_round(&harness, &["c1"]).await;
    harness
        .correlator
        .open_round(harness.conversation_id, requests.clone())
        .expect("open round");

    let result = harness
        .correlator
        .open_round(harness.conversation_id, requests);

    assert!(matches!(
        result,
        Err(CorrelatorError::RoundAlreadyOpen { .. })
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn abandon_writes_aborted_turns_for_unresolved_calls(harness: Harness) {
    let requests = seed_round(&harness, &["c1", "c2", "c3"]).await;
    let conversation = harness.conversation_id;
    harness
        .correlator
        .open_round(conversation, requests)
        .expect("open round");
    let c2 = TurnDraft::tool(
        conversation,
        call_id("c2"),
        ToolResult::ok(json!(2)),
        &DefaultClock,
    )
    .after(Some(SequenceNumber::new(2)));
    harness.store.append(c2).await.expect("c2 result");
    assert!(!harness
        .correlator
        .resolve(conversation, &call_id("c2"), ToolResult::ok(json!(2))));

    let aborted = harness
        .correlator
        .abandon(conversation, "iteration budget exhausted")
        .await
        .expect("abandon");

    let answered: Vec<_> = aborted
        .iter()
        .filter_map(|turn| turn.tool_call_id().map(ToolCallId::as_str))
        .collect();
    assert_eq!(answered, vec!["c1", "c3"]);
    assert!(aborted.iter().all(|turn| turn.role() == Role::Tool
        && turn.result().and_then(ToolResult::error_kind) == Some(ToolErrorKind::Aborted)));
    assert_eq!(
        harness.correlator.round_state(conversation),
        Some(RoundState::Abandoned)
    );
    assert!(harness
        .store
        .pending_tool_calls(conversation)
        .await
        .expect("pending")
        .is_empty());

    let again = harness
        .correlator
        .abandon(conversation, "again")
        .await
        .expect("second abandon");
    assert!(again.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn abandon_closes_calls_left_open_by_a_previous_process(harness: Harness) {
    seed_round(&harness, &["c1"]).await;

    let aborted = harness
        .correlator
        .abandon(harness.conversation_id, "recovered after restart")
        .await
        .expect("abandon");

    assert_eq!(aborted.len(), 1);
    assert_eq!(
        aborted.first().map(|turn| turn.sequence_number()),
        Some(SequenceNumber::new(3))
    );
}
