//! Reconciling rounds interrupted by a restart.

use std::sync::Arc;

use crate::loop_support::{call_id, default_config, register_provider, stack, stack_over};
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::json;
use turnstile::conversation::domain::{
    Conversation, ConversationId, Role, SequenceNumber, ToolErrorKind, ToolResult, TurnDraft, UserId,
};
use turnstile::conversation::ports::{ConversationMetadataStore, TurnStore};
use turnstile::invoker::adapters::memory::ScriptStep;
use turnstile::orchestrator::domain::{ModelReply, RecoveryPolicy};
use turnstile::orchestrator::services::RecoveryReport;

/// Leaves a conversation whose assistant turn requested two calls and only
/// the first was answered before the process stopped.
async fn interrupted(stack: &crate::loop_support::LoopStack) -> ConversationId {
    let conversation =
        Conversation::new(UserId::new(), "interrupted", &DefaultClock).expect("conversation");
    stack
        .metadata
        .create(&conversation)
        .await
        .expect("create conversation");
    let id = conversation.id();
    let user = TurnDraft::user(id, "Weather and news?", &DefaultClock).expect("user draft");
    stack.store.append(user).await.expect("user turn");
    let assistant = TurnDraft::assistant(id, "", &DefaultClock)
        .with_tool_call(call_id("w"), "get_weather", json!({"city": "Paris"}))
        .with_tool_call(call_id("s"), "web_search", json!({"q": "Paris"}))
        .after(Some(SequenceNumber::new(1)));
    stack.store.append(assistant).await.expect("assistant turn");
    let answered = TurnDraft::tool(
        id,
        call_id("w"),
        ToolResult::ok(json!({"tempC": 18})),
        &DefaultClock,
    )
    .after(Some(SequenceNumber::new(2)));
    stack.store.append(answered).await.expect("tool turn");
    id
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn restart_abandons_unanswered_calls_by_default() {
    let before = stack(default_config());
    let conversation = interrupted(&before).await;
    let after = stack_over(
        Arc::clone(&before.store),
        Arc::clone(&before.metadata),
        default_config(),
    );

    let report = after
        .orchestrator
        .recover(conversation)
        .await
        .expect("recover");

    let RecoveryReport::Abandoned { aborted } = report else {
        panic!("expected abandoned calls, got {report:?}");
    };
    let ids: Vec<_> = aborted
        .iter()
        .filter_map(|turn| turn.tool_call_id().cloned())
        .collect();
    assert_eq!(ids, vec![call_id("s")]);
    assert_eq!(
        aborted
            .first()
            .and_then(|turn| turn.result())
            .and_then(|result| result.error_kind()),
        Some(ToolErrorKind::Aborted)
    );
    assert!(after.transport.sent().expect("sent").is_empty());
    assert!(after.model.histories().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn restart_can_redispatch_unanswered_calls() {
    let before = stack(default_config());
    let conversation = interrupted(&before).await;
    let after = stack_over(
        Arc::clone(&before.store),
        Arc::clone(&before.metadata),
        default_config().with_recovery(RecoveryPolicy::Redispatch),
    );
    register_provider(&after, "search", &["web_search"]);
    after
        .transport
        .push("web_search", ScriptStep::ok(json!(["headline"])))
        .expect("script");
    after
        .model
        .push_reply(ModelReply::text("18C and one headline."));

    let report = after
        .orchestrator
        .recover(conversation)
        .await
        .expect("recover");

    let RecoveryReport::Redispatched { reply } = report else {
        panic!("expected a finished cycle, got {report:?}");
    };
    assert_eq!(reply.content(), "18C and one headline.");
    assert_eq!(reply.sequence_number(), SequenceNumber::new(5));
    let sent = after.transport.sent().expect("sent");
    assert_eq!(
        sent.iter()
            .map(|envelope| envelope.call_id.clone())
            .collect::<Vec<_>>(),
        vec![call_id("s")]
    );
    let history = after.model.histories().pop().expect("model call");
    assert_eq!(
        history.iter().map(|turn| turn.role()).collect::<Vec<_>>(),
        vec![Role::User, Role::Assistant, Role::Tool, Role::Tool]
    );
}
