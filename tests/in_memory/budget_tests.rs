//! Iteration budget, cancellation, and input handling.

use std::time::Duration;

use crate::loop_support::{call_id, default_config, register_provider, stack};
use rstest::rstest;
use serde_json::json;
use turnstile::conversation::domain::{Role, ToolErrorKind, TurnRange, UserId};
use turnstile::invoker::adapters::memory::ScriptStep;
use turnstile::orchestrator::domain::{ConversationState, ModelReply};
use turnstile::orchestrator::services::OrchestratorError;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn exhausted_budget_ends_with_a_synthesized_final_turn() {
    let stack = stack(default_config().with_iteration_budget(2));
    register_provider(&stack, "weather", &["get_weather"]);
    stack
        .transport
        .always("get_weather", ScriptStep::ok(json!({"tempC": 18})))
        .expect("script");
    for id in ["c1", "c2", "c3"] {
        stack.model.push_reply(ModelReply::text("").with_tool_call(
            call_id(id),
            "get_weather",
            json!({"city": "Paris"}),
        ));
    }
    stack.model.always(ModelReply::text("unreachable"));

    let (conversation, reply) = stack
        .orchestrator
        .start_conversation(UserId::new(), "Keep checking the weather")
        .await
        .expect("cycle");

    assert_eq!(reply.role(), Role::Assistant);
    assert!(reply.content().contains("iteration budget"));
    assert!(reply.tool_calls().is_empty());
    assert_eq!(stack.model.histories().len(), 3);
    assert_eq!(stack.transport.sent().expect("sent").len(), 2);

    let turns = stack
        .orchestrator
        .get_turns(conversation.id(), TurnRange::all())
        .await
        .expect("turns");
    assert_eq!(turns.len(), 8);
    let over_budget = turns.get(6).expect("aborted tool turn");
    assert_eq!(over_budget.tool_call_id(), Some(&call_id("c3")));
    assert_eq!(
        over_budget.result().and_then(|result| result.error_kind()),
        Some(ToolErrorKind::Aborted)
    );
    assert_eq!(
        stack.orchestrator.state(conversation.id()),
        ConversationState::AwaitingUserInput
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn cancelled_cycle_leaves_the_conversation_usable() {
    let stack = stack(default_config());
    register_provider(&stack, "weather", &["get_weather"]);
    stack
        .transport
        .push("get_weather", ScriptStep::Hang)
        .expect("script hang");
    stack.model.push_reply(ModelReply::text("Hi, how can I help?"));
    stack.model.push_reply(ModelReply::text("").with_tool_call(
        call_id("c1"),
        "get_weather",
        json!({"city": "Paris"}),
    ));
    stack.model.push_reply(ModelReply::text("Sure, what next?"));
    let (conversation, _) = stack
        .orchestrator
        .start_conversation(UserId::new(), "hello")
        .await
        .expect("first cycle");

    let orchestrator = std::sync::Arc::clone(&stack.orchestrator);
    let conversation_id = conversation.id();
    let cycle = tokio::spawn(async move {
        orchestrator
            .submit_user_message(conversation_id, "Weather in Paris?")
            .await
    });
    while stack.transport.sent().expect("sent").is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(stack.orchestrator.cancel(conversation_id));
    let cancelled = cycle.await.expect("cycle task");
    let Err(err) = cancelled else {
        panic!("expected the cycle to be cancelled");
    };
    assert!(matches!(err, OrchestratorError::Cancelled(id) if id == conversation_id));
    assert!(err.descriptor().recoverable);

    let reply = stack
        .orchestrator
        .submit_user_message(conversation_id, "Never mind")
        .await
        .expect("next cycle");

    assert_eq!(reply.content(), "Sure, what next?");
    let roles: Vec<_> = stack
        .orchestrator
        .get_turns(conversation_id, TurnRange::all())
        .await
        .expect("turns")
        .iter()
        .map(|turn| turn.role())
        .collect();
    assert_eq!(
        roles,
        vec![
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant,
            Role::Tool,
            Role::User,
            Role::Assistant,
        ]
    );
}

#[rstest]
#[case::blank("   ")]
#[case::empty("")]
#[tokio::test(flavor = "multi_thread")]
async fn blank_first_message_is_rejected(#[case] text: &str) {
    let stack = stack(default_config());

    let result = stack
        .orchestrator
        .start_conversation(UserId::new(), text)
        .await;

    let Err(err) = result else {
        panic!("expected blank input to be rejected");
    };
    assert_eq!(err.descriptor().kind, "InvalidInput");
    assert!(!err.is_recoverable());
    assert!(stack.model.histories().is_empty());
}
