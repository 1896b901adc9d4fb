//! Tool rounds driven through the full orchestrator.

use std::time::Duration;

use crate::loop_support::{call_id, default_config, register_provider, stack};
use rstest::rstest;
use serde_json::json;
use turnstile::conversation::domain::{
    Role, ToolErrorKind, ToolResultStatus, TurnRange, UserId,
};
use turnstile::correlator::domain::RoundState;
use turnstile::invoker::adapters::memory::ScriptStep;
use turnstile::orchestrator::domain::ModelReply;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn single_tool_call_produces_four_ordered_turns() {
    let stack = stack(default_config());
    register_provider(&stack, "weather", &["get_weather"]);
    stack
        .transport
        .push("get_weather", ScriptStep::ok(json!({"tempC": 18})))
        .expect("script");
    stack.model.push_reply(ModelReply::text("").with_tool_call(
        call_id("c1"),
        "get_weather",
        json!({"city": "Paris"}),
    ));
    stack
        .model
        .push_reply(ModelReply::text("It is 18C in Paris. Summary: mild."));

    let (conversation, reply) = stack
        .orchestrator
        .start_conversation(UserId::new(), "Weather in Paris, then summarize")
        .await
        .expect("cycle");

    let turns = stack
        .orchestrator
        .get_turns(conversation.id(), TurnRange::all())
        .await
        .expect("turns");
    let roles: Vec<_> = turns.iter().map(|turn| turn.role()).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );
    let sequence: Vec<_> = turns
        .iter()
        .map(|turn| turn.sequence_number().value())
        .collect();
    assert_eq!(sequence, vec![1, 2, 3, 4]);
    let tool_turn = turns.get(2).expect("tool turn");
    assert_eq!(tool_turn.tool_call_id(), Some(&call_id("c1")));
    assert_eq!(
        tool_turn.result().map(|result| result.payload().clone()),
        Some(json!({"tempC": 18}))
    );
    assert_eq!(reply, *turns.get(3).expect("final turn"));
    assert_eq!(conversation.title(), "Weather in Paris, then summarize");

    let sent = stack.transport.sent().expect("sent");
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent.first().map(|envelope| envelope.arguments.clone()),
        Some(json!({"city": "Paris"}))
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn unanswered_call_times_out_and_still_completes_the_round() {
    let stack = stack(default_config());
    register_provider(&stack, "weather", &["get_weather"]);
    stack
        .transport
        .always("get_weather", ScriptStep::Hang)
        .expect("script");
    stack.model.push_reply(ModelReply::text("").with_tool_call(
        call_id("c1"),
        "get_weather",
        json!({"city": "Paris"}),
    ));
    stack
        .model
        .push_reply(ModelReply::text("The weather service did not answer."));
    let started = tokio::time::Instant::now();

    let (conversation, reply) = stack
        .orchestrator
        .start_conversation(UserId::new(), "Weather in Paris?")
        .await
        .expect("cycle");

    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(reply.content(), "The weather service did not answer.");
    let turns = stack
        .orchestrator
        .get_turns(conversation.id(), TurnRange::all())
        .await
        .expect("turns");
    let result = turns
        .get(2)
        .and_then(|turn| turn.result())
        .expect("tool result");
    assert_eq!(result.status(), ToolResultStatus::Error);
    assert_eq!(result.error_kind(), Some(ToolErrorKind::Timeout));
    assert_eq!(
        stack.orchestrator.correlator().round_state(conversation.id()),
        Some(RoundState::Complete)
    );
    assert_eq!(
        stack.transport.cancelled().expect("cancelled"),
        vec![call_id("c1")]
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn parallel_round_waits_for_every_result() {
    let stack = stack(default_config());
    register_provider(&stack, "weather", &["get_weather"]);
    register_provider(&stack, "search", &["web_search", "summarize"]);
    stack
        .transport
        .push(
            "get_weather",
            ScriptStep::ok(json!({"tempC": 18})).after(Duration::from_millis(300)),
        )
        .expect("script weather");
    stack
        .transport
        .push(
            "web_search",
            ScriptStep::error("search backend rejected the query").after(Duration::from_millis(50)),
        )
        .expect("script search");
    stack
        .transport
        .push(
            "summarize",
            ScriptStep::ok(json!("short summary")).after(Duration::from_secs(2)),
        )
        .expect("script summarize");
    stack.model.push_reply(
        ModelReply::text("Working on it.")
            .with_tool_call(call_id("w"), "get_weather", json!({"city": "Paris"}))
            .with_tool_call(call_id("s"), "web_search", json!({"q": "Paris news"}))
            .with_tool_call(call_id("m"), "summarize", json!({"text": "..."})),
    );
    stack.model.push_reply(ModelReply::text("Here is everything."));

    let (conversation, _reply) = stack
        .orchestrator
        .start_conversation(UserId::new(), "Weather, news, and a summary")
        .await
        .expect("cycle");

    let histories = stack.model.histories();
    assert_eq!(histories.len(), 2);
    let second = histories.get(1).expect("second model call");
    let answered: Vec<_> = second
        .iter()
        .filter(|turn| turn.role() == Role::Tool)
        .filter_map(|turn| turn.tool_call_id().cloned())
        .collect();
    assert_eq!(answered, vec![call_id("s"), call_id("w"), call_id("m")]);

    let failed: Vec<_> = second
        .iter()
        .filter_map(|turn| turn.result())
        .filter_map(|result| result.error_kind())
        .collect();
    assert_eq!(failed, vec![ToolErrorKind::Execution]);
    assert_eq!(
        stack.orchestrator.correlator().round_state(conversation.id()),
        Some(RoundState::Complete)
    );
    assert!(
        stack
            .orchestrator
            .correlator()
            .anomalies(conversation.id())
            .is_empty()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_tool_is_answered_without_touching_a_provider() {
    let stack = stack(default_config());
    stack.model.push_reply(ModelReply::text("").with_tool_call(
        call_id("c1"),
        "launch_rocket",
        json!({}),
    ));
    stack
        .model
        .push_reply(ModelReply::text("I cannot do that."));

    let (conversation, _reply) = stack
        .orchestrator
        .start_conversation(UserId::new(), "Launch the rocket")
        .await
        .expect("cycle");

    let turns = stack
        .orchestrator
        .get_turns(conversation.id(), TurnRange::all())
        .await
        .expect("turns");
    assert_eq!(
        turns
            .get(2)
            .and_then(|turn| turn.result())
            .and_then(|result| result.error_kind()),
        Some(ToolErrorKind::UnknownTool)
    );
    assert!(stack.transport.sent().expect("sent").is_empty());
}
