//! Given steps for conversation loop scenarios.

use super::world::LoopWorld;
use crate::loop_support::{call_id, register_provider};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use serde_json::json;
use turnstile::invoker::adapters::memory::ScriptStep;
use turnstile::orchestrator::domain::ModelReply;

/// Replies queued for a model that never stops asking for tools.
const RUNAWAY_REPLIES: usize = 16;

#[given("an iteration budget of {budget}")]
fn iteration_budget(world: &mut LoopWorld, budget: u32) {
    *world = LoopWorld::with_config(world.config.with_iteration_budget(budget));
}

#[given(r#"a provider "{name}" offering tool "{tool}""#)]
fn provider_offering_tool(world: &mut LoopWorld, name: String, tool: String) {
    register_provider(&world.stack, &name, &[tool.as_str()]);
}

#[given(r#"tool "{tool}" answers successfully"#)]
fn tool_answers(world: &mut LoopWorld, tool: String) -> Result<(), eyre::Report> {
    world
        .stack
        .transport
        .always(&tool, ScriptStep::ok(json!({"tool": tool.as_str(), "ok": true})))
        .wrap_err("script tool reply")
}

#[given(r#"tool "{tool}" fails with "{message}""#)]
fn tool_fails(world: &mut LoopWorld, tool: String, message: String) -> Result<(), eyre::Report> {
    world
        .stack
        .transport
        .always(&tool, ScriptStep::error(message))
        .wrap_err("script tool failure")
}

#[given(r#"the model requests tools "{tools}" in one turn"#)]
fn model_requests_tools(world: &mut LoopWorld, tools: String) {
    let mut reply = ModelReply::text("");
    for tool in tools.split(',').map(str::trim) {
        let id = world.call_id(tool);
        reply = reply.with_tool_call(call_id(&id), tool, json!({}));
    }
    world.stack.model.push_reply(reply);
}

#[given(r#"the model keeps requesting tool "{tool}""#)]
fn model_keeps_requesting(world: &mut LoopWorld, tool: String) {
    for _ in 0..RUNAWAY_REPLIES {
        let id = world.call_id(&tool);
        world.stack.model.push_reply(ModelReply::text("").with_tool_call(
            call_id(&id),
            tool.as_str(),
            json!({}),
        ));
    }
}

#[given(r#"the model then answers "{text}""#)]
fn model_answers(world: &mut LoopWorld, text: String) {
    world.stack.model.push_reply(ModelReply::text(text));
}
