//! Then steps for conversation loop scenarios.

use super::world::{LoopWorld, run_async};
use eyre::{WrapErr, eyre};
use rstest_bdd_macros::then;
use turnstile::conversation::domain::{Role, Turn, TurnRange};
use turnstile::orchestrator::services::OrchestratorError;

fn turns(world: &LoopWorld) -> Result<Vec<Turn>, eyre::Report> {
    let conversation = world
        .conversation
        .as_ref()
        .ok_or_else(|| eyre!("no conversation in scenario world"))?;
    run_async(
        world
            .stack
            .orchestrator
            .get_turns(conversation.id(), TurnRange::all()),
    )
    .wrap_err("read turns")
}

fn final_reply(world: &LoopWorld) -> Result<&Turn, eyre::Report> {
    match world.last_reply.as_ref() {
        Some(Ok(turn)) => Ok(turn),
        Some(Err(err)) => Err(eyre!("last cycle failed: {err}")),
        None => Err(eyre!("no cycle ran")),
    }
}

#[then(r#"the conversation has turns "{roles}""#)]
fn conversation_has_turns(world: &LoopWorld, roles: String) -> Result<(), eyre::Report> {
    let expected = roles
        .split(',')
        .map(|role| Role::try_from(role.trim()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| eyre!("invalid role in scenario: {err}"))?;
    let actual: Vec<_> = turns(world)?.iter().map(Turn::role).collect();
    if actual != expected {
        return Err(eyre!("expected roles {expected:?}, found {actual:?}"));
    }
    Ok(())
}

#[then(r#"the final reply is "{text}""#)]
fn final_reply_is(world: &LoopWorld, text: String) -> Result<(), eyre::Report> {
    let reply = final_reply(world)?;
    if reply.content() != text {
        return Err(eyre!("expected reply {text:?}, found {:?}", reply.content()));
    }
    Ok(())
}

#[then(r#"the final reply mentions "{text}""#)]
fn final_reply_mentions(world: &LoopWorld, text: String) -> Result<(), eyre::Report> {
    let reply = final_reply(world)?;
    if !reply.content().contains(&text) {
        return Err(eyre!("reply {:?} does not mention {text:?}", reply.content()));
    }
    Ok(())
}

#[then("{count} tool result reports an error")]
fn tool_results_report_errors(world: &LoopWorld, count: usize) -> Result<(), eyre::Report> {
    let failed = turns(world)?
        .iter()
        .filter_map(Turn::result)
        .filter(|result| !result.is_ok())
        .count();
    if failed != count {
        return Err(eyre!("expected {count} failed tool results, found {failed}"));
    }
    Ok(())
}

#[then("the model saw {count} tool results before answering")]
fn model_saw_results(world: &LoopWorld, count: usize) -> Result<(), eyre::Report> {
    let history = world
        .stack
        .model
        .histories()
        .pop()
        .ok_or_else(|| eyre!("the model was never called"))?;
    let seen = history
        .iter()
        .filter(|turn| turn.role() == Role::Tool)
        .count();
    if seen != count {
        return Err(eyre!("expected {count} tool results in history, found {seen}"));
    }
    Ok(())
}

#[then("{count} tool calls were sent")]
fn tool_calls_sent(world: &LoopWorld, count: usize) -> Result<(), eyre::Report> {
    let sent = world
        .stack
        .transport
        .sent()
        .wrap_err("read sent envelopes")?
        .len();
    if sent != count {
        return Err(eyre!("expected {count} sent calls, found {sent}"));
    }
    Ok(())
}

#[then("the message is rejected because the conversation is closed")]
fn message_rejected_closed(world: &LoopWorld) -> Result<(), eyre::Report> {
    match world.last_reply.as_ref() {
        Some(Err(OrchestratorError::ConversationClosed(_))) => Ok(()),
        other => Err(eyre!("expected a closed conversation error, got {other:?}")),
    }
}
