//! When steps for conversation loop scenarios.

use super::world::{LoopWorld, run_async};
use eyre::{WrapErr, eyre};
use rstest_bdd_macros::when;
use turnstile::conversation::domain::UserId;

#[when(r#"the user starts a conversation with "{text}""#)]
fn start_conversation(world: &mut LoopWorld, text: String) -> Result<(), eyre::Report> {
    let (conversation, reply) = run_async(
        world
            .stack
            .orchestrator
            .start_conversation(UserId::new(), &text),
    )
    .wrap_err("start conversation")?;
    world.conversation = Some(conversation);
    world.last_reply = Some(Ok(reply));
    Ok(())
}

#[when(r#"the user sends "{text}""#)]
fn user_sends(world: &mut LoopWorld, text: String) -> Result<(), eyre::Report> {
    let conversation_id = world
        .conversation
        .as_ref()
        .map(|conversation| conversation.id())
        .ok_or_else(|| eyre!("no conversation in scenario world"))?;
    let result = run_async(
        world
            .stack
            .orchestrator
            .submit_user_message(conversation_id, &text),
    );
    world.last_reply = Some(result);
    Ok(())
}

#[when("the user closes the conversation")]
fn user_closes(world: &mut LoopWorld) -> Result<(), eyre::Report> {
    let conversation_id = world
        .conversation
        .as_ref()
        .map(|conversation| conversation.id())
        .ok_or_else(|| eyre!("no conversation in scenario world"))?;
    let closed = run_async(world.stack.orchestrator.close_conversation(conversation_id))
        .wrap_err("close conversation")?;
    world.conversation = Some(closed);
    Ok(())
}
