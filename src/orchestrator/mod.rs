//! Conversation orchestration.
//!
//! Drives one user message through zero or more tool rounds to a final
//! assistant turn. The cycle is an explicit state machine
//! ([`ConversationState`](domain::ConversationState)):
//!
//! 1. The user turn is appended and the model is asked for a reply.
//! 2. A reply without tool calls is the final turn.
//! 3. A reply with tool calls opens a round; every call runs concurrently
//!    and each outcome, success or failure, is appended as a tool turn.
//! 4. When the round completes the model is asked again.
//!
//! An iteration budget bounds the number of rounds per user message.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
