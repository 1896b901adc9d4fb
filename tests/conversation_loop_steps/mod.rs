//! Step definitions for conversation loop scenarios.

pub mod world;

mod given;
mod then;
mod when;
