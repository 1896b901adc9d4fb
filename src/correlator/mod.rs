//! Tool round correlation.
//!
//! An assistant turn that requests tools opens a round. Results are matched
//! back to requests by call id; the round completes when the last one
//! arrives, or is abandoned with aborted tool turns written for every call
//! still pending.

pub mod domain;
pub mod services;
