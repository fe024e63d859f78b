//! Classify-then-route pipeline for one user turn.
//!
//! The latest utterance is classified by the model into a `ParsedUserQuery`; the router picks
//! a flow by intent; the flow assembles a prompt from zero or more datasource sections in a
//! fixed order; and the completion invoker sends that prompt after the earlier turns.

pub mod classifier;
pub mod prompts;
pub mod router;
pub mod service;

pub use service::{ChatOptions, ChatService};
