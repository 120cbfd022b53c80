//! These models represent the conversation objects passed around by the relay
//!
//! The same shape travels in two directions: chat transcripts arrive from the
//! interface with the relay request, and the prior turns are forwarded to the
//! upstream answer service as `conversation_history`. Both sides speak plain
//! `{role, content}` records, so the internal model stays a single struct.
pub mod message;
pub mod role;
