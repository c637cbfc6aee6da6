//! Messages passed between the HTTP surface, the conversation pipeline and the
//! model provider.
//!
//! The OpenAI-compatible wire format is produced from these structs in
//! `providers::utils`.
pub mod content;
pub mod message;
pub mod role;
