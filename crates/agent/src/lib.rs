//! The conversation engine: dispatch loop plus the [`Assistant`] facade.
//!
//! [`DispatchLoop`] runs one user turn as a bounded state machine — call
//! the model, execute any requested tools, feed the results back, repeat
//! until the model answers in plain text. [`Assistant`] wraps the loop with
//! history checkpointing and document ingestion, and is the only surface an
//! embedding application needs. [`build_assistant`] assembles the whole
//! stack from an [`AppConfig`](papertalk_config::AppConfig).

pub mod assistant;
pub mod bootstrap;
pub mod dispatch;

pub use assistant::Assistant;
pub use bootstrap::build_assistant;
pub use dispatch::DispatchLoop;
