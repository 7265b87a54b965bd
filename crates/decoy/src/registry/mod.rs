//! Method registry for mock objects.
//!
//! This module provides:
//! - `MethodRegistry`: name → pipeline store with call counting, once mode,
//!   observers, call history and deferred expectations
//! - `CallEvent` / `Observer`: post-call notifications
//! - `Expectation`: minimum-call checks verified on demand
//!
//! ## Module Structure
//!
//! - `types`: Event, history and expectation types
//! - `core`: The `MethodRegistry` implementation

mod core;
mod types;


pub use self::core::{MethodRegistry, INSTANCE_CREATED};
pub use types::{CallEvent, CallRecord, Expectation, Observer};
