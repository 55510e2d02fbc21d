//! Transparent call tracing.
//!
//! The `Traceable*` decorators wrap a platform, toolbox or agent, delegate every call
//! unchanged and record it in a shared [`CallCollector`]. Content of deferred results is
//! shared with the owner through the identity-keyed [`ResultCache`], so reading a trace
//! never consumes a result a second time.
mod collector;
mod traceable;

pub use collector::{CallCollector, Outcome, RecordedCall, ResultCache};
pub use traceable::{TraceableAgent, TraceablePlatform, TraceableToolbox};
