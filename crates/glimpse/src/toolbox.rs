//! Registry and executor for the capabilities a model may call.
mod clock;
mod registry;
mod tool;

pub use clock::ClockTool;
pub use registry::{ToolRegistry, Toolbox};
pub use tool::{FunctionTool, Tool};
