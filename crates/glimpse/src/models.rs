//! These models represent the objects passed around by the agent
//!
//! A conversation is a [`message::MessageBag`] of [`message::Message`]s. Tools are described
//! to the model by [`tool::ToolMetadata`], requested by the model as [`tool::ToolCall`]s and
//! answered with [`tool::ToolResult`]s. Provider specific knobs travel in [`options::Options`].
//!
//! Wire formats of individual providers are converted to and from these structs at the
//! platform boundary; nothing outside `platform` sees provider JSON.
pub mod message;
pub mod options;
pub mod role;
pub mod tool;
