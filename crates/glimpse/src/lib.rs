pub mod agent;
pub mod errors;
pub mod models;
pub mod platform;
pub mod processor;
pub mod profiler;
pub mod result;
pub mod toolbox;
