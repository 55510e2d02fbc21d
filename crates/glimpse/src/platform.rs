pub mod base;
pub mod mock;
pub mod openai;
pub mod utils;

pub use base::{ModelCatalog, Platform};
