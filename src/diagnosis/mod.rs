pub mod image;
pub mod parser;
pub mod prompt;
mod service;
mod types;

pub use service::Diagnoser;
pub use types::*;
