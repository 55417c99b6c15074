pub mod client;
pub mod parser;

pub use client::{ModelClient, ModelReply};
pub use parser::parse_model_reply;
