pub mod prompt_service;
pub mod response_parser;
pub mod verifier;

pub use prompt_service::{build_prompt, Prompt};
pub use response_parser::parse_response;
pub use verifier::verify;
