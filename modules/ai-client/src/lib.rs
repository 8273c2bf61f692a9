pub mod error;
pub mod openai;
pub mod traits;

pub use error::AiError;
pub use openai::{ChatOptions, OpenAi};
pub use traits::{Message, MessageRole};
