pub mod llm;
pub mod mail;
pub mod prompt;
pub mod relay;
pub mod turn;
