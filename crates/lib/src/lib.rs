//! Careline core library: LINE webhook gateway, topic and language classification,
//! knowledge-base / AI answer resolution, and disclaimer-bearing reply composition.

pub mod channels;
pub mod compose;
pub mod config;
pub mod content;
pub mod dispatch;
pub mod gateway;
pub mod init;
pub mod intent;
pub mod language;
pub mod llm;
pub mod signature;
