//! Incident escalation tools, caller resolution and call sessions
//!
//! Provides the business logic exposed over the MCP protocol

pub mod phone;
pub mod scripts;
pub mod search;
pub mod session;
pub mod status;
pub mod tools;
pub mod utils;
