//! HTTP Transport layer for the Model Context Protocol
//!
//! Provides the external API routing, including the `/` and `/mcp` listeners and other endpoints.

pub mod handlers;
