//! fanline-cli library: command handlers, terminal rendering and the HTTP
//! server, exposed for tests.

pub mod commands;
pub mod http;
pub mod render;
