//! bookgate Server Library
//!
//! WebSocket gateway that lets a browser search for and download ebooks from
//! IRC file-sharing channels. The library is exposed for integration testing.

pub mod args;
pub mod cli;
pub mod config;
pub mod connection;
pub mod constants;
pub mod dcc;
pub mod error;
pub mod events;
pub mod handlers;
pub mod irc;
pub mod ratelimit;
pub mod reader;
pub mod repository;
pub mod server;
pub mod session;
pub mod session_log;
pub mod state;
