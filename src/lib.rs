//! Async status queries for Quake3-family game servers (out-of-band `getstatus`
//! and RCON over UDP) and TeamSpeak 3 voice servers (ServerQuery over TCP),
//! rendered as chat-ready text lines.
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod packet;
pub mod query;
pub mod rcon;
pub mod registry;
pub mod status;
pub mod voice;
