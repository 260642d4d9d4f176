//! A single streaming connection: handshake, framed I/O, ping/pong
//! keepalive, and the command/response envelope shapes layered on top of it.

mod client;
mod messages;

pub use client::{RawFrame, WireClient};
pub use messages::{classify, Command, CommandParams, CommandResponse, Envelope};
