//! IRC client integration.
//!
//! Plain or TLS connection framed by [`codec::IrcLineCodec`], registration,
//! keepalive replies, and channel messages forwarded as [`crate::common::IrcEvent`]s.

pub mod client;
pub mod codec;
pub mod message;

pub use client::IrcClient;
