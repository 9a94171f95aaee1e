//! Built-in tool implementations.
//!
//! Each sub-module implements one (or a small family of) tool(s) that
//! the agent can invoke.

pub mod ip_lookup;
pub mod tickets;
