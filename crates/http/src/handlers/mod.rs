#![allow(clippy::single_call_fn, reason = "HTTP handlers are called once from router")]

pub mod catalog;
pub mod chat;
pub mod conversations;
pub mod events;
