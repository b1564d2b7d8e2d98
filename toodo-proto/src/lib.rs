//! Shared domain and wire definitions for the `TooDo` client.

pub mod gateway;
pub mod task;
pub mod user;
