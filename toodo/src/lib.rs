//! `TooDo` — terminal client for the `TooDo` task service (library).

pub mod app;
pub mod auth;
pub mod config;
pub mod store;
pub mod ui;
pub mod views;
