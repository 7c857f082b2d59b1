//! Device inventory client.
//!
//! A registration form and a device table over the inventory REST backend,
//! coupled through a refresh trigger. The `devinv` binary drives them from
//! the terminal.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod form;
pub mod models;
pub mod notify;
pub mod render;
pub mod shell;
pub mod table;
