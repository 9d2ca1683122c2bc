//! Chat gateway for parley-rs.
//!
//! Turns chat events into log entries, questions and spend reports:
//!
//! - [`commands`]: the slash-command grammar and the usage replies.
//! - [`dispatch`]: [`Dispatcher`], which routes one [`ChatEvent`] to the
//!   application context and produces the [`Reply`] (if any).
//! - [`event`]: the line-delimited JSON wire types.
//! - [`config`]: TOML file, CLI overrides and the API key variable.

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod event;

pub use commands::{Command, CommandError};
pub use config::{API_KEY_ENV, Overrides, load_config};
pub use dispatch::{Dispatcher, PROVIDER_FAILURE_REPLY};
pub use event::{ChatEvent, Reply};
