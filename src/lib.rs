pub mod commands;
pub mod config;
pub mod consent;
pub mod data;
pub mod handlers;
pub mod health;
pub mod logging;

pub const BOT_NAME: &str = "drew_bot";
pub const COMMAND_TARGET: &str = "drew_bot::command";
pub const ERROR_TARGET: &str = "drew_bot::error";
pub const EVENT_TARGET: &str = "drew_bot::handlers";
pub const HEALTH_TARGET: &str = "drew_bot::health";
pub const CONSENT_TARGET: &str = "drew_bot::consent";
pub const CONSOLE_TARGET: &str = "drew_bot";

pub use data::{Data, DataInner};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
