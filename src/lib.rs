//! basewatch: game base health and goods alerts for Discord
//!
//! A library for polling a game server's public base-status endpoint,
//! detecting health drops and newly listed goods, and delivering alerts
//! to subscribed Discord channels.

pub mod alert;
pub mod config;
pub mod engine;
pub mod http;
pub mod monitor;
pub mod subscription;
pub mod time;
pub mod upstream;
