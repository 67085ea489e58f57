//! Alert layer: turning change events into delivered messages.
//!
//! This module provides:
//! - Deterministic rendering of events ([`AlertRenderer`], [`Alert`])
//! - The per-channel delivery abstraction ([`AlertSender`], [`DeliveryError`])
//! - Discord REST delivery ([`DiscordSender`]) and a dry-run sender ([`LogSender`])
//! - Fan-out with per-channel failure isolation ([`Dispatcher`], [`DispatchReport`])

mod dispatcher;
mod render;
mod sender;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use render::{
    Alert, AlertField, AlertRenderer, FOOTER, HEALTH_COLOR, ITEMS_COLOR, RenderError,
};
pub use sender::{AlertSender, DeliveryError, DiscordSender, LogSender};
