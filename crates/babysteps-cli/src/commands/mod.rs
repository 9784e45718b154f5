//! CLI subcommand implementations.

pub mod events;
pub mod invite;
pub mod log;
pub mod outbox;
pub mod profile;
pub mod quick;
pub mod remove;
pub mod reset;
pub mod stats;
pub mod status;
pub mod timer;
pub mod transfer;
pub mod util;
