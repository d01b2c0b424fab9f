pub mod api;
pub mod app;
pub mod cli;
pub mod clock;
pub mod config;
pub mod mutation;
pub mod notify;
pub mod preview;
pub mod session;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use mutation::{Epoch, Mutation, OptimisticStore, Rejected, Settled};
pub use preview::{HoverScheduler, Phase};
