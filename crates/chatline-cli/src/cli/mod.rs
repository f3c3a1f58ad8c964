pub mod config;
pub mod fixture;
pub mod replay;

pub use config::CliConfig;
pub use fixture::{Fixture, FixtureSession};
pub use replay::{replay, summarize_event, ReplayReport};
