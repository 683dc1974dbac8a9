//! OpenRover service daemon support: configuration loading and the dry-run
//! hardware bridge used when no PWM hat is attached. The `roverd` binary
//! wires these around [`openrover_runtime::Session`].

pub mod bridge;
pub mod config;

pub use bridge::DryRunBridge;
pub use config::RoverConfig;
