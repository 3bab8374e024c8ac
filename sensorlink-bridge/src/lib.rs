//! Serial display bridge for hardware sensor telemetry.
//!
//! This bridge polls a local hardware-monitoring HTTP endpoint for sensor
//! readings, reduces them to a fixed set of metrics and streams a four-line
//! text block to a serial-attached display once per cycle.
//!
//! # Wire Format
//!
//! ```text
//! CPU: 42%  TEMP:48 C
//! GPU:  7%  TEMP:41 C
//! RAM:11 GB  AVL:20 GB
//! TX:12KB/s  RX:1024KB/s
//! ```
//!
//! Each block is terminated by a single newline. All figures are truncated
//! integers and the percentage fields are right-aligned to width 3.

pub mod args;
pub mod config;
pub mod forwarder;
pub mod link;
pub mod locator;
pub mod memory;
pub mod pipeline;
pub mod source;

pub use args::BridgeArgs;
pub use config::BridgeConfig;
pub use forwarder::{CycleOutcome, CycleStats, Forwarder, compose_block};
pub use link::{ConnectionManager, DeviceHandle, LinkError, LinkState, PortOpener, SerialOpener};
pub use locator::{DeviceLocator, PortEntry, PortScanner, SystemPorts, find_device};
pub use memory::{MemoryProbe, MemoryStats, SysinfoMemory};
pub use pipeline::{MetricRules, MetricSnapshot};
pub use source::{FetchError, HttpSource, TelemetrySource, parse_body};
