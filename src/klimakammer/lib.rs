//! # Klimakammer Architecture
//!
//! Klimakammer logs temperature and humidity from a serial sensor and asks a
//! language model for building climate advice based on what it logged. The
//! binary is one client of this library; the library itself never touches the
//! terminal.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, runs the interactive menu              │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Owns store, clock, prompts, inference and registry       │
//! │  - Returns structured Result types                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Acquisition, advisory and store views                    │
//! │  - Operates on Rust types, returns Rust types               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - Abstract DataStore trait                                 │
//! │  - FileStore (production), InMemoryStore (testing)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Beside the layers sit the ports to the outside world, each a trait with a
//! production adapter and a test double: [`serial::Connector`] for the sensor,
//! [`inference::InferenceClient`] for the model, [`registry::BuildingRegistry`]
//! for building data and [`clock::Clock`] for time.
//!
//! ## Data Directory
//!
//! The daily CSV logs are the record of truth. The current snapshot, the
//! rolling window and the latest analysis pointer are caches refreshed on
//! every write and rebuilt by `doctor`. See [`store`] for the layout.
//!
//! ## No I/O Assumptions in Core
//!
//! From `api.rs` inward, code:
//! - Takes regular Rust function arguments
//! - Returns regular Rust types (`Result<CmdResult>`)
//! - **Never** writes to stdout/stderr
//! - **Never** calls `std::process::exit`
//!
//! Diagnostics go through the `log` facade; the binary decides where they end
//! up.
//!
//! ## Testing Strategy
//!
//! 1. **Commands**: unit tests against `InMemoryStore`, scripted serial
//!    connectors and scripted inference.
//! 2. **Store**: `FileStore` tests in temp directories.
//! 3. **CLI**: `tests/` drives the binary with `assert_cmd` against a temp
//!    `KLIMA_HOME`.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade and the advisory session
//! - [`commands`]: Business logic for each command
//! - [`acquisition`]: The serial logging loop and its reconnect state machine
//! - [`store`]: Storage abstraction and implementations
//! - [`model`]: Readings, analysis records and kinds
//! - [`serial`]: Line parsing and the serial port adapter
//! - [`inference`]: Chat completion client
//! - [`registry`]: Building registry lookup and code tables
//! - [`prompt`]: Prompt templates
//! - [`stats`]: Min/max/mean over readings
//! - [`config`]: Configuration and secrets
//! - [`init`]: Builds a ready-to-use API from a data directory
//! - [`error`]: Error types
//! - `cli`: Argument parsing, printing and the interactive menu for the binary (not part of the lib API)

pub mod acquisition;
pub mod api;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod inference;
pub mod init;
pub mod model;
pub mod prompt;
pub mod registry;
pub mod serial;
pub mod stats;
pub mod store;
