//! RJE Station Core - Stream Multiplexing & Spool Lifecycle Manager
//!
//! This crate bridges a remote job entry (RJE) host session to the local
//! filesystem. It submits card decks to the host's card readers and persists
//! each print or punch output segment as its own timestamped spool file.
//! The byte-level host protocol lives behind the [`HostEngine`] trait; this
//! crate only sees typed events and issues typed calls.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     Operator Console (stdin)                      │
//! │                   OperatorCommand (down)  OperatorNotice (up)     │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────┼──────────────────────────────────┐
//! │                            Station                               │
//! │  ┌──────────────────┐  ┌──────┴───────┐  ┌─────────────────────┐ │
//! │  │  InboundRouter   │──│ StreamTable  │──│ SubmissionController│ │
//! │  │ (print / punch / │  │ CR / LP / CP │  │   (load_cards)      │ │
//! │  │  read-request)   │  └──────────────┘  └─────────────────────┘ │
//! │  └────────┬─────────┘         │                                   │
//! │           │            SpoolNamer ──► <spool>/LP2_20240101093000  │
//! └───────────┼──────────────────────────────────────────────────────┘
//!             │ EngineEvent (up)      HostEngine calls (down)
//! ┌───────────┴──────────────────────────────────────────────────────┐
//! │   ChannelEngine (in-process)   │   RemoteEngine (framed TCP)      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Station`]: event loop owning the stream table
//! - [`StreamTable`]: the single registry of active streams
//! - [`InboundRouter`]: applies engine events to the table and spool files
//! - [`SubmissionController`]: validates and queues card decks
//! - [`SpoolNamer`]: `<ROLE><id>_<YYYYmmddHHMMSS>` spool paths
//! - [`EngineEvent`] / [`HostEngine`]: the protocol engine boundary
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use rje_station_core::{ChannelEngine, Station, StationConfig};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StationConfig::default();
//!     let (engine, events, _host) = ChannelEngine::new_pair(config.event_capacity);
//!     let (notice_tx, _notices) = mpsc::channel(config.event_capacity);
//!     let (_command_tx, commands) = mpsc::channel(config.event_capacity);
//!
//!     let mut station = Station::new(&config, Arc::new(engine), notice_tx)?;
//!     station.run(events, commands).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`streams`]: stream keys, the stream table and spool naming
//! - [`router`]: inbound record routing
//! - [`submission`]: outbound deck submission
//! - [`engine`]: host engine trait, in-process and TCP engines, frame codec
//! - [`events`]: events from the engine to the station
//! - [`messages`]: notices from the station to the operator
//! - [`console`]: operator command parsing
//! - [`station`]: the event loop
//! - [`config`]: TOML, environment and CLI configuration

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod console;
pub mod engine;
pub mod events;
pub mod messages;
pub mod router;
pub mod station;
pub mod streams;
pub mod submission;

// Re-exports for convenience
pub use console::OperatorCommand;
pub use engine::{
    ChannelEngine, ChannelHost, EngineCall, EngineCommand, EngineError, HostEngine, InputSource,
    RemoteEngine,
};
pub use events::EngineEvent;
pub use messages::{NotifyLevel, Notifier, OperatorNotice};
pub use router::{Desync, InboundRouter, SpoolCreateError, SpoolPolicy};
pub use station::{Flow, Station, StationError, StopReason};
pub use streams::{
    InputState, InputStream, OutputStream, ReaderState, Role, SpoolNamer, StreamId, StreamKey,
    StreamRecord, StreamTable,
};
pub use submission::{SubmissionController, SubmitError};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, load_required_config,
    ConfigError, ConfigOverrides, ConfigSource, StationConfig, StationToml,
};
