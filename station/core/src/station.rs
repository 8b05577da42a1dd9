//! Station Event Loop
//!
//! The [`Station`] owns the stream table and is its only mutator. Engine
//! events and operator commands arrive on two channels and are handled one at
//! a time; a handler runs to completion, file I/O included, before the next
//! message is taken. Operator commands are not polled until the host signs on.
//! An external shutdown signal is polled the same way, so it never cuts a
//! handler short.

use std::future::{self, Future};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, StationConfig};
use crate::console::OperatorCommand;
use crate::engine::HostEngine;
use crate::events::EngineEvent;
use crate::messages::{Notifier, OperatorNotice};
use crate::router::{Desync, InboundRouter};
use crate::streams::{SpoolNamer, StreamId, StreamTable};
use crate::submission::SubmissionController;

/// Fatal station errors
#[derive(Debug, Error)]
pub enum StationError {
    /// Station and engine disagree about which streams exist
    #[error("stream table out of sync with engine: {0}")]
    Desync(#[from] Desync),
}

/// Why the event loop stopped
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// `exit` or `quit`
    OperatorQuit,
    /// The operator console hung up (EOF)
    ConsoleClosed,
    /// The engine reported the host session ended
    EngineDisconnected {
        /// Reason given by the engine, if any
        reason: Option<String>,
    },
    /// The engine dropped its event channel without a word
    EngineGone,
    /// The shutdown signal passed to [`Station::run_until`] fired
    Interrupted,
}

/// Result of handling one message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep going
    Continue,
    /// Leave the loop
    Stop(StopReason),
}

/// Stream multiplexer for one host session
pub struct Station {
    table: StreamTable,
    router: InboundRouter,
    controller: SubmissionController,
    notifier: Notifier,
    host: String,
    port: u16,
    reader_stream: StreamId,
    signed_on: bool,
}

impl Station {
    /// Build a station from `config`, talking to `engine`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the configured reader
    /// stream is 0.
    pub fn new(
        config: &StationConfig,
        engine: Arc<dyn HostEngine>,
        notices: mpsc::Sender<OperatorNotice>,
    ) -> Result<Self, ConfigError> {
        let reader_stream = config.reader_stream_id()?;
        debug!(
            engine = engine.name(),
            spool_dir = ?config.spool_dir,
            reader = %reader_stream,
            "Station created"
        );
        let notifier = Notifier::new(notices);
        let router = InboundRouter::new(
            SpoolNamer::new(config.spool_dir.clone()),
            config.spool.clone(),
            Arc::clone(&engine),
            notifier.clone(),
        );
        let controller = SubmissionController::new(engine, notifier.clone());

        Ok(Self {
            table: StreamTable::new(),
            router,
            controller,
            notifier,
            host: config.host.clone(),
            port: config.port,
            reader_stream,
            signed_on: false,
        })
    }

    /// Current stream table
    #[must_use]
    pub fn table(&self) -> &StreamTable {
        &self.table
    }

    /// Whether the host has signed on
    #[must_use]
    pub fn is_signed_on(&self) -> bool {
        self.signed_on
    }

    /// Handle one engine event
    ///
    /// # Errors
    ///
    /// Returns [`StationError::Desync`] for card reader events with no record.
    pub async fn handle_event(&mut self, event: EngineEvent) -> Result<Flow, StationError> {
        debug!(event = event.kind(), "Engine event");
        match event {
            EngineEvent::Signon => {
                if self.signed_on {
                    warn!("Duplicate signon ignored");
                } else {
                    self.signed_on = true;
                    self.notifier
                        .notify(OperatorNotice::Connected {
                            host: self.host.clone(),
                            port: self.port,
                        })
                        .await;
                }
                Ok(Flow::Continue)
            }
            EngineEvent::Disconnected { reason } => {
                info!(reason = ?reason, "Host session ended");
                Ok(Flow::Stop(StopReason::EngineDisconnected { reason }))
            }
            other => {
                self.router.route(&mut self.table, other).await?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Handle one operator command
    ///
    /// Submission failures are reported to the operator and never stop the
    /// station.
    pub async fn handle_command(&mut self, command: OperatorCommand) -> Flow {
        match command {
            OperatorCommand::LoadCards { path } => {
                if let Err(e) = self
                    .controller
                    .submit(&mut self.table, self.reader_stream, path)
                    .await
                {
                    debug!(error = %e, "Submission refused");
                }
                Flow::Continue
            }
            OperatorCommand::Quit => Flow::Stop(StopReason::OperatorQuit),
            OperatorCommand::Blank => Flow::Continue,
            OperatorCommand::MissingFileName => {
                self.notifier.notify(OperatorNotice::MissingFileName).await;
                Flow::Continue
            }
            OperatorCommand::Unrecognized { verb } => {
                debug!(verb = %verb, "Unrecognized command");
                self.notifier
                    .notify(OperatorNotice::UnrecognizedCommand)
                    .await;
                Flow::Continue
            }
        }
    }

    /// Run until the operator quits or the session ends
    ///
    /// Open output segments are closed on the way out, error or not.
    ///
    /// # Errors
    ///
    /// Returns [`StationError`] if a handler fails fatally.
    pub async fn run(
        &mut self,
        events: mpsc::Receiver<EngineEvent>,
        commands: mpsc::Receiver<OperatorCommand>,
    ) -> Result<StopReason, StationError> {
        self.run_until(events, commands, future::pending()).await
    }

    /// Like [`Station::run`], also stopping with [`StopReason::Interrupted`]
    /// once `shutdown` completes
    ///
    /// `shutdown` is only observed between messages.
    ///
    /// # Errors
    ///
    /// Returns [`StationError`] if a handler fails fatally.
    pub async fn run_until(
        &mut self,
        mut events: mpsc::Receiver<EngineEvent>,
        mut commands: mpsc::Receiver<OperatorCommand>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<StopReason, StationError> {
        let result = self
            .event_loop(&mut events, &mut commands, shutdown)
            .await;
        self.shutdown().await;

        match &result {
            Ok(reason) => info!(reason = ?reason, "Station stopped"),
            Err(e) => warn!(error = %e, "Station stopped on error"),
        }
        result
    }

    async fn event_loop(
        &mut self,
        events: &mut mpsc::Receiver<EngineEvent>,
        commands: &mut mpsc::Receiver<OperatorCommand>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<StopReason, StationError> {
        tokio::pin!(shutdown);
        loop {
            let flow = tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    Flow::Stop(StopReason::Interrupted)
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await?,
                    None => Flow::Stop(StopReason::EngineGone),
                },
                command = commands.recv(), if self.signed_on => match command {
                    Some(command) => self.handle_command(command).await,
                    None => Flow::Stop(StopReason::ConsoleClosed),
                },
            };

            if let Flow::Stop(reason) = flow {
                return Ok(reason);
            }
        }
    }

    /// Close every open output segment
    pub async fn shutdown(&mut self) {
        let outputs = self.table.drain_outputs();
        if !outputs.is_empty() {
            info!(count = outputs.len(), "Closing open segments");
        }
        for (key, output) in outputs {
            self.router.close_segment(key, output).await;
        }
    }
}
