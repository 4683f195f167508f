//! The host bridge loop.
//!
//! [`Host`] turns decoded [`HostMessage`]s into [`HostReply`]s. [`run`]
//! drives it over any line-oriented reader and writer; the binary wires it
//! to stdin and stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use xpstream_core::config::{self, ConfigError, ConfigSnapshot, Settings};
use xpstream_core::service::RewardService;

use crate::command::{self, Command, CommandContext};
use crate::directory::PlayerDirectory;
use crate::error::EngineError;
use crate::protocol::{HostMessage, HostReply};

/// Read raw settings from `path`, or defaults when the file is missing.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    if path.exists() {
        Settings::from_file(path)
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        Settings::parse("")
    }
}

/// Read and validate the config at `path`, or defaults when it is missing.
pub fn load_config(path: &Path) -> Result<ConfigSnapshot, ConfigError> {
    if path.exists() {
        config::load_snapshot(path)
    } else {
        load_settings(path).map(|settings| ConfigSnapshot::from_settings(&settings))
    }
}

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// The host asked to shut down.
    Stop,
}

/// Per-connection state of the bridge.
#[derive(Debug)]
pub struct Host {
    service: Arc<RewardService>,
    directory: PlayerDirectory,
    config_path: PathBuf,
}

impl Host {
    /// Bridge `service`, reloading from `config_path` on request.
    pub fn new(service: Arc<RewardService>, config_path: PathBuf) -> Self {
        Self {
            service,
            directory: PlayerDirectory::new(),
            config_path,
        }
    }

    /// Decode and handle one line.
    pub fn handle_line(&mut self, line: &str) -> (Vec<HostReply>, Flow) {
        match serde_json::from_str::<HostMessage>(line) {
            Ok(message) => self.handle(message),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed host message");
                (
                    vec![HostReply::Error {
                        message: format!("malformed message: {e}"),
                    }],
                    Flow::Continue,
                )
            }
        }
    }

    /// Handle one decoded message.
    pub fn handle(&mut self, message: HostMessage) -> (Vec<HostReply>, Flow) {
        match message {
            HostMessage::Spawn { event, candidates } => {
                self.directory.observe(&candidates);
                let decision = self.service.process(&event, &candidates);
                debug!(outcome = ?decision.outcome, world = event.world.as_str(), "Spawn processed");
                (vec![HostReply::Decision { decision }], Flow::Continue)
            }
            HostMessage::Presence { players } => {
                self.directory.set_online(&players);
                (Vec::new(), Flow::Continue)
            }
            HostMessage::Command { sender, args } => {
                let ctx = CommandContext {
                    service: &self.service,
                    directory: &self.directory,
                    config_path: &self.config_path,
                };
                let lines = command::execute(&Command::parse(&args), &sender, &ctx);
                (
                    vec![HostReply::Messages {
                        recipient: sender.id,
                        lines,
                    }],
                    Flow::Continue,
                )
            }
            HostMessage::Complete { sender, args } => {
                let options = command::complete(&args, &sender, &self.directory);
                (vec![HostReply::Completions { options }], Flow::Continue)
            }
            HostMessage::Shutdown => {
                info!("Host requested shutdown");
                (Vec::new(), Flow::Stop)
            }
        }
    }
}

/// Serve `host` until `input` ends or a shutdown message arrives.
///
/// Every reply is written as one JSON line and flushed before the next
/// input line is read.
pub async fn run<R, W>(host: &mut Host, input: R, mut output: W) -> Result<(), EngineError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let (replies, flow) = host.handle_line(&line);
        for reply in &replies {
            let mut encoded = serde_json::to_vec(reply)?;
            encoded.push(b'\n');
            output.write_all(&encoded).await?;
        }
        output.flush().await?;
        if flow == Flow::Stop {
            return Ok(());
        }
    }
    info!("Host input closed");
    Ok(())
}
