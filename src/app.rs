use crate::audio::DeviceBackend;
use crate::channel;
use crate::config::Config;
use crate::error::ControlError;
use crate::light::{LogStripBackend, StripBackend};
use crate::router::{Command, Router, Surface, TrackLibrary};
use crate::services::{AudioController, LightController};

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct App {
    router: Arc<Router>,
    line_rx: mpsc::Receiver<String>,
    socket_path: Option<PathBuf>,
}

impl App {
    pub async fn new(config: &Config, use_stdin: bool) -> Result<Self> {
        let light = LightController::new(Self::strip_backend(config)?);
        let audio = AudioController::new(
            Arc::new(DeviceBackend::new(config.output_device.clone())),
            config.period_frames,
        );
        let library = TrackLibrary::new(config.music_dir.clone(), config.alarm_dir.clone());
        let router = Router::new(Arc::new(light), Arc::new(audio), library);

        let (line_tx, line_rx) = mpsc::channel(32);
        let socket_path = if use_stdin {
            tokio::spawn(async move {
                if let Err(e) = channel::read_stdin(line_tx).await {
                    tracing::error!("Stdin reader failed: {:#}", e);
                }
            });
            None
        } else {
            let listener = channel::bind_socket(&config.socket_path)?;
            tokio::spawn(async move {
                if let Err(e) = channel::listen_socket(listener, line_tx).await {
                    tracing::error!("Command socket failed: {:#}", e);
                }
            });
            Some(config.socket_path.clone())
        };

        tracing::info!("Ready for commands");

        Ok(Self {
            router: Arc::new(router),
            line_rx,
            socket_path,
        })
    }

    fn strip_backend(config: &Config) -> Result<Arc<dyn StripBackend>> {
        match config.strip_driver.as_str() {
            "log" => Ok(Arc::new(LogStripBackend::new(config.pixel_count))),
            #[cfg(target_os = "linux")]
            "spi" => Ok(Arc::new(crate::light::SpiStripBackend::new(
                config.spi_device.clone(),
                config.pixel_count,
            ))),
            other => Err(anyhow::anyhow!("strip driver {other:?} is not available")),
        }
    }

    /// Serve commands until Ctrl+C, the timeout, or the end of input
    pub async fn run(mut self, timeout: Option<Duration>) -> Result<()> {
        let deadline = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);

        loop {
            tracing::debug!("Main loop: waiting for command");
            tokio::select! {
                line = self.line_rx.recv() => match line {
                    Some(line) => self.handle_line(&line).await,
                    None => {
                        tracing::info!("Command input closed, shutting down");
                        break;
                    }
                },
                _ = &mut deadline => {
                    tracing::info!("Timeout reached, shutting down");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        self.shutdown().await
    }

    async fn handle_line(&self, line: &str) {
        let Some((surface, payload)) = channel::split_line(line) else {
            return;
        };

        let command = match surface
            .parse::<Surface>()
            .and_then(|surface| self.router.parse(surface, payload))
        {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!("Dropping command {:?}: {}", line, e);
                return;
            }
        };
        tracing::debug!("Dispatching {:?}", command);

        if command.blocks_caller() {
            self.spawn_detached(command);
            return;
        }

        let router = self.router.clone();
        match tokio::task::spawn_blocking(move || router.dispatch(command)).await {
            Ok(Ok(())) => {}
            Ok(Err(ControlError::NotPlaying)) => {
                tracing::warn!("Ignoring {:?}: nothing is playing", line)
            }
            Ok(Err(e)) => tracing::warn!("Command {:?} failed: {}", line, e),
            Err(e) => tracing::error!("Dispatch task failed: {}", e),
        }
    }

    /// Runs on its own thread; process exit abandons a pending ramp wait
    fn spawn_detached(&self, command: Command) {
        let router = self.router.clone();
        let spawned = std::thread::Builder::new()
            .name("alarm".to_string())
            .spawn(move || {
                if let Err(e) = router.dispatch(command) {
                    tracing::warn!("Alarm failed: {}", e);
                }
            });
        if let Err(e) = spawned {
            tracing::error!("Failed to spawn alarm thread: {}", e);
        }
    }

    async fn shutdown(self) -> Result<()> {
        let router = self.router.clone();
        tokio::task::spawn_blocking(move || router.shutdown())
            .await
            .context("Shutdown task failed")?;

        if let Some(path) = &self.socket_path {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove command socket: {:?}", path))?;
        }

        tracing::info!("Bedside shutdown complete");
        Ok(())
    }
}
