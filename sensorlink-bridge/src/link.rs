//! Serial link lifecycle: discover, open, settle, send.

use crate::config::SerialConfig;
use crate::locator::{DeviceLocator, PortScanner};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Error type for serial link operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("No serial device matching '{0}'")]
    DeviceNotFound(String),
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens a device path as a writable byte stream.
pub trait PortOpener {
    type Link: AsyncWrite + Unpin;

    fn open(&self, path: &str, baud_rate: u32) -> std::io::Result<Self::Link>;
}

/// Opens real serial ports (8N1) through `tokio-serial`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialOpener;

impl PortOpener for SerialOpener {
    type Link = tokio_serial::SerialStream;

    fn open(&self, path: &str, baud_rate: u32) -> std::io::Result<Self::Link> {
        let builder = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One);

        tokio_serial::SerialStream::open(&builder).map_err(std::io::Error::from)
    }
}

/// An open link bound to one device path.
#[derive(Debug)]
pub struct DeviceHandle<L> {
    path: String,
    link: L,
    write_timeout: Duration,
}

impl<L: AsyncWrite + Unpin> DeviceHandle<L> {
    pub fn new(path: impl Into<String>, link: L, write_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            link,
            write_timeout,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Write `block` followed by a newline, then flush.
    ///
    /// A peripheral that stops draining its buffer fails the send with
    /// `TimedOut` once the write timeout passes. Never retries; a failed
    /// handle must be closed by the caller.
    pub async fn send(&mut self, block: &str) -> Result<(), LinkError> {
        let link = &mut self.link;
        let write = async {
            link.write_all(block.as_bytes()).await?;
            link.write_all(b"\n").await?;
            link.flush().await
        };

        tokio::time::timeout(self.write_timeout, write)
            .await
            .map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::TimedOut, "Serial write timeout")
            })??;
        Ok(())
    }

    /// Close the handle, releasing the device.
    pub async fn close(mut self) {
        if let Err(e) = self.link.shutdown().await {
            debug!(path = %self.path, error = %e, "Error while closing serial link");
        }
        info!(path = %self.path, "Serial link closed");
    }
}

/// Link state as seen by the forwarder.
#[derive(Debug)]
pub enum LinkState<L> {
    Disconnected,
    Connected(DeviceHandle<L>),
}

impl<L> LinkState<L> {
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkState::Connected(_))
    }

    pub fn handle(&self) -> Option<&DeviceHandle<L>> {
        match self {
            LinkState::Connected(handle) => Some(handle),
            LinkState::Disconnected => None,
        }
    }
}

/// Owns discovery and opening of the peripheral link.
pub struct ConnectionManager<S, O> {
    locator: DeviceLocator<S>,
    opener: O,
    baud_rate: u32,
    retry_delay: Duration,
    settle_delay: Duration,
    write_timeout: Duration,
}

impl<S: PortScanner, O: PortOpener> ConnectionManager<S, O> {
    pub fn new(scanner: S, opener: O, config: &SerialConfig) -> Self {
        Self {
            locator: DeviceLocator::new(scanner, config.target.clone()),
            opener,
            baud_rate: config.baud_rate,
            retry_delay: config.retry_delay(),
            settle_delay: config.settle_delay(),
            write_timeout: config.write_timeout(),
        }
    }

    pub fn locator(&self) -> &DeviceLocator<S> {
        &self.locator
    }

    /// Make a single discovery + open attempt without waiting.
    pub fn try_open(&self) -> Result<DeviceHandle<O::Link>, LinkError> {
        let path = self
            .locator
            .find_device()
            .ok_or_else(|| LinkError::DeviceNotFound(self.locator.target().to_string()))?;

        let link = self
            .opener
            .open(&path, self.baud_rate)
            .map_err(|source| LinkError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        Ok(DeviceHandle::new(path, link, self.write_timeout))
    }

    /// Block until the peripheral is found, opened and settled.
    ///
    /// Never fails; each unsuccessful attempt waits the retry delay and
    /// starts over from discovery. The handle is placed in `state` before
    /// the settle delay, so a caller dropped mid-settle still owns it.
    pub async fn connect(&self, state: &mut LinkState<O::Link>) {
        let mut waiting_logged = false;

        loop {
            match self.try_open() {
                Ok(handle) => {
                    info!(
                        path = %handle.path(),
                        baud = self.baud_rate,
                        "Connected to serial device"
                    );
                    *state = LinkState::Connected(handle);
                    tokio::time::sleep(self.settle_delay).await;
                    return;
                }
                Err(LinkError::DeviceNotFound(target)) => {
                    if !waiting_logged {
                        info!(device = %target, "Waiting for device...");
                        waiting_logged = true;
                    } else {
                        debug!(device = %target, "Device still absent");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Serial open failed; will retry");
                }
            }

            tokio::time::sleep(self.retry_delay).await;
        }
    }
}
