//! RFID tag reader
//!
//! The reader streams fixed-length ASCII frames over a serial line:
//!
//! ```text
//! STX | 4 hex manufacturer | 6 hex card id | 2 hex checksum | trailer
//! ```
//!
//! The checksum is the XOR of the five bytes encoded by the ten data
//! characters. The card id, in decimal, is the book id.

use crate::error::{Error, Result};
use crate::types::BookId;
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, info, warn};

/// Start-of-frame marker
pub const STX: u8 = 0x02;

/// STX plus ten data and two checksum characters
const MIN_FRAME_LENGTH: usize = 13;

/// One decoded tag frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagFrame {
    data: [u8; 5],
    checksum: u8,
}

fn hex_byte(pair: &[u8]) -> Result<u8> {
    std::str::from_utf8(pair)
        .ok()
        .and_then(|s| u8::from_str_radix(s, 16).ok())
        .ok_or_else(|| Error::InvalidTag(format!("not a hex byte: {:?}", pair)))
}

impl TagFrame {
    /// Decode a raw frame; trailing bytes after the checksum are ignored
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < MIN_FRAME_LENGTH {
            return Err(Error::InvalidTag(format!(
                "frame too short: {} bytes",
                raw.len()
            )));
        }
        if raw[0] != STX {
            return Err(Error::InvalidTag(format!("bad start byte {:#04x}", raw[0])));
        }

        let mut data = [0u8; 5];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = hex_byte(&raw[1 + 2 * i..3 + 2 * i])?;
        }
        let checksum = hex_byte(&raw[11..13])?;

        Ok(Self { data, checksum })
    }

    pub fn manufacturer(&self) -> u16 {
        u16::from_be_bytes([self.data[0], self.data[1]])
    }

    pub fn card_id(&self) -> u32 {
        u32::from_be_bytes([0, self.data[2], self.data[3], self.data[4]])
    }

    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Checksum matches the data bytes
    pub fn is_valid(&self) -> bool {
        self.data.iter().fold(0, |acc, b| acc ^ b) == self.checksum
    }

    pub fn book_id(&self) -> BookId {
        BookId::from(self.card_id())
    }
}

/// Source of tag reads for the poll loop
#[async_trait]
pub trait TagSource: Send {
    /// The tag currently on the reader
    ///
    /// `Ok(None)` means no (valid) tag was seen within the source's read
    /// window, which the poll loop takes as "tag removed".
    async fn read_tag(&mut self) -> Result<Option<BookId>>;
}

/// Tag reader on a serial line
///
/// Generic over the byte stream so tests can feed it from memory; on the
/// device it reads a [`SerialStream`].
pub struct SerialTagReader<R = SerialStream> {
    name: String,
    port: R,
    frame_length: usize,
    read_timeout: Duration,
    buffer: Vec<u8>,
}

impl SerialTagReader<SerialStream> {
    /// Open `device` raw at `baud_rate`, 8 data bits, no parity, one stop bit
    pub fn open(
        device: &Path,
        baud_rate: u32,
        frame_length: usize,
        read_timeout: Duration,
    ) -> Result<Self> {
        let name = device.to_string_lossy().into_owned();
        let port = tokio_serial::new(name.as_str(), baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(io::Error::from)?;

        info!("RFID reader on {} at {} baud", name, baud_rate);
        Ok(Self::from_reader(name, port, frame_length, read_timeout))
    }
}

impl<R: AsyncRead + Unpin + Send> SerialTagReader<R> {
    pub fn from_reader(
        name: impl Into<String>,
        port: R,
        frame_length: usize,
        read_timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            port,
            frame_length: frame_length.max(MIN_FRAME_LENGTH),
            read_timeout,
            buffer: Vec::with_capacity(frame_length * 2),
        }
    }

    /// Take one frame off the front of the buffer, skipping noise before STX
    fn take_frame(&mut self) -> Option<Vec<u8>> {
        match self.buffer.iter().position(|&b| b == STX) {
            Some(start) => {
                self.buffer.drain(..start);
            }
            None => {
                self.buffer.clear();
                return None;
            }
        }
        if self.buffer.len() < self.frame_length {
            return None;
        }
        Some(self.buffer.drain(..self.frame_length).collect())
    }

    async fn fill(&mut self) -> Result<bool> {
        let mut chunk = [0u8; 64];
        match timeout(self.read_timeout, self.port.read(&mut chunk)).await {
            Ok(Ok(0)) => Err(Error::InvalidTag(format!("{} reached end of stream", self.name))),
            Ok(Ok(n)) => {
                self.buffer.extend_from_slice(&chunk[..n]);
                Ok(true)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Ok(false),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> TagSource for SerialTagReader<R> {
    async fn read_tag(&mut self) -> Result<Option<BookId>> {
        loop {
            if let Some(raw) = self.take_frame() {
                return match TagFrame::parse(&raw) {
                    Ok(frame) if frame.is_valid() => Ok(Some(frame.book_id())),
                    Ok(frame) => {
                        warn!("Tag {} failed checksum", frame.card_id());
                        Ok(None)
                    }
                    Err(e) => {
                        debug!("{}", e);
                        Ok(None)
                    }
                };
            }

            if !self.fill().await? {
                // Nothing within the read window: no tag present
                self.buffer.clear();
                return Ok(None);
            }
        }
    }
}
