//! Chunk acquisition from the register's RS-232 printer port.
//!
//! The engine only sees a [`ChunkSource`]: one optional text chunk per call.
//! Framing is dialect-specific — the 420 prints CR/LF-delimited lines, the
//! 520 emits segments delimited by printer escape sequences.

use crate::config::Dialect;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::Read;
use std::time::Duration;

#[async_trait]
pub trait ChunkSource: Send {
    /// Next chunk if one is ready. `Ok(None)` means the line is quiet.
    async fn next_chunk(&mut self) -> std::io::Result<Option<String>>;
}

const ESC: u8 = 0x1B;

/// Physical serial source. 8N1, no flow control; baud follows the dialect.
pub struct SerialChunkSource {
    port: Box<dyn serialport::SerialPort>,
    dialect: Dialect,
    residue: Vec<u8>,
    ready: VecDeque<String>,
}

impl SerialChunkSource {
    pub fn open(path: &str, dialect: Dialect) -> std::io::Result<Self> {
        let port = serialport::new(path, dialect.baud_rate())
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(150))
            .open()
            .map_err(|e| {
                std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    format!("Failed to open {} @ {}: {}", path, dialect.baud_rate(), e),
                )
            })?;
        log::info!("📟 Serial port {} open at {} baud", path, dialect.baud_rate());
        Ok(Self {
            port,
            dialect,
            residue: Vec::new(),
            ready: VecDeque::new(),
        })
    }

    /// Cut completed frames out of `residue`, leaving any partial tail.
    fn frame(&mut self) {
        match self.dialect {
            Dialect::D420 => {
                while let Some(pos) = self.residue.iter().position(|&b| b == b'\n' || b == b'\r') {
                    let frame: Vec<u8> = self.residue.drain(..=pos).collect();
                    let text = decode_bytes(&frame[..frame.len() - 1]);
                    if !text.trim().is_empty() {
                        self.ready.push_back(text);
                    }
                }
            }
            Dialect::D520 => {
                // Segments are ESC-delimited; the byte after ESC is the
                // printer command and carries no text. Wait for it before
                // cutting the frame.
                while let Some(pos) = self.residue.iter().position(|&b| b == ESC) {
                    if pos + 1 >= self.residue.len() {
                        break;
                    }
                    let frame: Vec<u8> = self.residue.drain(..=pos + 1).collect();
                    let text = decode_bytes(&frame[..frame.len() - 2]);
                    if !text.trim().is_empty() {
                        self.ready.push_back(text);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ChunkSource for SerialChunkSource {
    async fn next_chunk(&mut self) -> std::io::Result<Option<String>> {
        if let Some(chunk) = self.ready.pop_front() {
            return Ok(Some(chunk));
        }

        let mut buf = [0u8; 512];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(n) => {
                self.residue.extend_from_slice(&buf[..n]);
                self.frame();
                Ok(self.ready.pop_front())
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Device bytes are CP-1252-ish; anything non-ASCII is carried through as a
/// unit char so the normalizer can rewrite or drop it.
fn decode_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// In-memory source for tests and replays.
pub struct QueueSource {
    chunks: VecDeque<String>,
}

impl QueueSource {
    pub fn new(chunks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl ChunkSource for QueueSource {
    async fn next_chunk(&mut self) -> std::io::Result<Option<String>> {
        Ok(self.chunks.pop_front())
    }
}
