//! Engine Core - Receipt-Stream Reconstruction
//!
//! Turns the register's noisy character stream into validated transactions
//! and per-hour summary rows.
//!
//! # Architecture
//!
//! ```text
//! Serial chunk → Normalizer (scrub + dialect rewrites)
//!     ↓
//! Dispatcher (ordered pattern table, first match wins)
//!     ↓
//! Engine (event state machine: header / transaction / footer / other)
//!     ↓
//! Transaction parser (TOTAL / CASH / CHANGE / CARD / discount / PLU)
//!     ↓
//! HourlyRow (snapshot, revert, money conservation)
//!     ↓
//! Checkpointer (crash recovery) + RowWriter (per-day CSV)
//! ```

pub mod checkpoint;
pub mod dispatcher;
pub mod engine;
pub mod hourly;
pub mod normalizer;
pub mod output;
pub mod parser;

pub use checkpoint::{CheckpointError, Checkpointer};
pub use dispatcher::{ChunkClass, Dispatcher};
pub use engine::{Engine, EngineOptions, EventKind};
pub use hourly::HourlyRow;
pub use normalizer::Normalizer;
pub use output::{RawCaptureWriter, RowWriter, WriterError};
pub use parser::{parse_line, LineOp};
