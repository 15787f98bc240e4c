#![warn(missing_docs)]

//! Blobvault deduplication engine.
//!
//! Upload path: stream-hash (BLAKE3) → per-hash lock → catalog consult →
//! blob write (first sighting only) → catalog insert. Downloads resolve an
//! entry's content hash through the blob store; deletes drop the blob only
//! when the last referencing entry goes away.

pub mod config;
pub mod engine;
pub mod error;
pub mod locks;
pub mod sweep;

pub use config::{EngineConfig, DEFAULT_MAX_UPLOAD_BYTES};
pub use engine::DedupEngine;
pub use error::{EngineError, EngineResult};
pub use locks::HashLocks;
pub use sweep::SweepStats;
