//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract the
//! collaborators the engine does not own:
//! - Account equity lookup
//! - Order-intent execution
//! - Per-bar diagnostic records

pub mod execution;
pub mod diagnostics;
pub mod mocks;

// Re-export main traits and types
pub use execution::{AccountError, AccountPort, ExecutionError, ExecutionPort};
pub use diagnostics::{DiagnosticRecord, DiagnosticsError, DiagnosticsSink};
pub use mocks::{MemoryDiagnostics, RecordingVenue};
