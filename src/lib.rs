//! # mongodb-tracing
//!
//! Tracing instrumentation for MongoDB commands.
//!
//! Every outgoing command can be wrapped in a client span carrying a redacted
//! `db.statement` attribute. Statements only ever contain the filter, sort,
//! update and pipeline parts of a command, with literal values replaced by
//! `"?"` when obfuscation is on and protocol bookkeeping keys (`lsid`,
//! `$clusterTime`, ...) removed.
//!
//! ## Features
//!
//! - **Redacted Statements**: Values are masked, structure is kept
//! - **Size Bounded**: Bulk writes report only their first element, and the
//!   text can be capped to a byte length
//! - **One Switch**: Tracing is enabled once per [`Tracer`]; a disabled tracer
//!   makes no calls into the tracing provider at all
//! - **Failure Transparent**: Masking problems only drop the attribute, and
//!   command errors reach the caller unchanged
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mongodb_tracing::prelude::*;
//!
//! // Reads OTEL_RUST_INSTRUMENTATION_MONGODB_ENABLED once
//! let tracer = Arc::new(Tracer::from_env());
//!
//! // Wrap your executor
//! let traced = executor.with_tracing(tracer);
//! let reply = traced.execute(&command).await?;
//! ```
//!
//! ## Configuration
//!
//! ```rust,ignore
//! use mongodb_tracing::{Tracer, TracingConfig};
//!
//! let config = TracingConfig::default()
//!     .with_enabled(true)
//!     .with_obfuscation(true)        // Replace values with "?" (default: true)
//!     .with_max_statement_length(1024)
//!     .with_database_name("shop");
//!
//! let tracer = Tracer::new(config);
//! ```
//!
//! ## Span Attributes
//!
//! | Attribute | Description |
//! |-----------|-------------|
//! | `db.system` | Always "mongodb" |
//! | `db.statement` | Redacted command as JSON (when it has reportable fields) |
//! | `db.duration_ms` | Command duration |
//! | `otel.status_code` | "OK" or "ERROR" |
//! | `error.message` | Error details (on failure) |

mod command;
mod config;
mod error;
mod executor;
mod provider;
mod statement;
mod tracer;

#[cfg(test)]
mod testing;

pub use command::{Command, InternalKeys, DEFAULT_INTERNAL_KEYS};
pub use config::{parse_flag, TracingConfig, ENV_ENABLED, ENV_QUERY_TEXT_MAX_LENGTH};
pub use error::{CommandError, StatementError};
pub use executor::{CommandExecutor, TracedExecutor, TracingExt};
pub use provider::{BackendSpan, SpanHandle, TracingBackend, TracingProvider, DB_STATEMENT};
pub use statement::{StatementBuilder, PLACEHOLDER, TRIM_MARKER};
pub use tracer::Tracer;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{Command, CommandExecutor, TracedExecutor, Tracer, TracingConfig, TracingExt};
}
