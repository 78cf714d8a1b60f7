//! # offload-observe
//!
//! Observability glue for `offload-core`:
//! - [`init_logger`] installs a global `tracing` subscriber (text, json or journald);
//! - [`LogReporter`] is an [`ErrorReporter`](offload_core::ErrorReporter) that turns every
//!   reported task failure into a structured log event.

mod logger;
pub use logger::*;

mod reporter;
pub use reporter::{LogReporter, message_for};
