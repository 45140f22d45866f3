//! Signal extraction and validation
//!
//! Agents mark progress inline in their output. Two forms are accepted:
//!
//! ```text
//! <signal>SPEC_READY</signal>
//! <signal type=AWAITING_INPUT>Should the cache be per-user?</signal>
//! ```
//!
//! Extraction picks the marker that starts last in the text; validation
//! looks it up in the current phase's signal table. Nothing here performs
//! I/O or keeps state, so every function is safe to call from any thread.

pub mod extract;
pub mod parse;
pub mod scanner;
pub mod validate;
pub mod vocabulary;

pub use extract::{
    extract_all_signals, extract_signal, format_signal, format_typed_signal, has_signal,
    strip_signals, ExtractedSignal,
};
pub use parse::{parse_signal, SignalResult};
pub use scanner::{Marker, MarkerForm};
pub use validate::{valid_signals, validate_signal, Validation};
pub use vocabulary::{is_common_signal, COMMON_SIGNALS};
