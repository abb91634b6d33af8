//! Character encodings of templates and rendered output.
//!
//! Three pieces cooperate here:
//!
//! - [`EncodingDetector`] sniffs the encoding of a template resource from a
//!   bounded sample of its bytes. It answers `None` rather than failing.
//! - [`EncodingTable`] turns a detection result into per-locale encodings.
//!   A detected encoding is used for every locale; an inconclusive detection
//!   falls back to the built-in locale table with UTF-8 as default.
//! - [`EncodingWriter`] re-encodes rendered UTF-8 into the template's
//!   encoding while streaming to the output sink.
//!
//! ```rust
//! use standout_views::{EmbeddedSource, EncodingDetector, EncodingOrigin, EncodingTable};
//!
//! let source = EmbeddedSource::new().with("plain.ftl", "Hello, ${name}!");
//! let detected = EncodingDetector::default().detect(&source, "plain.ftl");
//! assert_eq!(detected, None);
//!
//! let table = EncodingTable::from_detection(detected);
//! assert_eq!(table.origin(), EncodingOrigin::Fallback);
//! ```

mod detect;
mod table;
mod writer;

pub use detect::{EncodingDetector, CHUNK_SIZE, DEFAULT_SAMPLE_LIMIT};
pub use table::{EncodingOrigin, EncodingTable, BUILTIN_LOCALE_ENCODINGS};
pub use writer::EncodingWriter;
