//! # Scanweave Import
//!
//! Grammar-agnostic parsing of reconnaissance artifacts.
//!
//! Raw bytes are normalized into a navigable tree (markup elements, object
//! values or delimited rows), candidate host records are located through the
//! definition's root path, and each record runs through the field-mapping
//! interpreter and the skip/classification rules.
//!
//! ```ignore
//! use scanweave_import::{interpret, normalize, nmap_definition, TreeLimits};
//!
//! let definition = nmap_definition();
//! let document = normalize(bytes, definition.grammar, &definition.delimited, &TreeLimits::default())?;
//! for outcome in interpret(&document, &definition) {
//!     // persist accepted records
//! }
//! ```

pub mod builtin;
pub mod delimited;
pub mod error;
pub mod interpreter;
pub mod limits;
pub mod mapping;
pub mod markup;
pub mod navigator;
pub mod rules;
pub mod sniff;
pub mod tree;

pub use builtin::{is_legacy_markup, nmap_definition, BUILTIN_NMAP_ID};
pub use delimited::{DelimitedRow, DelimitedTable};
pub use error::NormalizeError;
pub use interpreter::{interpret, RecordOutcome};
pub use limits::TreeLimits;
pub use mapping::{ExtractedRecord, TraceSequence};
pub use markup::XmlElement;
pub use navigator::{Navigable, SourcePath};
pub use sniff::detect_grammar;
pub use tree::{normalize, Document};
