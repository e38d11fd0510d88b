//! Decoders for Freelancer's data container formats.
//!
//! Freelancer keeps its game world description in a handful of proprietary
//! formats, all little-endian and none self-describing:
//!
//! - INI-style configuration, either as Windows-1252 text or in the compact
//!   binary `BINI` encoding with a trailing string pool
//! - UTF ("Universal Tree Format") containers holding named byte blobs
//! - ordinary PE DLLs whose resource section carries localized strings and
//!   RDL rich text
//!
//! The decoders here map those on-disk layouts to owned, typed values and
//! nothing more. Game semantics, path resolution and caching belong to the
//! layers above.

pub mod bini;
pub mod dll;
pub mod error;
pub mod ini;
pub mod rdl;
pub mod utf;
pub mod values;

pub use error::{FlError, Result, Warning};
