//! # fl-formats
//!
//! Read-only decoders for the proprietary container formats used by
//! Freelancer (Digital Anvil, 2003) to store configuration, text resources
//! and binary assets.
//!
//! Four independent decoders are provided:
//!
//! - [`formats::ini`]: Freelancer-style text INI, plus the facade that
//!   transparently dispatches to the binary decoder on a `BINI` magic number
//! - [`formats::bini`]: the compact binary INI encoding
//! - [`formats::utf`]: Universal Tree Format, a hierarchical container for
//!   binary assets such as icons and textures
//! - [`formats::dll`]: the resource section of Freelancer's string/infocard
//!   DLLs, combined with RDL rich-text translation from [`formats::rdl`]
//!
//! All decoders are pure functions over a byte source: nothing is written
//! back, nothing is cached globally, and a failed decode never corrupts the
//! result of an earlier one.
pub mod formats;

// Re-export the main types for convenience
pub use formats::{
    dll::{ResourceIndex, ResourceTable},
    error::{FlError, Result, Warning},
    ini::Parse,
    values::{Document, Entry, Section, Value},
};
