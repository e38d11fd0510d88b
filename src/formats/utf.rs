//! Decoder for Universal Tree Format (UTF), the hierarchical binary
//! container Digital Anvil used for assets like textures and icons.
//!
//! A UTF file has a 56-byte header, a table of fixed-size tree entries, a
//! NUL-delimited name dictionary and a shared data segment. Each entry
//! names itself through a dictionary offset and points either at child
//! entries or at a span of the data segment. This decoder performs a flat
//! walk over the entry table (sibling/child links are not followed) and
//! yields one `(name, payload)` pair per data entry. Reconstructing the
//! hierarchy, when it matters, is left to the caller.
//!
//! Reference: <https://wiki.librelancer.net/utf:universal_tree_format>

use std::collections::HashMap;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use log::debug;

use super::error::{FlError, Result};

const FORMAT: &str = "UTF";

/// Entry-type flag for a data (leaf) node. Directory nodes carry 0x80
/// instead and contribute no payload.
pub const TYPE_DATA: u32 = 0x10;

const HEADER_SIZE: usize = 56;
const ENTRY_SIZE: usize = 44;

/// One leaf of the asset tree: a dictionary name and its payload bytes,
/// copied out of the source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub data: Vec<u8>,
}

/// The fixed file header.
#[derive(Debug, Clone, Copy)]
struct Header {
    tree_offset: u32,
    tree_size: u32,
    entry_size: u32,
    names_offset: u32,
    names_used_size: u32,
    data_start_offset: u32,
}

impl Header {
    fn read(data: &[u8]) -> Result<Header> {
        let raw = data
            .get(..HEADER_SIZE)
            .ok_or_else(|| truncated("header (56 bytes expected)"))?;
        // Fields not listed are the signature, version, an allocation size
        // and the filetime, none of which the walk needs.
        Ok(Header {
            tree_offset: LittleEndian::read_u32(&raw[8..12]),
            tree_size: LittleEndian::read_u32(&raw[12..16]),
            entry_size: LittleEndian::read_u32(&raw[20..24]),
            names_offset: LittleEndian::read_u32(&raw[24..28]),
            names_used_size: LittleEndian::read_u32(&raw[32..36]),
            data_start_offset: LittleEndian::read_u32(&raw[36..40]),
        })
    }
}

/// Reads the UTF container at `path`. See [`parse`].
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Entry>> {
    let data = std::fs::read(path.as_ref())?;
    parse(&data)
}

/// Decodes a UTF byte buffer into its data entries, in table order.
///
/// Directory entries contribute names to the dictionary but no payload;
/// duplicate names across the tree stay distinct entries.
pub fn parse(data: &[u8]) -> Result<Vec<Entry>> {
    let header = Header::read(data)?;
    if header.entry_size == 0 {
        return Err(truncated("zero entry size"));
    }
    let entry_count = header.tree_size / header.entry_size;

    let names = read_name_dictionary(data, &header)?;
    debug!(
        "UTF tree: {} entries, {} dictionary names",
        entry_count,
        names.len()
    );

    let mut entries = Vec::new();
    for index in 0..entry_count {
        let offset = header.tree_offset as usize + (index * header.entry_size) as usize;
        let raw = data
            .get(offset..offset + ENTRY_SIZE)
            .ok_or_else(|| truncated("tree entry out of range"))?;

        let name_offset = LittleEndian::read_u32(&raw[4..8]);
        let entry_type = LittleEndian::read_u32(&raw[8..12]);
        let child_or_data_offset = LittleEndian::read_u32(&raw[16..20]);
        let used_size = LittleEndian::read_u32(&raw[24..28]);

        let name = names.get(&name_offset).ok_or_else(|| {
            truncated(&format!("name dictionary offset {} unmapped", name_offset))
        })?;

        if entry_type & TYPE_DATA == 0 {
            continue;
        }

        let start = header.data_start_offset as usize + child_or_data_offset as usize;
        let payload = data
            .get(start..start + used_size as usize)
            .ok_or_else(|| truncated(&format!("data span for '{}' out of range", name)))?;
        entries.push(Entry {
            name: name.clone(),
            data: payload.to_vec(),
        });
    }
    Ok(entries)
}

/// Returns the payload of the first data entry named `name`.
///
/// # Errors
/// `EntryNotFound` if no data entry carries that name.
pub fn extract(data: &[u8], name: &str) -> Result<Vec<u8>> {
    parse(data)?
        .into_iter()
        .find(|entry| entry.name == name)
        .map(|entry| entry.data)
        .ok_or_else(|| FlError::EntryNotFound(name.to_string()))
}

/// File-path variant of [`extract`].
pub fn extract_file(path: impl AsRef<Path>, name: &str) -> Result<Vec<u8>> {
    let data = std::fs::read(path.as_ref())?;
    extract(&data, name)
}

/// Maps each dictionary string's starting byte offset to its ASCII name.
fn read_name_dictionary(data: &[u8], header: &Header) -> Result<HashMap<u32, String>> {
    let start = header.names_offset as usize;
    let end = start + header.names_used_size as usize;
    let raw = data
        .get(start..end)
        .ok_or_else(|| truncated("name dictionary out of range"))?;

    let mut names = HashMap::new();
    let mut offset = 0u32;
    for chunk in raw.split(|&b| b == 0) {
        if !chunk.is_ascii() {
            return Err(truncated("non-ASCII name in dictionary"));
        }
        names.insert(offset, String::from_utf8_lossy(chunk).into_owned());
        offset += chunk.len() as u32 + 1;
    }
    Ok(names)
}

fn truncated(reason: &str) -> FlError {
    FlError::InvalidFormat {
        format: FORMAT,
        reason: reason.to_string(),
    }
}
