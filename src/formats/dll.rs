//! Reader for the resource section of Freelancer's string/infocard DLLs.
//!
//! The game ships localized text as ordinary PE DLLs whose `.rsrc` section
//! holds string tables (short names) and "HTML" resources (RDL-encoded
//! infocards). References in the INIs (`ids_name`, `ids_info`) use
//! *external ids*: `dll_index * 65536 + internal_id`, where `dll_index` is
//! the DLL's position in the `[Resources]` list of `freelancer.ini`. This
//! module never computes that ordering itself; callers supply either the
//! per-file offset ([`parse`]) or the ordered path list ([`ResourceIndex`]).
//!
//! The resource directory is walked exactly the way the game's own data
//! lays it out: numeric ids only, never named entries.
//!
//! Format reference: <https://docs.microsoft.com/en-gb/windows/win32/debug/pe-format>

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use encoding_rs::UTF_16LE;
use log::{debug, info, trace};

use super::error::{FlError, Result};
use super::rdl;

const FORMAT: &str = "PE";

/// Resource type tags interpreted by this reader.
/// <https://docs.microsoft.com/en-us/windows/win32/menurc/resource-types>
const RT_STRING: u32 = 0x06;
const RT_VERSION: u32 = 0x10; // version information - ignored
const RT_HTML: u32 = 0x17; // in Freelancer, XML-encoded rich text

/// String resources come in blocks of sixteen slots.
const STRINGS_PER_TABLE: u32 = 16;

/// External id → decoded text, for one resource container.
pub type ResourceTable = HashMap<u32, String>;

/// Reads the DLL at `path` into a [`ResourceTable`]. See [`parse`].
pub fn parse_file(path: impl AsRef<Path>, external_id_offset: u32) -> Result<ResourceTable> {
    let data = std::fs::read(path.as_ref())?;
    parse(&data, external_id_offset)
}

/// Decodes the `.rsrc` section of a PE image into a mapping of external
/// ids to string/rich-text resources.
///
/// # Errors
/// Returns an error if:
/// - The PE signature is missing or any structure is truncated
/// - The image has no `.rsrc` section
/// - A resource type other than string, HTML or version-info appears (its
///   leaf layout is unknown, so the directory cannot be skipped safely)
pub fn parse(data: &[u8], external_id_offset: u32) -> Result<ResourceTable> {
    // The dword at 0x3C points at the PE signature.
    let signature_offset = read_u32(data, 0x3C)? as usize;
    if data.get(signature_offset..signature_offset + 4) != Some(b"PE\0\0") {
        return Err(invalid("missing PE signature"));
    }

    // COFF header follows the signature; we need the section count and the
    // optional header size so we can skip to the section table.
    let coff_offset = signature_offset + 4;
    let section_count = read_u16(data, coff_offset + 2)?;
    let optional_header_size = read_u16(data, coff_offset + 16)? as usize;

    let rsrc_offset = find_rsrc(data, coff_offset + 20 + optional_header_size, section_count)?;
    debug!(".rsrc section at file offset {:#x}", rsrc_offset);

    // Root directory: resource type -> subdirectory offset. Only the
    // trailing id-entry count matters; these DLLs never use named entries.
    let types = read_directory_entries(data, rsrc_offset)?;

    // Second level: per-type tables mapping resource name ids to leaves.
    let mut resources = ResourceTable::new();
    for (resource_type, table_offset) in types {
        let leaves = read_directory_entries(data, rsrc_offset + table_offset as usize)?;
        for (name, descriptor_offset) in leaves {
            read_leaf(
                data,
                rsrc_offset,
                resource_type,
                name,
                descriptor_offset as usize,
                external_id_offset,
                &mut resources,
            )?;
        }
    }
    Ok(resources)
}

/// Scans the section table for `.rsrc` and returns its raw-data offset.
fn find_rsrc(data: &[u8], table_offset: usize, section_count: u16) -> Result<usize> {
    for i in 0..section_count as usize {
        let offset = table_offset + i * 40;
        let name = data
            .get(offset..offset + 8)
            .ok_or_else(|| invalid("section table out of range"))?;
        // Section names are NUL-padded to eight bytes.
        let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        if &name[..end] == b".rsrc" {
            return Ok(read_u32(data, offset + 20)? as usize);
        }
    }
    Err(FlError::SectionNotFound(".rsrc"))
}

/// Reads a resource directory table at `offset` and returns its id
/// entries as `(id, offset)` pairs, keeping only the low 31 bits of each
/// offset (the high bit flags "subdirectory" vs "leaf").
fn read_directory_entries(data: &[u8], offset: usize) -> Result<Vec<(u32, u32)>> {
    // Table header: characteristics, timestamp, version, all ignored.
    let id_entry_count = read_u16(data, offset + 14)?;
    let mut entries = Vec::with_capacity(id_entry_count as usize);
    for i in 0..id_entry_count as usize {
        let entry_offset = offset + 16 + i * 8;
        let id = read_u32(data, entry_offset)?;
        let target = read_u32(data, entry_offset + 4)? & 0x7FFF_FFFF;
        entries.push((id, target));
    }
    Ok(entries)
}

/// Decodes one resource leaf into `resources`.
///
/// The descriptor at `descriptor_offset` is laid out like a section
/// header; its raw-data pointer (relative to `.rsrc`) locates the 16-byte
/// resource data entry, whose RVA field addresses the payload in this
/// format variant.
fn read_leaf(
    data: &[u8],
    rsrc_offset: usize,
    resource_type: u32,
    name: u32,
    descriptor_offset: usize,
    external_id_offset: u32,
    resources: &mut ResourceTable,
) -> Result<()> {
    let raw_data_pointer = read_u32(data, rsrc_offset + descriptor_offset + 20)? as usize;

    let data_entry_offset = rsrc_offset + raw_data_pointer;
    let payload_offset = read_u32(data, data_entry_offset)? as usize;
    let payload_size = read_u32(data, data_entry_offset + 4)? as usize;

    match resource_type {
        RT_STRING => {
            // A string table holds up to sixteen length-prefixed UTF-16LE
            // strings; the block id carried by `name` is 1-based.
            let block = name
                .checked_sub(1)
                .ok_or_else(|| invalid("string table block id 0"))?;
            let mut cursor = payload_offset;
            for slot in 0..STRINGS_PER_TABLE {
                let length = read_u16(data, cursor)? as usize;
                cursor += 2;
                if length == 0 {
                    continue;
                }
                let raw = data
                    .get(cursor..cursor + length * 2)
                    .ok_or_else(|| invalid("string resource out of range"))?;
                cursor += length * 2;
                let id = block * STRINGS_PER_TABLE + slot + external_id_offset;
                let (text, _, _) = UTF_16LE.decode(raw);
                trace!("string resource {}: {} UTF-16 units", id, length);
                resources.insert(id, text.into_owned());
            }
        }
        RT_HTML => {
            let raw = data
                .get(payload_offset..payload_offset + payload_size)
                .ok_or_else(|| invalid("HTML resource out of range"))?;
            let (text, _, _) = UTF_16LE.decode(raw);
            resources.insert(name + external_id_offset, text.into_owned());
        }
        RT_VERSION => {}
        other => return Err(FlError::UnsupportedResourceType(other)),
    }
    Ok(())
}

/// Lazily-loaded view over an ordered list of resource DLLs.
///
/// The ordering comes from `freelancer.ini`'s `[Resources]` section and is
/// supplied by the caller; a DLL's position determines the external id
/// offset of everything inside it. Tables are parsed on first touch and
/// kept for the lifetime of the index.
#[derive(Debug, Default)]
pub struct ResourceIndex {
    paths: Vec<PathBuf>,
    loaded: HashMap<usize, ResourceTable>,
}

impl ResourceIndex {
    pub fn new(paths: Vec<PathBuf>) -> ResourceIndex {
        ResourceIndex {
            paths,
            loaded: HashMap::new(),
        }
    }

    /// Looks up the text for a resource id.
    ///
    /// An id whose DLL index falls outside the supplied list, or which is
    /// absent from its DLL's table, resolves to `""`, matching how the game
    /// treats objects whose infocards don't exist.
    ///
    /// # Errors
    /// Only I/O or format errors from loading a not-yet-seen DLL.
    pub fn lookup(&mut self, resource_id: u32) -> Result<String> {
        let dll_index = (resource_id / 65536) as usize;
        if dll_index >= self.paths.len() {
            return Ok(String::new());
        }

        if !self.loaded.contains_key(&dll_index) {
            let path = &self.paths[dll_index];
            info!("Loading resource DLL {}: {}", dll_index, path.display());
            let table = parse_file(path, (dll_index as u32) * 65536)?;
            self.loaded.insert(dll_index, table);
        }

        Ok(self.loaded[&dll_index]
            .get(&resource_id)
            .cloned()
            .unwrap_or_default())
    }

    /// Looks up a resource id and translates RDL markup to HTML.
    pub fn lookup_html(&mut self, resource_id: u32) -> Result<String> {
        Ok(rdl::to_html(&self.lookup(resource_id)?))
    }

    /// Looks up a resource id and strips all RDL markup, replacing
    /// paragraph breaks with newlines. Missing ids stay `""` without
    /// touching the markup parser.
    pub fn lookup_plain(&mut self, resource_id: u32) -> Result<String> {
        let text = self.lookup(resource_id)?;
        if text.is_empty() {
            return Ok(text);
        }
        rdl::to_plaintext(&text)
    }
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(LittleEndian::read_u32)
        .ok_or_else(|| invalid("structure out of range"))
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    data.get(offset..offset + 2)
        .map(LittleEndian::read_u16)
        .ok_or_else(|| invalid("structure out of range"))
}

fn invalid(reason: &str) -> FlError {
    FlError::InvalidFormat {
        format: FORMAT,
        reason: reason.to_string(),
    }
}
