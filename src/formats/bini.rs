//! Decoder for Freelancer's "BINI" (binary INI) format.
//!
//! A BINI file is the compiled form of a text INI: a 12-byte header, a run
//! of section/entry/value records, and a trailing pool of NUL-terminated
//! strings that stretches to end-of-file. Records never embed strings;
//! they carry 16-bit pointers holding a string's **starting byte offset
//! within the pool**. The same offset scheme is used for typed values with
//! tag 3, so the pool must stay offset-keyed rather than name-keyed.
//!
//! Format documentation by Bas Westerbaan:
//! <http://blog.w-nz.com/uploads/bini.pdf>

use std::collections::HashMap;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use encoding_rs::WINDOWS_1252;
use log::{debug, trace};

use super::error::{FlError, Result};
use super::values::{Document, Section, Value};

/// Magic number opening every BINI file.
pub const MAGIC: &[u8; 4] = b"BINI";

const FORMAT: &str = "BINI";

/// The only version ever shipped.
const VERSION: u32 = 1;

/// Value type tags. 1 = i32, 2 = f32, 3 = string-table pointer.
const TYPE_INT: i8 = 1;
const TYPE_FLOAT: i8 = 2;
const TYPE_STRING: i8 = 3;

/// Reads the BINI file at `path`. See [`parse`].
pub fn parse_file(path: impl AsRef<Path>) -> Result<Document> {
    let data = std::fs::read(path.as_ref())?;
    parse(&data)
}

/// Decodes a BINI byte buffer into an unfolded [`Document`].
///
/// # Errors
/// Returns an error if:
/// - The magic number or version check fails
/// - Any structure is truncated
/// - A string pointer does not land on a pooled string
/// - A value carries an unknown type tag (fatal: the record stream has no
///   safe resynchronization point past an unrecognized value)
pub fn parse(data: &[u8]) -> Result<Document> {
    let header = data
        .get(..12)
        .ok_or_else(|| truncated("header (12 bytes expected)"))?;
    if &header[..4] != MAGIC {
        return Err(FlError::InvalidFormat {
            format: FORMAT,
            reason: "bad magic number".to_string(),
        });
    }
    let version = LittleEndian::read_u32(&header[4..8]);
    if version != VERSION {
        return Err(FlError::UnsupportedVersion {
            format: FORMAT,
            version,
        });
    }

    let table_offset = LittleEndian::read_u32(&header[8..12]) as usize;
    if table_offset < 12 || table_offset > data.len() {
        return Err(truncated("string table offset out of range"));
    }

    let string_table = read_string_table(&data[table_offset..]);
    debug!(
        "BINI string table: {} strings in {} bytes",
        string_table.len(),
        data.len() - table_offset
    );

    let mut document = Document::default();
    let mut cursor = Cursor {
        data: &data[..table_offset],
        pos: 12,
    };

    // Section records run from the end of the header to the string table.
    while cursor.pos < table_offset {
        let section_name_ptr = cursor.read_i16()?;
        let entry_count = cursor.read_i16()?;
        let mut section = Section::new(resolve(&string_table, section_name_ptr)?);
        trace!("section [{}]: {} entries", section.name, entry_count);

        for _ in 0..entry_count.max(0) {
            let entry_name_ptr = cursor.read_i16()?;
            let value_count = cursor.read_i8()?;
            let entry_name = resolve(&string_table, entry_name_ptr)?;

            let mut values = Vec::with_capacity(value_count.max(0) as usize);
            for _ in 0..value_count.max(0) {
                values.push(read_value(&mut cursor, &string_table)?);
            }

            // A valueless entry is dropped, matching the game's reader.
            match values.len() {
                0 => continue,
                1 => section.push(&entry_name, values.remove(0)),
                _ => section.push(&entry_name, Value::Tuple(values)),
            }
        }
        document.sections.push(section);
    }

    Ok(document)
}

/// Splits the trailing string pool on NUL and maps each string's starting
/// byte offset (relative to the pool) to its decoded, lower-cased text.
///
/// The final byte is the last string's terminator and is dropped before
/// splitting so it does not yield a phantom empty string.
fn read_string_table(raw: &[u8]) -> HashMap<u32, String> {
    let raw = match raw.split_last() {
        Some((0, rest)) => rest,
        _ => raw,
    };

    let mut table = HashMap::new();
    let mut offset = 0u32;
    for chunk in raw.split(|&b| b == 0) {
        let (decoded, _, _) = WINDOWS_1252.decode(chunk);
        table.insert(offset, decoded.to_lowercase());
        offset += chunk.len() as u32 + 1;
    }
    table
}

fn resolve(table: &HashMap<u32, String>, ptr: i16) -> Result<String> {
    let offset = u32::try_from(ptr).map_err(|_| FlError::DanglingPointer {
        offset: ptr as u32,
    })?;
    table
        .get(&offset)
        .cloned()
        .ok_or(FlError::DanglingPointer { offset })
}

fn read_value(cursor: &mut Cursor<'_>, table: &HashMap<u32, String>) -> Result<Value> {
    let type_tag = cursor.read_i8()?;
    let raw = cursor.read_u32()?;
    match type_tag {
        TYPE_INT => Ok(Value::Int(raw as i32)),
        TYPE_FLOAT => Ok(Value::Float(f32::from_bits(raw))),
        TYPE_STRING => {
            // The numeric payload is a byte offset into the string pool,
            // not a literal number.
            let text = table
                .get(&raw)
                .cloned()
                .ok_or(FlError::DanglingPointer { offset: raw })?;
            Ok(Value::Str(text))
        }
        other => Err(FlError::InvalidFormat {
            format: FORMAT,
            reason: format!("unknown value type tag: {}", other),
        }),
    }
}

/// Bounds-checked little-endian reads over the record region.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let slice = self
            .data
            .get(self.pos..self.pos + n)
            .ok_or_else(|| truncated("record region ends mid-structure"))?;
        self.pos += n;
        Ok(slice)
    }

    fn read_i16(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }
}

fn truncated(reason: &str) -> FlError {
    FlError::InvalidFormat {
        format: FORMAT,
        reason: reason.to_string(),
    }
}
