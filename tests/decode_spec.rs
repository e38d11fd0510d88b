//! End-to-end decoding tests over synthetic, hand-assembled fixtures.
//!
//! Every fixture is built in memory byte by byte, so the tests double as
//! executable documentation of the on-disk layouts.

use std::io::Write;

use fl_formats::formats::{bini, dll, ini, utf};
use fl_formats::{Entry, FlError, ResourceIndex, Value};

fn push_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

// ---------------------------------------------------------------- BINI --

/// A minimal BINI: one `[system]` section, one `nickname = li01` entry.
/// String pool: `system\0nickname\0li01\0` (offsets 0, 7, 16).
fn minimal_bini() -> Vec<u8> {
    let body: &[u8] = &[
        0, 0, // section name ptr -> "system"
        1, 0, // entry count
        7, 0, // entry name ptr -> "nickname"
        1, // value count
        3, // type: string pointer
        16, 0, 0, 0, // -> "li01"
    ];
    let mut data = Vec::new();
    data.extend_from_slice(b"BINI");
    push_u32(&mut data, 1);
    push_u32(&mut data, 12 + body.len() as u32);
    data.extend_from_slice(body);
    data.extend_from_slice(b"system\0nickname\0li01\0");
    data
}

#[test]
fn bini_minimal_decodes_to_expected_document() {
    let document = bini::parse(&minimal_bini()).unwrap().fold();
    assert_eq!(document.sections.len(), 1);
    let section = &document.sections[0];
    assert_eq!(section.name, "system");
    assert_eq!(
        section.get("nickname"),
        Some(&Entry::Scalar(Value::Str("li01".to_string())))
    );
}

#[test]
fn bini_matches_equivalent_text_ini() {
    let from_binary = bini::parse(&minimal_bini()).unwrap().fold();
    let from_text = ini::parse_bytes(b"[System]\nnickname = li01\n", true)
        .unwrap()
        .document;
    assert_eq!(from_binary, from_text);
}

#[test]
fn bini_typed_values_round_to_model_types() {
    // [system] scale = 3, then a float entry. Pool: "system\0scale\0" (0, 7).
    let mut data = Vec::new();
    data.extend_from_slice(b"BINI");
    push_u32(&mut data, 1);
    let mut body = Vec::new();
    push_u16(&mut body, 0); // "system"
    push_u16(&mut body, 1);
    push_u16(&mut body, 7); // "scale"
    body.push(2); // two values -> tuple
    body.push(1);
    push_u32(&mut body, (-3i32) as u32);
    body.push(2);
    push_u32(&mut body, 1.5f32.to_bits());
    push_u32(&mut data, 12 + body.len() as u32);
    data.extend_from_slice(&body);
    data.extend_from_slice(b"system\0scale\0");

    let document = bini::parse(&data).unwrap().fold();
    assert_eq!(
        document.sections[0].get("scale"),
        Some(&Entry::Scalar(Value::Tuple(vec![
            Value::Int(-3),
            Value::Float(1.5)
        ])))
    );
}

#[test]
fn bini_dangling_string_pointer_is_an_error() {
    let mut data = minimal_bini();
    // Retarget the value pointer into the middle of "system": offset 3 is
    // not the start of any pooled string.
    let value_offset = 12 + 8;
    data[value_offset..value_offset + 4].copy_from_slice(&3u32.to_le_bytes());
    assert!(matches!(
        bini::parse(&data),
        Err(FlError::DanglingPointer { offset: 3 })
    ));
}

#[test]
fn bini_unknown_value_type_tag_is_fatal() {
    let mut data = minimal_bini();
    data[12 + 7] = 4; // type tag
    assert!(matches!(bini::parse(&data), Err(FlError::InvalidFormat { .. })));
}

#[test]
fn bini_rejects_bad_magic_and_version() {
    let mut bad_magic = minimal_bini();
    bad_magic[0] = b'X';
    assert!(matches!(
        bini::parse(&bad_magic),
        Err(FlError::InvalidFormat { .. })
    ));

    let mut bad_version = minimal_bini();
    bad_version[4] = 2;
    assert!(matches!(
        bini::parse(&bad_version),
        Err(FlError::UnsupportedVersion { version: 2, .. })
    ));
}

#[test]
fn bini_truncated_body_is_an_error_not_a_panic() {
    let data = minimal_bini();
    for len in 0..data.len() - 22 {
        assert!(bini::parse(&data[..len]).is_err(), "prefix of {} bytes", len);
    }
}

// -------------------------------------------------------------- facade --

#[test]
fn facade_concatenates_binary_and_text_sources() {
    let dir = tempfile::tempdir().unwrap();
    let binary_path = dir.path().join("universe.ini");
    std::fs::write(&binary_path, minimal_bini()).unwrap();
    let text_path = dir.path().join("goods.ini");
    let mut f = std::fs::File::create(&text_path).unwrap();
    f.write_all(b"[Good]\nnickname = commodity_h2o\nprice = 12, light\n")
        .unwrap();
    drop(f);

    let parsed = ini::parse(&[&binary_path, &text_path], true).unwrap();
    let names: Vec<_> = parsed
        .document
        .sections
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(names, ["system", "good"]);
    assert_eq!(
        parsed.document.sections[1].get("price"),
        Some(&Entry::Scalar(Value::Tuple(vec![
            Value::Int(12),
            Value::Str("light".to_string())
        ])))
    );
    assert!(parsed.warnings.is_empty());
}

#[test]
fn facade_missing_path_is_io_error() {
    let result = ini::parse(&["/no/such/file.ini"], true);
    assert!(matches!(result, Err(FlError::Io(_))));
}

#[test]
fn facade_reports_warnings_with_path_and_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ini");
    std::fs::write(&path, b"[a]\nok = 1\nbad = -12x34\n").unwrap();

    let parsed = ini::parse(&[&path], true).unwrap();
    assert_eq!(parsed.document.sections[0].len(), 1);
    assert_eq!(parsed.warnings.len(), 1);
    assert_eq!(parsed.warnings[0].line, 3);
    assert_eq!(parsed.warnings[0].path.as_deref(), Some(path.as_path()));
}

// ---------------------------------------------------------------- UTF ---

/// Builds a UTF container with a root directory entry and the given data
/// leaves. Names land in the dictionary in order; payloads in the data
/// segment in order.
fn build_utf(leaves: &[(&str, &[u8])]) -> Vec<u8> {
    let mut names = Vec::new();
    let mut name_offsets = vec![0u32];
    names.extend_from_slice(b"\\\0");
    for (name, _) in leaves {
        name_offsets.push(names.len() as u32);
        names.extend_from_slice(name.as_bytes());
        names.push(0);
    }

    let entry_count = leaves.len() + 1;
    let tree_offset = 56u32;
    let tree_size = (entry_count * 44) as u32;
    let names_offset = tree_offset + tree_size;
    let data_start = names_offset + names.len() as u32;

    let mut header = Vec::new();
    header.extend_from_slice(b"UTF ");
    push_u32(&mut header, 0x101);
    push_u32(&mut header, tree_offset);
    push_u32(&mut header, tree_size);
    push_u32(&mut header, 0);
    push_u32(&mut header, 44);
    push_u32(&mut header, names_offset);
    push_u32(&mut header, names.len() as u32);
    push_u32(&mut header, names.len() as u32);
    push_u32(&mut header, data_start);
    for _ in 0..4 {
        push_u32(&mut header, 0);
    }
    assert_eq!(header.len(), 56);

    let mut tree = Vec::new();
    let mut push_entry = |name_off: u32, ty: u32, data_off: u32, used: u32| {
        push_u32(&mut tree, 0); // sibling
        push_u32(&mut tree, name_off);
        push_u32(&mut tree, ty);
        push_u32(&mut tree, 0); // sharing attributes
        push_u32(&mut tree, data_off);
        push_u32(&mut tree, used); // allocated
        push_u32(&mut tree, used);
        push_u32(&mut tree, used); // uncompressed
        for _ in 0..3 {
            push_u32(&mut tree, 0); // timestamps
        }
    };

    push_entry(0, 0x80, 44, 0); // root directory
    let mut segment = Vec::new();
    for (i, (_, payload)) in leaves.iter().enumerate() {
        push_entry(
            name_offsets[i + 1],
            0x10,
            segment.len() as u32,
            payload.len() as u32,
        );
        segment.extend_from_slice(payload);
    }

    let mut data = header;
    data.extend_from_slice(&tree);
    data.extend_from_slice(&names);
    data.extend_from_slice(&segment);
    data
}

#[test]
fn utf_yields_one_pair_per_data_entry() {
    let container = build_utf(&[("icon", b"PNGDATA"), ("stats", b"\x01\x02\x03")]);
    let entries = utf::parse(&container).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "icon");
    assert_eq!(entries[0].data, b"PNGDATA");
    assert_eq!(entries[1].name, "stats");

    let total: usize = entries.iter().map(|e| e.data.len()).sum();
    assert!(total <= container.len());
}

#[test]
fn utf_duplicate_names_stay_distinct() {
    let container = build_utf(&[("icon", b"one"), ("icon", b"two")]);
    let entries = utf::parse(&container).unwrap();
    assert_eq!(entries.len(), 2);
    // extract returns the first structural match
    assert_eq!(utf::extract(&container, "icon").unwrap(), b"one");
}

#[test]
fn utf_missing_entry_is_not_found() {
    let container = build_utf(&[("icon", b"one")]);
    assert!(matches!(
        utf::extract(&container, "portrait"),
        Err(FlError::EntryNotFound(name)) if name == "portrait"
    ));
}

#[test]
fn utf_truncated_payload_is_an_error() {
    let mut container = build_utf(&[("icon", b"PNGDATA")]);
    container.truncate(container.len() - 2);
    assert!(matches!(
        utf::parse(&container),
        Err(FlError::InvalidFormat { .. })
    ));
}

// ------------------------------------------------------------ PE / DLL --

const RT_STRING: u32 = 0x06;
const RT_VERSION: u32 = 0x10;
const RT_HTML: u32 = 0x17;

/// Builds a minimal PE image whose `.rsrc` section carries the given
/// resources. Each resource is `(type, name, payload)`; payloads for the
/// string type must already be a full 16-slot string table.
fn build_pe(resources: &[(u32, u32, Vec<u8>)], section_name: &[u8; 8]) -> Vec<u8> {
    let mut data = vec![0u8; 0x40];
    data[0] = b'M';
    data[1] = b'Z';
    data[0x3C..0x40].copy_from_slice(&0x40u32.to_le_bytes());

    data.extend_from_slice(b"PE\0\0");
    // COFF header: machine, 1 section, no symbols, no optional header.
    push_u16(&mut data, 0x14C);
    push_u16(&mut data, 1);
    push_u32(&mut data, 0);
    push_u32(&mut data, 0);
    push_u32(&mut data, 0);
    push_u16(&mut data, 0);
    push_u16(&mut data, 0);

    let rsrc_offset = (data.len() + 40) as u32;

    // Section header.
    data.extend_from_slice(section_name);
    push_u32(&mut data, 0); // virtual size
    push_u32(&mut data, 0); // virtual address
    push_u32(&mut data, 0); // raw size
    push_u32(&mut data, rsrc_offset);
    data.extend_from_slice(&[0u8; 16]);
    assert_eq!(data.len() as u32, rsrc_offset);

    // Layout inside .rsrc, all offsets relative to its start:
    //   root table, then one type table per resource, then per-resource
    //   descriptor (40 bytes) + data entry (16 bytes), then payloads.
    let n = resources.len() as u32;
    let root_size = 16 + n * 8;
    let type_table_size = 16 + 8;
    let descriptors_base = root_size + n * type_table_size;
    let payloads_base = descriptors_base + n * (40 + 16);

    let mut rsrc = Vec::new();
    let dir_header = |rsrc: &mut Vec<u8>, id_count: u16| {
        push_u32(rsrc, 0);
        push_u32(rsrc, 0);
        push_u16(rsrc, 0);
        push_u16(rsrc, 0);
        push_u16(rsrc, 0); // named entries: never used
        push_u16(rsrc, id_count);
    };

    dir_header(&mut rsrc, n as u16);
    for (i, (ty, _, _)) in resources.iter().enumerate() {
        push_u32(&mut rsrc, *ty);
        push_u32(&mut rsrc, (root_size + i as u32 * type_table_size) | 0x8000_0000);
    }

    for (i, (_, name, _)) in resources.iter().enumerate() {
        dir_header(&mut rsrc, 1);
        push_u32(&mut rsrc, *name);
        push_u32(&mut rsrc, descriptors_base + i as u32 * 56);
    }

    let mut payload_cursor = payloads_base;
    for (i, (_, _, payload)) in resources.iter().enumerate() {
        // Section-header-shaped descriptor: only the raw-data pointer at
        // byte 20 is read, and it locates the data entry.
        let data_entry_rel = descriptors_base + i as u32 * 56 + 40;
        rsrc.extend_from_slice(&[0u8; 20]);
        push_u32(&mut rsrc, data_entry_rel);
        rsrc.extend_from_slice(&[0u8; 16]);
        // Resource data entry: RVA used as absolute file offset here.
        push_u32(&mut rsrc, rsrc_offset + payload_cursor);
        push_u32(&mut rsrc, payload.len() as u32);
        push_u32(&mut rsrc, 0); // codepage
        push_u32(&mut rsrc, 0); // reserved
        payload_cursor += payload.len() as u32;
    }
    for (_, _, payload) in resources {
        rsrc.extend_from_slice(payload);
    }

    data.extend_from_slice(&rsrc);
    data
}

/// A 16-slot string table with `texts` in the leading slots.
fn string_table_payload(texts: &[&str]) -> Vec<u8> {
    let mut payload = Vec::new();
    for slot in 0..16 {
        match texts.get(slot) {
            Some(text) => {
                push_u16(&mut payload, text.encode_utf16().count() as u16);
                payload.extend_from_slice(&utf16le(text));
            }
            None => push_u16(&mut payload, 0),
        }
    }
    payload
}

#[test]
fn pe_string_and_html_resources_get_external_ids() {
    let rdl = "<RDL><TEXT>Liberty<PARA/>A house of plenty.</TEXT></RDL>";
    let image = build_pe(
        &[
            (RT_STRING, 2, string_table_payload(&["New York", "Pittsburgh"])),
            (RT_HTML, 7, utf16le(rdl)),
            (RT_VERSION, 1, vec![0, 0, 0, 0]),
        ],
        b".rsrc\0\0\0",
    );

    let offset = 65536;
    let table = dll::parse(&image, offset).unwrap();
    // String block 2 covers internal ids 16..31.
    assert_eq!(table[&(offset + 16)], "New York");
    assert_eq!(table[&(offset + 17)], "Pittsburgh");
    assert_eq!(table[&(offset + 7)], rdl);
    assert_eq!(table.len(), 3);
}

#[test]
fn pe_without_rsrc_section_is_an_error() {
    let image = build_pe(&[], b".text\0\0\0");
    assert!(matches!(
        dll::parse(&image, 0),
        Err(FlError::SectionNotFound(".rsrc"))
    ));
}

#[test]
fn pe_unknown_resource_type_is_fatal() {
    let image = build_pe(&[(0x02, 1, vec![0u8; 4])], b".rsrc\0\0\0");
    assert!(matches!(
        dll::parse(&image, 0),
        Err(FlError::UnsupportedResourceType(0x02))
    ));
}

#[test]
fn resource_index_tolerates_absent_containers_and_ids() {
    let dir = tempfile::tempdir().unwrap();
    let dll_path = dir.path().join("resources.dll");
    let image = build_pe(
        &[(RT_STRING, 1, string_table_payload(&["Li01 System"]))],
        b".rsrc\0\0\0",
    );
    std::fs::write(&dll_path, image).unwrap();

    let mut index = ResourceIndex::new(vec![dll_path]);
    // dll 0, internal id 0
    assert_eq!(index.lookup(0).unwrap(), "Li01 System");
    // present container, absent id
    assert_eq!(index.lookup(9).unwrap(), "");
    // container index outside the supplied list
    assert_eq!(index.lookup(3 * 65536 + 5).unwrap(), "");
}

#[test]
fn resource_index_translates_rich_text() {
    let dir = tempfile::tempdir().unwrap();
    let dll_path = dir.path().join("infocards.dll");
    let rdl = "<RDL><TEXT>Liberty<PARA/>A house of plenty.</TEXT></RDL>";
    let image = build_pe(&[(RT_HTML, 4, utf16le(rdl))], b".rsrc\0\0\0");
    std::fs::write(&dll_path, image).unwrap();

    let mut index = ResourceIndex::new(vec![dll_path]);
    assert_eq!(index.lookup_html(4).unwrap(), "Liberty<p>A house of plenty.");
    assert_eq!(
        index.lookup_plain(4).unwrap(),
        "Liberty\nA house of plenty."
    );
    // Missing ids never reach the markup parser.
    assert_eq!(index.lookup_plain(9999).unwrap(), "");
}
