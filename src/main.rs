use std::env;
use std::path::PathBuf;

use fl_formats::formats::{dll, ini, utf};
use fl_formats::{Document, Entry};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <file> [--unfolded]", args[0]);
        eprintln!();
        eprintln!("Sniffs the file's format (INI, BINI, UTF or resource DLL)");
        eprintln!("and dumps its decoded contents.");
        std::process::exit(1);
    }

    let path = PathBuf::from(&args[1]);
    let fold = !args.iter().any(|arg| arg == "--unfolded");

    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("ERROR: cannot read {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };

    // parse_bytes sniffs BINI itself, so the last arm covers both
    // configuration encodings.
    let outcome = match data.get(..4) {
        Some(b"UTF ") => utf::parse(&data).map(|entries| dump_utf(&entries)),
        Some([b'M', b'Z', ..]) => dll::parse(&data, 0).map(|table| dump_resources(&table)),
        _ => ini::parse_bytes(&data, fold).map(|p| {
            for warning in &p.warnings {
                eprintln!("WARNING: {}", warning);
            }
            dump_document(&p.document)
        }),
    };

    if let Err(e) = outcome {
        eprintln!("ERROR: failed to decode {}", path.display());
        eprintln!("  {}", e);
        std::process::exit(1);
    }
}

/// Prints a decoded configuration back out as INI-formatted text.
fn dump_document(document: &Document) {
    for section in &document.sections {
        println!("[{}]", section.name);
        for (key, entry) in section.entries() {
            match entry {
                Entry::Scalar(value) => println!("{} = {}", key, value),
                Entry::Sequence(values) => {
                    for value in values {
                        println!("{} = {}", key, value);
                    }
                }
            }
        }
        println!();
    }
}

fn dump_utf(entries: &[utf::Entry]) {
    for entry in entries {
        println!("{:>10}  {}", entry.data.len(), entry.name);
    }
    println!("{} data entries", entries.len());
}

fn dump_resources(table: &dll::ResourceTable) {
    let mut ids: Vec<_> = table.keys().collect();
    ids.sort_unstable();
    for id in ids {
        let text = &table[id];
        let preview: String = text.chars().take(60).collect();
        println!("{:>7}  {}", id, preview.replace('\n', " "));
    }
    println!("{} resources", table.len());
}
