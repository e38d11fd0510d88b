//! Parser for Freelancer-style text INI files, and the facade that hides
//! the text/binary split.
//!
//! Freelancer stores its stock configuration as BINI, but accepts plain
//! text INIs just as happily, which makes text the format most mods ship.
//! A single logical configuration is routinely spread over several files,
//! some binary and some text, so [`parse`] takes a list of paths, sniffs
//! each one's magic number and concatenates the decoded documents.
//!
//! The text grammar has accreted quirks over twenty years of modding and
//! this parser aims to accept whatever the game accepts:
//!
//! - the whole buffer is Windows-1252
//! - section and key names are lower-cased; values keep their case
//! - every space and tab is stripped from entry lines, not just the edges
//! - `;` comments out the rest of a line, wherever it appears
//! - a bracketed span preceded by `;` is not a header, and a header whose
//!   name itself contains `;` comments out the entire section body
//!
//! Lines that still fail to parse are skipped with a [`Warning`] rather
//! than aborting the decode; broken mod data should not take the rest of
//! the document down with it.

use std::path::Path;

use encoding_rs::WINDOWS_1252;
use log::{info, warn};

use super::bini;
use super::error::{Result, Warning};
use super::values::{Document, Section, Value};

const DELIMITER_KEY_VALUE: char = '=';
const DELIMITER_COMMENT: char = ';';

/// A decoded configuration plus the recoverable problems hit on the way.
#[derive(Debug, Default)]
pub struct Parse {
    pub document: Document,
    pub warnings: Vec<Warning>,
}

/// Decodes the configuration files at `paths` into one document.
///
/// Each file is independently sniffed: a `BINI` magic number routes it to
/// the binary decoder, anything else is read as text. Decoded documents
/// are concatenated in argument order.
///
/// With `fold` set, entries holding a single value collapse to scalars;
/// unfolded, every entry is a sequence (more uniform to process when the
/// individual occurrences matter).
///
/// # Errors
/// Returns an error if a path cannot be read or a binary file is
/// malformed. Malformed *text* lines are recoverable and reported through
/// [`Parse::warnings`] instead.
pub fn parse<P: AsRef<Path>>(paths: &[P], fold: bool) -> Result<Parse> {
    let mut result = Parse::default();

    for path in paths {
        let path = path.as_ref();
        info!("Parsing INI file: {}", path.display());
        let data = std::fs::read(path)?;

        if data.starts_with(bini::MAGIC) {
            result.document.extend(bini::parse(&data)?);
        } else {
            let mut warnings = parse_text(&data, Some(path), &mut result.document);
            result.warnings.append(&mut warnings);
        }
    }

    if fold {
        result.document = result.document.fold();
    }
    Ok(result)
}

/// Decodes a pre-read buffer, sniffing the magic number like [`parse`].
pub fn parse_bytes(data: &[u8], fold: bool) -> Result<Parse> {
    let mut result = Parse::default();
    if data.starts_with(bini::MAGIC) {
        result.document = bini::parse(data)?;
    } else {
        result.warnings = parse_text(data, None, &mut result.document);
    }
    if fold {
        result.document = result.document.fold();
    }
    Ok(result)
}

/// Parses text INI data into `document`, returning the warnings collected.
fn parse_text(data: &[u8], path: Option<&Path>, document: &mut Document) -> Vec<Warning> {
    let (text, _, _) = WINDOWS_1252.decode(data);
    let mut warnings = Vec::new();

    // `None` means no section is open; entries before the first header and
    // the bodies of commented-out sections are consumed without effect.
    let mut current: Option<Section> = None;
    let mut skipping = false;

    for (index, line) in text.lines().enumerate() {
        let lineno = index + 1;
        let trimmed = line.trim_start();

        if let Some(rest) = trimmed.strip_prefix('[') {
            match rest.split_once(']') {
                Some((name, _)) if !name.contains(DELIMITER_COMMENT) => {
                    if let Some(section) = current.take() {
                        document.sections.push(section);
                    }
                    current = Some(Section::new(name.trim().to_lowercase()));
                    skipping = false;
                }
                Some((name, _)) => {
                    // A comment character inside the brackets means the
                    // whole section is commented out, body included.
                    if let Some(section) = current.take() {
                        document.sections.push(section);
                    }
                    warn_skip(
                        &mut warnings,
                        path,
                        lineno,
                        format!("commented-out section header '[{}]'", name),
                    );
                    skipping = true;
                }
                None => {
                    warn_skip(
                        &mut warnings,
                        path,
                        lineno,
                        "unterminated section header".to_string(),
                    );
                }
            }
            continue;
        }

        // Strip the comment, then squash all blanks out of what remains.
        let code = match line.split_once(DELIMITER_COMMENT) {
            Some((before, after)) => {
                // `;[` swallows everything up to the next real header: the
                // bracketed span is a dead header, not a live one.
                if before.trim().is_empty() && after.trim_start().starts_with('[') {
                    skipping = true;
                }
                before
            }
            None => line,
        };
        let code: String = code.chars().filter(|c| *c != ' ' && *c != '\t').collect();
        if code.is_empty() || skipping {
            continue;
        }

        // Lines without '=' (stray words, valueless keys) are ignored.
        let Some((key, raw_value)) = code.split_once(DELIMITER_KEY_VALUE) else {
            continue;
        };

        let Some(section) = current.as_mut() else {
            continue;
        };

        match parse_value(raw_value) {
            Ok(value) => section.push(&key.to_lowercase(), value),
            Err(reason) => warn_skip(
                &mut warnings,
                path,
                lineno,
                format!("couldn't parse line '{}': {}", code, reason),
            ),
        }
    }

    if let Some(section) = current.take() {
        document.sections.push(section);
    }
    warnings
}

/// Coerces an entry value. A value containing `,` becomes a tuple with
/// each component coerced independently.
fn parse_value(raw: &str) -> std::result::Result<Value, String> {
    if raw.contains(',') {
        let parts = raw
            .split(',')
            .map(auto_cast)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Value::Tuple(parts))
    } else {
        auto_cast(raw)
    }
}

/// Coercion order: a token starting with a digit or `-` must be numeric
/// (int, then float; failing both is an error, not a string); `true` and
/// `false` are booleans; everything else is a string.
fn auto_cast(token: &str) -> std::result::Result<Value, String> {
    let mut chars = token.chars();
    let numeric = matches!(chars.next(), Some(c) if c.is_ascii_digit() || c == '-');
    if numeric {
        if let Ok(int) = token.parse::<i32>() {
            return Ok(Value::Int(int));
        }
        return token
            .parse::<f32>()
            .map(Value::Float)
            .map_err(|_| format!("invalid number '{}'", token));
    }
    match token {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        _ => Ok(Value::Str(token.to_string())),
    }
}

fn warn_skip(warnings: &mut Vec<Warning>, path: Option<&Path>, line: usize, message: String) {
    let warning = Warning {
        path: path.map(Path::to_path_buf),
        line,
        message,
    };
    warn!("{}", warning);
    warnings.push(warning);
}
