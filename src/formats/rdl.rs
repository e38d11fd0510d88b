//! Translation between RDL, Freelancer's rich-text markup, and HTML or
//! plaintext.
//!
//! RDL ("Render Display List") is the XML-ish tag language used for
//! formatting inside the game's resource DLLs: infocards, rumor text and
//! the like. The translation is a crude ordered substitution table rather
//! than a real interpreter, which matches how the community tooling has
//! always handled it. Table based on work by adoxa and cshake; see
//! <https://the-starport.net/modules/newbb/viewtopic.php?&topic_id=562>.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::error::{FlError, Result};

/// The ordered RDL → HTML substitution table. Several visually identical
/// effects have distinct RDL spellings, so the mapping is many-to-one and
/// [`from_html`] cannot reconstruct byte-identical RDL.
const RDL_TO_HTML: &[(&str, &str)] = &[
    ("<TRA data=\"1\" mask=\"1\" def=\"-2\"/>", "<b>"),
    ("<TRA bold=\"true\"/>", "<b>"), // rare bold
    ("<TRA data=\"0\" mask=\"1\" def=\"-1\"/>", "</b>"),
    ("<TRA data=\"2\" mask=\"3\" def=\"-3\"/>", "<i>"),
    ("<TRA data=\"0\" mask=\"3\" def=\"-1\"/>", "</i>"),
    ("<TRA data=\"98\" mask=\"-29\" def=\"-3\"/>", "<i>"),
    ("<TRA data=\"96\" mask=\"-29\" def=\"-1\"/>", "</i>"),
    ("<TRA data=\"2\" mask=\"2\" def=\"-3\"/>", "<i>"),
    ("<TRA data=\"0\" mask=\"2\" def=\"-1\"/>", "</i>"),
    ("<TRA data=\"5\" mask=\"5\" def=\"-6\"/>", "<b><u>"),
    ("<TRA data=\"0\" mask=\"5\" def=\"-1\"/>", "</b></u>"),
    ("<TRA data=\"5\" mask=\"7\" def=\"-6\"/>", "<b><u>"),
    ("<TRA data=\"0\" mask=\"7\" def=\"-1\"/>", "</b></u>"),
    ("<TRA data=\"65280\" mask=\"-32\" def=\"31\"/>", "<font color=\"red\">"),
    ("<TRA data=\"96\" mask=\"-32\" def=\"-1\"/>", "</font>"),
    ("<TRA data=\"65281\" mask=\"-31\" def=\"30\"/>", "<b><font color=\"red\">"),
    ("<TRA data=\"96\" mask=\"-31\" def=\"-1\"/>", "</b></font>"),
    ("<TRA data=\"-16777216\" mask=\"-32\" def=\"31\"/>", "<font color=\"blue\">"),
    ("<PARA/>", "<p>"),
    ("</PARA>", "</p>"),
    ("<JUST loc=\"left\"/>", "<p align=\"left\">"),
    ("<JUST loc=\"center\"/>", "<p align=\"center\">"),
    ("\u{a0}", "&nbsp;"), // non-breaking space, often present after titles
    // Structural tags with no HTML counterpart, dropped for neatness.
    ("<RDL>", ""),
    ("</RDL>", ""),
    ("<TEXT>", ""),
    ("</TEXT>", ""),
    ("<PUSH/>", ""),
    ("<POP/>", ""),
    ("<?xml version=\"1.0\" encoding=\"UTF-16\"?>", ""),
];

/// Translates RDL to HTML by applying the substitution table left to
/// right. Unmapped tags pass through verbatim; this never fails.
pub fn to_html(rdl: &str) -> String {
    let mut result = rdl.to_string();
    for (rdl_tag, html_tag) in RDL_TO_HTML {
        result = result.replace(rdl_tag, html_tag);
    }
    result
}

/// Translates HTML back to RDL, best effort.
///
/// The inverse table is applied in the same order, so an HTML tag with
/// several RDL spellings always maps to the first one. Substitutions that
/// merely dropped structural RDL tags have no inverse and are skipped.
pub fn from_html(html: &str) -> String {
    let mut result = html.to_string();
    for (rdl_tag, html_tag) in RDL_TO_HTML {
        if html_tag.is_empty() {
            continue;
        }
        result = result.replace(html_tag, rdl_tag);
    }
    result
}

/// Strips all markup from RDL, keeping only text content. `<PARA/>`
/// becomes a newline and the paired `</PARA>` is dropped; the remainder
/// must parse as XML or the call fails.
pub fn to_plaintext(rdl: &str) -> Result<String> {
    let substituted = rdl.replace("<PARA/>", "\n").replace("</PARA>", "");

    let mut reader = Reader::from_str(&substituted);
    let mut text = String::new();
    // The pull parser flags mismatched end tags on its own but accepts
    // elements left open at end of input, so balance is tracked here.
    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Text(e)) => {
                let fragment = e
                    .unescape()
                    .map_err(|e| FlError::MalformedMarkup(e.to_string()))?;
                text.push_str(&fragment);
            }
            Ok(Event::CData(e)) => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::Eof) => {
                if depth != 0 {
                    return Err(FlError::MalformedMarkup(
                        "unclosed element at end of input".to_string(),
                    ));
                }
                break;
            }
            Ok(_) => {}
            Err(e) => return Err(FlError::MalformedMarkup(e.to_string())),
        }
    }
    Ok(text)
}
