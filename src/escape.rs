//! Entity escaping used outside of, and after, the marshalling pipeline

use std::borrow::Cow;

/// HTML 4 named entities for U+00A0..=U+00FF
const LATIN1_ENTITIES: [&str; 96] = [
    "nbsp", "iexcl", "cent", "pound", "curren", "yen", "brvbar", "sect", "uml", "copy", "ordf",
    "laquo", "not", "shy", "reg", "macr", "deg", "plusmn", "sup2", "sup3", "acute", "micro",
    "para", "middot", "cedil", "sup1", "ordm", "raquo", "frac14", "frac12", "frac34", "iquest",
    "Agrave", "Aacute", "Acirc", "Atilde", "Auml", "Aring", "AElig", "Ccedil", "Egrave", "Eacute",
    "Ecirc", "Euml", "Igrave", "Iacute", "Icirc", "Iuml", "ETH", "Ntilde", "Ograve", "Oacute",
    "Ocirc", "Otilde", "Ouml", "times", "Oslash", "Ugrave", "Uacute", "Ucirc", "Uuml", "Yacute",
    "THORN", "szlig", "agrave", "aacute", "acirc", "atilde", "auml", "aring", "aelig", "ccedil",
    "egrave", "eacute", "ecirc", "euml", "igrave", "iacute", "icirc", "iuml", "eth", "ntilde",
    "ograve", "oacute", "ocirc", "otilde", "ouml", "divide", "oslash", "ugrave", "uacute",
    "ucirc", "uuml", "yacute", "thorn", "yuml",
];

/// Escape `& < > "` in one pass. Blank input is returned unchanged.
pub fn escape_xml(data: &str) -> Cow<'_, str> {
    if data.trim().is_empty() {
        return Cow::Borrowed(data);
    }
    replace_with(data, |c| match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' => Some("&quot;"),
        _ => None,
    })
}

/// Escape a document for embedding inside another XML 1.1 document.
///
/// The five predefined entities are escaped. NUL, U+FFFE and U+FFFF are not
/// allowed anywhere in XML 1.1 and are dropped.
pub fn escape_xml11(data: &str) -> String {
    let mut out = String::with_capacity(data.len() + data.len() / 8);
    for c in data.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\0' | '\u{FFFE}' | '\u{FFFF}' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Escape a document for embedding inside HTML 4.
pub fn escape_html4(data: &str) -> String {
    let mut out = String::with_capacity(data.len() + data.len() / 8);
    for c in data.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\u{A0}'..='\u{FF}' => {
                out.push('&');
                out.push_str(LATIN1_ENTITIES[c as usize - 0xA0]);
                out.push(';');
            }
            _ => out.push(c),
        }
    }
    out
}

fn replace_with(data: &str, entity: impl Fn(char) -> Option<&'static str>) -> Cow<'_, str> {
    let Some(first) = data.find(|c| entity(c).is_some()) else {
        return Cow::Borrowed(data);
    };

    let mut out = String::with_capacity(data.len() + 16);
    out.push_str(&data[..first]);
    for c in data[first..].chars() {
        match entity(c) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    Cow::Owned(out)
}
