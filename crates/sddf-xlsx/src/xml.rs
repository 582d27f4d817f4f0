//! Small helpers shared by the reader, writer and patcher

use quick_xml::events::BytesStart;
use sddf_core::CellAddress;

/// Get an attribute's unescaped value by its (qualified) name
pub(crate) fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Namespace prefix of an element name including the colon (`x:` for `x:row`)
pub(crate) fn prefix_of(qname: &[u8]) -> String {
    match qname.iter().position(|&b| b == b':') {
        Some(pos) => String::from_utf8_lossy(&qname[..=pos]).into_owned(),
        None => String::new(),
    }
}

/// Resolve the 0-based row index of a `<row>` element
///
/// Rows may omit `r`, in which case they follow the previous row.
pub(crate) fn row_index(e: &BytesStart, previous: Option<u32>) -> u32 {
    attr(e, b"r")
        .and_then(|r| r.parse::<u32>().ok())
        .filter(|&r| r >= 1)
        .map(|r| r - 1)
        .unwrap_or_else(|| previous.map_or(0, |p| p + 1))
}

/// Resolve the address of a `<c>` element
///
/// Cells may omit `r`, in which case they take the next column of the row.
pub(crate) fn cell_address(e: &BytesStart, row: u32, next_col: u16) -> CellAddress {
    attr(e, b"r")
        .and_then(|r| CellAddress::parse(&r).ok())
        .unwrap_or_else(|| CellAddress::new(row, next_col))
}

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel uses this format to encode special characters in XML:
/// - `_x000d_` = CR (carriage return)
/// - `_x000a_` = LF (line feed)
/// - `_x0009_` = Tab
/// - `_x005f_` = Underscore (escaped underscore)
pub(crate) fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '_' {
            result.push(c);
            continue;
        }

        let mut hex_chars = String::new();
        let mut decoded = None;
        let mut saw_x = false;

        if chars.peek() == Some(&'x') {
            chars.next();
            saw_x = true;

            while hex_chars.len() < 4 {
                match chars.peek() {
                    Some(&ch) if ch.is_ascii_hexdigit() => {
                        hex_chars.push(ch);
                        chars.next();
                    }
                    _ => break,
                }
            }

            if hex_chars.len() == 4 && chars.peek() == Some(&'_') {
                decoded = u32::from_str_radix(&hex_chars, 16)
                    .ok()
                    .and_then(char::from_u32);
                if decoded.is_some() {
                    chars.next();
                }
            }
        }

        match decoded {
            Some(ch) => result.push(ch),
            None => {
                // Not a valid escape sequence, output what we consumed
                result.push('_');
                if saw_x {
                    result.push('x');
                }
                result.push_str(&hex_chars);
            }
        }
    }

    result
}

/// Encode text so that `decode_excel_escapes` gives it back unchanged.
///
/// A literal `_` that would read as an `_xHHHH_` escape becomes `_x005F_`,
/// and control characters XML cannot carry are written as `_xHHHH_`.
pub(crate) fn encode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") && !s.chars().any(is_escaped_control) {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len() + 8);
    for (i, c) in s.char_indices() {
        if c == '_' && is_escape_shaped(&s[i..]) {
            result.push_str("_x005F_");
        } else if is_escaped_control(c) {
            result.push_str(&format!("_x{:04X}_", c as u32));
        } else {
            result.push(c);
        }
    }
    result
}

fn is_escape_shaped(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 7
        && bytes.starts_with(b"_x")
        && bytes[2..6].iter().all(u8::is_ascii_hexdigit)
        && bytes[6] == b'_'
}

fn is_escaped_control(c: char) -> bool {
    (c as u32) < 0x20 && c != '\t' && c != '\n'
}

/// Escape text for use in element content or attribute values
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Resolve a relationship target against the directory of its source part
///
/// `base_dir` is the source part's folder without trailing slash (`xl`).
pub(crate) fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for part in target.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
