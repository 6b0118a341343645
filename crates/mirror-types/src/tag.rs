//! Struct field tags
//!
//! A tag is free-form metadata attached to a field. By convention it is a
//! space-separated list of `key:"value"` pairs, e.g. `json:"userName" db:"name"`.

use std::fmt;

/// Metadata string attached to a struct field
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StructTag(String);

impl StructTag {
    /// Wrap raw tag text
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw tag text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the tag is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value for `key`, or the empty string when absent
    pub fn get(&self, key: &str) -> String {
        self.lookup(key).unwrap_or_default()
    }

    /// Value for `key` if present.
    ///
    /// Parsing stops at the first malformed pair; pairs before it are still
    /// visible. A value with an invalid escape sequence counts as absent.
    pub fn lookup(&self, key: &str) -> Option<String> {
        let mut rest = self.0.as_str();
        while !rest.is_empty() {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }

            let bytes = rest.as_bytes();
            let name_end = bytes
                .iter()
                .position(|&b| b <= b' ' || b == b':' || b == b'"' || b == 0x7f)
                .unwrap_or(bytes.len());
            if name_end == 0
                || name_end + 1 >= bytes.len()
                || bytes[name_end] != b':'
                || bytes[name_end + 1] != b'"'
            {
                break;
            }
            let name = &rest[..name_end];
            rest = &rest[name_end + 1..];

            // rest starts at the opening quote
            let bytes = rest.as_bytes();
            let mut i = 1;
            while i < bytes.len() && bytes[i] != b'"' {
                if bytes[i] == b'\\' {
                    i += 1;
                }
                i += 1;
            }
            if i >= bytes.len() {
                break;
            }
            let quoted = &rest[1..i];
            rest = &rest[i + 1..];

            if name == key {
                return unescape(quoted);
            }
        }
        None
    }
}

/// Decode the body of a double-quoted string literal: the single-letter
/// escapes, `\xHH`, three-digit octal, `\uXXXX` and `\UXXXXXXXX`.
/// Returns `None` for an invalid escape or a raw newline.
fn unescape(s: &str) -> Option<String> {
    if !s.contains('\\') {
        return (!s.contains('\n')).then(|| s.to_string());
    }

    let mut out = Vec::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '\n' => return None,
            '\\' => {}
            _ => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                continue;
            }
        }
        let byte = match chars.next()? {
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0c,
            'n' => b'\n',
            'r' => b'\r',
            't' => b'\t',
            'v' => 0x0b,
            '\\' => b'\\',
            '"' => b'"',
            'x' => u8::try_from(digits(&mut chars, 2, 16)?).ok()?,
            d @ '0'..='7' => {
                let rest = digits(&mut chars, 2, 8)?;
                u8::try_from(d.to_digit(8)? * 64 + rest).ok()?
            }
            'u' => {
                push_char(&mut out, digits(&mut chars, 4, 16)?)?;
                continue;
            }
            'U' => {
                push_char(&mut out, digits(&mut chars, 8, 16)?)?;
                continue;
            }
            _ => return None,
        };
        out.push(byte);
    }
    Some(String::from_utf8_lossy(&out).into_owned())
}

/// Read exactly `count` digits in `radix`
fn digits(chars: &mut std::str::Chars<'_>, count: usize, radix: u32) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..count {
        value = value * radix + chars.next()?.to_digit(radix)?;
    }
    Some(value)
}

fn push_char(out: &mut Vec<u8>, code: u32) -> Option<()> {
    let c = char::from_u32(code)?;
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    Some(())
}

impl fmt::Display for StructTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StructTag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
