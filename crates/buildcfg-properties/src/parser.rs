//! Line parser for property files.

use std::str::Chars;

use crate::{ParseError, Properties, PropertyValue};

/// Parse property text.
///
/// Blank lines and lines starting with `#` or `!` are skipped. A line ending
/// in an odd number of backslashes continues on the next line, whose leading
/// whitespace is dropped. The key is everything before the first unescaped
/// `=` or `:`. Escapes follow `java.util.Properties`: `\t`, `\n`, `\r`, `\f`,
/// `\uXXXX`, and a backslash before any other character yields that
/// character. Surrounding whitespace is trimmed unless escaped. A later
/// declaration of the same key replaces the earlier one.
///
/// Values are stored as text; nothing is reinterpreted.
pub fn parse(input: &str) -> Result<Properties, ParseError> {
    let mut props = Properties::new();
    let mut lines = input.lines().enumerate();

    while let Some((index, physical)) = lines.next() {
        let line_no = index + 1;
        let mut logical = physical.trim_start().to_string();

        if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
            continue;
        }

        while continues(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let Some(split) = find_separator(&logical) else {
            return Err(error(
                line_no,
                format!("expected `key=value`, found `{}`", logical.trim_end()),
            ));
        };

        let key = unescape(logical[..split].trim_end(), line_no)?;
        let value = unescape(logical[split + 1..].trim_start(), line_no)?;

        if key.is_empty() {
            return Err(error(line_no, "empty key"));
        }
        if key.chars().any(char::is_whitespace) {
            return Err(error(line_no, format!("key `{}` contains whitespace", key)));
        }

        props.insert(key, PropertyValue::String(value), line_no);
    }

    Ok(props)
}

fn error(line: usize, message: impl Into<String>) -> ParseError {
    ParseError {
        line,
        message: message.into(),
    }
}

/// Odd number of trailing backslashes
fn continues(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn find_separator(line: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return Some(i),
            _ => {}
        }
    }
    None
}

/// Resolve escapes and drop unescaped trailing whitespace
fn unescape(raw: &str, line: usize) -> Result<String, ParseError> {
    let mut out = String::with_capacity(raw.len());
    // length of `out` through the last character that survives trimming
    let mut keep = 0;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            if !c.is_whitespace() {
                keep = out.len();
            }
            continue;
        }

        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => out.push(unicode_escape(&mut chars, line)?),
            Some(other) => out.push(other),
            // lone backslash at end of input
            None => {}
        }
        keep = out.len();
    }

    out.truncate(keep);
    Ok(out)
}

fn unicode_escape(chars: &mut Chars<'_>, line: usize) -> Result<char, ParseError> {
    let first = hex_unit(chars, line)?;
    let units = if (0xD800..0xDC00).contains(&first) {
        if chars.next() != Some('\\') || chars.next() != Some('u') {
            return Err(error(line, "unpaired surrogate in \\u escape"));
        }
        vec![first, hex_unit(chars, line)?]
    } else {
        vec![first]
    };

    match char::decode_utf16(units).next() {
        Some(Ok(c)) => Ok(c),
        _ => Err(error(line, "invalid \\u escape")),
    }
}

fn hex_unit(chars: &mut Chars<'_>, line: usize) -> Result<u16, ParseError> {
    let digits: String = chars.by_ref().take(4).collect();
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(error(line, format!("malformed \\u escape `\\u{}`", digits)));
    }
    u16::from_str_radix(&digits, 16).map_err(|e| error(line, e.to_string()))
}
