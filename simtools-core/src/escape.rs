/// Resolve the backslash escapes of a quoted script literal.
///
/// Recognised forms (the body of a `'...'` or `"..."` literal, quotes
/// already stripped):
///
/// - `\n \r \t \b \f \v \0`
/// - `\\ \' \" \``
/// - `\xHH`, `\uHHHH` and `\u{H...}`
/// - a backslash directly before a line break (line continuation) is dropped
///
/// Anything else, including a truncated or invalid hex escape, is kept
/// verbatim with its backslash. Non-ASCII characters pass through untouched.
pub fn decode_literal(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        let Some(&(_, esc)) = chars.peek() else {
            // Trailing lone backslash.
            out.push('\\');
            break;
        };

        let simple = match esc {
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            'b' => Some('\u{0008}'),
            'f' => Some('\u{000C}'),
            'v' => Some('\u{000B}'),
            '0' => Some('\0'),
            '\\' | '\'' | '"' | '`' => Some(esc),
            _ => None,
        };
        if let Some(c) = simple {
            chars.next();
            out.push(c);
            continue;
        }

        match esc {
            '\n' => {
                chars.next();
            }
            '\r' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '\n'))) {
                    chars.next();
                }
            }
            'x' | 'u' => {
                let body = &raw[idx + 2..];
                match parse_hex_escape(esc, body) {
                    Some((c, consumed)) => {
                        chars.next();
                        for _ in 0..consumed {
                            chars.next();
                        }
                        out.push(c);
                    }
                    None => out.push('\\'),
                }
            }
            _ => out.push('\\'),
        }
    }

    out
}

/// Parse the hex payload following `\x` or `\u`. Returns the decoded
/// character and how many chars of `body` it used.
fn parse_hex_escape(kind: char, body: &str) -> Option<(char, usize)> {
    let fixed = |len: usize| -> Option<(char, usize)> {
        let digits = body.get(..len)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let code = u32::from_str_radix(digits, 16).ok()?;
        char::from_u32(code).map(|c| (c, len))
    };

    match kind {
        'x' => fixed(2),
        'u' if body.starts_with('{') => {
            let close = body.find('}')?;
            let digits = &body[1..close];
            if digits.is_empty() || digits.len() > 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }
            let code = u32::from_str_radix(digits, 16).ok()?;
            char::from_u32(code).map(|c| (c, close + 1))
        }
        'u' => fixed(4),
        _ => None,
    }
}
