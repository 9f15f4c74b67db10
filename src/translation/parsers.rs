//! Byte-level lookahead used while walking a statement.
//!
//! Every helper takes the statement bytes and the index of the byte under the
//! cursor, and never reads past the end of the slice.

fn pair_at(bytes: &[u8], idx: usize, pair: [u8; 2]) -> bool {
    bytes.get(idx..idx + 2) == Some(&pair[..])
}

/// `--` starts a comment running to end of line.
pub(super) fn opens_line_comment(bytes: &[u8], idx: usize) -> bool {
    pair_at(bytes, idx, *b"--")
}

pub(super) fn opens_block_comment(bytes: &[u8], idx: usize) -> bool {
    pair_at(bytes, idx, *b"/*")
}

pub(super) fn closes_block_comment(bytes: &[u8], idx: usize) -> bool {
    pair_at(bytes, idx, *b"*/")
}

/// Read a `$tag$` opener at `start`, returning the tag and the index of its
/// closing `$`. Positional parameters such as `$1` are not openers.
pub(super) fn dollar_quote_tag(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let rest = bytes.get(start + 1..)?;
    let len = rest.iter().position(|&b| b == b'$')?;
    let tag = &rest[..len];
    if tag.first().is_some_and(u8::is_ascii_digit)
        || !tag.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return None;
    }
    let tag = std::str::from_utf8(tag).ok()?;
    Some((tag.to_string(), start + 1 + len))
}

/// Whether the `$` at `idx` begins the `$tag$` that ends a dollar-quoted body.
pub(super) fn closes_dollar_quote(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    bytes.get(idx + 1..end) == Some(tag.as_bytes()) && bytes.get(end) == Some(&b'$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_comment_markers() {
        let sql = b"a -- b /* c */";
        assert!(opens_line_comment(sql, 2));
        assert!(!opens_line_comment(sql, 3));
        assert!(opens_block_comment(sql, 7));
        assert!(closes_block_comment(sql, 12));
        assert!(!closes_block_comment(sql, 13));
    }

    #[test]
    fn reads_dollar_quote_tags() {
        assert_eq!(dollar_quote_tag(b"$$ x $$", 0), Some((String::new(), 1)));
        assert_eq!(dollar_quote_tag(b"$fn$ x $fn$", 0), Some(("fn".to_string(), 3)));
        assert_eq!(dollar_quote_tag(b"$1 + $2", 0), None);
        assert_eq!(dollar_quote_tag(b"$no end", 0), None);
        assert!(closes_dollar_quote(b"$fn$ x $fn$", 7, "fn"));
        assert!(!closes_dollar_quote(b"$fn$ x $f", 7, "fn"));
    }
}
