/// Lexical context the scanner is in while walking statement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

fn pair_at(bytes: &[u8], idx: usize, pair: &[u8; 2]) -> bool {
    bytes.get(idx..idx + 2) == Some(&pair[..])
}

pub(super) fn line_comment_at(bytes: &[u8], idx: usize) -> bool {
    pair_at(bytes, idx, b"--")
}

pub(super) fn block_comment_start_at(bytes: &[u8], idx: usize) -> bool {
    pair_at(bytes, idx, b"/*")
}

pub(super) fn block_comment_end_at(bytes: &[u8], idx: usize) -> bool {
    pair_at(bytes, idx, b"*/")
}

/// Digits starting at `start`, with the index one past the last digit.
pub(super) fn digits_at(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let len = bytes
        .get(start..)?
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if len == 0 {
        return None;
    }
    let end = start + len;
    std::str::from_utf8(&bytes[start..end])
        .ok()
        .map(|digits| (end, digits))
}

/// Recognise a `$tag$` opener at `start`, returning the tag and the index of its closing `$`.
pub(super) fn dollar_tag_at(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let body = bytes.get(start + 1..)?;
    let len = body
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count();
    if body.get(len) != Some(&b'$') {
        return None;
    }
    let tag = std::str::from_utf8(&body[..len]).ok()?.to_string();
    Some((tag, start + 1 + len))
}

/// Whether `$tag$` closes at `idx` (which points at the leading `$`).
pub(super) fn dollar_tag_closes_at(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    bytes.get(idx + 1..end) == Some(tag.as_bytes()) && bytes.get(end) == Some(&b'$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_digit_runs() {
        assert_eq!(digits_at(b"$12 ", 1), Some((3, "12")));
        assert_eq!(digits_at(b"$x", 1), None);
        assert_eq!(digits_at(b"$", 1), None);
    }

    #[test]
    fn recognises_dollar_tags() {
        assert_eq!(dollar_tag_at(b"$fn$ body", 0), Some(("fn".to_string(), 3)));
        assert_eq!(dollar_tag_at(b"$$", 0), Some((String::new(), 1)));
        assert_eq!(dollar_tag_at(b"$1 ", 0), None);
        assert!(dollar_tag_closes_at(b"x $fn$", 2, "fn"));
    }
}
