//! Placeholder rewriting between `$N` and `?N` styles.

use std::borrow::Cow;

mod scanner;

use scanner::{
    State, block_comment_end_at, block_comment_start_at, digits_at, dollar_tag_at,
    dollar_tag_closes_at, line_comment_at,
};

/// Placeholder style a driver understands natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
    /// SQLite-style placeholders like `?1`.
    #[default]
    Sqlite,
}

impl PlaceholderStyle {
    fn sigil(self) -> u8 {
        match self {
            PlaceholderStyle::Postgres => b'$',
            PlaceholderStyle::Sqlite => b'?',
        }
    }

    fn foreign_sigil(self) -> u8 {
        match self {
            PlaceholderStyle::Postgres => b'?',
            PlaceholderStyle::Sqlite => b'$',
        }
    }
}

/// Rewrite numbered placeholders into the `target` style.
///
/// Quoted strings, comments and dollar-quoted blocks are left alone. The
/// scanner is small and may miss exotic SQL; keep dialect
/// specific bodies (PL/pgSQL and the like) in the driver's native style.
///
/// Returns a borrowed `Cow` when nothing needed rewriting.
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle, enabled: bool) -> Cow<'_, str> {
    if !enabled {
        return Cow::Borrowed(sql);
    }

    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        // Every token the scanner cares about is ASCII, so idx stays on a char boundary.
        let width = sql[idx..].chars().next().map_or(1, char::len_utf8);
        let mut copy_end = idx + width;

        match state {
            State::Normal => {
                if b == b'\'' {
                    state = State::SingleQuoted;
                } else if b == b'"' {
                    state = State::DoubleQuoted;
                } else if line_comment_at(bytes, idx) {
                    state = State::LineComment;
                } else if block_comment_start_at(bytes, idx) {
                    state = State::BlockComment(1);
                } else if b == b'$'
                    && let Some((tag, tag_end)) = dollar_tag_at(bytes, idx)
                {
                    state = State::DollarQuoted(tag);
                    copy_end = tag_end + 1;
                } else if b == target.foreign_sigil()
                    && let Some((digits_end, digits)) = digits_at(bytes, idx + 1)
                {
                    let buf = out.get_or_insert_with(|| sql[..idx].to_string());
                    buf.push(char::from(target.sigil()));
                    buf.push_str(digits);
                    idx = digits_end;
                    continue;
                }
            }
            State::SingleQuoted | State::DoubleQuoted => {
                let quote = if state == State::SingleQuoted { b'\'' } else { b'"' };
                if b == quote {
                    if bytes.get(idx + 1) == Some(&quote) {
                        copy_end = idx + 2;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if block_comment_start_at(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    copy_end = idx + 2;
                } else if block_comment_end_at(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    copy_end = idx + 2;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && dollar_tag_closes_at(bytes, idx, tag) {
                    copy_end = idx + tag.len() + 2;
                    state = State::Normal;
                }
            }
        }

        if let Some(buf) = out.as_mut() {
            buf.push_str(&sql[idx..copy_end]);
        }
        idx = copy_end;
    }

    match out {
        Some(buf) => Cow::Owned(buf),
        None => Cow::Borrowed(sql),
    }
}
