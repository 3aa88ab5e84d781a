//! Bounded path utilities.
//!
//! Every mutating helper takes the maximum length the result may have and
//! fails with [`VfsError::PathTooLong`] instead of growing past it. Paths
//! use `/` as the only separator.

use crate::error::{VfsError, VfsResult};

/// Path separator.
pub const SEPARATOR: char = '/';

/// Check whether `c` is a path separator.
pub fn is_separator(c: char) -> bool {
    c == SEPARATOR
}

/// Parse the next path component from `cursor`.
///
/// The cursor is advanced past the component and the separator following
/// it, even when the component turns out to be invalid.
pub fn parse_component<'a>(cursor: &mut &'a str, name_max: usize) -> VfsResult<&'a str> {
    let s = *cursor;
    let end = s.find(is_separator).unwrap_or(s.len());
    let name = &s[..end];

    *cursor = if end < s.len() { &s[end + 1..] } else { &s[end..] };

    if name.is_empty() {
        return Err(VfsError::InvalidPath(s.to_string()));
    }
    if name.len() > name_max {
        return Err(VfsError::NameTooLong);
    }
    Ok(name)
}

/// Append `s` to `buf`, joining with exactly one separator when both sides
/// are non-empty and neither provides one.
pub fn append(buf: &mut String, s: &str, max: usize) -> VfsResult<()> {
    let needs_sep = !buf.is_empty()
        && !buf.ends_with(SEPARATOR)
        && !s.is_empty()
        && !s.starts_with(SEPARATOR);

    if buf.len() + s.len() + usize::from(needs_sep) > max {
        return Err(VfsError::PathTooLong);
    }

    if needs_sep {
        buf.push(SEPARATOR);
    }
    buf.push_str(s);
    Ok(())
}

/// Insert `prefix` in front of `buf`.
///
/// Trailing separators of the prefix are dropped so the join has a single
/// separator. Returns the number of bytes inserted before the original
/// path, so `&buf[n..]` gives the original back.
pub fn prepend(buf: &mut String, prefix: &str, max: usize) -> VfsResult<usize> {
    let prefix = prefix.trim_end_matches(SEPARATOR);
    if prefix.is_empty() {
        return Ok(0);
    }

    let needs_sep = !buf.starts_with(SEPARATOR);
    let added = prefix.len() + usize::from(needs_sep);
    if buf.len() + added > max {
        return Err(VfsError::PathTooLong);
    }

    if needs_sep {
        buf.insert(0, SEPARATOR);
    }
    buf.insert_str(0, prefix);
    Ok(added)
}

/// Make sure `buf` ends with a separator.
pub fn add_separator(buf: &mut String, max: usize) -> VfsResult<()> {
    if buf.ends_with(SEPARATOR) {
        return Ok(());
    }
    if buf.len() + 1 > max {
        return Err(VfsError::PathTooLong);
    }
    buf.push(SEPARATOR);
    Ok(())
}

/// Normalize an absolute path in place.
///
/// Removes `.` segments and redundant separators and resolves `..` against
/// the preceding segment (`..` at the root stays at the root). A single
/// trailing separator is kept if the input had one. The result is never
/// longer than the input and normalizing it again changes nothing.
pub fn normalize(buf: &mut String, max: usize) -> VfsResult<()> {
    if buf.len() > max {
        return Err(VfsError::PathTooLong);
    }
    if !buf.starts_with(SEPARATOR) {
        return Err(VfsError::InvalidPath(buf.clone()));
    }

    let trailing = buf.len() > 1 && buf.ends_with(SEPARATOR);
    let mut bytes = std::mem::take(buf).into_bytes();
    let n = bytes.len();

    // bytes[..w] is always "/" or "/a/b" (no trailing separator).
    let mut w = 1;
    let mut r = 1;
    while r < n {
        if bytes[r] == b'/' {
            r += 1;
            continue;
        }

        let mut e = r;
        while e < n && bytes[e] != b'/' {
            e += 1;
        }

        match &bytes[r..e] {
            b"." => {}
            b".." => {
                while w > 1 && bytes[w - 1] != b'/' {
                    w -= 1;
                }
                if w > 1 {
                    w -= 1;
                }
            }
            _ => {
                if w > 1 {
                    bytes[w] = b'/';
                    w += 1;
                }
                bytes.copy_within(r..e, w);
                w += e - r;
            }
        }
        r = e;
    }

    if trailing && w > 1 {
        bytes[w] = b'/';
        w += 1;
    }
    bytes.truncate(w);

    // Only whole segments split on an ASCII separator were moved.
    *buf = String::from_utf8(bytes)
        .map_err(|e| VfsError::InvalidPath(String::from_utf8_lossy(e.as_bytes()).into_owned()))?;
    Ok(())
}
