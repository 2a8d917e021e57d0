//! Store path resolution.
//!
//! Paths inside a bucket are handled with POSIX semantics and are always
//! absolute (`/prefix/name`). Object keys handed to the store are the same
//! string without the leading `/`.

use percent_encoding::percent_encode_byte;

/// Characters the store rejects (or mangles) in object keys.
const KEY_SPECIAL_CHARS: [char; 9] = [' ', '!', '\'', '(', ')', '#', '*', '+', '?'];

pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

pub fn ensure_leading_slash(path: &str) -> String {
    if is_absolute(path) {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Join `filename` onto `prefix` and normalize the result.
///
/// An absolute `filename` replaces the prefix. `.` and empty segments are
/// dropped, `..` removes the previous segment but never climbs above `/`.
pub fn resolve(prefix: &str, filename: &str) -> String {
    let joined = if is_absolute(filename) {
        filename.to_string()
    } else {
        format!("{}/{}", ensure_leading_slash(prefix), filename)
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    format!("/{}", segments.join("/"))
}

/// Percent-encode the characters listed in [`KEY_SPECIAL_CHARS`].
///
/// Everything else, non-ASCII text included, is kept as is.
pub fn encode_special_chars(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for c in path.chars() {
        if KEY_SPECIAL_CHARS.contains(&c) {
            // Listed characters are ASCII, so the char is a single byte.
            encoded.push_str(percent_encode_byte(c as u8));
        } else {
            encoded.push(c);
        }
    }
    encoded
}

/// The object key for an absolute store path.
pub fn object_key(resolved: &str) -> &str {
    resolved.trim_start_matches('/')
}
