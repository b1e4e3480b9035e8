//! URL helpers for tab filtering
//!
//! These functions work directly on string slices and never allocate.

/// Get the position after the scheme separator.
///
/// Handles both hierarchical (`https://`) and opaque (`about:`,
/// `view-source:`) schemes.
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    let colon_pos = bytes.iter().position(|&b| b == b':')?;
    if colon_pos == 0 || !bytes[..colon_pos].iter().all(is_scheme_byte) {
        return None;
    }

    if bytes.len() > colon_pos + 2
        && bytes[colon_pos + 1] == b'/'
        && bytes[colon_pos + 2] == b'/'
    {
        return Some(colon_pos + 3);
    }

    Some(colon_pos + 1)
}

#[inline]
fn is_scheme_byte(b: &u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.')
}

/// Case-insensitive prefix test on the scheme part of a URL.
#[inline]
fn starts_with_ignore_case(url: &str, prefix: &str) -> bool {
    url.len() >= prefix.len() && url.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Does `url` belong to a browser-internal or extension page?
pub fn is_privileged<S: AsRef<str>>(url: &str, prefixes: &[S]) -> bool {
    prefixes
        .iter()
        .any(|prefix| starts_with_ignore_case(url, prefix.as_ref()))
}

/// Can CSS be injected into a tab showing `url`?
///
/// Tabs without a visible URL (no host permission) are never injectable.
pub fn is_injectable<S: AsRef<str>>(url: Option<&str>, prefixes: &[S]) -> bool {
    match url {
        Some(url) if !url.is_empty() => get_scheme_end(url).is_some() && !is_privileged(url, prefixes),
        _ => false,
    }
}
