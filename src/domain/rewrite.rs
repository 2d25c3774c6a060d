//! Textual URL rewriting for proxied stylesheets.
//!
//! Upstream stylesheets reference font files by absolute URL on the asset
//! host. Swapping that prefix for the proxy's own base routes every follow-up
//! asset request back through the proxy. No CSS parsing is involved; the
//! substitution is a plain byte search.

use bytes::Bytes;

/// Replace every occurrence of `origin_asset_base` in `body` with `proxy_base`.
///
/// Matches are found left to right and never overlap. An empty search string
/// leaves the body untouched.
pub fn rewrite(body: &[u8], origin_asset_base: &str, proxy_base: &str) -> Bytes {
    let needle = origin_asset_base.as_bytes();
    if needle.is_empty() {
        return Bytes::copy_from_slice(body);
    }

    let replacement = proxy_base.as_bytes();
    let mut output = Vec::with_capacity(body.len());
    let mut rest = body;
    while let Some(position) = find(rest, needle) {
        output.extend_from_slice(&rest[..position]);
        output.extend_from_slice(replacement);
        rest = &rest[position + needle.len()..];
    }
    output.extend_from_slice(rest);

    Bytes::from(output)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
