//! Percent-encodes a package name for use as a URL path segment, preserving
//! the scoped-package leading `@` the way an npm-compatible registry expects
//! it (`@scope/pkg` → `@scope%2Fpkg`, not `%40scope%2Fpkg`).

/// Encodes a package name for the metadata request path.
pub fn encode_package_name(name: &str) -> String {
    let encoded = urlencoding::encode(name).into_owned();
    if let Some(rest) = encoded.strip_prefix("%40") {
        format!("@{rest}")
    } else {
        encoded
    }
}

#[cfg(test)]
#[path = "encode_test.rs"]
mod encode_test;
