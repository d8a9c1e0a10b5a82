//! Output file naming.
//!
//! `certificate-<sanitized name>.png`, where the sanitized name keeps ASCII
//! digits, lowercases ASCII letters and maps every other character to `_`.
//! Distinct names can sanitize to the same string ("A!" and "A?" both give
//! "a_"); callers writing to one directory then overwrite earlier output.

pub const FILE_PREFIX: &str = "certificate-";
pub const FILE_EXTENSION: &str = "png";

/// Maps a name to its filename-safe form.
///
/// Idempotent: the output only contains `[a-z0-9_]`.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// Builds the output file name for a certificate.
pub fn certificate_file_name(name: &str) -> String {
    format!("{FILE_PREFIX}{}.{FILE_EXTENSION}", sanitize(name))
}
