//! Company slug generation
//!
//! Slugs are lowercase ASCII alphanumerics separated by single dashes. Uniqueness is
//! never checked up front: sign-up retries with a timestamp suffix on conflict, and
//! self-repair slugs embed the identity id prefix plus a millisecond timestamp.

use sha2::{Digest, Sha256};

use crate::constants::FALLBACK_SLUG;

/// Turn a display name into a URL-safe slug.
///
/// ```
/// use marquee::tenant::slug::slugify;
///
/// assert_eq!(slugify("Acme Signs, Inc."), "acme-signs-inc");
/// assert_eq!(slugify("  ¡¡!!  "), "company");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Check that a slug is non-empty and made of dash-separated `[a-z0-9]` runs.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.split('-').all(|run| {
            !run.is_empty()
                && run
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}

/// Append a timestamp disambiguator to a slug that collided.
pub fn disambiguate(slug: &str, millis: u64) -> String {
    format!("{slug}-{millis}")
}

/// Slug for a company created by self-repair.
///
/// Combines the identity id prefix with the timestamp so that repairs for distinct
/// identities never collide, even within the same millisecond. At least one id
/// character is always kept. Ids without ASCII alphanumerics contribute a prefix of
/// their SHA-256 digest instead.
///
/// ```
/// use marquee::tenant::slug::repair_slug;
///
/// let slug = repair_slug("empresa", "3F2A9C1B-77d0-4c11", 8, 1704067200000);
/// assert_eq!(slug, "empresa-3f2a9c1b-1704067200000");
/// ```
pub fn repair_slug(prefix: &str, identity_id: &str, id_prefix_len: usize, millis: u64) -> String {
    let id_prefix_len = id_prefix_len.max(1);
    let id_prefix: String = identity_id
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(id_prefix_len)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let id_prefix = if id_prefix.is_empty() {
        hex::encode(Sha256::digest(identity_id.as_bytes()))
            .chars()
            .take(id_prefix_len)
            .collect()
    } else {
        id_prefix
    };
    format!("{}-{id_prefix}-{millis}", slugify(prefix))
}
