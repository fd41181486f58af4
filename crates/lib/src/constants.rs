//! Constants used throughout the Marquee library.

/// Prefix of the company name created for an orphaned identity.
///
/// The full name is `"{prefix} {email local part}"`, e.g. `"Empresa de jane"`.
pub const DEFAULT_COMPANY_PREFIX: &str = "Empresa de";

/// Leading segment of slugs generated during self-repair.
pub const REPAIR_SLUG_PREFIX: &str = "empresa";

/// Number of identity-id characters embedded in a repair slug.
pub const SLUG_ID_PREFIX_LEN: usize = 8;

/// Fallback slug segment when a name contains no URL-safe characters.
pub const FALLBACK_SLUG: &str = "company";

/// Capacity of the session command channel.
pub const SESSION_COMMAND_BUFFER: usize = 64;

/// Minimum password length accepted by the in-memory identity store.
pub const MIN_PASSWORD_LEN: usize = 6;
