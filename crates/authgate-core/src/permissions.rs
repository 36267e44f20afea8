//! Permission evaluation.

/// The super-permission that satisfies any requirement.
pub const ADMIN_PERMISSION: &str = "admin";

/// Decide whether a claim set satisfies a required permission.
///
/// Exact string membership only, with one override: a claim set containing
/// [`ADMIN_PERMISSION`] satisfies every requirement. There is no wildcard
/// or prefix matching.
#[must_use]
pub fn satisfies(claims: &[String], required: &str) -> bool {
    claims.iter().any(|c| c == required || c == ADMIN_PERMISSION)
}
