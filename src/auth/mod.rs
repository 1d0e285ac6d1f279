pub mod password;

use crate::error::{AppError, AppResult};

/// Validated owner key. Every document query is scoped by this value;
/// constructing one is only possible through an [`OwnerResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerKey(String);

impl OwnerKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns the caller-supplied identity parameter into an [`OwnerKey`].
/// The email-based resolver trusts the parameter as-is; swapping in a
/// session-derived implementation does not touch any document logic.
pub trait OwnerResolver: Send + Sync + 'static {
    fn resolve(&self, supplied: Option<&str>) -> AppResult<OwnerKey>;
}

pub struct EmailOwnerResolver;

impl OwnerResolver for EmailOwnerResolver {
    fn resolve(&self, supplied: Option<&str>) -> AppResult<OwnerKey> {
        let raw = supplied.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(AppError::bad_request("email is required"));
        }
        match raw.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(OwnerKey(raw.to_string()))
            }
            _ => Err(AppError::bad_request("email must be a valid address")),
        }
    }
}
