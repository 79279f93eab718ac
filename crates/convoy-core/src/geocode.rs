//! Geocoding lookup contract.

use async_trait::async_trait;

use crate::error::TrackError;
use crate::types::Coordinate;

/// Resolves a free-text location name to a coordinate.
///
/// `Ok(None)` means "not found". `Err` is reserved for transport failures;
/// callers treat both as an unresolved role.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, TrackError>;
}

/// Normalized lookup key: trimmed, whitespace-collapsed, lowercase.
pub fn normalize_address(address: &str) -> String {
    address.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_folds_case_and_spacing() {
        assert_eq!(normalize_address("  Port   X "), "port x");
        assert_eq!(normalize_address("Nhava Sheva\tTerminal"), "nhava sheva terminal");
    }
}
