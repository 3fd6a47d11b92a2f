//! Input validation for the two public operations.
//!
//! Both checks are pure functions: expected-invalid input comes back as a
//! [`ValidationError`] with a specific reason, never a panic. The reason
//! strings are surfaced verbatim in 400 responses.

use thiserror::Error;

/// Maximum accepted search query length in characters, after trimming.
pub const MAX_QUERY_LEN: usize = 200;

/// Largest catalog identifier the service will accept.
pub const MAX_MOVIE_ID: i64 = 10_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("search query cannot be empty")]
    EmptyQuery,
    #[error("search query cannot exceed {MAX_QUERY_LEN} characters")]
    QueryTooLong,
    #[error("search query contains control characters")]
    ControlCharacters,
    #[error("movie id is required")]
    MissingId,
    #[error("movie id must be a base-10 integer")]
    NotAnInteger,
    #[error("movie id must be positive")]
    NotPositive,
    #[error("movie id cannot exceed {MAX_MOVIE_ID}")]
    IdTooLarge,
}

/// Validate a free-text search query.
///
/// Returns the trimmed query on success. Fails on empty-after-trim input,
/// length over [`MAX_QUERY_LEN`], or embedded ASCII control characters.
pub fn validate_search_query(raw: &str) -> Result<&str, ValidationError> {
    let query = raw.trim();
    if query.is_empty() {
        return Err(ValidationError::EmptyQuery);
    }
    // Character count, not byte length: multibyte titles must not hit the
    // limit early.
    if query.chars().count() > MAX_QUERY_LEN {
        return Err(ValidationError::QueryTooLong);
    }
    if query.chars().any(|c| ('\x00'..='\x1f').contains(&c)) {
        return Err(ValidationError::ControlCharacters);
    }
    Ok(query)
}

/// Validate a caller-supplied movie identifier in string form.
///
/// Accepts only a plain positive base-10 integer no larger than
/// [`MAX_MOVIE_ID`]. The round-trip check (`n.to_string() == trimmed`)
/// rejects decimal points, leading zeros, and sign prefixes that a bare
/// parse would let through.
pub fn validate_movie_id(raw: &str) -> Result<u64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingId);
    }
    let id: i64 = trimmed
        .parse()
        .map_err(|_| ValidationError::NotAnInteger)?;
    if id <= 0 {
        return Err(ValidationError::NotPositive);
    }
    if id > MAX_MOVIE_ID {
        return Err(ValidationError::IdTooLarge);
    }
    if id.to_string() != trimmed {
        return Err(ValidationError::NotAnInteger);
    }
    Ok(id as u64)
}
