use crate::errors::{ErrorKind, RowshapeError, RowshapeResult};
use regex::Regex;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

/// Returns true when `name` can be used unquoted as a table or column name.
pub fn is_valid_identifier(name: &str) -> bool {
    match IDENTIFIER.as_ref() {
        Some(re) => re.is_match(name),
        None => false,
    }
}

/// Fails with `InvalidFieldName` unless `name` is a plain SQL identifier.
pub fn validate_identifier(name: &str, context: &str) -> RowshapeResult<()> {
    if is_valid_identifier(name) {
        return Ok(());
    }
    log::error!("Invalid {} name '{}'", context, name);
    Err(RowshapeError::new(
        &format!("Invalid {} name '{}'", context, name),
        ErrorKind::InvalidFieldName,
    ))
}
