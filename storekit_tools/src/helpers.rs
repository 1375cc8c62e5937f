use crate::StoreApiError;

/// Substitutes `value` for `{placeholder}` in an endpoint template.
///
/// Identifiers are interpolated into the URL path, so anything that could escape the path segment is refused.
pub fn fill_path(template: &str, placeholder: &str, value: &str) -> Result<String, StoreApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreApiError::RestRequestError(format!("No value given for {placeholder}")));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')) || value.contains("..") {
        return Err(StoreApiError::RestRequestError(format!("'{value}' is not a valid {placeholder}")));
    }
    Ok(template.replace(&format!("{{{placeholder}}}"), value))
}
