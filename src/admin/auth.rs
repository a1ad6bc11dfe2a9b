use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::admin::AdminError;

/// Default headers for admin requests: `Authorization: Bearer <token>`
/// when a token is configured.
pub fn auth_headers(token: Option<&str>) -> Result<HeaderMap, AdminError> {
    let mut headers = HeaderMap::new();
    if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| AdminError::InvalidToken)?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}
