//! Session-token lookup from the browser's cookie store.

use crate::page::ChallengePage;
use tracing::warn;

/// Cookie the host keeps its session token in.
pub const TOKEN_COOKIE: &str = "jwt_token";

/// Read the host session token. `None` means "not authenticated" — logged
/// and treated as a non-fatal inability to use the API path; the DOM-driven
/// loop keeps working without it.
pub async fn auth_token(page: &dyn ChallengePage) -> Option<String> {
    match page.cookie(TOKEN_COOKIE).await {
        Ok(Some(token)) => Some(token),
        Ok(None) => {
            warn!("no {TOKEN_COOKIE} cookie found; log in to enable API access");
            None
        }
        Err(e) => {
            warn!("cookie lookup failed: {e}");
            None
        }
    }
}
