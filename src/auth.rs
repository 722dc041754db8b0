//! Implicit-grant authorization helpers
//!
//! The user opens the URL from [`authorize_url`], approves access, and is sent
//! to the redirect URI with the token in the URL fragment
//! (`#access_token=...&token_type=Bearer&expires_in=3600`).
//! [`token_from_redirect`] pulls the token back out. Nothing here talks to the
//! network.

use url::Url;

use crate::error::{Error, Result};

/// Authorization endpoint of the accounts service
pub const AUTHORIZE_ENDPOINT: &str = "https://accounts.spotify.com/authorize";

/// Every scope the accounts service knows about
pub const ALL_SCOPES: &[&str] = &[
    "ugc-image-upload",
    "user-top-read",
    "user-read-playback-position",
    "user-read-playback-state",
    "user-library-modify",
    "streaming",
    "user-read-private",
    "user-follow-modify",
    "user-library-read",
    "playlist-modify-public",
    "user-read-currently-playing",
    "user-modify-playback-state",
    "user-follow-read",
    "playlist-read-collaborative",
    "playlist-read-private",
    "app-remote-control",
    "user-read-email",
    "user-read-recently-played",
    "playlist-modify-private",
];

/// Scopes that only grant read access
pub fn read_scopes() -> Vec<&'static str> {
    ALL_SCOPES
        .iter()
        .copied()
        .filter(|scope| scope.contains("read"))
        .collect()
}

/// Build the URL a user visits to grant `scopes` to `client_id`
///
/// # Errors
/// Returns [`Error::Auth`] for an unknown scope and [`Error::Config`] if the
/// authorization endpoint cannot be parsed.
pub fn authorize_url(client_id: &str, redirect_uri: &str, scopes: &[&str]) -> Result<Url> {
    if let Some(unknown) = scopes.iter().find(|scope| !ALL_SCOPES.contains(*scope)) {
        return Err(Error::Auth(format!("unknown scope '{unknown}'")));
    }

    let mut url = Url::parse(AUTHORIZE_ENDPOINT).map_err(|e| Error::Config {
        message: format!("invalid authorization endpoint: {e}"),
        key: None,
    })?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "token")
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", &scopes.join(" "));

    Ok(url)
}

/// Extract the bearer token from the URL the user was redirected to
///
/// # Errors
/// Returns [`Error::Auth`] if the URL does not parse or its fragment carries no
/// non-empty `access_token`.
pub fn token_from_redirect(redirect: &str) -> Result<String> {
    let url = Url::parse(redirect.trim())
        .map_err(|e| Error::Auth(format!("redirect is not a URL: {e}")))?;

    let fragment = url
        .fragment()
        .ok_or_else(|| Error::Auth("redirect URL has no fragment".to_string()))?;

    url::form_urlencoded::parse(fragment.as_bytes())
        .find(|(key, _)| key == "access_token")
        .map(|(_, token)| token.into_owned())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| Error::Auth("redirect URL carries no access_token".to_string()))
}
