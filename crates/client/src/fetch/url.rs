//! URL normalization for consistent cache keys and fetch targets.

use lunchbox_core::Error;

/// Strip the fragment from a URL.
///
/// Fragments are never sent to a server, so `/menu#denni-menu` and `/menu`
/// are the same page and must share a cache key. Parseable URLs are
/// re-serialized without their fragment; anything else is cut at the first
/// `#` and otherwise left alone, leaving rejection to [`validate`].
pub fn normalize(input: &str) -> String {
    let trimmed = input.trim();

    match url::Url::parse(trimmed) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.into()
        }
        Err(_) => match trimmed.split_once('#') {
            Some((head, _)) => head.to_string(),
            None => trimmed.to_string(),
        },
    }
}

/// Parse a normalized URL, accepting only absolute http(s) URLs with a host.
pub fn validate(normalized: &str) -> Result<url::Url, Error> {
    if normalized.is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }

    let parsed =
        url::Url::parse(normalized).map_err(|e| Error::InvalidInput(format!("invalid url {normalized:?}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(Error::InvalidInput(format!("unsupported scheme: {scheme}"))),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidInput(format!("url has no host: {normalized}")));
    }

    Ok(parsed)
}
