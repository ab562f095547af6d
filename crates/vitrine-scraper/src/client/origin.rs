//! URL origin and host extraction for request headers and signing.

/// Scheme+host(+port) origin of `url`.
///
/// Given `"https://shopee.com.br/search?keyword=fone"`, returns
/// `"https://shopee.com.br"`. Falls back to splitting on `/` when the URL
/// does not parse.
#[must_use]
pub fn extract_origin(url: &str) -> String {
    reqwest::Url::parse(url).map_or_else(
        |e| {
            tracing::warn!(url, error = %e, "could not parse URL; falling back to string split for origin");
            url.trim_end_matches('/')
                .splitn(4, '/')
                .take(3)
                .collect::<Vec<_>>()
                .join("/")
        },
        |u| u.origin().ascii_serialization(),
    )
}

/// Host (with a non-default port) of `url`, as sent in the `Host` header.
///
/// Falls back to the full URL string if parsing fails.
#[must_use]
pub fn extract_host(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            let host = u.host_str()?.to_owned();
            Some(match u.port() {
                Some(port) => format!("{host}:{port}"),
                None => host,
            })
        })
        .unwrap_or_else(|| url.to_owned())
}
