//! URL helpers for the vendor's API host.

use once_cell::sync::Lazy;
use url::Url;

pub const BASE_URL: &str = "http://music.163.com";

static BASE: Lazy<Url> = Lazy::new(|| Url::parse(BASE_URL).expect("base url literal"));

/// Resolve a relative URL against [`BASE_URL`].
pub fn to_absolute(relative: &str) -> Result<Url, url::ParseError> {
    BASE.join(relative)
}

/// Whether `url` points at an obfuscated endpoint that requires the
/// [`weapi`](crate::weapi) encryption envelope.
pub fn is_weapi(url: &Url) -> bool {
    url.host_str() == BASE.host_str() && url.path().starts_with("/weapi")
}
