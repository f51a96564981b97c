use std::sync::LazyLock;

use email_address::EmailAddress;
use regex::Regex;
use url::Url;

static USER_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("valid regex"));
static USERNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9_]{3,32}$").expect("valid regex"));

/// Returns `true` if the provided string is a syntactically valid email address.
pub fn is_valid_email(value: &str) -> bool {
    EmailAddress::is_valid(value)
}

/// Returns `true` if the provided string parses as an http(s) URL.
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Identity-provider subject ids: ASCII alphanumerics, `_` and `-`.
pub fn is_valid_user_id(value: &str) -> bool {
    USER_ID_PATTERN.is_match(value)
}

/// Public handles shown on channel pages.
pub fn is_valid_username(value: &str) -> bool {
    USERNAME_PATTERN.is_match(value)
}
