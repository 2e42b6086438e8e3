//! Client platform probing from request metadata

use once_cell::sync::Lazy;
use regex::Regex;

static MOBILE_USER_AGENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Android|iPhone|iPad|iPod").unwrap()
});

/// Check whether a user agent string belongs to a mobile-class device
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    MOBILE_USER_AGENT_REGEX.is_match(user_agent)
}

/// Interpret the `Sec-CH-UA-Mobile` client hint (`?1` means mobile)
pub fn client_hint_mobile(hint: &str) -> Option<bool> {
    match hint.trim() {
        "?1" => Some(true),
        "?0" => Some(false),
        _ => None,
    }
}

/// Mobile-class when either the client hint or the user agent says so
pub fn is_mobile_client(client_hint: Option<&str>, user_agent: Option<&str>) -> bool {
    if client_hint.and_then(client_hint_mobile) == Some(true) {
        return true;
    }
    user_agent.map(is_mobile_user_agent).unwrap_or(false)
}
