//! Reading values out of a `document.cookie` style string.

/// Cookie the server issues on the dashboard page.
pub const CSRF_COOKIE_NAME: &str = "csrftoken";

/// Header a state-changing request echoes the cookie back in.
pub const CSRF_HEADER_NAME: &str = "X-CSRFToken";

/// Finds `name` in a raw cookie string such as `"a=1; b=2"` and returns its
/// percent-decoded value.
///
/// The first pair whose key matches wins. An empty cookie string, a missing
/// name, or a value that is not valid percent-encoded UTF-8 all yield `None`.
pub fn get_cookie(raw: &str, name: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }

    let prefix = format!("{name}=");
    raw.split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(&prefix))
        .filter(|value| has_valid_escapes(value))
        .and_then(|value| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
}

/// Every `%` must start a two hex digit escape. `urlencoding` passes broken
/// escapes through untouched.
fn has_valid_escapes(value: &str) -> bool {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !matches!(escape, Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit())
            {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}
