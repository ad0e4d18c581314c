//! Input validation and sanitization for user-supplied text, URLs and IDs.

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Default Discord message limit.
pub const DEFAULT_MAX_LENGTH: usize = 2000;
const MAX_GAME_NAME: usize = 200;
const WEBHOOK_PREFIX: &str = "https://discord.com/api/webhooks/";
const LEGACY_WEBHOOK_PREFIX: &str = "https://discordapp.com/api/webhooks/";

static CONTROL_CHARS_REGEX: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_REGEX: OnceLock<Regex> = OnceLock::new();
static UNSAFE_NAME_REGEX: OnceLock<Regex> = OnceLock::new();

fn control_chars_regex() -> &'static Regex {
    CONTROL_CHARS_REGEX.get_or_init(|| {
        Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("Control chars regex is valid")
    })
}

fn whitespace_regex() -> &'static Regex {
    WHITESPACE_REGEX.get_or_init(|| Regex::new(r"\s+").expect("Whitespace regex is valid"))
}

fn unsafe_name_regex() -> &'static Regex {
    UNSAFE_NAME_REGEX
        .get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("Unsafe name regex is valid"))
}

/// Strip control characters (newlines and tabs survive) and cap the length at
/// `max_length` characters, marking truncation with `...`.
pub fn sanitize_string(text: &str, max_length: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let cleaned = control_chars_regex().replace_all(text, "");
    let truncated = if cleaned.chars().count() > max_length {
        let keep: String = cleaned.chars().take(max_length.saturating_sub(3)).collect();
        format!("{keep}...")
    } else {
        cleaned.into_owned()
    };

    truncated.trim().to_string()
}

/// `true` for absolute http(s) URLs with a host.
pub fn validate_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|h| !h.is_empty())
        },
        Err(_) => false,
    }
}

/// Trimmed URL if it validates.
pub fn sanitize_url(url: &str) -> Option<String> {
    let url = url.trim();
    validate_url(url).then(|| url.to_string())
}

/// Normalise a game title for searching and storage.
pub fn clean_game_name(name: &str) -> String {
    let collapsed = whitespace_regex().replace_all(name.trim(), " ");
    let cleaned = unsafe_name_regex().replace_all(&collapsed, "");
    cleaned.chars().take(MAX_GAME_NAME).collect()
}

fn positive_decimal(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) && id.bytes().any(|b| b != b'0')
}

/// Discord snowflakes are 17 to 19 digits.
pub fn validate_discord_id(id: &str) -> bool {
    (17..=19).contains(&id.len()) && positive_decimal(id)
}

/// SteamID64 values have at least 17 digits.
pub fn validate_steam_id(id: &str) -> bool {
    id.len() >= 17 && positive_decimal(id)
}

/// Accept Discord webhook URLs only, rewriting the legacy `discordapp.com` host.
pub fn sanitize_webhook_url(url: &str) -> Option<String> {
    let url = url.trim();
    let url = if url.starts_with(WEBHOOK_PREFIX) {
        url.to_string()
    } else if let Some(rest) = url.strip_prefix(LEGACY_WEBHOOK_PREFIX) {
        format!("{WEBHOOK_PREFIX}{rest}")
    } else {
        return None;
    };

    validate_url(&url).then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_string_strips_control_chars() {
        assert_eq!(sanitize_string("a\u{0}b\tc\nd\u{7f}", 100), "ab\tc\nd");
        assert_eq!(sanitize_string("", 10), "");
        assert_eq!(sanitize_string("  padded  ", 100), "padded");
    }

    #[test]
    fn test_sanitize_string_truncates_on_chars() {
        let out = sanitize_string(&"é".repeat(20), 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_urls() {
        assert!(validate_url("https://store.steampowered.com/app/1"));
        assert!(!validate_url("ftp://example.com"));
        assert!(!validate_url("not a url"));
        assert_eq!(sanitize_url("  http://a.io/x "), Some("http://a.io/x".to_string()));
        assert_eq!(sanitize_url(""), None);
    }

    #[test]
    fn test_clean_game_name() {
        assert_eq!(clean_game_name("  Half   Life: 2?  "), "Half Life 2");
        assert_eq!(clean_game_name(&"x".repeat(300)).len(), 200);
    }

    #[test]
    fn test_ids() {
        assert!(validate_discord_id("123456789012345678"));
        assert!(!validate_discord_id("1234"));
        assert!(!validate_discord_id("12345678901234567a"));
        assert!(!validate_discord_id("00000000000000000"));
        assert!(validate_steam_id("76561197960287930"));
        assert!(!validate_steam_id("7656119796028793"));
    }

    #[test]
    fn test_webhook_urls() {
        assert_eq!(
            sanitize_webhook_url("https://discordapp.com/api/webhooks/1/abc"),
            Some("https://discord.com/api/webhooks/1/abc".to_string())
        );
        assert!(sanitize_webhook_url("https://discord.com/api/webhooks/1/abc").is_some());
        assert_eq!(sanitize_webhook_url("https://evil.com/api/webhooks/1"), None);
    }
}
