//! User-Agent header parsing.
//!
//! Extracts the handful of fields stored with each visit row: the Mozilla
//! token version, platform and OS from the first comment, the layout engine,
//! the browser, and whether the client is a mobile device.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static MOZILLA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Mozilla/([\d.]+)").unwrap());

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]*)\)").unwrap());

/// Layout engines, most specific first. Gecko is last because WebKit
/// agents carry a "like Gecko" comment.
static ENGINES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"AppleWebKit/([\d.+]+)").unwrap(), "AppleWebKit"),
        (Regex::new(r"Trident/([\d.]+)").unwrap(), "Trident"),
        (Regex::new(r"Presto/([\d.]+)").unwrap(), "Presto"),
        (Regex::new(r"Gecko/([\d.]+)").unwrap(), "Gecko"),
    ]
});

/// Browser product tokens. Order matters: Chromium derivatives also send
/// `Chrome/` and `Safari/`, Chrome also sends `Safari/`.
static BROWSERS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"Edg(?:e|A|iOS)?/([\d.]+)").unwrap(), "Edge"),
        (Regex::new(r"OPR/([\d.]+)").unwrap(), "Opera"),
        (Regex::new(r"Opera/[\d.]+.*Version/([\d.]+)").unwrap(), "Opera"),
        (Regex::new(r"SamsungBrowser/([\d.]+)").unwrap(), "Samsung Internet"),
        (Regex::new(r"(?:CriOS|Chrome)/([\d.]+)").unwrap(), "Chrome"),
        (Regex::new(r"(?:FxiOS|Firefox)/([\d.]+)").unwrap(), "Firefox"),
        (Regex::new(r"Version/([\d.]+).*Safari/").unwrap(), "Safari"),
        (Regex::new(r"MSIE ([\d.]+)").unwrap(), "Internet Explorer"),
        (Regex::new(r"Trident/.*rv:([\d.]+)").unwrap(), "Internet Explorer"),
    ]
});

static MOBILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Mobi|iPhone|iPod|Windows Phone|BlackBerry").unwrap());

/// Fields derived from a raw User-Agent string. Unknown parts are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserAgentInfo {
    pub mobile: bool,
    pub mozilla_version: String,
    pub platform: String,
    pub os: String,
    pub engine_name: String,
    pub engine_version: String,
    pub browser_name: String,
    pub browser_version: String,
    pub raw: String,
}

impl UserAgentInfo {
    pub fn parse(header: &str) -> Self {
        let raw = header.trim();

        let mozilla_version = MOZILLA
            .captures(raw)
            .map(|c| c[1].to_string())
            .unwrap_or_default();

        let (platform, os) = COMMENT
            .captures(raw)
            .map(|c| platform_and_os(&c[1]))
            .unwrap_or_default();

        let (engine_name, engine_version) = first_match(&ENGINES, raw);
        let (browser_name, browser_version) = first_match(&BROWSERS, raw);

        Self {
            mobile: MOBILE.is_match(raw),
            mozilla_version,
            platform,
            os,
            engine_name,
            engine_version,
            browser_name,
            browser_version,
            raw: header.to_string(),
        }
    }
}

fn first_match(patterns: &[(Regex, &'static str)], raw: &str) -> (String, String) {
    patterns
        .iter()
        .find_map(|(re, name)| re.captures(raw).map(|c| (name.to_string(), c[1].to_string())))
        .unwrap_or_default()
}

/// Split the first comment, e.g. `Windows NT 10.0; Win64; x64`.
fn platform_and_os(comment: &str) -> (String, String) {
    let tokens: Vec<&str> = comment
        .split(';')
        .map(str::trim)
        // "U" is the legacy encryption-strength token
        .filter(|t| !t.is_empty() && *t != "U")
        .collect();

    let Some(first) = tokens.first() else {
        return (String::new(), String::new());
    };

    if let Some(nt) = first.strip_prefix("Windows NT ") {
        return ("Windows".to_string(), windows_name(nt));
    }
    if first.starts_with("Windows") {
        return ("Windows".to_string(), first.to_string());
    }

    let os = tokens.get(1).map(|s| s.to_string()).unwrap_or_default();
    (first.to_string(), os)
}

fn windows_name(nt_version: &str) -> String {
    let name = match nt_version {
        "10.0" => "Windows 10",
        "6.3" => "Windows 8.1",
        "6.2" => "Windows 8",
        "6.1" => "Windows 7",
        "6.0" => "Windows Vista",
        "5.2" => "Windows XP x64 Edition",
        "5.1" => "Windows XP",
        "5.0" => "Windows 2000",
        other => return format!("Windows NT {other}"),
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_on_windows() {
        let ua = UserAgentInfo::parse(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        );
        assert_eq!(ua.mozilla_version, "5.0");
        assert_eq!(ua.platform, "Windows");
        assert_eq!(ua.os, "Windows 10");
        assert_eq!(ua.engine_name, "AppleWebKit");
        assert_eq!(ua.engine_version, "537.36");
        assert_eq!(ua.browser_name, "Chrome");
        assert_eq!(ua.browser_version, "131.0.0.0");
        assert!(!ua.mobile);
    }

    #[test]
    fn test_firefox_on_mac() {
        let ua = UserAgentInfo::parse(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
        );
        assert_eq!(ua.platform, "Macintosh");
        assert_eq!(ua.os, "Intel Mac OS X 10.15");
        assert_eq!(ua.engine_name, "Gecko");
        assert_eq!(ua.engine_version, "20100101");
        assert_eq!(ua.browser_name, "Firefox");
        assert_eq!(ua.browser_version, "133.0");
    }

    #[test]
    fn test_safari_on_iphone_is_mobile() {
        let ua = UserAgentInfo::parse(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
        );
        assert!(ua.mobile);
        assert_eq!(ua.platform, "iPhone");
        assert_eq!(ua.os, "CPU iPhone OS 17_0 like Mac OS X");
        assert_eq!(ua.browser_name, "Safari");
        assert_eq!(ua.browser_version, "17.0");
    }

    #[test]
    fn test_edge_is_not_reported_as_chrome() {
        let ua = UserAgentInfo::parse(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
        );
        assert_eq!(ua.browser_name, "Edge");
        assert_eq!(ua.browser_version, "131.0.0.0");
    }

    #[test]
    fn test_android_chrome() {
        let ua = UserAgentInfo::parse(
            "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Mobile Safari/537.36",
        );
        assert!(ua.mobile);
        assert_eq!(ua.platform, "Linux");
        assert_eq!(ua.os, "Android 14");
        assert_eq!(ua.browser_name, "Chrome");
    }

    #[test]
    fn test_unknown_agent() {
        let ua = UserAgentInfo::parse("curl/8.5.0");
        assert_eq!(ua.mozilla_version, "");
        assert_eq!(ua.platform, "");
        assert_eq!(ua.browser_name, "");
        assert_eq!(ua.raw, "curl/8.5.0");
        assert!(!ua.mobile);

        assert_eq!(UserAgentInfo::parse(""), UserAgentInfo::default());
    }

    #[test]
    fn test_raw_header_kept_verbatim() {
        let header = "  Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/128.0 ";
        let ua = UserAgentInfo::parse(header);
        assert_eq!(ua.raw, header);
        assert_eq!(ua.mozilla_version, "5.0");
        assert_eq!(ua.browser_name, "Firefox");
    }
}
