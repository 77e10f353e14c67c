// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! Browser impersonation profiles with realistic header sets.

use crate::error::FluxionError;

/// A frozen browser impersonation profile.
#[derive(Debug, Clone, Copy)]
pub struct BrowserProfile {
    pub name: &'static str,
    pub user_agent: &'static str,
    pub headers: &'static [(&'static str, &'static str)],
    pub sec_headers: &'static [(&'static str, &'static str)],
}

const CHROME: BrowserProfile = BrowserProfile {
    name: "chrome",
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    headers: &[
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8"),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Accept-Encoding", "gzip, deflate, br, zstd"),
        ("Cache-Control", "no-cache"),
        ("Pragma", "no-cache"),
        ("Upgrade-Insecure-Requests", "1"),
    ],
    sec_headers: &[
        ("Sec-Ch-Ua", "\"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\", \"Google Chrome\";v=\"131\""),
        ("Sec-Ch-Ua-Mobile", "?0"),
        ("Sec-Ch-Ua-Platform", "\"Windows\""),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
        ("Sec-Fetch-User", "?1"),
    ],
};

const FIREFOX: BrowserProfile = BrowserProfile {
    name: "firefox",
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:134.0) Gecko/20100101 Firefox/134.0",
    headers: &[
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        ("Accept-Language", "en-US,en;q=0.5"),
        ("Accept-Encoding", "gzip, deflate, br, zstd"),
        ("DNT", "1"),
        ("Upgrade-Insecure-Requests", "1"),
        ("Connection", "keep-alive"),
    ],
    sec_headers: &[
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
        ("Sec-Fetch-User", "?1"),
    ],
};

const EDGE: BrowserProfile = BrowserProfile {
    name: "edge",
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
    headers: &[
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8"),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Accept-Encoding", "gzip, deflate, br, zstd"),
        ("Cache-Control", "no-cache"),
        ("Pragma", "no-cache"),
        ("Upgrade-Insecure-Requests", "1"),
    ],
    sec_headers: &[
        ("Sec-Ch-Ua", "\"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\", \"Microsoft Edge\";v=\"131\""),
        ("Sec-Ch-Ua-Mobile", "?0"),
        ("Sec-Ch-Ua-Platform", "\"Windows\""),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
        ("Sec-Fetch-User", "?1"),
    ],
};

const SAFARI: BrowserProfile = BrowserProfile {
    name: "safari",
    user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.2 Safari/605.1.15",
    headers: &[
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Accept-Encoding", "gzip, deflate, br"),
        ("Connection", "keep-alive"),
    ],
    sec_headers: &[
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
    ],
};

const PROFILES: &[BrowserProfile] = &[CHROME, FIREFOX, EDGE, SAFARI];

/// Return a browser profile by (case-insensitive) name.
pub fn get_profile(name: &str) -> crate::error::Result<BrowserProfile> {
    let lower = name.to_lowercase();
    PROFILES
        .iter()
        .copied()
        .find(|p| p.name == lower)
        .ok_or_else(|| {
            FluxionError::stealth(format!("Unknown browser profile: {name:?}"))
                .with_suggestion(format!("Available profiles: {}", profile_names().join(", ")))
        })
}

/// Sorted list of available profile names.
pub fn profile_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = PROFILES.iter().map(|p| p.name).collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_profiles_resolve_case_insensitively() {
        assert_eq!(get_profile("Chrome").unwrap().name, "chrome");
        assert_eq!(get_profile("FIREFOX").unwrap().name, "firefox");
    }

    #[test]
    fn unknown_profile_lists_available_names() {
        let err = get_profile("opera").unwrap_err();
        assert_eq!(err.category(), "stealth");
        assert_eq!(
            err.suggestion(),
            Some("Available profiles: chrome, edge, firefox, safari")
        );
    }

    #[test]
    fn profile_names_are_sorted() {
        assert_eq!(profile_names(), vec!["chrome", "edge", "firefox", "safari"]);
    }
}
