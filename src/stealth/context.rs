// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! Stealth context — assembles final request headers from all stealth sources.

use std::collections::HashMap;

use super::cookies::CookieJar;
use super::profiles::BrowserProfile;

/// Aggregates a browser profile, cookies, custom headers, and referer.
#[derive(Debug, Clone, Default)]
pub struct StealthContext {
    pub profile: Option<BrowserProfile>,
    pub cookie_jar: CookieJar,
    pub custom_headers: HashMap<String, String>,
    pub referer: Option<String>,
}

impl StealthContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge all sources into a single headers map.
    ///
    /// Priority (later wins): profile base headers -> profile sec-fetch
    /// headers -> profile User-Agent -> referer -> custom headers -> cookies.
    pub fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();

        if let Some(profile) = &self.profile {
            for (name, value) in profile.headers {
                headers.insert((*name).to_string(), (*value).to_string());
            }
            for (name, value) in profile.sec_headers {
                headers.insert((*name).to_string(), (*value).to_string());
            }
            headers.insert("User-Agent".to_string(), profile.user_agent.to_string());
        }

        if let Some(referer) = &self.referer {
            headers.insert("Referer".to_string(), referer.clone());
        }

        headers.extend(self.custom_headers.clone());

        if let Some(cookie_header) = self.cookie_jar.as_header() {
            headers.insert("Cookie".to_string(), cookie_header);
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stealth::profiles::get_profile;

    #[test]
    fn custom_headers_override_profile_headers() {
        let mut ctx = StealthContext::new();
        ctx.profile = Some(get_profile("chrome").unwrap());
        ctx.custom_headers.insert("Accept".to_string(), "application/json".to_string());

        let headers = ctx.build_headers();
        assert_eq!(headers.get("Accept"), Some(&"application/json".to_string()));
        assert!(headers.contains_key("User-Agent"));
    }

    #[test]
    fn cookies_land_in_a_single_cookie_header() {
        let mut ctx = StealthContext::new();
        ctx.cookie_jar.add_raw("a=1; b=2");
        let headers = ctx.build_headers();
        assert_eq!(headers.get("Cookie"), Some(&"a=1; b=2".to_string()));
    }

    #[test]
    fn referer_is_set_when_present() {
        let mut ctx = StealthContext::new();
        ctx.referer = Some("https://example.com".to_string());
        let headers = ctx.build_headers();
        assert_eq!(headers.get("Referer"), Some(&"https://example.com".to_string()));
    }

    #[test]
    fn no_profile_yields_no_user_agent() {
        let ctx = StealthContext::new();
        assert!(!ctx.build_headers().contains_key("User-Agent"));
    }
}
