// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! Shared reqwest client construction.
//!
//! One client is built per `Engine` and reused across probe/fetch/bench
//! calls so connection pooling and keep-alive actually pay off.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{FluxionError, Result};

pub struct ClientOptions {
    pub timeout: Duration,
    pub verify_tls: bool,
    pub proxy: Option<String>,
    pub user_agent: String,
    pub max_connections: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            verify_tls: true,
            proxy: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
                .to_string(),
            max_connections: 8,
        }
    }
}

/// Build a `reqwest::Client` with the given options and extra headers
/// merged on top of the default User-Agent.
pub fn build_client(options: &ClientOptions, extra_headers: &HashMap<String, String>) -> Result<reqwest::Client> {
    crate::init_rustls_provider();

    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        HeaderValue::from_str(&options.user_agent).unwrap_or_else(|_| HeaderValue::from_static("fluxion")),
    );
    for (key, value) in extra_headers {
        if let (Ok(name), Ok(val)) = (HeaderName::try_from(key.as_str()), HeaderValue::from_str(value)) {
            headers.insert(name, val);
        }
    }

    let mut builder = reqwest::Client::builder()
        .timeout(options.timeout)
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .pool_max_idle_per_host(options.max_connections * 2)
        .danger_accept_invalid_certs(!options.verify_tls)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(crate::constants::MAX_REDIRECTS));

    if let Some(proxy) = &options.proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| FluxionError::network(format!("Invalid proxy {proxy:?}: {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| FluxionError::network(format!("Failed to create HTTP client: {e}")))
}
