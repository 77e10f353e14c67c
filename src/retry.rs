// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! Retry classifier.
//!
//! Maps an HTTP status code or a connection-level error into a
//! [`RetryDecision`], and decides whether the caller's attempt budget
//! still allows another try.

use crate::constants::{RETRY_BASE_BACKOFF_SECS, RETRY_MAX_BACKOFF_SECS, RETRY_MAX_RETRIES};
use crate::models::{RetryDecision, RetryVerdict};

const RETRYABLE_STATUS: [u16; 6] = [408, 429, 500, 502, 503, 504];
const FATAL_STATUS: [u16; 7] = [400, 401, 403, 404, 405, 410, 451];

#[derive(Debug, Clone)]
pub struct RetryClassifier {
    max_retries: u32,
    base_backoff: f64,
    max_backoff: f64,
}

impl Default for RetryClassifier {
    fn default() -> Self {
        Self::new(RETRY_MAX_RETRIES, RETRY_BASE_BACKOFF_SECS, RETRY_MAX_BACKOFF_SECS)
    }
}

impl RetryClassifier {
    pub fn new(max_retries: u32, base_backoff: f64, max_backoff: f64) -> Self {
        Self {
            max_retries,
            base_backoff,
            max_backoff,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Classify an HTTP status code for a given attempt number (1-based).
    pub fn classify_status(&self, status_code: u16, attempt: u32) -> RetryDecision {
        if (200..300).contains(&status_code) {
            return RetryDecision::fatal("Success — no retry needed");
        }

        if FATAL_STATUS.contains(&status_code) {
            return RetryDecision::fatal(format!("HTTP {status_code} is not retryable"));
        }

        if status_code == 429 {
            let delay = (self.base_backoff * 2f64.powi(attempt as i32)).min(self.max_backoff);
            return RetryDecision::backoff(delay, "Rate limited (429)");
        }

        if RETRYABLE_STATUS.contains(&status_code) {
            let delay = (self.base_backoff * 2f64.powi(attempt as i32 - 1)).min(self.max_backoff);
            return RetryDecision::backoff(delay, format!("HTTP {status_code} — retryable server error"));
        }

        RetryDecision::backoff(self.base_backoff, format!("Unexpected HTTP {status_code}"))
    }

    /// Classify a connection-level error by its lowercase kind tag
    /// (e.g. `"timeout"`, `"connection reset"`, `"dns resolution failed"`)
    /// and its display message.
    pub fn classify_exception(&self, kind: &str, message: &str, attempt: u32) -> RetryDecision {
        let kind = kind.to_lowercase();
        let message_lower = message.to_lowercase();

        if kind.contains("timeout") || kind.contains("timedout") || message_lower.contains("timed out") {
            let delay = (self.base_backoff * 2f64.powi(attempt as i32)).min(self.max_backoff);
            return RetryDecision::backoff(delay, format!("Timeout: {message}"));
        }

        if ["refused", "reset", "broken", "aborted"]
            .iter()
            .any(|k| kind.contains(k))
        {
            return RetryDecision::immediate(0.5, format!("Connection error: {message}"));
        }

        if kind.contains("resolve") || kind.contains("dns") || kind.contains("gaierror") {
            return RetryDecision::fatal(format!("DNS resolution failure: {message}"));
        }

        if kind.contains("ssl") || kind.contains("certificate") || kind.contains("tls") {
            return RetryDecision::fatal(format!("TLS/SSL error: {message}"));
        }

        let delay = (self.base_backoff * 2f64.powi(attempt as i32)).min(self.max_backoff);
        RetryDecision::backoff(delay, format!("Unknown error: {message}"))
    }

    /// Whether the caller should attempt a retry, given the attempt
    /// number just completed (1-based).
    pub fn should_retry(&self, decision: &RetryDecision, attempt: u32) -> bool {
        if decision.verdict == RetryVerdict::Fatal {
            return false;
        }
        attempt < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_status_is_fatal_no_retry_needed() {
        let c = RetryClassifier::default();
        let d = c.classify_status(200, 1);
        assert_eq!(d.verdict, RetryVerdict::Fatal);
    }

    #[test]
    fn client_errors_are_fatal() {
        let c = RetryClassifier::default();
        for status in [400, 401, 403, 404, 405, 410, 451] {
            assert_eq!(c.classify_status(status, 1).verdict, RetryVerdict::Fatal);
        }
    }

    #[test]
    fn rate_limited_backs_off_exponentially() {
        let c = RetryClassifier::default();
        let d1 = c.classify_status(429, 0);
        let d2 = c.classify_status(429, 1);
        assert_eq!(d1.verdict, RetryVerdict::RetryBackoff);
        assert!(d2.delay_secs > d1.delay_secs);
    }

    #[test]
    fn backoff_caps_at_max_backoff() {
        let c = RetryClassifier::default();
        let d = c.classify_status(503, 20);
        assert!(d.delay_secs <= 30.0);
    }

    #[test]
    fn connection_reset_retries_immediately() {
        let c = RetryClassifier::default();
        let d = c.classify_exception("ConnectionReset", "connection reset by peer", 1);
        assert_eq!(d.verdict, RetryVerdict::RetryImmediate);
    }

    #[test]
    fn dns_failure_is_fatal() {
        let c = RetryClassifier::default();
        let d = c.classify_exception("ResolveError", "failed to resolve host", 1);
        assert_eq!(d.verdict, RetryVerdict::Fatal);
    }

    #[test]
    fn tls_failure_is_fatal() {
        let c = RetryClassifier::default();
        let d = c.classify_exception("SslError", "certificate verify failed", 1);
        assert_eq!(d.verdict, RetryVerdict::Fatal);
    }

    #[test]
    fn should_retry_respects_max_retries() {
        let c = RetryClassifier::new(3, 1.0, 30.0);
        let decision = c.classify_status(503, 1);
        assert!(c.should_retry(&decision, 2));
        assert!(!c.should_retry(&decision, 3));
    }

    #[test]
    fn fatal_verdict_never_retries() {
        let c = RetryClassifier::default();
        let decision = c.classify_status(404, 1);
        assert!(!c.should_retry(&decision, 0));
    }
}
