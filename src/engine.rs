// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! The Fluxion engine: probes a URL, plans a transfer strategy, executes
//! it (parallel-range, single-stream, or an external protocol), and
//! verifies the result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::future;
use futures_util::StreamExt;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};
use url::Url;

use crate::bandwidth::BandwidthEstimator;
use crate::chunker::AdaptiveChunker;
use crate::constants::{BENCH_THROUGHPUT_RANGE_END, PROBE_MAX_RETRIES, STREAM_WRITE_CHUNK};
use crate::error::{FluxionError, Result};
use crate::external::dispatch_external;
use crate::http_client::{build_client, ClientOptions};
use crate::integrity;
use crate::models::{
    BenchResult, ChunkResult, FetchRequest, FetchResult, FluxMode, ProbeResult, Protocol, TransferPhase, TransferStats,
};
use crate::optimizer::ConnectionOptimizer;
use crate::retry::RetryClassifier;
use crate::scheduler::ParallelScheduler;
use crate::stealth::cookies::CookieJar;
use crate::stealth::profiles::get_profile;
use crate::stealth::StealthContext;

/// Callback invoked with the live transfer state as a fetch progresses.
pub type ProgressCallback<'a> = dyn FnMut(&TransferStats) + Send + 'a;

pub struct FluxionEngine {
    options: ClientOptions,
    retry: RetryClassifier,
}

impl FluxionEngine {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            retry: RetryClassifier::default(),
        }
    }

    fn resolve_stealth_headers(request: &FetchRequest) -> Result<HashMap<String, String>> {
        let profile = match &request.browser_profile {
            Some(name) => Some(get_profile(name)?),
            None => None,
        };

        let mut cookie_jar = CookieJar::new();
        for (name, value) in &request.cookies {
            cookie_jar.add_raw(&format!("{name}={value}"));
        }

        let ctx = StealthContext {
            profile,
            cookie_jar,
            custom_headers: request.headers.clone(),
            referer: request.referer.clone(),
        };
        Ok(ctx.build_headers())
    }

    // ------------------------------------------------------------------
    // Probe
    // ------------------------------------------------------------------

    /// HEAD (falling back to a ranged GET) a URL to discover its
    /// transfer characteristics, retrying transient server errors.
    pub async fn probe(&self, url: &str, extra_headers: &HashMap<String, String>) -> Result<ProbeResult> {
        let parsed = Url::parse(url)?;

        let mut result = ProbeResult {
            url: url.to_string(),
            resolved_ip: None,
            tls_version: None,
            cipher: None,
            cert_issuer: None,
            cert_expiry: None,
            http_version: String::new(),
            server: None,
            supports_range: false,
            content_length: None,
            content_type: None,
            latency_ms: 0.0,
            headers: HashMap::new(),
        };

        if parsed.scheme() == "https" {
            if let Ok(cert) = crate::secure::inspect(url, true, self.options.timeout).await {
                result.tls_version = Some(cert.tls_version).filter(|s| !s.is_empty());
                result.cipher = Some(cert.cipher).filter(|s| !s.is_empty());
                result.cert_issuer = Some(cert.issuer).filter(|s| !s.is_empty());
                result.cert_expiry = Some(cert.not_after).filter(|s| !s.is_empty());
            }
        }

        let client = build_client(&self.options, extra_headers)?;

        let mut latency_ms = 0.0;
        let mut response = None;
        for attempt in 0..=PROBE_MAX_RETRIES {
            let t0 = Instant::now();
            let resp = client.head(url).send().await;
            let elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0;

            let resp = match resp {
                Ok(r) => r,
                Err(e) => {
                    return Err(FluxionError::network(format!("Probe failed: {e}"))
                        .with_suggestion("Check the URL and network connectivity."));
                }
            };

            let (resp, elapsed_ms) = if matches!(resp.status().as_u16(), 403 | 405 | 501) {
                let t0 = Instant::now();
                let get_resp = client
                    .get(url)
                    .header("Range", "bytes=0-0")
                    .send()
                    .await
                    .map_err(|e| FluxionError::network(format!("Probe failed: {e}")))?;
                (get_resp, t0.elapsed().as_secs_f64() * 1000.0)
            } else {
                (resp, elapsed_ms)
            };
            let status = resp.status().as_u16();

            if matches!(status, 429 | 500 | 502 | 503) && attempt < PROBE_MAX_RETRIES {
                let delay = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(2u64.pow(attempt));
                tokio::time::sleep(Duration::from_secs(delay)).await;
                continue;
            }

            if status >= 400 {
                return Err(FluxionError::network_status(
                    format!("HTTP {status}"),
                    status,
                )
                .with_suggestion("Check the URL and ensure the resource is accessible."));
            }

            latency_ms = elapsed_ms;
            response = Some(resp);
            break;
        }

        let resp = response.ok_or_else(|| FluxionError::network("Probe exhausted all retries"))?;
        result.latency_ms = (latency_ms * 100.0).round() / 100.0;
        result.http_version = format!("{:?}", resp.version());
        result.server = resp.headers().get("server").and_then(|v| v.to_str().ok()).map(String::from);
        result.supports_range = resp
            .headers()
            .get("accept-ranges")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("bytes"))
            .unwrap_or(false);

        if resp.status().as_u16() == 206 {
            if let Some(cr) = resp.headers().get("content-range").and_then(|v| v.to_str().ok()) {
                if let Some(total) = cr.rsplit('/').next() {
                    result.content_length = total.parse().ok();
                    result.supports_range = true;
                }
            }
        } else {
            result.content_length = resp
                .headers()
                .get("content-length")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
        }

        result.content_type = resp.headers().get("content-type").and_then(|v| v.to_str().ok()).map(String::from);
        result.headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();

        result.resolved_ip = tokio::net::lookup_host((parsed.host_str().unwrap_or(""), parsed.port_or_known_default().unwrap_or(443)))
            .await
            .ok()
            .and_then(|mut addrs| addrs.next())
            .map(|addr| addr.ip().to_string());

        Ok(result)
    }

    // ------------------------------------------------------------------
    // Bench
    // ------------------------------------------------------------------

    /// Measure latency distribution and first-megabyte throughput.
    pub async fn bench(&self, url: &str, iterations: usize) -> Result<BenchResult> {
        let client = build_client(&self.options, &HashMap::new())?;

        let mut latencies = Vec::with_capacity(iterations);
        let mut failures = 0usize;

        for _ in 0..iterations {
            let t0 = Instant::now();
            match client.head(url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    latencies.push(t0.elapsed().as_secs_f64() * 1000.0);
                }
                _ => failures += 1,
            }
        }

        if latencies.is_empty() {
            return Ok(BenchResult {
                url: url.to_string(),
                requests_failed: failures,
                ..Default::default()
            });
        }

        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let n = latencies.len();
        let avg = latencies.iter().sum::<f64>() / n as f64;
        let jitter = if n > 1 { latencies[n - 1] - latencies[0] } else { 0.0 };

        let percentile = |p: f64| -> f64 {
            let k = (n - 1) as f64 * p;
            let f = k.floor() as usize;
            let c = if f + 1 < n { f + 1 } else { f };
            latencies[f] + (k - f as f64) * (latencies[c] - latencies[f])
        };

        let variance = latencies.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n as f64;
        let stddev = variance.sqrt();
        let cv = if avg > 0.0 { stddev / avg } else { 0.0 };
        let stability = (1.0 - cv).clamp(0.0, 1.0);

        let mut throughput_mbps = 0.0;
        let t0 = Instant::now();
        if let Ok(resp) = client
            .get(url)
            .header("Range", format!("bytes=0-{BENCH_THROUGHPUT_RANGE_END}"))
            .send()
            .await
        {
            if let Ok(bytes) = resp.bytes().await {
                let elapsed_sec = t0.elapsed().as_secs_f64();
                if elapsed_sec > 0.0 && !bytes.is_empty() {
                    throughput_mbps = (bytes.len() as f64 * 8.0) / (elapsed_sec * 1_000_000.0);
                }
            }
        }

        Ok(BenchResult {
            url: url.to_string(),
            latency_min_ms: round2(latencies[0]),
            latency_max_ms: round2(latencies[n - 1]),
            latency_avg_ms: round2(avg),
            p50_ms: round2(percentile(0.50)),
            p95_ms: round2(percentile(0.95)),
            p99_ms: round2(percentile(0.99)),
            jitter_ms: round2(jitter),
            throughput_mbps: round3(throughput_mbps),
            stability_score: (stability * 1000.0).round() / 1000.0,
            requests_completed: n,
            requests_failed: failures,
        })
    }

    // ------------------------------------------------------------------
    // Stream
    // ------------------------------------------------------------------

    /// Stream a resource's bytes, calling `on_chunk` for each piece
    /// received without ever buffering it to disk.
    pub async fn stream(&self, url: &str, headers: &HashMap<String, String>, mut on_chunk: impl FnMut(Bytes)) -> Result<u64> {
        let client = build_client(&self.options, headers)?;
        let resp = client
            .get(url)
            .send()
            .await
            .map_err(|e| FluxionError::network(format!("Stream failed: {e}")))?;

        if resp.status().as_u16() >= 400 {
            return Err(FluxionError::network_status(format!("HTTP {}", resp.status()), resp.status().as_u16())
                .with_suggestion("Check the URL."));
        }

        let mut total = 0u64;
        let mut body = resp.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| FluxionError::network(format!("Stream failed: {e}")))?;
            total += chunk.len() as u64;
            on_chunk(chunk);
        }
        Ok(total)
    }

    // ------------------------------------------------------------------
    // Mirror
    // ------------------------------------------------------------------

    /// Probe each candidate URL and fetch from whichever responds with
    /// the lowest latency.
    pub async fn mirror(&self, urls: &[String], output: Option<PathBuf>) -> Result<FetchResult> {
        let outcomes = future::join_all(urls.iter().map(|url| async move {
            self.probe(url, &HashMap::new()).await.map(|result| (url.clone(), result.latency_ms))
        }))
        .await;

        let mut probes: Vec<(String, f64)> = outcomes.into_iter().filter_map(Result::ok).collect();

        if probes.is_empty() {
            return Err(FluxionError::network("All mirrors failed probing.")
                .with_suggestion("Check URLs and connectivity."));
        }

        probes.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        let mut request = FetchRequest::new(probes[0].0.clone());
        request.output = output;
        self.fetch(request, None).await
    }

    // ------------------------------------------------------------------
    // Fetch
    // ------------------------------------------------------------------

    /// Download a resource with parallel range requests and adaptive
    /// chunking, falling back to a single stream when ranges aren't
    /// supported or the resource is small.
    pub async fn fetch(&self, mut request: FetchRequest, mut on_progress: Option<&mut ProgressCallback<'_>>) -> Result<FetchResult> {
        let parsed = Url::parse(&request.url)?;
        let scheme = parsed.scheme().to_lowercase();

        if matches!(scheme.as_str(), "ftp" | "sftp" | "scp") {
            dispatch_external(&scheme)?;
            unreachable!("dispatch_external always errors for these schemes");
        }

        let mut stats = TransferStats::new(FluxMode::Smart);
        stats.phase = TransferPhase::Resolving;
        notify(&mut on_progress, &stats);

        let stealth_headers = Self::resolve_stealth_headers(&request)?;

        let probe = self.probe(&request.url, &stealth_headers).await?;
        stats.phase = TransferPhase::Connecting;
        notify(&mut on_progress, &stats);

        let output_path = request.output.clone().unwrap_or_else(|| PathBuf::from(filename_from_url(&request.url)));
        let protocol = Protocol::from_version_str(&probe.http_version);

        stats.phase = TransferPhase::Tls;
        notify(&mut on_progress, &stats);
        stats.phase = TransferPhase::ProtocolLock;
        notify(&mut on_progress, &stats);

        let total_size = probe.content_length;
        let supports_range = probe.supports_range && total_size.is_some();

        if request.resume && !supports_range && output_path.exists() {
            request.resume = false;
        }

        let mut resume_offset = 0u64;
        if request.resume && supports_range && output_path.exists() {
            resume_offset = tokio::fs::metadata(&output_path).await.map(|m| m.len()).unwrap_or(0);
            if let Some(total) = total_size {
                if resume_offset >= total {
                    stats.phase = TransferPhase::Complete;
                    notify(&mut on_progress, &stats);
                    let sha256 = integrity::compute_sha256(&output_path).await.unwrap_or_default();
                    return Ok(FetchResult {
                        url: request.url,
                        output_path,
                        bytes_downloaded: resume_offset,
                        elapsed_secs: 0.0,
                        speed_bps: 0.0,
                        protocol,
                        sha256,
                        resumed: true,
                    });
                }
            }
        }

        let start = Instant::now();
        stats.phase = TransferPhase::Stream;
        stats.bytes_total = total_size;

        let bytes_downloaded = if supports_range && total_size.map(|t| t > request.chunk_size * 2).unwrap_or(false) {
            stats.mode = FluxMode::Parallel;
            self.parallel_download(&request, &output_path, total_size.unwrap(), resume_offset, &mut stats, &mut on_progress, &stealth_headers)
                .await?
        } else {
            stats.mode = FluxMode::Single;
            self.stream_download(&request, &output_path, &mut stats, &mut on_progress, &stealth_headers).await?
        };

        let elapsed = start.elapsed().as_secs_f64();

        stats.phase = TransferPhase::Verify;
        notify(&mut on_progress, &stats);
        let sha256 = integrity::compute_sha256(&output_path).await?;
        if let Some(expected) = &request.expected_sha256 {
            integrity::verify(&output_path, expected).await?;
        }

        stats.phase = TransferPhase::Complete;
        notify(&mut on_progress, &stats);

        Ok(FetchResult {
            url: request.url,
            output_path,
            bytes_downloaded,
            elapsed_secs: (elapsed * 1000.0).round() / 1000.0,
            speed_bps: (bytes_downloaded as f64 / elapsed.max(0.001) * 100.0).round() / 100.0,
            protocol,
            sha256,
            resumed: resume_offset > 0,
        })
    }

    async fn parallel_download(
        &self,
        request: &FetchRequest,
        output_path: &Path,
        total_size: u64,
        offset: u64,
        stats: &mut TransferStats,
        on_progress: &mut Option<&mut ProgressCallback<'_>>,
        stealth_headers: &HashMap<String, String>,
    ) -> Result<u64> {
        let chunker = AdaptiveChunker::new(request.chunk_size);
        let optimizer = ConnectionOptimizer::new(request.max_connections.min(4), 1, request.max_connections);

        let mut scheduler = ParallelScheduler::new(total_size, offset).with_chunker(chunker).with_optimizer(optimizer);

        let client = build_client(&self.options, stealth_headers)?;
        let url = request.url.clone();
        let max_retries = request.max_retries;
        let retry = RetryClassifier::new(max_retries, 1.0, 30.0);

        let download_chunk = move |plan: crate::models::ChunkPlan| {
            let client = client.clone();
            let url = url.clone();
            let retry = retry.clone();
            async move { download_one_chunk(&client, &url, plan, &retry, max_retries).await }
        };

        let results = scheduler.execute(download_chunk, |_, _| {}).await;

        if let Some(failed) = results.iter().find(|r| !r.is_ok()) {
            warn!(index = failed.index, error = ?failed.error, "chunk failed permanently");
            return Err(FluxionError::network(format!(
                "Chunk {} failed: {}",
                failed.index,
                failed.error.as_deref().unwrap_or("unknown error")
            ))
            .with_suggestion("Retry the download, or lower --connections to reduce server load."));
        }

        // Assemble the output file.
        let existing = offset > 0 && output_path.exists();
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(!existing)
            .open(output_path)
            .await?;

        let mut bytes_written = 0u64;
        for result in &results {
            if let Some(bytes) = &result.bytes {
                file.seek(std::io::SeekFrom::Start(result.start)).await?;
                file.write_all(bytes).await?;
                bytes_written += bytes.len() as u64;
            }
        }
        file.flush().await?;

        stats.bytes_done = bytes_written + offset;
        stats.speed_bps = scheduler.current_speed();
        notify(on_progress, stats);

        Ok(bytes_written + offset)
    }

    async fn stream_download(
        &self,
        request: &FetchRequest,
        output_path: &Path,
        stats: &mut TransferStats,
        on_progress: &mut Option<&mut ProgressCallback<'_>>,
        stealth_headers: &HashMap<String, String>,
    ) -> Result<u64> {
        let mut bandwidth = BandwidthEstimator::default();
        let mut already_written = 0u64;

        'attempts: for attempt in 0..=request.max_retries {
            let client = build_client(&self.options, stealth_headers)?;

            let write_from_start = !request.retry_preserves_partial || attempt == 0;
            let mut builder = client.get(&request.url);
            if !write_from_start && already_written > 0 {
                builder = builder.header("Range", format!("bytes={already_written}-"));
            }
            let resp = builder.send().await;
            let resp = match resp {
                Ok(r) => r,
                Err(e) => {
                    let decision = self.retry.classify_exception("connection", &e.to_string(), attempt);
                    if self.retry.should_retry(&decision, attempt) {
                        tokio::time::sleep(Duration::from_secs_f64(decision.delay_secs)).await;
                        continue;
                    }
                    return Err(FluxionError::network(format!("Stream download failed: {e}"))
                        .with_suggestion("Check the URL and network connectivity."));
                }
            };

            let status = resp.status().as_u16();
            if status >= 400 {
                let decision = self.retry.classify_status(status, attempt);
                if self.retry.should_retry(&decision, attempt) {
                    tokio::time::sleep(Duration::from_secs_f64(decision.delay_secs)).await;
                    continue;
                }
                return Err(FluxionError::network_status(format!("HTTP {status}"), status)
                    .with_suggestion("Check the URL and ensure the resource exists."));
            }

            if write_from_start {
                if let Some(len) = resp.content_length() {
                    stats.bytes_total = Some(len);
                }
            }

            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(write_from_start)
                .append(!write_from_start)
                .open(output_path)
                .await?;

            let mut downloaded = already_written;
            let mut body = resp.bytes_stream();
            let mut last = Instant::now();
            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let decision = self.retry.classify_exception("stream", &e.to_string(), attempt);
                        if self.retry.should_retry(&decision, attempt) {
                            already_written = downloaded;
                            tokio::time::sleep(Duration::from_secs_f64(decision.delay_secs)).await;
                            continue 'attempts;
                        }
                        return Err(FluxionError::network(format!("Stream download failed: {e}")));
                    }
                };
                for piece in chunk.chunks(STREAM_WRITE_CHUNK) {
                    file.write_all(piece).await?;
                    downloaded += piece.len() as u64;
                    let elapsed = last.elapsed();
                    last = Instant::now();
                    bandwidth.record(piece.len() as u64, elapsed.max(Duration::from_millis(1)));
                    stats.bytes_done = downloaded;
                    stats.speed_bps = bandwidth.current_speed();
                    if let Some(total) = stats.bytes_total {
                        stats.eta_secs = bandwidth.eta_seconds(total.saturating_sub(downloaded));
                    }
                    notify(on_progress, stats);
                }
            }
            file.flush().await?;
            debug!(downloaded, "single-stream download finished");
            return Ok(downloaded);
        }

        Err(FluxionError::network("Stream download failed after max retries.")
            .with_suggestion("Try again later or increase the timeout."))
    }
}

async fn download_one_chunk(
    client: &reqwest::Client,
    url: &str,
    plan: crate::models::ChunkPlan,
    retry: &RetryClassifier,
    max_retries: u32,
) -> ChunkResult {
    let mut last_elapsed = Duration::ZERO;
    for attempt in 0..=max_retries {
        let t0 = Instant::now();
        let resp = client.get(url).header("Range", plan.range_header()).send().await;
        last_elapsed = t0.elapsed();

        match resp {
            Ok(resp) => {
                let status = resp.status().as_u16();
                if status >= 400 {
                    let decision = retry.classify_status(status, attempt);
                    if retry.should_retry(&decision, attempt) {
                        tokio::time::sleep(Duration::from_secs_f64(decision.delay_secs)).await;
                        continue;
                    }
                    return ChunkResult::failed(plan.index, plan.start, plan.end, last_elapsed, format!("HTTP {status}"));
                }
                match resp.bytes().await {
                    Ok(bytes) => return ChunkResult::ok(plan.index, plan.start, plan.end, bytes, last_elapsed),
                    Err(e) => {
                        return ChunkResult::failed(plan.index, plan.start, plan.end, last_elapsed, e.to_string());
                    }
                }
            }
            Err(e) => {
                let decision = retry.classify_exception("connection", &e.to_string(), attempt);
                if retry.should_retry(&decision, attempt) {
                    tokio::time::sleep(Duration::from_secs_f64(decision.delay_secs)).await;
                    continue;
                }
                return ChunkResult::failed(plan.index, plan.start, plan.end, last_elapsed, e.to_string());
            }
        }
    }
    ChunkResult::failed(plan.index, plan.start, plan.end, last_elapsed, "Max retries exhausted")
}

fn notify(on_progress: &mut Option<&mut ProgressCallback<'_>>, stats: &TransferStats) {
    if let Some(cb) = on_progress.as_mut() {
        cb(stats);
    }
}

fn filename_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segs| segs.next_back().map(String::from))
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| "download".to_string())
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_from_url_picks_last_path_segment() {
        assert_eq!(filename_from_url("https://example.com/dir/file.zip"), "file.zip");
        assert_eq!(filename_from_url("https://example.com/"), "download");
        assert_eq!(filename_from_url("https://example.com"), "download");
    }
}
