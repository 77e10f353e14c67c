// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! End-to-end fetch scenarios driven against a local `wiremock` server.

use std::collections::HashMap;
use std::time::Duration;

use fluxion::http_client::ClientOptions;
use fluxion::{FetchRequest, FluxionEngine};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_options() -> ClientOptions {
    ClientOptions {
        timeout: Duration::from_secs(10),
        ..ClientOptions::default()
    }
}

fn payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn known_size_ranged_parallel_fetch_reconstructs_file_exactly() {
    let server = MockServer::start().await;
    let body = payload(5 * 1024 * 1024);

    Mock::given(method("HEAD"))
        .and(path("/file.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("accept-ranges", "bytes")
                .insert_header("content-length", body.len().to_string()),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(move |req: &wiremock::Request| {
            let range = req.headers.get("range").and_then(|v| v.to_str().ok()).unwrap();
            let (start, end) = range.trim_start_matches("bytes=").split_once('-').unwrap();
            let start: usize = start.parse().unwrap();
            let end: usize = end.parse().unwrap();
            let slice = &payload(5 * 1024 * 1024)[start..=end];
            ResponseTemplate::new(206)
                .insert_header("content-range", format!("bytes {start}-{end}/{}", 5 * 1024 * 1024))
                .set_body_bytes(slice.to_vec())
        })
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.bin");

    let engine = FluxionEngine::new(test_options());
    let mut request = FetchRequest::new(format!("{}/file.bin", server.uri()));
    request.output = Some(output.clone());
    request.chunk_size = 1024 * 1024;
    request.max_connections = 4;

    let result = engine.fetch(request, None).await.unwrap();

    assert_eq!(result.bytes_downloaded, body.len() as u64);
    let on_disk = tokio::fs::read(&output).await.unwrap();
    assert_eq!(on_disk, body);
    assert_eq!(result.sha256, fluxion::integrity::compute_sha256(&output).await.unwrap());
}

#[tokio::test]
async fn no_range_support_falls_back_to_single_stream() {
    let server = MockServer::start().await;
    let body = payload(64 * 1024);

    Mock::given(method("HEAD"))
        .and(path("/small.bin"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-length", body.len().to_string()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/small.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("small.bin");

    let engine = FluxionEngine::new(test_options());
    let mut request = FetchRequest::new(format!("{}/small.bin", server.uri()));
    request.output = Some(output.clone());
    request.resume = true;

    let result = engine.fetch(request, None).await.unwrap();

    assert!(!result.resumed);
    let on_disk = tokio::fs::read(&output).await.unwrap();
    assert_eq!(on_disk, body);
}

#[tokio::test]
async fn fatal_404_surfaces_status_code_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/missing.bin"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let engine = FluxionEngine::new(test_options());
    let err = engine
        .probe(&format!("{}/missing.bin", server.uri()), &HashMap::new())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(404));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn transient_503_with_retry_after_eventually_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/flaky.bin"))
        .respond_with(ResponseTemplate::new(503).insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/flaky.bin"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-length", "4").insert_header("accept-ranges", "bytes"))
        .mount(&server)
        .await;

    let engine = FluxionEngine::new(test_options());
    let t0 = std::time::Instant::now();
    let result = engine
        .probe(&format!("{}/flaky.bin", server.uri()), &HashMap::new())
        .await
        .unwrap();
    let elapsed = t0.elapsed();

    assert_eq!(result.content_length, Some(4));
    assert!(elapsed >= Duration::from_secs(1));
}

#[tokio::test]
async fn probe_falls_back_to_ranged_get_when_head_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/cdn.bin"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cdn.bin"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-range", "bytes 0-0/2048")
                .insert_header("accept-ranges", "bytes")
                .set_body_bytes(vec![0u8]),
        )
        .mount(&server)
        .await;

    let engine = FluxionEngine::new(test_options());
    let result = engine.probe(&format!("{}/cdn.bin", server.uri()), &HashMap::new()).await.unwrap();

    assert!(result.supports_range);
    assert_eq!(result.content_length, Some(2048));
}

#[tokio::test]
async fn benchmark_reports_latency_distribution() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/probe.bin"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/probe.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload(64)))
        .mount(&server)
        .await;

    let engine = FluxionEngine::new(test_options());
    let result = engine.bench(&format!("{}/probe.bin", server.uri()), 5).await.unwrap();

    assert_eq!(result.requests_completed, 5);
    assert_eq!(result.requests_failed, 0);
    assert!(result.latency_min_ms <= result.latency_avg_ms);
    assert!(result.latency_avg_ms <= result.latency_max_ms);
    assert!(result.stability_score >= 0.0 && result.stability_score <= 1.0);
}
