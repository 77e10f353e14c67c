// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! Streaming content hashing and whole-file integrity verification.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::constants::INTEGRITY_BLOCK_SIZE;
use crate::error::{FluxionError, Result};

/// Compute the SHA-256 hex digest of a file by streaming it in
/// fixed-size blocks.
pub async fn compute_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; INTEGRITY_BLOCK_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify a file's SHA-256 digest against an expected hex string,
/// compared case-insensitively.
pub async fn verify(path: &Path, expected: &str) -> Result<()> {
    let actual = compute_sha256(path).await?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(FluxionError::security(format!(
            "Integrity check failed: expected {expected}, got {actual}"
        )))
    }
}
