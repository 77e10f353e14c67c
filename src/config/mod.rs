// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! # Configuration System
//!
//! Layered, type-safe configuration management based on figment.

pub mod manager;
pub mod models;

pub use manager::{ConfigBuilder, ConfigEvent, ConfigManager};
pub use models::FluxionConfig;
