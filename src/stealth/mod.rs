// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! Browser impersonation: header assembly, cookie jars, and profiles.

pub mod context;
pub mod cookies;
pub mod profiles;

pub use context::StealthContext;
pub use cookies::CookieJar;
pub use profiles::{get_profile, profile_names, BrowserProfile};
