//! `Cache-Control` presets.

use std::convert::Infallible;

use axum::http::{header::CACHE_CONTROL, HeaderValue};
use axum::response::{IntoResponseParts, ResponseParts};

/// Caching policy attached to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePreset {
    /// Never store: mutations, admin, auth.
    NoStore,
    /// Per-user data; browsers may keep it but must revalidate.
    Private,
    /// Listings that change often.
    Short,
    /// Detail pages.
    Medium,
    /// Rarely changing reference data.
    Long,
    /// Content-addressed assets.
    Immutable,
}

impl CachePreset {
    pub fn directive(&self) -> &'static str {
        match self {
            CachePreset::NoStore => "no-store, no-cache, must-revalidate",
            CachePreset::Private => "private, no-cache",
            CachePreset::Short => "public, s-maxage=60, stale-while-revalidate=300",
            CachePreset::Medium => "public, s-maxage=300, stale-while-revalidate=600",
            CachePreset::Long => "public, s-maxage=3600, stale-while-revalidate=86400",
            CachePreset::Immutable => "public, max-age=31536000, immutable",
        }
    }
}

impl IntoResponseParts for CachePreset {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        res.headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static(self.directive()));
        Ok(res)
    }
}
