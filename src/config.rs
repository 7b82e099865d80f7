//! Configuration for the derivative pipeline and resolver.
//!
//! [`MediaConfig`] is the full policy surface with stock defaults.
//! Deployments load overrides from TOML; per-tenant policy layers a
//! partial [`TenantConfig`] over the defaults through [`ConfigResolver`],
//! so every component that needs tenant-scoped policy takes a resolver
//! (or an already-resolved config) instead of reaching for globals.

use crate::geometry::PlanWidths;
use crate::model::TenantId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid aspect ratio '{0}': expected 'N:D' with positive integers")]
    InvalidAspectRatio(String),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// An aspect ratio written as `"N:D"`, e.g. `"8:5"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    pub n: u32,
    pub d: u32,
}

impl AspectRatio {
    pub fn new(n: u32, d: u32) -> Self {
        Self { n, d }
    }

    /// As the `(numerator, denominator)` tuple the geometry module takes.
    pub fn as_tuple(self) -> (u32, u32) {
        (self.n, self.d)
    }
}

impl FromStr for AspectRatio {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ConfigError::InvalidAspectRatio(s.to_string());
        let (n, d) = s.split_once(':').ok_or_else(bad)?;
        let n: u32 = n.trim().parse().map_err(|_| bad())?;
        let d: u32 = d.trim().parse().map_err(|_| bad())?;
        if n == 0 || d == 0 {
            return Err(bad());
        }
        Ok(Self { n, d })
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(r: AspectRatio) -> Self {
        format!("{}:{}", r.n, r.d)
    }
}

/// Width lists per orientation plus the single thumbnail width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeWidths {
    pub horizontal: Vec<u32>,
    pub vertical: Vec<u32>,
    pub non_cropped: Vec<u32>,
    /// Widths that also get an `@2x` sibling.
    pub retina_2x: Vec<u32>,
    pub thumbnail: u32,
}

impl Default for ResizeWidths {
    fn default() -> Self {
        Self {
            horizontal: vec![2440, 1220, 840, 800, 610, 420, 160],
            vertical: vec![556, 320, 278, 160],
            non_cropped: vec![2440, 1220, 610, 160],
            retina_2x: vec![1220, 610, 420, 278, 160],
            thumbnail: 200,
        }
    }
}

/// The full configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Master switch for derivative generation. When off, a single `orig`
    /// derivative mirrors the source.
    pub resize: bool,
    /// Directory under the media root where rendered files land.
    pub resize_directory: String,
    pub horizontal_aspect: AspectRatio,
    pub vertical_aspect: AspectRatio,
    pub widths: ResizeWidths,
    /// Migrate local bytes to the object store after generation.
    pub upload_to_remote: bool,
    /// Remove local files when a record is deleted.
    pub delete_from_local: bool,
    /// Remove remote objects when a record is deleted.
    pub delete_from_remote: bool,
    /// Default visibility for new remote uploads.
    pub remote_is_public: bool,
    pub remote_bucket: String,
    /// Optional key prefix inside the bucket.
    pub remote_folder: Option<String>,
    /// Lifetime of signed URLs for private remote objects.
    pub signed_url_expiry_secs: u64,
    pub video_thumbnail_default_url: String,
    pub gallery_thumbnail_default_url: String,
    pub page_size: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            resize: true,
            resize_directory: "resized".to_string(),
            horizontal_aspect: AspectRatio::new(8, 5),
            vertical_aspect: AspectRatio::new(320, 414),
            widths: ResizeWidths::default(),
            upload_to_remote: false,
            delete_from_local: false,
            delete_from_remote: false,
            remote_is_public: true,
            remote_bucket: String::new(),
            remote_folder: None,
            signed_url_expiry_secs: 3600,
            video_thumbnail_default_url: "/static/img/default_video.gif".to_string(),
            gallery_thumbnail_default_url: "/static/img/default_gallery.gif".to_string(),
            page_size: 50,
        }
    }
}

impl MediaConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// The width lists in the shape the geometry module takes.
    pub fn plan_widths(&self) -> PlanWidths<'_> {
        PlanWidths {
            horizontal: &self.widths.horizontal,
            vertical: &self.widths.vertical,
            non_cropped: &self.widths.non_cropped,
            retina_2x: &self.widths.retina_2x,
            thumbnail: self.widths.thumbnail,
        }
    }
}

/// Partial per-tenant overrides. Unset fields fall through to the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantConfig {
    pub resize: Option<bool>,
    pub horizontal_aspect: Option<AspectRatio>,
    pub vertical_aspect: Option<AspectRatio>,
    pub widths: Option<ResizeWidths>,
    pub upload_to_remote: Option<bool>,
    pub remote_is_public: Option<bool>,
    pub remote_bucket: Option<String>,
    pub signed_url_expiry_secs: Option<u64>,
    pub video_thumbnail_default_url: Option<String>,
    pub gallery_thumbnail_default_url: Option<String>,
    pub page_size: Option<usize>,
}

/// Layered configuration lookup: tenant overrides over defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    defaults: MediaConfig,
    overrides: HashMap<TenantId, TenantConfig>,
}

impl ConfigResolver {
    pub fn new(defaults: MediaConfig) -> Self {
        Self {
            defaults,
            overrides: HashMap::new(),
        }
    }

    pub fn with_tenant(mut self, tenant_id: TenantId, overrides: TenantConfig) -> Self {
        self.overrides.insert(tenant_id, overrides);
        self
    }

    pub fn defaults(&self) -> &MediaConfig {
        &self.defaults
    }

    /// Resolve the effective configuration for a tenant.
    pub fn for_tenant(&self, tenant_id: TenantId) -> MediaConfig {
        let mut cfg = self.defaults.clone();
        let Some(t) = self.overrides.get(&tenant_id) else {
            return cfg;
        };
        if let Some(v) = t.resize {
            cfg.resize = v;
        }
        if let Some(v) = t.horizontal_aspect {
            cfg.horizontal_aspect = v;
        }
        if let Some(v) = t.vertical_aspect {
            cfg.vertical_aspect = v;
        }
        if let Some(v) = &t.widths {
            cfg.widths = v.clone();
        }
        if let Some(v) = t.upload_to_remote {
            cfg.upload_to_remote = v;
        }
        if let Some(v) = t.remote_is_public {
            cfg.remote_is_public = v;
        }
        if let Some(v) = &t.remote_bucket {
            cfg.remote_bucket = v.clone();
        }
        if let Some(v) = t.signed_url_expiry_secs {
            cfg.signed_url_expiry_secs = v;
        }
        if let Some(v) = &t.video_thumbnail_default_url {
            cfg.video_thumbnail_default_url = v.clone();
        }
        if let Some(v) = &t.gallery_thumbnail_default_url {
            cfg.gallery_thumbnail_default_url = v.clone();
        }
        if let Some(v) = t.page_size {
            cfg.page_size = v;
        }
        cfg
    }

    /// Signed-URL lifetime for a tenant. The one knob hot enough on the
    /// serving path to deserve a direct accessor.
    pub fn signed_url_expiry(&self, tenant_id: TenantId) -> u64 {
        self.overrides
            .get(&tenant_id)
            .and_then(|t| t.signed_url_expiry_secs)
            .unwrap_or(self.defaults.signed_url_expiry_secs)
    }
}
