//! Catalog record types shared across the pipeline.
//!
//! These are the durable shapes: one uploaded asset ([`SourceMedia`]), its
//! rendered size variants ([`Derivative`]), named collections ([`Gallery`])
//! and the ordered join rows between them ([`GalleryMembership`]).
//!
//! Where an asset's bytes live is carried explicitly as a [`Locator`]
//! tagged variant, decided once at write time. No code probes optional
//! fields to guess the backing mode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tenant (site) identifier. Every record is scoped to one tenant.
pub type TenantId = u64;

/// Record identifier within the catalog store.
pub type RecordId = u64;

/// Where an asset's bytes live.
///
/// Exactly one variant is authoritative at any time; migration to remote
/// storage replaces a `Local` locator wholesale, never leaves both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Locator {
    /// A path under the media root, doubling as the public URL path.
    Local { path: String },
    /// A remote object readable by anyone at `url`.
    PublicRemote {
        bucket: String,
        path: String,
        url: String,
    },
    /// A remote object requiring a signed URL to read.
    PrivateRemote { bucket: String, path: String },
}

impl Locator {
    /// The URL-ish string for display and gallery thumbnails. Private
    /// remote objects have no standing URL.
    pub fn url(&self) -> Option<&str> {
        match self {
            Locator::Local { path } => Some(path),
            Locator::PublicRemote { url, .. } => Some(url),
            Locator::PrivateRemote { .. } => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Locator::Local { .. })
    }
}

/// Media kind. Video fields on a [`SourceMedia`] force `Video`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

/// One uploaded image or video asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMedia {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub kind: MediaKind,
    /// Display name. Defaults to the file name (images) or the video URL
    /// (videos) when not supplied.
    pub name: Option<String>,
    pub file_name: Option<String>,
    /// File name at the time of the last successful derivative generation.
    /// Regeneration triggers when this differs from `file_name`.
    pub original_file_name: Option<String>,
    pub credit: Option<String>,
    pub description: Option<String>,
    /// Where the image bytes live.
    pub locator: Option<Locator>,
    pub width: u32,
    pub height: u32,
    pub video_url: Option<String>,
    pub video_embed: Option<String>,
    pub manual_embed: bool,
    /// Thumbnail triad, mirroring the image locator shape.
    pub thumbnail_locator: Option<Locator>,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    /// Default visibility for remote uploads of this asset.
    pub remote_is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SourceMedia {
    pub fn new(tenant_id: TenantId) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            tenant_id,
            kind: MediaKind::Image,
            name: None,
            file_name: None,
            original_file_name: None,
            credit: None,
            description: None,
            locator: None,
            width: 0,
            height: 0,
            video_url: None,
            video_embed: None,
            manual_embed: false,
            thumbnail_locator: None,
            thumbnail_width: 0,
            thumbnail_height: 0,
            remote_is_public: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The URL of this asset's thumbnail, if it has one with a standing URL.
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail_locator.as_ref().and_then(Locator::url)
    }
}

/// One rendered size variant of a [`SourceMedia`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Derivative {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub source_id: RecordId,
    pub file_name: String,
    /// Size label, one of the exact forms in [`size_label`].
    pub size: String,
    pub width: u32,
    pub height: u32,
    /// Always `width * height`. Maintained by [`Derivative::set_dimensions`].
    pub area: u64,
    pub locator: Locator,
    pub remote_is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Derivative {
    pub fn new(
        tenant_id: TenantId,
        source_id: RecordId,
        file_name: String,
        size: String,
        locator: Locator,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            tenant_id,
            source_id,
            file_name,
            size,
            width: 0,
            height: 0,
            area: 0,
            locator,
            remote_is_public: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The single write path for dimensions, keeping the area invariant.
    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.area = width as u64 * height as u64;
    }
}

/// A named, described, manually-ordered collection of media.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gallery {
    pub id: RecordId,
    pub tenant_id: TenantId,
    /// Required, non-empty.
    pub name: String,
    pub short_code: Option<String>,
    pub description: Option<String>,
    /// Derived: the thumbnail of the first member by sort order, or the
    /// configured default. Recomputed on every save.
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Gallery {
    pub fn new(tenant_id: TenantId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            tenant_id,
            name: name.into(),
            short_code: None,
            description: None,
            thumbnail_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Join row between a gallery and a source, with per-gallery overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryMembership {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub gallery_id: RecordId,
    pub element_id: RecordId,
    pub credit: Option<String>,
    pub description: Option<String>,
    /// Presentation position. Contiguous from 0 after a full rewrite.
    pub sort_by: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The derivative size-label grammar.
///
/// These exact string forms are load-bearing: file names and stored URLs
/// embed them, so they must never change shape.
pub mod size_label {
    /// Full-size mirror of the source, written when resizing is disabled.
    pub const ORIG: &str = "orig";
    /// The aspect-corrected crop every other cropped size derives from.
    pub const ORIG_CROPPED: &str = "orig_c";

    pub fn cropped(width: u32, height: u32) -> String {
        format!("{width}x{height}")
    }

    pub fn cropped_retina(width: u32, height: u32) -> String {
        format!("{width}x{height}@2x")
    }

    pub fn non_cropped(width: u32) -> String {
        format!("{width}nc")
    }

    pub fn non_cropped_retina(width: u32) -> String {
        format!("{width}nc@2x")
    }

    pub fn thumbnail(width: u32, height: u32) -> String {
        format!("{width}x{height}.thumbnail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_follows_every_dimension_write() {
        let mut d = Derivative::new(
            1,
            1,
            "a_610x381.jpg".into(),
            "610x381".into(),
            Locator::Local {
                path: "/media/resized/a_610x381.jpg".into(),
            },
        );
        d.set_dimensions(610, 381);
        assert_eq!(d.area, 610 * 381);
        d.set_dimensions(1220, 762);
        assert_eq!(d.area, 1220 * 762);
    }

    #[test]
    fn size_labels_exact_strings() {
        assert_eq!(size_label::cropped(1220, 762), "1220x762");
        assert_eq!(size_label::cropped_retina(610, 381), "610x381@2x");
        assert_eq!(size_label::non_cropped(160), "160nc");
        assert_eq!(size_label::non_cropped_retina(160), "160nc@2x");
        assert_eq!(size_label::thumbnail(200, 125), "200x125.thumbnail");
        assert_eq!(size_label::ORIG, "orig");
        assert_eq!(size_label::ORIG_CROPPED, "orig_c");
    }

    #[test]
    fn locator_urls() {
        let local = Locator::Local {
            path: "/media/x.jpg".into(),
        };
        assert_eq!(local.url(), Some("/media/x.jpg"));
        assert!(local.is_local());

        let public = Locator::PublicRemote {
            bucket: "b".into(),
            path: "guid/x.jpg".into(),
            url: "https://s3.amazonaws.com/b/guid/x.jpg".into(),
        };
        assert_eq!(public.url(), Some("https://s3.amazonaws.com/b/guid/x.jpg"));

        let private = Locator::PrivateRemote {
            bucket: "b".into(),
            path: "guid/x.jpg".into(),
        };
        assert_eq!(private.url(), None);
    }

    #[test]
    fn locator_serde_round_trip() {
        let l = Locator::PrivateRemote {
            bucket: "b".into(),
            path: "p".into(),
        };
        let json = serde_json::to_string(&l).unwrap();
        assert!(json.contains("\"mode\":\"private_remote\""));
        let back: Locator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, l);
    }
}
