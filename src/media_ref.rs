//! Embedded media references.
//!
//! Rich-text documents embed media as small JSON objects rather than
//! URLs, so renames and migrations never break them:
//!
//! ```json
//! {"id": 42, "kind": "image", "caption": "Low tide", "credit": "H. A."}
//! ```
//!
//! [`MediaRef`] is that object. Parsing and validation are separate
//! steps: a document can be parsed offline, but validating requires the
//! catalog to confirm the record exists and is of the claimed kind.

use crate::model::{MediaKind, RecordId, TenantId};
use crate::store::Catalog;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaRefError {
    #[error("malformed media reference: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no {kind} with id {id}")]
    Missing { kind: RefKind, id: RecordId },
    #[error("media element {id} is not a {expected}")]
    KindMismatch { id: RecordId, expected: RefKind },
}

/// What a reference points at. Galleries are referencable alongside
/// individual elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Image,
    Video,
    Gallery,
}

impl std::fmt::Display for RefKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RefKind::Image => "image",
            RefKind::Video => "video",
            RefKind::Gallery => "gallery",
        })
    }
}

/// One embedded reference to a catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: RecordId,
    pub kind: RefKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit: Option<String>,
}

impl MediaRef {
    pub fn from_json(json: &str) -> Result<Self, MediaRefError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("media reference serializes")
    }

    /// Check the reference against the catalog: the record must exist in
    /// the tenant and be of the claimed kind.
    pub fn validate(&self, catalog: &Catalog, tenant_id: TenantId) -> Result<(), MediaRefError> {
        let missing = || MediaRefError::Missing {
            kind: self.kind,
            id: self.id,
        };
        match self.kind {
            RefKind::Gallery => {
                catalog.gallery(tenant_id, self.id).ok_or_else(missing)?;
            }
            RefKind::Image | RefKind::Video => {
                let element = catalog.media(tenant_id, self.id).ok_or_else(missing)?;
                let expected = match self.kind {
                    RefKind::Image => MediaKind::Image,
                    _ => MediaKind::Video,
                };
                if element.kind != expected {
                    return Err(MediaRefError::KindMismatch {
                        id: self.id,
                        expected: self.kind,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gallery, SourceMedia};

    fn catalog_with_records() -> (Catalog, RecordId, RecordId, RecordId) {
        let mut cat = Catalog::new();
        let image = cat.insert_media(SourceMedia::new(1));
        let video = cat.insert_media(SourceMedia {
            kind: MediaKind::Video,
            video_url: Some("https://video.example/v/1".into()),
            ..SourceMedia::new(1)
        });
        let gallery = cat.insert_gallery(Gallery::new(1, "G"));
        (cat, image, video, gallery)
    }

    #[test]
    fn json_round_trip() {
        let r = MediaRef {
            id: 42,
            kind: RefKind::Image,
            caption: Some("Low tide".into()),
            credit: None,
        };
        let json = r.to_json();
        assert!(json.contains("\"kind\":\"image\""));
        assert!(!json.contains("credit"));
        assert_eq!(MediaRef::from_json(&json).unwrap(), r);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            MediaRef::from_json("{\"id\": \"not a number\"}"),
            Err(MediaRefError::Parse(_))
        ));
    }

    #[test]
    fn validate_checks_existence_per_kind() {
        let (cat, image, video, gallery) = catalog_with_records();
        for (id, kind) in [
            (image, RefKind::Image),
            (video, RefKind::Video),
            (gallery, RefKind::Gallery),
        ] {
            let r = MediaRef {
                id,
                kind,
                caption: None,
                credit: None,
            };
            r.validate(&cat, 1).unwrap();
            // same id, wrong tenant
            assert!(matches!(
                r.validate(&cat, 2),
                Err(MediaRefError::Missing { .. })
            ));
        }
    }

    #[test]
    fn validate_rejects_kind_mismatch() {
        let (cat, image, video, _) = catalog_with_records();
        let r = MediaRef {
            id: image,
            kind: RefKind::Video,
            caption: None,
            credit: None,
        };
        assert!(matches!(
            r.validate(&cat, 1),
            Err(MediaRefError::KindMismatch { .. })
        ));
        let r = MediaRef {
            id: video,
            kind: RefKind::Image,
            caption: None,
            credit: None,
        };
        assert!(r.validate(&cat, 1).is_err());
    }

    #[test]
    fn gallery_reference_ignores_media_table() {
        let (cat, image, _, _) = catalog_with_records();
        let r = MediaRef {
            id: image,
            kind: RefKind::Gallery,
            caption: None,
            credit: None,
        };
        assert!(matches!(
            r.validate(&cat, 1),
            Err(MediaRefError::Missing { .. })
        ));
    }
}
