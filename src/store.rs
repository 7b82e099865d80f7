//! In-memory record store for the media catalog.
//!
//! The persistence layer is deliberately abstract in this crate: the
//! pipeline only needs tenant-scoped create/get/filter/update/delete with
//! stable insertion order (the resolver's area tie-break), an upsert
//! keyed on (tenant, source, size) for derivatives, and a small query
//! surface (substring search, field ordering, paging) for list endpoints.
//! [`Catalog`] provides exactly that; a database-backed store can replace
//! it behind the same methods.

use crate::model::{
    Derivative, Gallery, GalleryMembership, Locator, RecordId, SourceMedia, TenantId,
};
use chrono::Utc;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
}

/// Ordering for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Descending,
    Ascending,
}

/// Query surface for media listings.
#[derive(Debug, Clone, Default)]
pub struct MediaQuery {
    /// Case-insensitive substring match on the display name.
    pub search: Option<String>,
    /// Sort field: `"created_at"` (default) or `"name"`.
    pub sort: Option<String>,
    pub direction: SortDirection,
    /// 1-based page number.
    pub page: usize,
    pub page_size: usize,
}

/// Insertion-ordered store for all four record types.
#[derive(Debug, Default)]
pub struct Catalog {
    media: Vec<SourceMedia>,
    derivatives: Vec<Derivative>,
    galleries: Vec<Gallery>,
    memberships: Vec<GalleryMembership>,
    next_id: RecordId,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }

    // =========================================================================
    // SourceMedia
    // =========================================================================

    pub fn insert_media(&mut self, mut media: SourceMedia) -> RecordId {
        media.id = self.next_id();
        let id = media.id;
        self.media.push(media);
        id
    }

    pub fn media(&self, tenant_id: TenantId, id: RecordId) -> Option<&SourceMedia> {
        self.media
            .iter()
            .find(|m| m.id == id && m.tenant_id == tenant_id)
    }

    pub fn media_by_url(&self, tenant_id: TenantId, url: &str) -> Option<&SourceMedia> {
        self.media.iter().find(|m| {
            m.tenant_id == tenant_id && m.locator.as_ref().and_then(Locator::url) == Some(url)
        })
    }

    pub fn update_media(&mut self, media: SourceMedia) -> Result<(), StoreError> {
        let slot = self
            .media
            .iter_mut()
            .find(|m| m.id == media.id && m.tenant_id == media.tenant_id)
            .ok_or(StoreError::NotFound("media"))?;
        *slot = SourceMedia {
            updated_at: Utc::now(),
            ..media
        };
        Ok(())
    }

    pub fn remove_media(&mut self, tenant_id: TenantId, id: RecordId) -> Result<(), StoreError> {
        let before = self.media.len();
        self.media
            .retain(|m| !(m.id == id && m.tenant_id == tenant_id));
        if self.media.len() == before {
            return Err(StoreError::NotFound("media"));
        }
        Ok(())
    }

    /// Whether any source still points at `path` (image or thumbnail).
    /// Used by the orphan cleanup after migration.
    pub fn local_path_referenced(&self, path: &str) -> bool {
        let is_path = |l: &Option<Locator>| matches!(l, Some(Locator::Local { path: p }) if p == path);
        self.media
            .iter()
            .any(|m| is_path(&m.locator) || is_path(&m.thumbnail_locator))
    }

    pub fn list_media(&self, tenant_id: TenantId, query: &MediaQuery) -> Vec<&SourceMedia> {
        let mut rows: Vec<&SourceMedia> = self
            .media
            .iter()
            .filter(|m| m.tenant_id == tenant_id)
            .filter(|m| match &query.search {
                Some(s) => m
                    .name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&s.to_lowercase())),
                None => true,
            })
            .collect();

        match query.sort.as_deref() {
            Some("name") => rows.sort_by(|a, b| a.name.cmp(&b.name)),
            _ => rows.sort_by_key(|m| m.created_at),
        }
        if query.direction == SortDirection::Descending {
            rows.reverse();
        }

        if query.page_size > 0 {
            let page = query.page.max(1);
            rows.into_iter()
                .skip((page - 1) * query.page_size)
                .take(query.page_size)
                .collect()
        } else {
            rows
        }
    }

    // =========================================================================
    // Derivatives
    // =========================================================================

    /// Insert or replace the derivative for (tenant, source, size).
    ///
    /// The unique constraint lives here so regeneration is idempotent:
    /// re-running on an unchanged source never duplicates rows.
    pub fn upsert_derivative(&mut self, mut derivative: Derivative) -> RecordId {
        if let Some(existing) = self.derivatives.iter_mut().find(|d| {
            d.tenant_id == derivative.tenant_id
                && d.source_id == derivative.source_id
                && d.size == derivative.size
        }) {
            derivative.id = existing.id;
            derivative.created_at = existing.created_at;
            derivative.updated_at = Utc::now();
            *existing = derivative;
            return existing.id;
        }
        derivative.id = self.next_id();
        let id = derivative.id;
        self.derivatives.push(derivative);
        id
    }

    pub fn update_derivative(&mut self, derivative: Derivative) -> Result<(), StoreError> {
        let slot = self
            .derivatives
            .iter_mut()
            .find(|d| d.id == derivative.id && d.tenant_id == derivative.tenant_id)
            .ok_or(StoreError::NotFound("derivative"))?;
        *slot = Derivative {
            updated_at: Utc::now(),
            ..derivative
        };
        Ok(())
    }

    /// All derivatives of one source, in insertion order.
    pub fn derivatives_for_source(
        &self,
        tenant_id: TenantId,
        source_id: RecordId,
    ) -> Vec<&Derivative> {
        self.derivatives
            .iter()
            .filter(|d| d.tenant_id == tenant_id && d.source_id == source_id)
            .collect()
    }

    pub fn remove_derivative(&mut self, id: RecordId) {
        self.derivatives.retain(|d| d.id != id);
    }

    // =========================================================================
    // Galleries
    // =========================================================================

    pub fn insert_gallery(&mut self, mut gallery: Gallery) -> RecordId {
        gallery.id = self.next_id();
        let id = gallery.id;
        self.galleries.push(gallery);
        id
    }

    pub fn gallery(&self, tenant_id: TenantId, id: RecordId) -> Option<&Gallery> {
        self.galleries
            .iter()
            .find(|g| g.id == id && g.tenant_id == tenant_id)
    }

    pub fn update_gallery(&mut self, gallery: Gallery) -> Result<(), StoreError> {
        let slot = self
            .galleries
            .iter_mut()
            .find(|g| g.id == gallery.id && g.tenant_id == gallery.tenant_id)
            .ok_or(StoreError::NotFound("gallery"))?;
        *slot = Gallery {
            updated_at: Utc::now(),
            ..gallery
        };
        Ok(())
    }

    pub fn remove_gallery(&mut self, tenant_id: TenantId, id: RecordId) -> Result<(), StoreError> {
        let before = self.galleries.len();
        self.galleries
            .retain(|g| !(g.id == id && g.tenant_id == tenant_id));
        if self.galleries.len() == before {
            return Err(StoreError::NotFound("gallery"));
        }
        self.memberships.retain(|m| m.gallery_id != id);
        Ok(())
    }

    /// Galleries whose cached thumbnail is `url`. Scanned when a source is
    /// deleted so their thumbnails can be recomputed.
    pub fn galleries_with_thumbnail(&self, url: &str) -> Vec<RecordId> {
        self.galleries
            .iter()
            .filter(|g| g.thumbnail_url.as_deref() == Some(url))
            .map(|g| g.id)
            .collect()
    }

    // =========================================================================
    // Gallery memberships
    // =========================================================================

    /// Memberships of one gallery, ordered by sort position.
    pub fn memberships_for_gallery(
        &self,
        tenant_id: TenantId,
        gallery_id: RecordId,
    ) -> Vec<&GalleryMembership> {
        let mut rows: Vec<&GalleryMembership> = self
            .memberships
            .iter()
            .filter(|m| m.tenant_id == tenant_id && m.gallery_id == gallery_id)
            .collect();
        rows.sort_by_key(|m| m.sort_by);
        rows
    }

    /// Galleries a source belongs to. Used by the delete cascade to know
    /// which memberships and thumbnails need attention.
    pub fn galleries_for_element(
        &self,
        tenant_id: TenantId,
        element_id: RecordId,
    ) -> Vec<RecordId> {
        self.memberships
            .iter()
            .filter(|m| m.tenant_id == tenant_id && m.element_id == element_id)
            .map(|m| m.gallery_id)
            .collect()
    }

    /// Insert or replace the membership for (tenant, gallery, element).
    pub fn upsert_membership(&mut self, mut membership: GalleryMembership) -> RecordId {
        if let Some(existing) = self.memberships.iter_mut().find(|m| {
            m.tenant_id == membership.tenant_id
                && m.gallery_id == membership.gallery_id
                && m.element_id == membership.element_id
        }) {
            membership.id = existing.id;
            membership.created_at = existing.created_at;
            membership.updated_at = Utc::now();
            *existing = membership;
            return existing.id;
        }
        membership.id = self.next_id();
        let id = membership.id;
        self.memberships.push(membership);
        id
    }

    pub fn remove_membership(
        &mut self,
        tenant_id: TenantId,
        gallery_id: RecordId,
        element_id: RecordId,
    ) {
        self.memberships.retain(|m| {
            !(m.tenant_id == tenant_id && m.gallery_id == gallery_id && m.element_id == element_id)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaKind;

    fn media(tenant: TenantId, name: &str) -> SourceMedia {
        SourceMedia {
            name: Some(name.to_string()),
            ..SourceMedia::new(tenant)
        }
    }

    fn derivative(tenant: TenantId, source: RecordId, size: &str, w: u32, h: u32) -> Derivative {
        let mut d = Derivative::new(
            tenant,
            source,
            format!("f_{size}.jpg"),
            size.to_string(),
            Locator::Local {
                path: format!("/media/resized/f_{size}.jpg"),
            },
        );
        d.set_dimensions(w, h);
        d
    }

    #[test]
    fn media_is_tenant_scoped() {
        let mut cat = Catalog::new();
        let id = cat.insert_media(media(1, "a"));
        assert!(cat.media(1, id).is_some());
        assert!(cat.media(2, id).is_none());
    }

    #[test]
    fn media_lookup_by_url() {
        let mut cat = Catalog::new();
        let mut m = media(1, "a");
        m.locator = Some(Locator::Local {
            path: "/media/a.jpg".into(),
        });
        let id = cat.insert_media(m);
        assert_eq!(cat.media_by_url(1, "/media/a.jpg").unwrap().id, id);
        assert!(cat.media_by_url(2, "/media/a.jpg").is_none());
    }

    #[test]
    fn updates_are_tenant_scoped() {
        let mut cat = Catalog::new();
        let id = cat.insert_media(media(1, "a"));

        // a row carrying a foreign tenant id must not reach tenant 1's data
        let mut stolen = cat.media(1, id).unwrap().clone();
        stolen.tenant_id = 2;
        stolen.name = Some("hijacked".into());
        assert_eq!(cat.update_media(stolen), Err(StoreError::NotFound("media")));
        assert_eq!(cat.media(1, id).unwrap().name.as_deref(), Some("a"));

        cat.upsert_derivative(derivative(1, id, "10x10", 10, 10));
        let mut row = cat.derivatives_for_source(1, id)[0].clone();
        row.tenant_id = 2;
        assert_eq!(
            cat.update_derivative(row),
            Err(StoreError::NotFound("derivative"))
        );

        let g = cat.insert_gallery(Gallery::new(1, "G"));
        let mut gallery = cat.gallery(1, g).unwrap().clone();
        gallery.tenant_id = 2;
        assert_eq!(
            cat.update_gallery(gallery),
            Err(StoreError::NotFound("gallery"))
        );
    }

    #[test]
    fn derivative_upsert_is_idempotent() {
        let mut cat = Catalog::new();
        let source = cat.insert_media(media(1, "a"));
        let first = cat.upsert_derivative(derivative(1, source, "610x381", 610, 381));
        let second = cat.upsert_derivative(derivative(1, source, "610x381", 610, 381));
        assert_eq!(first, second);
        assert_eq!(cat.derivatives_for_source(1, source).len(), 1);

        // different size is a new row
        cat.upsert_derivative(derivative(1, source, "160x100", 160, 100));
        assert_eq!(cat.derivatives_for_source(1, source).len(), 2);
    }

    #[test]
    fn derivatives_keep_insertion_order() {
        let mut cat = Catalog::new();
        let source = cat.insert_media(media(1, "a"));
        for size in ["840x525", "160x100", "610x381"] {
            cat.upsert_derivative(derivative(1, source, size, 100, 100));
        }
        let sizes: Vec<&str> = cat
            .derivatives_for_source(1, source)
            .iter()
            .map(|d| d.size.as_str())
            .collect();
        assert_eq!(sizes, vec!["840x525", "160x100", "610x381"]);
    }

    #[test]
    fn list_media_search_and_paging() {
        let mut cat = Catalog::new();
        for name in ["Sunset Beach", "Harbor", "Beach Huts", "Forest"] {
            let mut m = media(1, name);
            m.kind = MediaKind::Image;
            cat.insert_media(m);
        }

        let q = MediaQuery {
            search: Some("beach".into()),
            sort: Some("name".into()),
            direction: SortDirection::Ascending,
            page: 1,
            page_size: 10,
        };
        let rows = cat.list_media(1, &q);
        let names: Vec<&str> = rows.iter().map(|m| m.name.as_deref().unwrap()).collect();
        assert_eq!(names, vec!["Beach Huts", "Sunset Beach"]);

        let q = MediaQuery {
            page: 2,
            page_size: 3,
            direction: SortDirection::Ascending,
            ..MediaQuery::default()
        };
        assert_eq!(cat.list_media(1, &q).len(), 1);
    }

    #[test]
    fn membership_upsert_unique_per_pair() {
        let mut cat = Catalog::new();
        let g = cat.insert_gallery(Gallery::new(1, "G"));
        let e = cat.insert_media(media(1, "a"));
        let now = Utc::now();
        let row = GalleryMembership {
            id: 0,
            tenant_id: 1,
            gallery_id: g,
            element_id: e,
            credit: None,
            description: None,
            sort_by: 0,
            created_at: now,
            updated_at: now,
        };
        let first = cat.upsert_membership(row.clone());
        let second = cat.upsert_membership(GalleryMembership {
            sort_by: 3,
            ..row.clone()
        });
        assert_eq!(first, second);
        let rows = cat.memberships_for_gallery(1, g);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sort_by, 3);
    }

    #[test]
    fn removing_gallery_drops_memberships() {
        let mut cat = Catalog::new();
        let g = cat.insert_gallery(Gallery::new(1, "G"));
        let e = cat.insert_media(media(1, "a"));
        let now = Utc::now();
        cat.upsert_membership(GalleryMembership {
            id: 0,
            tenant_id: 1,
            gallery_id: g,
            element_id: e,
            credit: None,
            description: None,
            sort_by: 0,
            created_at: now,
            updated_at: now,
        });
        cat.remove_gallery(1, g).unwrap();
        assert!(cat.memberships_for_gallery(1, g).is_empty());
    }
}
