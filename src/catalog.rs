//! Catalog lifecycle: saving, deleting and grouping media records.
//!
//! [`MediaCatalog`] owns the write-side orchestration the store itself
//! stays ignorant of. Saving an element runs an explicit, ordered
//! pipeline:
//! 1. infer the media kind from the record's fields,
//! 2. fill derived defaults (display name, video thumbnail),
//! 3. regenerate derivatives when the file name changed since the last
//!    successful run, cleaning up files the new family orphaned,
//! 4. migrate local bytes to the object store when configured.
//!
//! Deleting cascades in the opposite order: derivative rows and bytes
//! first (tolerating individual failures), then the source's own bytes,
//! then memberships, and finally a thumbnail rescan of any gallery that
//! was showing the deleted element.

use crate::config::{ConfigResolver, MediaConfig};
use crate::generator::{DerivativeGenerator, GenerateOutcome};
use crate::imaging::ImageCodec;
use crate::model::{Gallery, GalleryMembership, Locator, MediaKind, RecordId, SourceMedia, TenantId};
use crate::storage::{is_remote_url, local_fs_path, remote_object_path, ObjectStore};
use crate::store::{Catalog, StoreError};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Write-side service over the record store, codec and object store.
pub struct MediaCatalog<C: ImageCodec, S: ObjectStore> {
    codec: C,
    objects: S,
    config: ConfigResolver,
    media_root: PathBuf,
}

impl<C: ImageCodec, S: ObjectStore> MediaCatalog<C, S> {
    pub fn new(codec: C, objects: S, config: ConfigResolver, media_root: impl Into<PathBuf>) -> Self {
        Self {
            codec,
            objects,
            config,
            media_root: media_root.into(),
        }
    }

    pub fn config(&self) -> &ConfigResolver {
        &self.config
    }

    // =========================================================================
    // elements
    // =========================================================================

    /// Save one element through the full pipeline. Returns the record id
    /// and, when derivatives were (re)generated, the run's outcome.
    pub fn save_element(
        &self,
        catalog: &mut Catalog,
        mut element: SourceMedia,
    ) -> Result<(RecordId, Option<GenerateOutcome>), CatalogError> {
        let cfg = self.config.for_tenant(element.tenant_id);

        element.kind = infer_kind(&element);
        apply_defaults(&mut element, &cfg);
        normalize_locators(&mut element, &cfg);

        if element.id == 0 {
            element.remote_is_public = cfg.remote_is_public;
            element.id = catalog.insert_media(element.clone());
        } else if catalog.media(element.tenant_id, element.id).is_none() {
            return Err(StoreError::NotFound("media").into());
        }

        let outcome = if needs_regeneration(&element) {
            Some(self.regenerate(catalog, &mut element, &cfg))
        } else {
            None
        };

        if cfg.upload_to_remote && !cfg.remote_bucket.is_empty() {
            self.migrate_element(catalog, &mut element, &cfg);
        }

        catalog.update_media(element.clone())?;
        Ok((element.id, outcome))
    }

    fn regenerate(
        &self,
        catalog: &mut Catalog,
        element: &mut SourceMedia,
        cfg: &MediaConfig,
    ) -> GenerateOutcome {
        // The old family is dropped wholesale; sizes the new image cannot
        // support must not survive as stale rows.
        let old_rows: Vec<(RecordId, Option<String>)> = catalog
            .derivatives_for_source(element.tenant_id, element.id)
            .iter()
            .map(|d| {
                let path = match &d.locator {
                    Locator::Local { path } => Some(path.clone()),
                    _ => None,
                };
                (d.id, path)
            })
            .collect();
        for (id, _) in &old_rows {
            catalog.remove_derivative(*id);
        }

        let generator = DerivativeGenerator::new(&self.codec, cfg, &self.media_root);
        let outcome = generator.generate(catalog, element);
        if outcome.success {
            element.original_file_name = element.file_name.clone();
        }
        // Persist before the orphan scan so reference checks see the
        // element's new locators, not the ones being retired.
        if let Err(e) = catalog.update_media(element.clone()) {
            warn!(error = %e, "could not persist element after generation");
        }

        let current: HashSet<String> = catalog
            .derivatives_for_source(element.tenant_id, element.id)
            .iter()
            .filter_map(|d| match &d.locator {
                Locator::Local { path } => Some(path.clone()),
                _ => None,
            })
            .collect();
        for path in old_rows.into_iter().filter_map(|(_, p)| p) {
            if !current.contains(&path) && !catalog.local_path_referenced(&path) {
                let fs = local_fs_path(&self.media_root, &path);
                if let Err(e) = std::fs::remove_file(&fs) {
                    warn!(path = %fs.display(), error = %e, "could not remove orphaned file");
                }
            }
        }

        outcome
    }

    /// Move every local-backed file of this element to the object store.
    /// Upload failures are logged and leave the local locator authoritative.
    fn migrate_element(&self, catalog: &mut Catalog, element: &mut SourceMedia, cfg: &MediaConfig) {
        let record_key = element.id.to_string();
        // The element's thumbnail is also one of the derivative rows; once
        // that row migrates (and the file may be gone), the element reuses
        // its new locator instead of uploading again.
        let mut moved: HashMap<String, Locator> = HashMap::new();

        let rows: Vec<_> = catalog
            .derivatives_for_source(element.tenant_id, element.id)
            .into_iter()
            .cloned()
            .collect();
        for mut row in rows {
            let public = row.remote_is_public;
            let old_path = match &row.locator {
                Locator::Local { path } => path.clone(),
                _ => continue,
            };
            if let Some(migrated) = self.migrate_locator(&row.locator, &record_key, public, cfg) {
                moved.insert(old_path, migrated.clone());
                row.locator = migrated;
                if let Err(e) = catalog.update_derivative(row) {
                    warn!(error = %e, "could not persist migrated derivative");
                }
            }
        }

        let public = element.remote_is_public;
        for locator in [&mut element.locator, &mut element.thumbnail_locator] {
            let Some(Locator::Local { path }) = locator else {
                continue;
            };
            let path = path.clone();
            if let Some(migrated) = moved.get(&path).cloned().or_else(|| {
                self.migrate_locator(&Locator::Local { path }, &record_key, public, cfg)
            }) {
                *locator = Some(migrated);
            }
        }
    }

    fn migrate_locator(
        &self,
        locator: &Locator,
        record_key: &str,
        public: bool,
        cfg: &MediaConfig,
    ) -> Option<Locator> {
        let Locator::Local { path } = locator else {
            return None;
        };
        let fs = local_fs_path(&self.media_root, path);
        let key = remote_object_path(cfg.remote_folder.as_deref(), record_key, path);
        let url = match self.objects.upload(&fs, &cfg.remote_bucket, &key, public) {
            Ok(url) => url,
            Err(e) => {
                error!(path = %path, error = %e, "remote upload failed, keeping local copy");
                return None;
            }
        };
        if cfg.delete_from_local {
            if let Err(e) = std::fs::remove_file(&fs) {
                warn!(path = %fs.display(), error = %e, "could not remove migrated file");
            }
        }
        Some(if public {
            Locator::PublicRemote {
                bucket: cfg.remote_bucket.clone(),
                path: key,
                url,
            }
        } else {
            Locator::PrivateRemote {
                bucket: cfg.remote_bucket.clone(),
                path: key,
            }
        })
    }

    /// Delete an element and everything that hangs off it. Byte deletion
    /// is best-effort per item; row deletion always completes.
    pub fn delete_element(
        &self,
        catalog: &mut Catalog,
        tenant_id: TenantId,
        id: RecordId,
    ) -> Result<(), CatalogError> {
        let element = catalog
            .media(tenant_id, id)
            .cloned()
            .ok_or(StoreError::NotFound("media"))?;
        let cfg = self.config.for_tenant(tenant_id);
        let old_thumbnail = element.thumbnail_url().map(str::to_string);

        let rows: Vec<_> = catalog
            .derivatives_for_source(tenant_id, id)
            .into_iter()
            .cloned()
            .collect();
        for row in rows {
            self.delete_bytes(&row.locator, &cfg);
            catalog.remove_derivative(row.id);
        }

        if let Some(locator) = &element.locator {
            self.delete_bytes(locator, &cfg);
        }
        if let Some(locator) = &element.thumbnail_locator {
            self.delete_bytes(locator, &cfg);
        }

        let mut affected: Vec<RecordId> = catalog.galleries_for_element(tenant_id, id);
        for gallery_id in &affected {
            catalog.remove_membership(tenant_id, *gallery_id, id);
        }
        catalog.remove_media(tenant_id, id)?;

        if let Some(url) = old_thumbnail {
            affected.extend(catalog.galleries_with_thumbnail(&url));
        }
        affected.sort_unstable();
        affected.dedup();
        for gallery_id in affected {
            self.refresh_gallery_thumbnail(catalog, tenant_id, gallery_id);
        }
        Ok(())
    }

    fn delete_bytes(&self, locator: &Locator, cfg: &MediaConfig) {
        match locator {
            Locator::Local { path } => {
                if cfg.delete_from_local {
                    let fs = local_fs_path(&self.media_root, path);
                    if let Err(e) = std::fs::remove_file(&fs) {
                        warn!(path = %fs.display(), error = %e, "could not remove local file");
                    }
                }
            }
            Locator::PublicRemote { bucket, path, .. } | Locator::PrivateRemote { bucket, path } => {
                if cfg.delete_from_remote {
                    if let Err(e) = self.objects.delete(bucket, path) {
                        warn!(bucket = %bucket, path = %path, error = %e, "could not remove remote object");
                    }
                }
            }
        }
    }

    // =========================================================================
    // galleries
    // =========================================================================

    /// Save a gallery, recomputing its cached thumbnail.
    pub fn save_gallery(
        &self,
        catalog: &mut Catalog,
        mut gallery: Gallery,
    ) -> Result<RecordId, CatalogError> {
        if gallery.name.trim().is_empty() {
            return Err(CatalogError::Validation(
                "gallery name is required".to_string(),
            ));
        }
        if gallery.id == 0 {
            gallery.id = catalog.insert_gallery(gallery.clone());
        }
        gallery.thumbnail_url = Some(self.gallery_thumbnail(catalog, &gallery));
        catalog.update_gallery(gallery.clone())?;
        Ok(gallery.id)
    }

    /// Replace a gallery's membership with `elements`, in order. Existing
    /// rows keep their per-gallery credit and description; positions are
    /// rewritten contiguously from zero.
    pub fn set_gallery_elements(
        &self,
        catalog: &mut Catalog,
        tenant_id: TenantId,
        gallery_id: RecordId,
        elements: &[RecordId],
    ) -> Result<(), CatalogError> {
        let gallery = catalog
            .gallery(tenant_id, gallery_id)
            .cloned()
            .ok_or(StoreError::NotFound("gallery"))?;
        for &e in elements {
            if catalog.media(tenant_id, e).is_none() {
                return Err(CatalogError::Validation(format!("no media element {e}")));
            }
        }

        let existing: HashMap<RecordId, (Option<String>, Option<String>)> = catalog
            .memberships_for_gallery(tenant_id, gallery_id)
            .into_iter()
            .map(|m| (m.element_id, (m.credit.clone(), m.description.clone())))
            .collect();

        let wanted: HashSet<RecordId> = elements.iter().copied().collect();
        for &element_id in existing.keys() {
            if !wanted.contains(&element_id) {
                catalog.remove_membership(tenant_id, gallery_id, element_id);
            }
        }

        let now = Utc::now();
        for (position, &element_id) in elements.iter().enumerate() {
            let (credit, description) = existing.get(&element_id).cloned().unwrap_or_default();
            catalog.upsert_membership(GalleryMembership {
                id: 0,
                tenant_id,
                gallery_id,
                element_id,
                credit,
                description,
                sort_by: position as u32,
                created_at: now,
                updated_at: now,
            });
        }

        self.save_gallery(catalog, gallery)?;
        Ok(())
    }

    /// The thumbnail a gallery should show: its first member's thumbnail,
    /// or the configured default when the gallery is empty (or the first
    /// member has no thumbnail).
    fn gallery_thumbnail(&self, catalog: &Catalog, gallery: &Gallery) -> String {
        let cfg = self.config.for_tenant(gallery.tenant_id);
        catalog
            .memberships_for_gallery(gallery.tenant_id, gallery.id)
            .first()
            .and_then(|m| catalog.media(gallery.tenant_id, m.element_id))
            .and_then(|e| e.thumbnail_url())
            .map(str::to_string)
            .unwrap_or(cfg.gallery_thumbnail_default_url)
    }

    fn refresh_gallery_thumbnail(
        &self,
        catalog: &mut Catalog,
        tenant_id: TenantId,
        gallery_id: RecordId,
    ) {
        let Some(gallery) = catalog.gallery(tenant_id, gallery_id).cloned() else {
            return;
        };
        let mut updated = gallery;
        updated.thumbnail_url = Some(self.gallery_thumbnail(catalog, &updated));
        if let Err(e) = catalog.update_gallery(updated) {
            warn!(gallery = gallery_id, error = %e, "could not refresh gallery thumbnail");
        }
    }
}

/// A record with any video field set is a video, everything else an image.
fn infer_kind(element: &SourceMedia) -> MediaKind {
    if element.video_url.is_some() || element.video_embed.is_some() || element.manual_embed {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

fn apply_defaults(element: &mut SourceMedia, cfg: &MediaConfig) {
    if element.name.is_none() {
        element.name = match element.kind {
            MediaKind::Image => element.file_name.clone(),
            MediaKind::Video => element.video_url.clone(),
        };
    }
    if element.kind == MediaKind::Video && element.thumbnail_locator.is_none() {
        element.thumbnail_locator = Some(Locator::Local {
            path: cfg.video_thumbnail_default_url.clone(),
        });
    }
}

/// Callers sometimes paste a full URL where a local path belongs. A
/// `Local` locator whose path is really a remote URL is rewritten to
/// `PublicRemote` here, so nothing downstream treats it as a file under
/// the media root.
fn normalize_locators(element: &mut SourceMedia, cfg: &MediaConfig) {
    for locator in [&mut element.locator, &mut element.thumbnail_locator] {
        let Some(Locator::Local { path }) = locator else {
            continue;
        };
        let path = path.clone();
        if is_remote_url(&path) {
            *locator = Some(Locator::PublicRemote {
                bucket: cfg.remote_bucket.clone(),
                path: path.clone(),
                url: path,
            });
        }
    }
}

/// Regeneration fires when the stored file differs from the one the last
/// successful run saw. Videos never regenerate.
fn needs_regeneration(element: &SourceMedia) -> bool {
    element.kind == MediaKind::Image
        && element.file_name.is_some()
        && element.file_name != element.original_file_name
}
