//! Size-aware media resolution and serving decisions.
//!
//! [`MediaResolver::serve`] turns a request (tenant, element or URL, size
//! hint, delivery flags) into a [`ServeResult`]: inline bytes, a redirect,
//! a bare URL for the caller to embed, or a not-found. The HTTP layer
//! above maps these onto responses; nothing here touches sockets.
//!
//! Delivery follows the chosen derivative's [`Locator`] variant, never a
//! guess from optional fields:
//! - `Local` — stream from disk, or hand back the URL path
//! - `PublicRemote` — always the standing URL, never proxied
//! - `PrivateRemote` — mint a signed URL (serialized through a mutex so
//!   concurrent mints never interleave), then redirect or proxy

use crate::config::ConfigResolver;
use crate::model::{Derivative, Locator, RecordId, TenantId};
use crate::storage::{local_fs_path, ObjectStore, StorageError};
use crate::store::Catalog;
use std::cmp::Reverse;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// One year, the far-future expiry for immutable derivative files.
pub const CACHE_CONTROL: &str = "public, max-age=31557600";

/// Proxied private objects are streamed through a buffer of this size.
pub const PROXY_CHUNK_SIZE: usize = 512 * 1024;

/// Failures on the serving path that map to a 5xx upstream: the request
/// was well-formed and the record exists, but delivery broke.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("could not sign remote object: {0}")]
    Sign(StorageError),
    #[error("could not fetch remote object: {0}")]
    Fetch(StorageError),
}

/// A media serving request, decoded from query parameters upstream.
#[derive(Debug, Clone, Default)]
pub struct ServeRequest {
    pub tenant_id: Option<TenantId>,
    pub element_id: Option<RecordId>,
    /// Locate the element by its stored URL instead of by id.
    pub url: Option<String>,
    /// `small`, `medium`, `large`, or one or more exact size labels
    /// separated by commas (`"610x381, 320x414"`).
    pub size: String,
    /// Miss on an exact label is a not-found instead of falling back.
    pub get_exact_size: bool,
    /// Return the URL itself rather than serving.
    pub get_url: bool,
    /// Redirect to the URL rather than streaming bytes.
    pub redirect_url: bool,
}

impl ServeRequest {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            size: "small".to_string(),
            ..Self::default()
        }
    }
}

/// What the HTTP layer should do with a request.
pub enum ServeResult {
    /// Stream a body with the given headers.
    InlineBytes {
        content_type: String,
        content_length: Option<u64>,
        cache_control: &'static str,
        body: Box<dyn Read + Send>,
    },
    /// 302 to this URL.
    RedirectUrl(String),
    /// Hand the URL back as the response body (for client-side embedding).
    LocatorUrl(String),
    /// 404 with a reason.
    NotFound(String),
}

/// Pick a derivative for a size hint.
///
/// Labels containing `x` are exact-label lookups: the hint is split on
/// commas, entries trimmed, and the first derivative (insertion order)
/// whose size is in the set wins. Named sizes rank by pixel area:
/// `small` is the minimum, `large` the maximum, `medium` the middle of
/// the area-ascending list (lower middle for even counts). Area ties go
/// to the earliest-inserted row.
pub fn select_derivative<'a>(
    rows: &[&'a Derivative],
    size: &str,
    get_exact_size: bool,
) -> Option<&'a Derivative> {
    if rows.is_empty() {
        return None;
    }

    if size.contains('x') {
        let wanted: Vec<&str> = size.split(',').map(str::trim).collect();
        let exact = rows.iter().find(|d| wanted.contains(&d.size.as_str()));
        if exact.is_some() || get_exact_size {
            return exact.copied();
        }
        return select_derivative(rows, "small", false);
    }

    match size {
        "large" => rows.iter().min_by_key(|d| Reverse(d.area)).copied(),
        "medium" => {
            let mut sorted = rows.to_vec();
            sorted.sort_by_key(|d| d.area);
            Some(sorted[(sorted.len() - 1) / 2])
        }
        _ => rows.iter().min_by_key(|d| d.area).copied(),
    }
}

/// Resolves serve requests against the catalog and object store.
pub struct MediaResolver<S: ObjectStore> {
    objects: S,
    config: ConfigResolver,
    media_root: PathBuf,
    /// Serializes signed-URL minting. Only minting: fetches and disk reads
    /// happen outside the lock.
    signer: Mutex<()>,
}

impl<S: ObjectStore> MediaResolver<S> {
    pub fn new(objects: S, config: ConfigResolver, media_root: impl Into<PathBuf>) -> Self {
        Self {
            objects,
            config,
            media_root: media_root.into(),
            signer: Mutex::new(()),
        }
    }

    pub fn serve(
        &self,
        catalog: &Catalog,
        req: &ServeRequest,
    ) -> Result<ServeResult, ResolveError> {
        let Some(tenant_id) = req.tenant_id else {
            return Ok(ServeResult::NotFound("tenant is required".to_string()));
        };
        let source = match (req.element_id, req.url.as_deref()) {
            (Some(id), None) => catalog.media(tenant_id, id),
            (None, Some(url)) => catalog.media_by_url(tenant_id, url),
            _ => {
                return Ok(ServeResult::NotFound(
                    "exactly one of element id and url is required".to_string(),
                ));
            }
        };
        let Some(source) = source else {
            return Ok(ServeResult::NotFound("no such media element".to_string()));
        };

        let rows = catalog.derivatives_for_source(tenant_id, source.id);
        let Some(derivative) = select_derivative(&rows, &req.size, req.get_exact_size) else {
            return Ok(ServeResult::NotFound(format!(
                "no derivative for size '{}'",
                req.size
            )));
        };

        match &derivative.locator {
            Locator::Local { path } => {
                if req.get_url {
                    return Ok(ServeResult::LocatorUrl(path.clone()));
                }
                if req.redirect_url {
                    return Ok(ServeResult::RedirectUrl(path.clone()));
                }
                self.serve_local_file(path, &derivative.file_name)
            }
            // Public objects are the CDN's problem: point at them, never proxy.
            Locator::PublicRemote { url, .. } => {
                if req.get_url {
                    Ok(ServeResult::LocatorUrl(url.clone()))
                } else {
                    Ok(ServeResult::RedirectUrl(url.clone()))
                }
            }
            Locator::PrivateRemote { bucket, path } => {
                let signed = self.sign(tenant_id, bucket, path)?;
                if req.get_url {
                    return Ok(ServeResult::LocatorUrl(signed));
                }
                if req.redirect_url {
                    return Ok(ServeResult::RedirectUrl(signed));
                }
                self.proxy(&signed, &derivative.file_name)
            }
        }
    }

    fn sign(&self, tenant_id: TenantId, bucket: &str, path: &str) -> Result<String, ResolveError> {
        let expiry = self.config.signed_url_expiry(tenant_id);
        let _guard = self.signer.lock().unwrap();
        self.objects
            .sign(bucket, path, expiry)
            .map_err(ResolveError::Sign)
    }

    fn serve_local_file(
        &self,
        url_path: &str,
        file_name: &str,
    ) -> Result<ServeResult, ResolveError> {
        let fs_path = local_fs_path(&self.media_root, url_path);
        let file = match File::open(&fs_path) {
            Ok(f) => f,
            Err(_) => {
                return Ok(ServeResult::NotFound(format!(
                    "missing file {}",
                    fs_path.display()
                )));
            }
        };
        let content_length = file.metadata().ok().map(|m| m.len());
        Ok(ServeResult::InlineBytes {
            content_type: content_type_for(file_name),
            content_length,
            cache_control: CACHE_CONTROL,
            body: Box::new(file),
        })
    }

    fn proxy(&self, signed_url: &str, file_name: &str) -> Result<ServeResult, ResolveError> {
        let body = self.objects.fetch(signed_url).map_err(ResolveError::Fetch)?;
        Ok(ServeResult::InlineBytes {
            content_type: content_type_for(file_name),
            content_length: None,
            cache_control: CACHE_CONTROL,
            body: Box::new(BufReader::with_capacity(PROXY_CHUNK_SIZE, body)),
        })
    }
}

fn content_type_for(file_name: &str) -> String {
    mime_guess::from_path(Path::new(file_name))
        .first_or_octet_stream()
        .to_string()
}
