//! # Media Forge
//!
//! A media catalog and image derivative pipeline for content-management
//! backends. Editors upload one image; Media Forge renders the whole
//! family of sizes a responsive front end needs, tracks every rendered
//! file, serves the right one per request, and keeps records consistent
//! as files are renamed, migrated to object storage, or deleted.
//!
//! # Architecture
//!
//! Three cooperating pieces, all sharing one record store:
//!
//! ```text
//! 1. Generator   source image  →  derivative family   (crop, resize, register)
//! 2. Resolver    request       →  bytes / redirect    (size + backing mode)
//! 3. Catalog     mutations     →  ordered pipelines   (save, delete, group)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | Pure arithmetic: orientation, crop boxes, the derivative plan |
//! | [`model`] | Record types: `SourceMedia`, `Derivative`, `Gallery`, the `Locator` and the size-label grammar |
//! | [`store`] | In-memory tenant-scoped record store with the query surface the pipeline needs |
//! | [`config`] | TOML configuration, stock defaults, per-tenant override layering |
//! | [`imaging`] | The `ImageCodec` trait and its pure-Rust `image`-crate implementation |
//! | [`storage`] | The `ObjectStore` trait (upload/delete/sign/fetch) and locator path helpers |
//! | [`generator`] | The derivative pipeline: identify, crop, render, register |
//! | [`resolver`] | Size selection and serving decisions per backing mode |
//! | [`catalog`] | Write-side lifecycle: save pipeline, delete cascade, galleries |
//! | [`media_ref`] | Embedded JSON media references and their validation |
//!
//! # Design Decisions
//!
//! ## Explicit Backing Modes
//!
//! Where an asset's bytes live is a [`model::Locator`] enum — local path,
//! public remote object, or private remote object — decided once at write
//! time. Serving code matches on the variant; it never infers the mode
//! from which optional fields happen to be set. Private objects get
//! signed URLs minted behind a mutex; public objects are always
//! redirected to, never proxied.
//!
//! ## An Ordered Save Pipeline, Not Hooks
//!
//! Saving an element runs one explicit sequence in
//! [`catalog::MediaCatalog::save_element`]: infer kind, fill defaults,
//! regenerate derivatives if the file changed, migrate to remote storage.
//! Each step sees the previous step's writes, so there is no
//! callback-ordering ambiguity and the whole pipeline is testable as a
//! unit.
//!
//! ## Pure-Rust Imaging Behind a Trait
//!
//! All pixel work goes through the [`imaging::ImageCodec`] trait. The
//! production implementation is the `image` crate (Lanczos3 resampling),
//! statically linked — no ImageMagick, no system dependencies. Tests swap
//! in a recording mock, so pipeline logic is exercised without decoding a
//! single pixel.
//!
//! ## Derivatives Are Rows, Not Conventions
//!
//! Every rendered file is registered as a [`model::Derivative`] keyed on
//! (tenant, source, size label), with its pixel area stored alongside.
//! The resolver ranks by that area for `small`/`medium`/`large` and never
//! reconstructs file names from naming conventions.

pub mod catalog;
pub mod config;
pub mod generator;
pub mod geometry;
pub mod imaging;
pub mod media_ref;
pub mod model;
pub mod resolver;
pub mod storage;
pub mod store;
