//! Image codec seam — pure Rust, zero external dependencies.
//!
//! The module is split into:
//! - **Backend**: [`ImageCodec`] trait + shared parameter types
//! - **Rust codec**: the `image`-crate implementation

pub mod backend;
pub mod rust_codec;

pub use backend::{CodecError, ImageCodec, ImageInfo, RenderParams};
pub use rust_codec::RustCodec;
