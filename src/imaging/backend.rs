//! Image codec trait and shared types.
//!
//! The [`ImageCodec`] trait defines the three operations the derivative
//! pipeline needs: identify, crop-to-fit, and resize. The production
//! implementation is [`RustCodec`](super::rust_codec::RustCodec) — pure
//! Rust via the `image` crate, statically linked.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("render failed: {0}")]
    Render(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Preferred file extension for the detected format (`jpg`, `png`, ...),
    /// when the codec recognizes one.
    pub format: Option<String>,
}

/// Full specification for one render: source file, output file, target box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Trait for image codecs.
///
/// Operations are path-to-path so the rest of the codebase never touches
/// pixel buffers, and tests can swap in a recording mock.
pub trait ImageCodec: Sync {
    /// Read dimensions and detected format without a full decode.
    fn identify(&self, path: &Path) -> Result<ImageInfo, CodecError>;

    /// Center-weighted crop-to-fit: cover the target box, then crop the
    /// overflow evenly. The transform behind every derivative render.
    fn crop_to_fit(&self, params: &RenderParams) -> Result<(), CodecError>;

    /// Plain resize to exact dimensions, no cropping.
    fn resize(&self, params: &RenderParams) -> Result<(), CodecError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock codec that records operations without touching pixels.
    /// Uses Mutex (not RefCell) so it is Sync.
    #[derive(Default)]
    pub struct MockCodec {
        pub identify_results: Mutex<Vec<ImageInfo>>,
        pub operations: Mutex<Vec<RecordedOp>>,
        /// Output-path substrings whose renders should fail, to exercise
        /// the skip-and-continue path.
        pub fail_outputs: Mutex<Vec<String>>,
        /// When set, rendered outputs are written as empty files so
        /// follow-up filesystem checks see them.
        pub touch_outputs: bool,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RecordedOp {
        Identify(String),
        CropToFit {
            source: String,
            output: String,
            width: u32,
            height: u32,
        },
        Resize {
            source: String,
            output: String,
            width: u32,
            height: u32,
        },
    }

    impl MockCodec {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_info(infos: Vec<ImageInfo>) -> Self {
            Self {
                identify_results: Mutex::new(infos),
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn should_fail(&self, output: &Path) -> bool {
            let output = output.to_string_lossy();
            self.fail_outputs
                .lock()
                .unwrap()
                .iter()
                .any(|s| output.contains(s.as_str()))
        }

        fn touch(&self, output: &Path) {
            if self.touch_outputs {
                if let Some(parent) = output.parent() {
                    std::fs::create_dir_all(parent).unwrap();
                }
                std::fs::write(output, b"").unwrap();
            }
        }
    }

    impl ImageCodec for MockCodec {
        fn identify(&self, path: &Path) -> Result<ImageInfo, CodecError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));
            self.identify_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| CodecError::Decode("no mock image info".to_string()))
        }

        fn crop_to_fit(&self, params: &RenderParams) -> Result<(), CodecError> {
            self.operations.lock().unwrap().push(RecordedOp::CropToFit {
                source: params.source.to_string_lossy().to_string(),
                output: params.output.to_string_lossy().to_string(),
                width: params.width,
                height: params.height,
            });
            if self.should_fail(&params.output) {
                return Err(CodecError::Render("mock render failure".to_string()));
            }
            self.touch(&params.output);
            Ok(())
        }

        fn resize(&self, params: &RenderParams) -> Result<(), CodecError> {
            self.operations.lock().unwrap().push(RecordedOp::Resize {
                source: params.source.to_string_lossy().to_string(),
                output: params.output.to_string_lossy().to_string(),
                width: params.width,
                height: params.height,
            });
            if self.should_fail(&params.output) {
                return Err(CodecError::Render("mock render failure".to_string()));
            }
            self.touch(&params.output);
            Ok(())
        }
    }

    #[test]
    fn mock_records_identify() {
        let codec = MockCodec::with_info(vec![ImageInfo {
            width: 800,
            height: 600,
            format: Some("jpg".into()),
        }]);

        let info = codec.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(info.width, 800);
        assert_eq!(info.height, 600);

        let ops = codec.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_records_crop_to_fit() {
        let codec = MockCodec::new();
        codec
            .crop_to_fit(&RenderParams {
                source: "/a.jpg".into(),
                output: "/out/a_610x381.jpg".into(),
                width: 610,
                height: 381,
            })
            .unwrap();

        let ops = codec.get_operations();
        assert!(matches!(
            &ops[0],
            RecordedOp::CropToFit {
                width: 610,
                height: 381,
                ..
            }
        ));
    }

    #[test]
    fn mock_fails_matching_outputs() {
        let codec = MockCodec::new();
        codec.fail_outputs.lock().unwrap().push("_610x381".into());

        let result = codec.crop_to_fit(&RenderParams {
            source: "/a.jpg".into(),
            output: "/out/a_610x381.jpg".into(),
            width: 610,
            height: 381,
        });
        assert!(result.is_err());
    }
}
