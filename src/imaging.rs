//! Image derivative generation and capture-date extraction.
//!
//! Gallery sources are kept at full resolution under `static/cooking/`; the
//! site serves webp derivatives instead: a bounded full-size rendition and a
//! square center-cropped thumbnail. Both are produced by ImageMagick, and the
//! capture timestamp comes from the image's EXIF `DateTimeOriginal` tag.
//!
//! The [`ImageBackend`] trait is the seam between the pipeline and the
//! external tool: [`MagickBackend`] shells out to `convert`/`identify`, the
//! test mock records operations and writes stub files.

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No capture date in {0}")]
    NoCaptureDate(PathBuf),
    #[error("Unreadable capture date {value:?} in {path}")]
    BadCaptureDate { path: PathBuf, value: String },
    #[error("Image processing failed for {path}: {detail}")]
    ProcessingFailed { path: PathBuf, detail: String },
    #[error("ImageMagick not found; install it or check PATH")]
    MagickMissing,
}

/// Which derivative a transcode produces. Fixes the geometry arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivative {
    /// Bounded fit inside 1600x1600, never upscaled.
    Full,
    /// 320x320 center crop.
    Thumbnail,
}

/// One transcode request: source image to webp derivative.
#[derive(Debug, Clone)]
pub struct TranscodeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub derivative: Derivative,
}

/// Trait for image processing backends.
///
/// Implementations must be `Send + Sync`: transcodes run on pipeline worker
/// threads sharing one backend instance.
pub trait ImageBackend: Send + Sync {
    /// Read the capture timestamp (Unix seconds) from embedded metadata.
    fn capture_timestamp(&self, path: &Path) -> Result<i64, BackendError>;

    /// Produce a webp derivative per `params`.
    fn transcode(&self, params: &TranscodeParams) -> Result<(), BackendError>;
}

/// Production backend driving the ImageMagick CLI tools.
pub struct MagickBackend;

impl MagickBackend {
    fn run(&self, path: &Path, mut command: Command) -> Result<std::process::Output, BackendError> {
        match command.output() {
            Ok(out) if out.status.success() => Ok(out),
            Ok(out) => Err(BackendError::ProcessingFailed {
                path: path.to_path_buf(),
                detail: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BackendError::MagickMissing),
            Err(e) => Err(e.into()),
        }
    }
}

impl ImageBackend for MagickBackend {
    fn capture_timestamp(&self, path: &Path) -> Result<i64, BackendError> {
        let mut command = Command::new("identify");
        command
            .arg("-format")
            .arg("%[EXIF:DateTimeOriginal]")
            .arg(path);
        let out = self.run(path, command)?;

        let raw = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if raw.is_empty() {
            return Err(BackendError::NoCaptureDate(path.to_path_buf()));
        }
        // EXIF format: "2024:06:01 14:03:22"
        let parsed = NaiveDateTime::parse_from_str(&raw, "%Y:%m:%d %H:%M:%S").map_err(|_| {
            BackendError::BadCaptureDate {
                path: path.to_path_buf(),
                value: raw.clone(),
            }
        })?;
        Ok(parsed.and_utc().timestamp())
    }

    fn transcode(&self, params: &TranscodeParams) -> Result<(), BackendError> {
        let mut command = Command::new("convert");
        command.arg(&params.source);
        match params.derivative {
            Derivative::Full => {
                command.arg("-resize").arg("1600x1600>").arg("-quality").arg("82");
            }
            Derivative::Thumbnail => {
                command
                    .arg("-resize")
                    .arg("320x320^")
                    .arg("-gravity")
                    .arg("center")
                    .arg("-extent")
                    .arg("320x320")
                    .arg("-quality")
                    .arg("70");
            }
        }
        command.arg(&params.output);
        self.run(&params.source, command)?;
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock backend with canned timestamps, recording every operation and
    /// writing stub derivative files.
    #[derive(Default)]
    pub struct MockBackend {
        pub timestamps: HashMap<PathBuf, i64>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        CaptureTimestamp(PathBuf),
        Transcode {
            source: PathBuf,
            output: PathBuf,
            derivative: Derivative,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_timestamps(entries: Vec<(PathBuf, i64)>) -> Self {
            Self {
                timestamps: entries.into_iter().collect(),
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn capture_timestamp(&self, path: &Path) -> Result<i64, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::CaptureTimestamp(path.to_path_buf()));
            self.timestamps
                .get(path)
                .copied()
                .ok_or_else(|| BackendError::NoCaptureDate(path.to_path_buf()))
        }

        fn transcode(&self, params: &TranscodeParams) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Transcode {
                source: params.source.clone(),
                output: params.output.clone(),
                derivative: params.derivative,
            });
            std::fs::write(&params.output, b"webp-stub")?;
            Ok(())
        }
    }

    #[test]
    fn mock_returns_canned_timestamp() {
        let backend = MockBackend::with_timestamps(vec![(PathBuf::from("/g/a.jpg"), 1700000000)]);
        assert_eq!(
            backend.capture_timestamp(Path::new("/g/a.jpg")).unwrap(),
            1700000000
        );
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::CaptureTimestamp(PathBuf::from("/g/a.jpg"))]
        );
    }

    #[test]
    fn mock_missing_timestamp_is_an_error() {
        let backend = MockBackend::new();
        assert!(matches!(
            backend.capture_timestamp(Path::new("/g/a.jpg")),
            Err(BackendError::NoCaptureDate(_))
        ));
    }

    #[test]
    fn mock_transcode_writes_stub() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("a.webp");
        let backend = MockBackend::new();

        backend
            .transcode(&TranscodeParams {
                source: PathBuf::from("/g/a.jpg"),
                output: output.clone(),
                derivative: Derivative::Thumbnail,
            })
            .unwrap();

        assert!(output.exists());
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Transcode {
                derivative: Derivative::Thumbnail,
                ..
            }
        ));
    }

    #[test]
    fn exif_date_format_parses() {
        let parsed = NaiveDateTime::parse_from_str("2024:06:01 14:03:22", "%Y:%m:%d %H:%M:%S");
        assert!(parsed.is_ok());
    }
}
