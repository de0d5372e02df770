// Screen capture: DPI-correct primary-monitor PNG, staged in a temp file.
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use image::ImageFormat;
use tempfile::NamedTempFile;

use crate::config::CaptureConfig;
use crate::errors::{DeskError, DeskResult};
use crate::perception::types::{ImageSize, ScreenshotMeta};
use crate::platform::{CapturedFrame, DesktopBackend};

/// Encoded image plus its true pixel dimensions.
///
/// A temp file backing the image is removed when the value is dropped,
/// unless the capture config asked to keep it.
pub struct ScreenImage {
    bytes: Vec<u8>,
    mime_type: &'static str,
    size: ImageSize,
    meta: Option<ScreenshotMeta>,
    temp_file: Option<NamedTempFile>,
    kept_path: Option<PathBuf>,
}

impl ScreenImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn meta(&self) -> Option<&ScreenshotMeta> {
        self.meta.as_ref()
    }

    /// Path that stays valid after this value is dropped, if any.
    pub fn persistent_path(&self) -> Option<&Path> {
        self.kept_path.as_deref()
    }
}

/// Captures the primary monitor under a hard timeout.
pub async fn capture_primary(
    backend: Arc<dyn DesktopBackend>,
    cfg: &CaptureConfig,
    limit: Duration,
) -> DeskResult<ScreenImage> {
    let cfg = cfg.clone();
    let task = tokio::task::spawn_blocking(move || -> DeskResult<ScreenImage> {
        let frame = backend.capture()?;
        stage_frame(frame, &cfg)
    });

    match tokio::time::timeout(limit, task).await {
        Err(_) => Err(DeskError::CaptureTimeout(limit.as_secs())),
        Ok(Err(join)) => Err(DeskError::CaptureFailed(format!("capture task failed: {join}"))),
        Ok(Ok(result)) => {
            let shot = result?;
            tracing::info!(
                width = shot.size.width,
                height = shot.size.height,
                bytes = shot.bytes.len(),
                "screenshot captured"
            );
            Ok(shot)
        }
    }
}

/// Encodes a frame to PNG and writes it to a uniquely named temp file.
fn stage_frame(frame: CapturedFrame, cfg: &CaptureConfig) -> DeskResult<ScreenImage> {
    let (width, height) = frame.image.dimensions();
    if width == 0 || height == 0 {
        return Err(DeskError::CaptureFailed("captured frame is empty".into()));
    }

    let mut bytes = Vec::new();
    frame
        .image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| DeskError::CaptureFailed(format!("png encode: {e}")))?;

    let mut file = tempfile::Builder::new()
        .prefix(&format!("{}-", cfg.file_prefix))
        .suffix(".png")
        .tempfile()
        .map_err(|e| DeskError::CaptureFailed(format!("create screenshot file: {e}")))?;
    file.write_all(&bytes)
        .and_then(|_| file.flush())
        .map_err(|e| DeskError::CaptureFailed(format!("write screenshot file: {e}")))?;

    let written = std::fs::metadata(file.path()).map(|m| m.len()).unwrap_or(0);
    if written != bytes.len() as u64 {
        return Err(DeskError::CaptureFailed(format!(
            "screenshot file {} did not materialize",
            file.path().display()
        )));
    }

    let (temp_file, kept_path) = if cfg.keep_files {
        let (_, path) = file
            .keep()
            .map_err(|e| DeskError::CaptureFailed(format!("keep screenshot file: {e}")))?;
        (None, Some(path))
    } else {
        (Some(file), None)
    };

    Ok(ScreenImage {
        bytes,
        mime_type: "image/png",
        size: ImageSize::new(width, height),
        meta: Some(frame.meta),
        temp_file,
        kept_path,
    })
}

/// Loads an existing PNG/JPEG instead of capturing. Dimensions come from
/// decoding the file.
pub async fn load_image_file(path: &Path) -> DeskResult<ScreenImage> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        DeskError::InvalidRequest(format!("cannot read image_path {}: {e}", path.display()))
    })?;
    let format = image::guess_format(&bytes)?;
    let decoded = image::load_from_memory_with_format(&bytes, format)?;
    tracing::debug!(path = %path.display(), width = decoded.width(), height = decoded.height(), "image file loaded");

    Ok(ScreenImage {
        size: ImageSize::new(decoded.width(), decoded.height()),
        mime_type: format.to_mime_type(),
        bytes,
        meta: None,
        temp_file: None,
        kept_path: Some(path.to_path_buf()),
    })
}

/// Decodes an image sent inline with the request. Nothing is written to
/// disk, so the result carries no path.
pub fn load_image_base64(data: &str) -> DeskResult<ScreenImage> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| DeskError::InvalidRequest(format!("image_base64 is not valid base64: {e}")))?;
    let format = image::guess_format(&bytes)
        .map_err(|e| DeskError::InvalidRequest(format!("image_base64 is not a PNG or JPEG: {e}")))?;
    let decoded = image::load_from_memory_with_format(&bytes, format)?;
    tracing::debug!(width = decoded.width(), height = decoded.height(), "inline image decoded");

    Ok(ScreenImage {
        size: ImageSize::new(decoded.width(), decoded.height()),
        mime_type: format.to_mime_type(),
        bytes,
        meta: None,
        temp_file: None,
        kept_path: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::InputStep;
    use image::RgbaImage;

    struct FixedFrame {
        width: u32,
        height: u32,
        delay: Duration,
    }

    impl DesktopBackend for FixedFrame {
        fn name(&self) -> &str {
            "fixed"
        }

        fn capture(&self) -> DeskResult<CapturedFrame> {
            std::thread::sleep(self.delay);
            Ok(CapturedFrame {
                image: RgbaImage::new(self.width, self.height),
                meta: ScreenshotMeta {
                    monitor_name: "test".into(),
                    scale_factor: 1.5,
                    physical_width: self.width,
                    physical_height: self.height,
                    logical_width: (self.width as f64 / 1.5) as u32,
                    logical_height: (self.height as f64 / 1.5) as u32,
                },
            })
        }

        fn perform(&self, _steps: &[InputStep]) -> DeskResult<()> {
            Ok(())
        }
    }

    fn backend(width: u32, height: u32, delay: Duration) -> Arc<dyn DesktopBackend> {
        Arc::new(FixedFrame { width, height, delay })
    }

    #[tokio::test]
    async fn capture_reports_physical_size_and_cleans_up() {
        let shot = capture_primary(backend(30, 20, Duration::ZERO), &CaptureConfig::default(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(shot.size(), ImageSize::new(30, 20));
        assert_eq!(shot.mime_type(), "image/png");
        assert!(shot.persistent_path().is_none());

        let path = shot.temp_file.as_ref().unwrap().path().to_path_buf();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("deskpilot-screenshot-") && name.ends_with(".png"));
        assert_eq!(image::load_from_memory(shot.bytes()).unwrap().width(), 30);

        drop(shot);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn keep_files_persists_screenshot() {
        let cfg = CaptureConfig {
            keep_files: true,
            file_prefix: "deskpilot-kept".into(),
        };
        let shot = capture_primary(backend(4, 4, Duration::ZERO), &cfg, Duration::from_secs(5))
            .await
            .unwrap();
        let path = shot.persistent_path().unwrap().to_path_buf();
        drop(shot);
        assert!(path.exists());
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn empty_frame_is_capture_failed() {
        let err = capture_primary(backend(0, 0, Duration::ZERO), &CaptureConfig::default(), Duration::from_secs(5))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DeskError::CaptureFailed(_)));
    }

    #[tokio::test]
    async fn slow_capture_times_out() {
        let err = capture_primary(
            backend(4, 4, Duration::from_millis(1500)),
            &CaptureConfig::default(),
            Duration::from_secs(1),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, DeskError::CaptureTimeout(1)));
    }

    #[tokio::test]
    async fn loads_existing_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        RgbaImage::new(12, 7).save(&path).unwrap();

        let img = load_image_file(&path).await.unwrap();
        assert_eq!(img.size(), ImageSize::new(12, 7));
        assert_eq!(img.mime_type(), "image/png");
        assert!(img.meta().is_none());
        assert_eq!(img.persistent_path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn missing_image_file_is_invalid_request() {
        let err = load_image_file(Path::new("/definitely/not/here.png")).await.err().unwrap();
        assert!(matches!(err, DeskError::InvalidRequest(_)));
    }

    #[test]
    fn inline_image_keeps_bytes_and_reports_size() {
        let mut png = Vec::new();
        RgbaImage::new(9, 5).write_to(&mut Cursor::new(&mut png), ImageFormat::Png).unwrap();
        let data = base64::engine::general_purpose::STANDARD.encode(&png);

        let img = load_image_base64(&data).unwrap();
        assert_eq!(img.size(), ImageSize::new(9, 5));
        assert_eq!(img.mime_type(), "image/png");
        assert_eq!(img.bytes(), png.as_slice());
        assert_eq!(img.base64(), data);
        assert!(img.persistent_path().is_none());
    }

    #[test]
    fn undecodable_inline_image_is_invalid_request() {
        assert!(matches!(load_image_base64("%%%"), Err(DeskError::InvalidRequest(_))));
        // Valid base64, but "hello" is no image format.
        assert!(matches!(load_image_base64("aGVsbG8="), Err(DeskError::InvalidRequest(_))));
    }
}
