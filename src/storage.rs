use chrono::{DateTime, TimeZone};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::fmt::{self, Display, Write as _};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::capture::CaptureError;

/// Timestamp-derived photo file name, e.g. `24-03-05-14-07-09-042.jpg`
///
/// Fails instead of panicking when `format` holds an unknown strftime
/// specifier.
pub fn photo_file_name<Tz>(
    format: &str,
    at: &DateTime<Tz>,
    extension: &str,
) -> Result<String, fmt::Error>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut name = String::new();
    write!(name, "{}.{}", at.format(format), extension)?;
    Ok(name)
}

/// Where photos go, resolved once per process
///
/// The first external media directory (plus the app name) is preferred and
/// created on demand. When it is missing or cannot be created, the internal
/// files directory is used instead.
#[derive(Debug)]
pub struct OutputDirectory {
    external_media_dirs: Vec<PathBuf>,
    app_name: String,
    files_dir: PathBuf,
    resolved: OnceLock<PathBuf>,
}

impl OutputDirectory {
    pub fn new(external_media_dirs: Vec<PathBuf>, app_name: &str, files_dir: PathBuf) -> Self {
        Self {
            external_media_dirs,
            app_name: app_name.to_string(),
            files_dir,
            resolved: OnceLock::new(),
        }
    }

    pub fn get(&self) -> &Path {
        self.resolved.get_or_init(|| self.resolve())
    }

    fn resolve(&self) -> PathBuf {
        if let Some(media) = self.external_media_dirs.first() {
            let dir = media.join(&self.app_name);
            if let Err(e) = fs::create_dir_all(&dir) {
                tracing::warn!("Cannot create {}: {}", dir.display(), e);
            }
            if dir.is_dir() {
                tracing::info!("Saving photos to {}", dir.display());
                return dir;
            }
        }

        if let Err(e) = fs::create_dir_all(&self.files_dir) {
            tracing::warn!("Cannot create {}: {}", self.files_dir.display(), e);
        }
        tracing::info!(
            "External media unavailable, saving photos to {}",
            self.files_dir.display()
        );
        self.files_dir.clone()
    }
}

/// Encode `image` as JPEG and move it into place at `path`.
///
/// The data is written to a `.part` sibling first; on any failure that
/// file is removed, so `path` only ever holds a complete photo.
pub fn write_jpeg(path: &Path, image: &RgbImage, quality: u8) -> Result<(), CaptureError> {
    let partial = partial_path(path);

    let result = encode_to(&partial, image, quality).and_then(|()| {
        fs::rename(&partial, path).map_err(|source| CaptureError::Io {
            path: path.to_path_buf(),
            source,
        })
    });

    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn encode_to(partial: &Path, image: &RgbImage, quality: u8) -> Result<(), CaptureError> {
    let io_error = |source| CaptureError::Io {
        path: partial.to_path_buf(),
        source,
    };

    let file = File::create(partial).map_err(io_error)?;
    let mut writer = BufWriter::new(file);

    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode_image(image)
        .map_err(|source| CaptureError::Encode {
            path: partial.to_path_buf(),
            source,
        })?;

    writer.flush().map_err(io_error)?;
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Timelike, Utc};
    use tempfile::tempdir;

    #[test]
    fn test_photo_file_name_format() {
        let at = Utc
            .with_ymd_and_hms(2024, 3, 5, 14, 7, 9)
            .unwrap()
            .with_nanosecond(42_000_000)
            .unwrap();

        let name = photo_file_name("%y-%m-%d-%H-%M-%S-%3f", &at, "jpg").unwrap();
        assert_eq!(name, "24-03-05-14-07-09-042.jpg");
    }

    #[test]
    fn test_unknown_specifier_is_an_error() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert!(photo_file_name("%y-%Q", &at, "jpg").is_err());
    }

    #[test]
    fn test_prefers_external_media() {
        let root = tempdir().unwrap();
        let media = root.path().join("media");
        fs::create_dir_all(&media).unwrap();

        let files = root.path().join("files");
        let dir = OutputDirectory::new(vec![media.clone()], "lumacam", files);
        assert_eq!(dir.get(), media.join("lumacam"));
        assert!(media.join("lumacam").is_dir());
    }

    #[test]
    fn test_falls_back_to_files_dir_and_stays_stable() {
        let root = tempdir().unwrap();
        // A regular file where the media directory should be blocks creation
        let blocked = root.path().join("media");
        fs::write(&blocked, b"not a directory").unwrap();
        let files = root.path().join("files");

        let dir = OutputDirectory::new(vec![blocked], "lumacam", files.clone());
        let first = dir.get().to_path_buf();
        assert_eq!(first, files);
        assert!(files.is_dir());

        fs::remove_dir_all(&files).unwrap();
        assert_eq!(dir.get(), first.as_path());
        assert_eq!(dir.get(), first.as_path());
    }

    #[test]
    fn test_no_external_dirs_uses_files_dir() {
        let root = tempdir().unwrap();
        let files = root.path().join("files");

        let dir = OutputDirectory::new(Vec::new(), "lumacam", files.clone());
        assert_eq!(dir.get(), files.as_path());
        assert!(files.is_dir());
    }

    #[test]
    fn test_write_jpeg_leaves_only_the_photo() {
        let root = tempdir().unwrap();
        let path = root.path().join("shot.jpg");
        let image = RgbImage::from_pixel(16, 8, image::Rgb([30, 120, 220]));

        write_jpeg(&path, &image, 85).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_write_jpeg_failure_leaves_nothing() {
        let root = tempdir().unwrap();
        let path = root.path().join("missing-dir").join("shot.jpg");
        let image = RgbImage::new(4, 4);

        let err = write_jpeg(&path, &image, 85).unwrap_err();
        assert!(matches!(err, CaptureError::Io { .. }));
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }
}
