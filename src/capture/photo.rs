use super::{CapturedPhoto, ImageCapture};
use crate::config::CameraConfig;
use crate::storage::{self, OutputDirectory};
use chrono::Local;
use std::path::Path;

/// Still-photo orchestrator: names the file, asks the session to write it,
/// reports the outcome
pub struct PhotoCapture {
    directory: OutputDirectory,
    file_name_format: String,
    extension: String,
}

impl PhotoCapture {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            directory: OutputDirectory::new(
                config.storage.external_media_dirs.clone(),
                &config.app_name,
                config.storage.files_dir.clone(),
            ),
            file_name_format: config.file_name_format.clone(),
            extension: config.photo_extension.clone(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        self.directory.get()
    }

    /// Capture one photo.
    ///
    /// Without an active capture session this does nothing. Failures,
    /// including an unusable file name format, are logged and yield `None`.
    pub fn take_photo<C>(&self, capture: Option<&mut C>) -> Option<CapturedPhoto>
    where
        C: ImageCapture + ?Sized,
    {
        let capture = capture?;

        let name = match storage::photo_file_name(
            &self.file_name_format,
            &Local::now(),
            &self.extension,
        ) {
            Ok(name) => name,
            Err(_) => {
                tracing::error!(
                    format = %self.file_name_format,
                    "Photo file name format is invalid, capture skipped"
                );
                return None;
            }
        };
        let path = self.directory.get().join(&name);

        match capture.take_picture(&path) {
            Ok(()) => {
                let photo = CapturedPhoto::new(path, name);
                tracing::info!("Image saved location: {}", photo.uri());
                Some(photo)
            }
            Err(e) => {
                tracing::error!(error = %e, "Photo capture failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureError;
    use std::fs;
    use tempfile::tempdir;

    struct FakeCapture {
        calls: usize,
        fail: bool,
    }

    impl ImageCapture for FakeCapture {
        fn take_picture(&mut self, destination: &Path) -> Result<(), CaptureError> {
            self.calls += 1;
            if self.fail {
                return Err(CaptureError::Grab("sensor timeout".into()));
            }
            fs::write(destination, b"jpeg").map_err(|source| CaptureError::Io {
                path: destination.to_path_buf(),
                source,
            })
        }
    }

    fn config_in(root: &Path) -> CameraConfig {
        let mut config = CameraConfig::default();
        config.storage.external_media_dirs = vec![root.join("media")];
        config.storage.files_dir = root.join("files");
        config
    }

    #[test]
    fn test_no_session_is_a_no_op() {
        let root = tempdir().unwrap();
        let photos = PhotoCapture::new(&config_in(root.path()));

        assert!(photos.take_photo::<FakeCapture>(None).is_none());
        assert_eq!(
            fs::read_dir(root.path()).unwrap().count(),
            0,
            "nothing may be written without a session"
        );
    }

    #[test]
    fn test_success_names_file_by_timestamp() {
        let root = tempdir().unwrap();
        let photos = PhotoCapture::new(&config_in(root.path()));
        let mut capture = FakeCapture { calls: 0, fail: false };

        let photo = photos.take_photo(Some(&mut capture)).unwrap();

        assert_eq!(capture.calls, 1);
        assert!(photo.path.exists());
        assert_eq!(
            photo.path.parent().unwrap(),
            root.path().join("media").join("lumacam")
        );
        assert!(photo.name.ends_with(".jpg"));
        // yy-MM-dd-HH-mm-ss-SSS
        assert_eq!(photo.name.len(), "24-03-05-14-07-09-042.jpg".len());
        assert!(photo.uri().starts_with("file://"));
    }

    #[test]
    fn test_failure_reports_nothing() {
        let root = tempdir().unwrap();
        let photos = PhotoCapture::new(&config_in(root.path()));
        let mut capture = FakeCapture { calls: 0, fail: true };

        assert!(photos.take_photo(Some(&mut capture)).is_none());
        assert_eq!(capture.calls, 1);
        let written = fs::read_dir(photos.output_directory()).unwrap().count();
        assert_eq!(written, 0);
    }

    #[test]
    fn test_bad_name_format_is_logged_not_fatal() {
        let root = tempdir().unwrap();
        let mut config = config_in(root.path());
        config.file_name_format = "%y-%Q".into();
        let photos = PhotoCapture::new(&config);
        let mut capture = FakeCapture { calls: 0, fail: false };

        assert!(photos.take_photo(Some(&mut capture)).is_none());
        assert_eq!(capture.calls, 0);
    }
}
