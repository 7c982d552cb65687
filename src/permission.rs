use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Runtime permissions the application can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Camera,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Camera => f.write_str("camera"),
        }
    }
}

/// Answer to a permission request, tagged with the request code it was made under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionResponse {
    pub request_code: u32,
    pub results: Vec<(Permission, bool)>,
}

impl PermissionResponse {
    /// True when every requested permission was granted
    pub fn all_granted(&self) -> bool {
        self.results.iter().all(|(_, granted)| *granted)
    }
}

/// Host side of runtime permissions
pub trait PermissionHost {
    fn is_granted(&self, permission: Permission) -> bool;

    /// Ask for the permissions; the answer is reported synchronously
    fn request(&mut self, permissions: &[Permission], request_code: u32) -> PermissionResponse {
        PermissionResponse {
            request_code,
            results: permissions
                .iter()
                .map(|&permission| (permission, self.is_granted(permission)))
                .collect(),
        }
    }
}

/// Camera permission as access to the video device node
///
/// A node that exists but cannot be opened counts as a denial. A missing
/// node is left for the camera binding to report.
pub struct DevicePermissions {
    device: PathBuf,
}

impl DevicePermissions {
    pub fn new<P: AsRef<Path>>(device: P) -> Self {
        Self {
            device: device.as_ref().to_path_buf(),
        }
    }

    /// Permissions for `/dev/video<index>`
    pub fn for_index(index: u32) -> Self {
        Self::new(format!("/dev/video{index}"))
    }

    pub fn device(&self) -> &Path {
        &self.device
    }
}

impl PermissionHost for DevicePermissions {
    fn is_granted(&self, permission: Permission) -> bool {
        match permission {
            Permission::Camera => match File::open(&self.device) {
                Ok(_) => true,
                Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                    tracing::warn!("No access to {}: {}", self.device.display(), e);
                    false
                }
                Err(e) => {
                    tracing::debug!("Cannot open {}: {}", self.device.display(), e);
                    true
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(bool);

    impl PermissionHost for Fixed {
        fn is_granted(&self, _permission: Permission) -> bool {
            self.0
        }
    }

    #[test]
    fn test_default_request_echoes_code() {
        let response = Fixed(true).request(&[Permission::Camera], 200);
        assert_eq!(response.request_code, 200);
        assert!(response.all_granted());

        let response = Fixed(false).request(&[Permission::Camera], 7);
        assert_eq!(response.request_code, 7);
        assert!(!response.all_granted());
    }

    #[test]
    fn test_missing_device_is_not_a_denial() {
        let permissions = DevicePermissions::new("/nonexistent/lumacam/video0");
        assert!(permissions.is_granted(Permission::Camera));
    }

    #[test]
    fn test_device_path_for_index() {
        assert_eq!(
            DevicePermissions::for_index(3).device(),
            Path::new("/dev/video3")
        );
    }
}
