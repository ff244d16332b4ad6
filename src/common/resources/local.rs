use crate::common::error::MrcError;
use crate::resources::ResourceProvider;
use std::ffi::OsString;
use std::path::PathBuf;

/// # Local resource
#[derive(Debug, PartialEq, Clone)]
pub struct LocalResource {
    /// Local path for the resource
    pub local_path: PathBuf,
}

impl ResourceProvider for LocalResource {
    /// Gets the path for a local resource.
    ///
    /// # Returns
    ///
    /// * `PathBuf` pointing to the resource file
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rust_mrc::resources::{LocalResource, ResourceProvider};
    /// use std::path::PathBuf;
    /// let data_resource = LocalResource {
    ///     local_path: PathBuf::from("path/to/predict.data"),
    /// };
    /// let data_path = data_resource.get_local_path();
    /// ```
    fn get_local_path(&self) -> Result<PathBuf, MrcError> {
        Ok(self.local_path.clone())
    }

    fn file_name(&self) -> Option<OsString> {
        self.local_path.file_name().map(|name| name.to_os_string())
    }
}

impl From<PathBuf> for LocalResource {
    fn from(local_path: PathBuf) -> Self {
        Self { local_path }
    }
}

impl From<PathBuf> for Box<dyn ResourceProvider> {
    fn from(local_path: PathBuf) -> Self {
        Box::new(LocalResource { local_path })
    }
}
