//! # Resource definitions for model artifacts and prediction inputs
//!
//! Artifacts consumed around a prediction run (model checkpoints, model configuration, scored
//! example files) are referenced through resources. Two types of resources are pre-defined:
//! - LocalResource: points to a local file
//! - RemoteResource: points to a remote file via a URL (requires the `remote` feature)
//!
//! For both types of resources, the local location of the file can be retrieved using
//! `get_local_path`, allowing to reference the resource file location regardless if it is a remote
//! or local resource. Staging a set of resources into a working directory is an explicit step
//! performed by [`stage_resources`], independent of any prediction run.

mod local;

use crate::common::error::MrcError;
pub use local::LocalResource;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// # Resource Trait that can provide the location of model artifacts or input data
pub trait ResourceProvider {
    /// Provides the local path for a resource.
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
    fn get_local_path(&self) -> Result<PathBuf, MrcError>;

    /// File name under which the resource is staged into a working directory.
    fn file_name(&self) -> Option<OsString>;
}

impl<T: ResourceProvider + ?Sized> ResourceProvider for Box<T> {
    fn get_local_path(&self) -> Result<PathBuf, MrcError> {
        (**self).get_local_path()
    }

    fn file_name(&self) -> Option<OsString> {
        (**self).file_name()
    }
}

#[cfg(feature = "remote")]
mod remote;
#[cfg(feature = "remote")]
pub use remote::RemoteResource;

/// Creates a resource from a command-line style location: `http://` and `https://` locations
/// become remote resources, anything else is read as a local path.
///
/// # Example
///
/// ```no_run
/// use rust_mrc::resources::{resource_from_location, ResourceProvider};
/// let resource = resource_from_location("predict.data")?;
/// let path = resource.get_local_path()?;
/// # Ok::<(), rust_mrc::MrcError>(())
/// ```
pub fn resource_from_location(location: &str) -> Result<Box<dyn ResourceProvider>, MrcError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        remote_resource(location)
    } else {
        Ok(Box::new(LocalResource::from(PathBuf::from(location))))
    }
}

#[cfg(feature = "remote")]
fn remote_resource(location: &str) -> Result<Box<dyn ResourceProvider>, MrcError> {
    Ok(Box::new(RemoteResource::new(location, "staged")))
}

#[cfg(not(feature = "remote"))]
fn remote_resource(location: &str) -> Result<Box<dyn ResourceProvider>, MrcError> {
    Err(MrcError::InvalidConfigurationError(format!(
        "{location} is a remote location but the crate was built without the `remote` feature"
    )))
}

/// Resolves each resource to a local file and copies it into `target_dir`, creating the
/// directory if needed. Resources already located in `target_dir` are left in place.
///
/// # Arguments
///
/// * `resources` - resources to stage
/// * `target_dir` - working directory receiving the staged files
///
/// # Returns
///
/// * `Vec<PathBuf>` staged file locations, in the order of `resources`
pub fn stage_resources<R: ResourceProvider>(
    resources: &[R],
    target_dir: &Path,
) -> Result<Vec<PathBuf>, MrcError> {
    fs::create_dir_all(target_dir)?;
    let mut staged = Vec::with_capacity(resources.len());
    for resource in resources {
        let source = resource.get_local_path()?;
        if !source.is_file() {
            return Err(MrcError::IOError(format!(
                "resource {} is not a readable file",
                source.display()
            )));
        }
        let file_name = resource.file_name().ok_or_else(|| {
            MrcError::InvalidInputError(format!(
                "cannot derive a file name for resource {}",
                source.display()
            ))
        })?;
        let target = target_dir.join(&file_name);
        if fs::canonicalize(&source)? == fs::canonicalize(target_dir)?.join(&file_name) {
            debug!("{} already staged", target.display());
        } else {
            fs::copy(&source, &target)?;
            info!("staged {} -> {}", source.display(), target.display());
        }
        staged.push(target);
    }
    Ok(staged)
}
