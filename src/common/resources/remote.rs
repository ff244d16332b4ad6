use super::*;
use crate::common::error::MrcError;
use cached_path::{Cache, Options, ProgressBar};
use dirs::cache_dir;
use lazy_static::lazy_static;
use std::ffi::OsString;
use std::path::PathBuf;

/// # Remote resource that will be downloaded and cached locally on demand
#[derive(Debug, PartialEq, Clone)]
pub struct RemoteResource {
    /// Remote path/url for the resource
    pub url: String,
    /// Local subdirectory of the cache root where this resource is saved
    pub cache_subdir: String,
}

impl RemoteResource {
    /// Creates a new RemoteResource from an URL and a cache subdirectory. Note that this does not
    /// download the resource (only declares the remote and local locations)
    ///
    /// # Arguments
    ///
    /// * `url` - `&str` Location of the remote resource
    /// * `cache_subdir` - `&str` Local subdirectory of the cache root to save the resource to
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rust_mrc::resources::RemoteResource;
    /// let data_resource = RemoteResource::new("http://artifacts/dureader/predict.data", "dureader");
    /// ```
    pub fn new(url: &str, cache_subdir: &str) -> RemoteResource {
        RemoteResource {
            url: url.to_string(),
            cache_subdir: cache_subdir.to_string(),
        }
    }
}

impl ResourceProvider for RemoteResource {
    /// Gets the local path for a remote resource.
    ///
    /// The remote resource is downloaded and cached. Then the path
    /// to the local cache is returned.
    fn get_local_path(&self) -> Result<PathBuf, MrcError> {
        let cache = Cache::builder()
            .dir(CACHE_DIRECTORY.clone())
            .progress_bar(Some(ProgressBar::Light))
            .build()?;
        let cached_path = cache
            .cached_path_with_options(&self.url, &Options::default().subdir(&self.cache_subdir))?;
        Ok(cached_path)
    }

    /// Last path segment of the URL, without query string or fragment.
    fn file_name(&self) -> Option<OsString> {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        path.rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty() && !segment.contains(':'))
            .map(OsString::from)
    }
}

lazy_static! {
/// # Global cache directory
/// If the environment variable `RUSTMRC_CACHE` is set, downloaded resources are cached at that
/// location. Otherwise defaults to `$XDG_CACHE_HOME/.rustmrc`, or corresponding user cache for
/// the current system.
    pub static ref CACHE_DIRECTORY: PathBuf = _get_cache_directory();
}

fn _get_cache_directory() -> PathBuf {
    match std::env::var("RUSTMRC_CACHE") {
        Ok(value) => PathBuf::from(value),
        Err(_) => {
            let mut home = cache_dir().unwrap_or_else(|| PathBuf::from("."));
            home.push(".rustmrc");
            home
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn file_name_from_url() {
        let resource = RemoteResource::new(
            "http://10.0.0.1/webhdfs/api/v1/dureader/predict-test.data?op=OPEN",
            "dureader",
        );
        assert_eq!(
            resource.file_name(),
            Some(OsString::from("predict-test.data"))
        );

        let resource = RemoteResource::new("https://host/", "dureader");
        assert_eq!(resource.file_name(), None);
    }
}
