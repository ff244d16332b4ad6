// Copyright 2020 The rust-mrc Authors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MrcError {
    #[error("Endpoint not available error: {0}")]
    FileDownloadError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("JSON (de)serialization error: {0}")]
    JsonError(String),

    #[error("Invalid input error: {0}")]
    InvalidInputError(String),

    #[error("Invalid configuration error: {0}")]
    InvalidConfigurationError(String),
}

#[cfg(feature = "remote")]
impl From<cached_path::Error> for MrcError {
    fn from(error: cached_path::Error) -> Self {
        MrcError::FileDownloadError(error.to_string())
    }
}

impl From<std::io::Error> for MrcError {
    fn from(error: std::io::Error) -> Self {
        MrcError::IOError(error.to_string())
    }
}

impl From<serde_json::Error> for MrcError {
    fn from(error: serde_json::Error) -> Self {
        MrcError::JsonError(error.to_string())
    }
}
