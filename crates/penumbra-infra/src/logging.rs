// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logging initialization.

use anyhow::{Context, Result};
use env_logger::{Builder, Env};

/// Installs `env_logger` as the `log` backend.
///
/// `RUST_LOG` overrides `default_filter`. Fails if a logger is already set.
pub fn init_logging(default_filter: &str) -> Result<()> {
    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init()
        .context("a logger is already installed")
}
