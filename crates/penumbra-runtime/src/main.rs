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


//! Headless Penumbra runtime.
//!
//! Renders a demo scene through the deferred frame pipeline and logs one
//! report per frame. Run with `penumbra-runtime --config penumbra.json`.

mod app;
mod config;
mod scene;

use anyhow::Result;
use clap::Parser;
use config::RuntimeConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON runtime configuration. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to render, overriding the configuration.
    #[arg(short, long)]
    frames: Option<u32>,

    /// Directory of `<program>.glsl` shader overrides.
    #[arg(long)]
    shader_dir: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    log: String,
}

impl Args {
    fn load_config(&self) -> Result<RuntimeConfig> {
        let mut config = match &self.config {
            Some(path) => RuntimeConfig::from_file(path)?,
            None => RuntimeConfig::default(),
        };
        if let Some(frames) = self.frames {
            config.frames = frames;
        }
        if let Some(dir) = &self.shader_dir {
            config.shader_dir = Some(dir.clone());
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    penumbra_infra::init_logging(&args.log)?;

    let config = args.load_config()?;
    log::info!(
        "Rendering {} frame(s) at {}x{}",
        config.frames,
        config.viewport.width,
        config.viewport.height
    );
    let reports = app::run(&config)?;

    let draws: u32 = reports.iter().map(|r| r.draw_calls).sum();
    log::info!("Done: {} frame(s), {draws} draw call(s)", reports.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from(["penumbra-runtime", "--frames", "7", "--shader-dir", "shaders"]);
        let config = args.load_config().unwrap();
        assert_eq!(config.frames, 7);
        assert_eq!(config.shader_dir, Some(PathBuf::from("shaders")));
        assert_eq!(args.log, "info");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = Args::parse_from(["penumbra-runtime", "-c", "/no/such/penumbra.json"]);
        assert!(args.load_config().is_err());
    }
}
