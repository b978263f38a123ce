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


//! Renders the configured scene for a number of frames.

use crate::config::RuntimeConfig;
use crate::scene::build_demo_scene;
use anyhow::{Context, Result};
use penumbra_infra::{FileProgramStore, HeadlessDevice};
use penumbra_lanes::{FramePipeline, FrameReport, RenderContext};
use std::sync::Arc;

/// Builds the demo scene on a headless device, renders `config.frames`
/// frames and releases every resource.
///
/// Returns the report of each rendered frame.
pub fn run(config: &RuntimeConfig) -> Result<Vec<FrameReport>> {
    let device = HeadlessDevice::new();
    let mut ctx = RenderContext::new(Arc::new(device.clone()), config.viewport)
        .context("failed to create the render context")?;
    let mut programs = FileProgramStore::new();

    let result = build_demo_scene(&mut ctx, &config.scene, config.settings.clear_color)
        .and_then(|()| {
            FramePipeline::new(
                &ctx,
                &mut programs,
                config.settings.clone(),
                config.shader_dir.as_deref(),
            )
            .context("failed to build the frame pipeline")
        });

    let reports = result.and_then(|mut pipeline| {
        let reports = render_frames(&mut pipeline, &mut ctx, &mut programs, config.frames);
        let stats = pipeline.cache_stats();
        log::info!(
            "Binding cache: {} hits, {} misses, {} evictions",
            stats.hits,
            stats.misses,
            stats.evictions
        );
        pipeline.destroy(&mut ctx);
        reports
    });

    ctx.destroy();
    programs.destroy(&device);
    log::debug!("Device objects left after shutdown: {:?}", device.resource_counts());
    reports
}

fn render_frames(
    pipeline: &mut FramePipeline,
    ctx: &mut RenderContext,
    programs: &mut FileProgramStore,
    frames: u32,
) -> Result<Vec<FrameReport>> {
    let mut reports = Vec::with_capacity(frames as usize);
    for _ in 0..frames {
        let report = pipeline
            .render_frame(ctx, programs)
            .with_context(|| format!("frame {} failed", reports.len()))?;
        log::info!(
            "Frame {}: {} passes, {} draws, {} lights, {} new bindings, {} B constants, {:.3} ms prep, {:.3} ms submit",
            report.frame_number,
            report.passes.len(),
            report.draw_calls,
            report.lights_drawn,
            report.bindings_created,
            report.constant_bytes,
            report.cpu_preparation_time_ms,
            report.cpu_render_submission_time_ms
        );
        if report.programs_reloaded > 0 {
            log::info!(
                "{} program(s) reloaded, {} binding(s) invalidated",
                report.programs_reloaded,
                report.bindings_invalidated
            );
        }
        reports.push(report);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use penumbra_core::math::Extent2D;
    use penumbra_lanes::FramePass;

    fn small_config() -> RuntimeConfig {
        RuntimeConfig {
            viewport: Extent2D::new(32, 32),
            frames: 2,
            scene: SceneConfig {
                grid: 2,
                ..SceneConfig::default()
            },
            ..RuntimeConfig::default()
        }
    }

    #[test]
    fn test_renders_every_frame() {
        let reports = run(&small_config()).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].passes, FramePass::ALL.to_vec());
        // Five entities with two submeshes each, in the pre-pass and the
        // geometry pass, then AO, blur, three lights and the composite.
        assert_eq!(reports[0].draw_calls, 2 * 10 + 2 + 3 + 1);
        assert_eq!(reports[0].lights_drawn, 3);
        assert!(reports[0].bindings_created > 0);
        assert_eq!(reports[1].bindings_created, 0);
        assert_eq!(reports[1].frame_number, 1);
    }

    #[test]
    fn test_constant_overflow_is_reported() {
        let mut config = small_config();
        config.settings.constant_buffer_cap = Some(512);
        let err = run(&config).unwrap_err();
        assert!(format!("{err:#}").contains("frame 0 failed"));
    }

    #[test]
    fn test_broken_shader_override_fails_setup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ssao.glsl"), "#error unfinished\n").unwrap();
        let mut config = small_config();
        config.shader_dir = Some(dir.path().to_path_buf());
        let err = run(&config).unwrap_err();
        assert!(format!("{err:#}").contains("frame pipeline"));
    }
}
