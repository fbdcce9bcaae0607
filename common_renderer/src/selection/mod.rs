//! Per frame cluster selection.
//!
//! Each frame runs `DepthCopy -> HizBuildLevels -> ErrorProjection -> Culling -> IndirectDraw` in
//! that order. [FrameSelection] owns the buffers written by every stage and refuses to run a stage
//! out of turn.

pub mod culling;
pub mod hiz;
pub mod projection;

use std::sync::atomic::{AtomicU32, Ordering};

use glam::UVec2;
use rayon::prelude::*;
use thiserror::Error;

use crate::{gpu_records::DrawIndexedIndirectCommand, scene::Scene};

use self::{
    culling::{aabb_inside_planes, is_occluded, planes_from_mat, selects, sphere_footprint},
    hiz::HiZPyramid,
    projection::ScreenError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStage {
    DepthCopy,
    /// Next mip to write
    HizBuildLevels(u32),
    ErrorProjection,
    Culling,
    IndirectDraw,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("Stage {found:?} run while waiting for {expected:?}")]
    OutOfOrder {
        expected: SelectionStage,
        found: SelectionStage,
    },
    #[error("Depth buffer has {found} texels, viewport needs {expected}")]
    DepthSize { expected: usize, found: usize },
    #[error("Viewport has no area")]
    EmptyViewport,
    #[error("Indirect draw still holds {0} indices from the last frame")]
    StaleDrawArgs(u32),
    #[error("{clusters} cluster records but {errors} error records")]
    MismatchedRecords { clusters: usize, errors: usize },
    #[error("Cluster record {cluster} references triangle {triangle} past the index buffer")]
    OutOfRangeTriangle { cluster: usize, triangle: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionConfig {
    /// Largest acceptable screen space error, in pixels
    pub error_threshold: f32,
    pub viewport: UVec2,
    pub occlusion_culling: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            error_threshold: 1.0,
            viewport: UVec2::new(1280, 720),
            occlusion_culling: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionStats {
    pub selected: usize,
    pub frustum_culled: usize,
    pub occlusion_culled: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    /// Not part of the cut at this threshold
    Rejected,
    FrustumCulled,
    OcclusionCulled,
    Selected,
}

/// Buffers and stage of one frame's selection.
#[derive(Debug, Clone)]
pub struct FrameSelection {
    config: SelectionConfig,
    stage: SelectionStage,
    hiz: HiZPyramid,
    screen_errors: Vec<ScreenError>,
    draw_args: DrawIndexedIndirectCommand,
    compacted_indices: Vec<u32>,
    object_ids: Vec<u32>,
    selected: Vec<usize>,
    stats: SelectionStats,
}

impl FrameSelection {
    pub fn new(config: SelectionConfig) -> Self {
        Self {
            config,
            stage: SelectionStage::DepthCopy,
            hiz: HiZPyramid::default(),
            screen_errors: Vec::new(),
            draw_args: DrawIndexedIndirectCommand {
                instance_count: 1,
                ..Default::default()
            },
            compacted_indices: Vec::new(),
            object_ids: Vec::new(),
            selected: Vec::new(),
            stats: SelectionStats::default(),
        }
    }

    fn expect_stage(&self, attempted: SelectionStage) -> Result<(), SelectionError> {
        if self.stage == attempted {
            Ok(())
        } else {
            Err(SelectionError::OutOfOrder {
                expected: self.stage,
                found: attempted,
            })
        }
    }

    /// Clear the index count of the indirect draw. Must happen before every [Self::cull],
    /// once the previous frame's draw has finished reading it.
    pub fn reset_draw_args(&mut self) {
        self.draw_args.index_count = 0;
    }

    /// Load this frame's depth attachment as level 0 of the pyramid.
    pub fn depth_copy(&mut self, depth: &[f32]) -> Result<(), SelectionError> {
        self.expect_stage(SelectionStage::DepthCopy)?;

        self.hiz.copy_depth(self.config.viewport, depth)?;

        self.stage = if self.hiz.is_complete() {
            SelectionStage::ErrorProjection
        } else {
            SelectionStage::HizBuildLevels(1)
        };

        Ok(())
    }

    /// Write the next mip of the pyramid from the last.
    pub fn build_hiz_level(&mut self) -> Result<(), SelectionError> {
        let SelectionStage::HizBuildLevels(level) = self.stage else {
            return Err(SelectionError::OutOfOrder {
                expected: self.stage,
                found: SelectionStage::HizBuildLevels(self.hiz.levels().len() as u32),
            });
        };

        self.hiz.build_next_level();

        self.stage = if self.hiz.is_complete() {
            SelectionStage::ErrorProjection
        } else {
            SelectionStage::HizBuildLevels(level + 1)
        };

        Ok(())
    }

    pub fn project_errors(&mut self, scene: &Scene) -> Result<(), SelectionError> {
        self.expect_stage(SelectionStage::ErrorProjection)?;

        if scene.cluster_info.len() != scene.error_info.len() {
            return Err(SelectionError::MismatchedRecords {
                clusters: scene.cluster_info.len(),
                errors: scene.error_info.len(),
            });
        }

        self.screen_errors =
            projection::project_errors(&scene.error_info, &scene.uniform_camera, self.config.viewport);

        self.stage = SelectionStage::Culling;
        Ok(())
    }

    /// Select the cut, then append the triangles of every selected cluster to the compacted
    /// index buffer, tagging each triangle with its instance.
    pub fn cull(&mut self, scene: &Scene) -> Result<(), SelectionError> {
        self.expect_stage(SelectionStage::Culling)?;

        if self.draw_args.index_count != 0 {
            return Err(SelectionError::StaleDrawArgs(self.draw_args.index_count));
        }

        let camera = &scene.uniform_camera;
        let planes = planes_from_mat(camera.culling_view_proj);
        let viewport = self.config.viewport.as_vec2();
        let occlusion = self.config.occlusion_culling && self.hiz.is_complete();
        let threshold = self.config.error_threshold;

        let index_count = AtomicU32::new(0);

        let verdicts: Vec<(Verdict, u32)> = scene
            .cluster_info
            .par_iter()
            .zip(&scene.error_info)
            .zip(&self.screen_errors)
            .map(|((cluster, error), &screen_error)| {
                if cluster.is_empty() || !selects(screen_error, threshold) {
                    return (Verdict::Rejected, 0);
                }

                if !aabb_inside_planes(&planes, cluster.min(), cluster.max()) {
                    return (Verdict::FrustumCulled, 0);
                }

                if occlusion {
                    let sphere = error.sphere();
                    let footprint = sphere_footprint(
                        sphere.truncate(),
                        sphere.w,
                        &camera.culling_view,
                        &camera.proj,
                        camera.znear,
                        viewport,
                    );

                    if is_occluded(&self.hiz, footprint) {
                        return (Verdict::OcclusionCulled, 0);
                    }
                }

                let offset = index_count.fetch_add(cluster.triangle_count() * 3, Ordering::Relaxed);
                (Verdict::Selected, offset)
            })
            .collect();

        let index_count = index_count.into_inner();

        self.compacted_indices.clear();
        self.compacted_indices.resize(index_count as usize, 0);
        self.object_ids.clear();
        self.object_ids.resize(index_count as usize / 3, 0);
        self.selected.clear();
        self.stats = SelectionStats::default();

        for (record, &(verdict, offset)) in verdicts.iter().enumerate() {
            match verdict {
                Verdict::Rejected => continue,
                Verdict::FrustumCulled => {
                    self.stats.frustum_culled += 1;
                    continue;
                }
                Verdict::OcclusionCulled => {
                    self.stats.occlusion_culled += 1;
                    continue;
                }
                Verdict::Selected => (),
            }

            let cluster = &scene.cluster_info[record];
            let start = cluster.triangle_start as usize * 3;
            let end = cluster.triangle_end as usize * 3;

            let Some(indices) = scene.indices.get(start..end) else {
                return Err(SelectionError::OutOfRangeTriangle {
                    cluster: record,
                    triangle: cluster.triangle_end,
                });
            };

            let offset = offset as usize;
            self.compacted_indices[offset..offset + indices.len()].copy_from_slice(indices);
            self.object_ids[offset / 3..(offset + indices.len()) / 3].fill(cluster.instance_id);

            self.selected.push(record);
        }

        self.stats.selected = self.selected.len();
        self.draw_args.index_count = index_count;

        log::debug!(
            "Selected {} clusters, {} triangles. Frustum culled {}, occluded {}",
            self.stats.selected,
            index_count / 3,
            self.stats.frustum_culled,
            self.stats.occlusion_culled
        );

        self.stage = SelectionStage::IndirectDraw;
        Ok(())
    }

    /// Hand the indirect arguments to the raster pass, ending the frame.
    pub fn indirect_draw(&mut self) -> Result<DrawIndexedIndirectCommand, SelectionError> {
        self.expect_stage(SelectionStage::IndirectDraw)?;

        self.stage = SelectionStage::DepthCopy;
        Ok(self.draw_args)
    }

    /// Run every stage of a frame against `depth`, the depth attachment of the last raster pass.
    pub fn run_frame(
        &mut self,
        scene: &Scene,
        depth: &[f32],
    ) -> Result<DrawIndexedIndirectCommand, SelectionError> {
        self.reset_draw_args();
        self.depth_copy(depth)?;

        while let SelectionStage::HizBuildLevels(_) = self.stage {
            self.build_hiz_level()?;
        }

        self.project_errors(scene)?;
        self.cull(scene)?;
        self.indirect_draw()
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    pub fn set_error_threshold(&mut self, error_threshold: f32) {
        self.config.error_threshold = error_threshold;
    }

    pub fn set_occlusion_culling(&mut self, occlusion_culling: bool) {
        self.config.occlusion_culling = occlusion_culling;
    }

    pub fn stage(&self) -> SelectionStage {
        self.stage
    }

    pub fn hiz(&self) -> &HiZPyramid {
        &self.hiz
    }

    pub fn screen_errors(&self) -> &[ScreenError] {
        &self.screen_errors
    }

    pub fn draw_args(&self) -> DrawIndexedIndirectCommand {
        self.draw_args
    }

    pub fn compacted_indices(&self) -> &[u32] {
        &self.compacted_indices
    }

    /// Owning instance of each triangle of the compacted index buffer
    pub fn object_ids(&self) -> &[u32] {
        &self.object_ids
    }

    /// Record indices of the selected clusters, ascending
    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn stats(&self) -> SelectionStats {
        self.stats
    }
}
