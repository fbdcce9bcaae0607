use glam::{UVec2, Vec2};

use super::SelectionError;

/// One mip of an R32 depth pyramid, row 0 at the top of the screen.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthLevel {
    pub size: UVec2,
    pub texels: Vec<f32>,
}

impl DepthLevel {
    pub fn texel(&self, x: u32, y: u32) -> f32 {
        let x = x.min(self.size.x - 1);
        let y = y.min(self.size.y - 1);
        self.texels[(y * self.size.x + x) as usize]
    }

    /// Each texel holds the farthest of the 2x2 texels below it. Odd edges fold into the last texel.
    fn downsample(&self) -> Self {
        let size = UVec2::new(self.size.x.div_ceil(2), self.size.y.div_ceil(2)).max(UVec2::ONE);
        let mut texels = Vec::with_capacity((size.x * size.y) as usize);

        for y in 0..size.y {
            for x in 0..size.x {
                let (sx, sy) = (x * 2, y * 2);

                texels.push(
                    self.texel(sx, sy)
                        .max(self.texel(sx + 1, sy))
                        .max(self.texel(sx, sy + 1))
                        .max(self.texel(sx + 1, sy + 1)),
                );
            }
        }

        Self { size, texels }
    }
}

/// Conservative hierarchical depth: no level ever reports an occluder nearer than the depth buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HiZPyramid {
    levels: Vec<DepthLevel>,
}

impl HiZPyramid {
    /// Mips needed to reach a single texel
    pub fn level_count_for(size: UVec2) -> u32 {
        // ceil(log2(n)) halvings, plus level 0
        33 - (size.max_element().max(1) - 1).leading_zeros()
    }

    /// Copy a depth attachment into level 0, dropping any levels built from an older frame.
    pub fn copy_depth(&mut self, size: UVec2, depth: &[f32]) -> Result<(), SelectionError> {
        let expected = (size.x * size.y) as usize;

        if size.x == 0 || size.y == 0 {
            return Err(SelectionError::EmptyViewport);
        }
        if depth.len() != expected {
            return Err(SelectionError::DepthSize {
                expected,
                found: depth.len(),
            });
        }

        self.levels.clear();
        self.levels.push(DepthLevel {
            size,
            texels: depth.to_vec(),
        });

        Ok(())
    }

    /// Build the next mip from the last. Returns false once the last mip is a single texel.
    pub fn build_next_level(&mut self) -> bool {
        match self.levels.last() {
            Some(last) if last.size != UVec2::ONE => {
                let next = last.downsample();
                self.levels.push(next);
                true
            }
            _ => false,
        }
    }

    pub fn levels(&self) -> &[DepthLevel] {
        &self.levels
    }

    pub fn is_complete(&self) -> bool {
        self.levels.last().is_some_and(|l| l.size == UVec2::ONE)
    }

    /// Farthest depth over a pixel rectangle of level 0, sampled from the mip where the rectangle
    /// covers at most 2x2 texels. `None` when the rectangle lies off screen or no depth is loaded.
    pub fn sample_rect(&self, min: Vec2, max: Vec2) -> Option<f32> {
        let base = self.levels.first()?;
        let screen = base.size.as_vec2();

        let min = min.max(Vec2::ZERO);
        let max = max.min(screen);
        if min.x >= max.x || min.y >= max.y {
            return None;
        }

        let extent = (max - min).max_element().max(1.0);
        let level = (extent.log2().ceil() as usize).min(self.levels.len() - 1);
        let mip = &self.levels[level];
        let scale = (1u32 << level) as f32;

        let lo = (min / scale).floor().as_uvec2();
        let hi = ((max / scale).ceil().as_uvec2()).max(lo + UVec2::ONE);

        let mut depth = f32::NEG_INFINITY;
        for y in lo.y..hi.y {
            for x in lo.x..hi.x {
                depth = depth.max(mip.texel(x, y));
            }
        }

        Some(depth)
    }
}
