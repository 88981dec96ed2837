//! The reference grid drawn under the generated object.

use crate::{
    config::{GridConfig, linear_rgb},
    data_structures::model::LineVertex,
};

/// A square grid of lines in the XZ plane, centred on the origin.
#[derive(Clone, Debug)]
pub struct Grid {
    pub vertices: Vec<LineVertex>,
}

impl Grid {
    /**
     * Builds `divisions + 1` lines along each axis spanning `size`. The two lines
     * crossing the centre use the centre colour; all others the grid colour.
     */
    pub fn new(config: &GridConfig) -> Self {
        let divisions = config.divisions.max(1);
        let half = config.size / 2.0;
        let step = config.size / divisions as f32;
        let centre = linear_rgb(config.center_color);
        let line = linear_rgb(config.color);
        let y = config.elevation;

        let mut vertices = Vec::with_capacity((divisions as usize + 1) * 4);
        for i in 0..=divisions {
            let k = -half + i as f32 * step;
            let color = if i == divisions / 2 && divisions % 2 == 0 {
                centre
            } else {
                line
            };
            vertices.push(LineVertex { position: [-half, y, k], color });
            vertices.push(LineVertex { position: [half, y, k], color });
            vertices.push(LineVertex { position: [k, y, -half], color });
            vertices.push(LineVertex { position: [k, y, half], color });
        }
        Self { vertices }
    }

    pub fn line_count(&self) -> usize {
        self.vertices.len() / 2
    }
}
