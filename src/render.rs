//! Render composition and pipeline batching.
//!
//! This module defines the [`Render`] enum that describes what should be drawn in
//! a frame. The frame loop sorts a `Render` tree into per-pipeline batches
//! (lit meshes, lines) so that every pipeline is bound once per frame.
//!
//! # Key types
//!
//! - [`Render<'a>`] is the enum describing render operations
//! - [`Instanced<'a>`] a GPU mesh plus its instance buffer
//! - [`Lines<'a>`] a line-list vertex buffer (reference grid)
//!

use crate::data_structures::model::GpuMesh;

/// Data for instanced mesh rendering: a GPU mesh and the buffer with its world transforms.
#[derive(Clone)]
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub mesh: &'a GpuMesh,
    pub amount: usize,
}

/// Data for unlit line rendering.
#[derive(Clone)]
pub struct Lines<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub amount: u32,
}

/// Specifies how scene content should be rendered.
///
/// # Variants
///
/// - `Defaults(Vec<Instanced>)` renders a batch of lit meshes
/// - `Lines(Lines)` renders a line list with vertex colours
/// - `Composed(Vec<Render>)` recursively renders composition of multiple renders
///
pub enum Render<'a> {
    Defaults(Vec<Instanced<'a>>),
    Lines(Lines<'a>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    pub(crate) fn set_pipelines(self, basics: &mut Vec<Instanced<'a>>, lines: &mut Vec<Lines<'a>>) {
        match self {
            Render::Defaults(mut vec) => basics.append(&mut vec),
            Render::Lines(l) => lines.push(l),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(basics, lines)),
        }
    }
}
