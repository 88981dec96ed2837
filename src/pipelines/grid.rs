use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        grid::Grid,
        model::{LineVertex, Vertex},
    },
    pipelines::basic::{PipelineDesc, mk_render_pipeline},
};

/// Unlit pipeline for the reference grid.
pub fn mk_grid_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    mk_render_pipeline(
        device,
        config.format,
        PipelineDesc {
            label: "Grid",
            shader: wgpu::ShaderModuleDescriptor {
                label: Some("Grid Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("grid.wgsl").into()),
            },
            bind_group_layouts: &[camera_bind_group_layout],
            vertex_layouts: &[LineVertex::desc()],
            topology: wgpu::PrimitiveTopology::LineList,
        },
    )
}

pub fn mk_grid_buffer(device: &wgpu::Device, grid: &Grid) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Grid Vertex Buffer"),
        contents: bytemuck::cast_slice(&grid.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    })
}
