use cgmath::InnerSpace;

use crate::{
    config::{LightConfig, linear_rgb},
    pipelines::{UniformBinding, mk_uniform},
};

/// Hemisphere and directional light of the scene, bound at group 1 of the mesh pipeline.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    sky_color: [f32; 3],
    hemisphere_intensity: f32,
    ground_color: [f32; 3],
    // Uniforms require 16 byte (4 float) spacing
    _padding: f32,
    /// Points from the scene towards the light.
    direction: [f32; 3],
    directional_intensity: f32,
    color: [f32; 3],
    _padding2: f32,
}

impl LightUniform {
    pub fn new(config: &LightConfig) -> Self {
        let position: cgmath::Vector3<f32> = config.directional_position.into();
        let direction = if position.magnitude2() > 0.0 {
            position.normalize()
        } else {
            cgmath::Vector3::unit_y()
        };
        Self {
            sky_color: linear_rgb(config.sky_color),
            hemisphere_intensity: config.hemisphere_intensity,
            ground_color: linear_rgb(config.ground_color),
            _padding: 0.0,
            direction: direction.into(),
            directional_intensity: config.directional_intensity,
            color: linear_rgb(config.directional_color),
            _padding2: 0.0,
        }
    }

    pub fn direction(&self) -> [f32; 3] {
        self.direction
    }
}

impl LightResources {
    pub fn new(config: &LightConfig, device: &wgpu::Device) -> Self {
        let uniform = LightUniform::new(config);
        let UniformBinding {
            buffer,
            bind_group,
            bind_group_layout,
        } = mk_uniform(device, "Light", &uniform);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}
