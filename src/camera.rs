//! Camera, projection and the damped orbit controller.
//!
//! The controller keeps its pending input as spherical deltas around a target
//! point. Every frame [`OrbitController::update`] applies a fraction of the
//! pending delta (the damping factor) and decays the rest, so motion eases out
//! instead of stopping abruptly.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

use crate::{
    config::ViewerConfig,
    pipelines::{UniformBinding, mk_uniform},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const EPS: f32 = 1e-6;

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P, target: P) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).magnitude()
    }
}

#[derive(Clone, Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn znear(&self) -> f32 {
        self.znear
    }

    pub fn zfar(&self) -> f32 {
        self.zfar
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct SphericalDelta {
    theta: f32,
    phi: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum DragMode {
    None,
    Rotate,
    Pan,
}

/**
 * Orbit-style camera controller.
 *
 * Left drag rotates around the target, right drag pans the target, the mouse
 * wheel zooms. Inputs accumulate and are applied by `update`, once per frame.
 */
#[derive(Clone, Debug)]
pub struct OrbitController {
    pub target: Point3<f32>,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    spherical_delta: SphericalDelta,
    pan_offset: Vector3<f32>,
    scale: f32,
    saved_position: Point3<f32>,
    saved_target: Point3<f32>,
    viewport: (u32, u32),
    fovy: Rad<f32>,
    drag: DragMode,
    cursor: Option<PhysicalPosition<f64>>,
}

impl OrbitController {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            target: config.default_target,
            damping_factor: config.damping_factor,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            spherical_delta: SphericalDelta::default(),
            pan_offset: Vector3::new(0.0, 0.0, 0.0),
            scale: 1.0,
            saved_position: config.default_camera_position,
            saved_target: config.default_target,
            viewport: (1, 1),
            fovy: cgmath::Deg(config.fov).into(),
            drag: DragMode::None,
            cursor: None,
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
    }

    /// Rotates around the vertical axis through the target.
    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    /// `factor` > 1 moves the camera closer to the target.
    pub fn dolly_in(&mut self, factor: f32) {
        if factor > 0.0 {
            self.scale /= factor;
        }
    }

    pub fn dolly_out(&mut self, factor: f32) {
        if factor > 0.0 {
            self.scale *= factor;
        }
    }

    /// Moves the target by a pixel delta, proportional to the distance to the target.
    pub fn pan(&mut self, dx: f32, dy: f32, camera: &Camera) {
        let forward = (camera.target - camera.position).normalize();
        let right = forward.cross(camera.up).normalize();
        let up = right.cross(forward);
        let distance = camera.distance() * (self.fovy.0 / 2.0).tan();
        let height = self.viewport.1 as f32;
        let left = 2.0 * dx * distance / height;
        let upward = 2.0 * dy * distance / height;
        self.pan_offset += -right * left + up * upward;
    }

    fn zoom_factor(&self) -> f32 {
        0.95f32.powf(self.zoom_speed)
    }

    /// Feeds a winit event to the controller. Returns whether it was used.
    pub fn handle_window_events(&mut self, event: &WindowEvent, camera: &Camera) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.drag = match (state, button) {
                    (ElementState::Pressed, MouseButton::Left) => DragMode::Rotate,
                    (ElementState::Pressed, MouseButton::Right) => DragMode::Pan,
                    (ElementState::Released, _) => DragMode::None,
                    _ => self.drag,
                };
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.cursor.replace(*position);
                let Some(previous) = previous else {
                    return false;
                };
                let dx = (position.x - previous.x) as f32;
                let dy = (position.y - previous.y) as f32;
                let height = self.viewport.1 as f32;
                match self.drag {
                    DragMode::Rotate => {
                        self.rotate_left(2.0 * PI * dx / height * self.rotate_speed);
                        self.rotate_up(2.0 * PI * dy / height * self.rotate_speed);
                        true
                    }
                    DragMode::Pan => {
                        self.pan(dx, dy, camera);
                        true
                    }
                    DragMode::None => false,
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => *y as f32,
                };
                if scroll > 0.0 {
                    self.dolly_in(1.0 / self.zoom_factor());
                } else if scroll < 0.0 {
                    self.dolly_out(1.0 / self.zoom_factor());
                }
                scroll != 0.0
            }
            _ => false,
        }
    }

    /**
     * Applies the pending input to `camera`. With damping only a fraction of the
     * pending rotation and pan is applied and the remainder decays.
     *
     * Returns whether the camera moved.
     */
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.position - self.target;
        let mut radius = offset.magnitude();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        let damping = self.damping_factor > 0.0;
        if damping {
            theta += self.spherical_delta.theta * self.damping_factor;
            phi += self.spherical_delta.phi * self.damping_factor;
        } else {
            theta += self.spherical_delta.theta;
            phi += self.spherical_delta.phi;
        }
        phi = phi.clamp(EPS, PI - EPS);

        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        if damping {
            self.target += self.pan_offset * self.damping_factor;
        } else {
            self.target += self.pan_offset;
        }

        let sin_phi_radius = phi.sin() * radius;
        let offset = Vector3::new(
            sin_phi_radius * theta.sin(),
            phi.cos() * radius,
            sin_phi_radius * theta.cos(),
        );
        let previous_position = camera.position;
        let previous_target = camera.target;
        camera.position = self.target + offset;
        camera.target = self.target;

        if damping {
            self.spherical_delta.theta *= 1.0 - self.damping_factor;
            self.spherical_delta.phi *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.spherical_delta = SphericalDelta::default();
            self.pan_offset = Vector3::new(0.0, 0.0, 0.0);
        }
        self.scale = 1.0;

        (camera.position - previous_position).magnitude2() > EPS
            || (camera.target - previous_target).magnitude2() > EPS
    }

    /// Drops pending input and puts target and camera back to the saved default pose.
    pub fn reset(&mut self, camera: &mut Camera) {
        self.target = self.saved_target;
        self.spherical_delta = SphericalDelta::default();
        self.pan_offset = Vector3::new(0.0, 0.0, 0.0);
        self.scale = 1.0;
        camera.position = self.saved_position;
        camera.target = self.saved_target;
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU side of the camera: the uniform and its bind group.
#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    /// Starts with an identity view; the real camera is written before the first frame.
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform = CameraUniform::new();
        let UniformBinding {
            buffer,
            bind_group,
            bind_group_layout,
        } = mk_uniform(device, "Camera", &uniform);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, camera: &Camera, projection: &Projection) {
        self.uniform.update_view_proj(camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&self.uniform));
    }
}
