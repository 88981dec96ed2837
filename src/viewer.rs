//! The 3D viewer: scene, camera and orbit controller, without any GPU state.
//!
//! The platform shell (`flow`) owns a [`Viewer`] next to the GPU context and
//! draws whatever it holds every frame. Mesh loading goes through the
//! [`MeshTarget`] trait so the same [`load_mesh`] drives a local viewer in
//! tests and the event-loop-owned viewer through its proxy.

use std::cell::RefCell;

use winit::event::WindowEvent;

use crate::{
    camera::{Camera, OrbitController, Projection},
    config::ViewerConfig,
    data_structures::{
        bounds::fit_transform,
        scene_graph::{MeshHandle, Scene, SceneNode, for_each_mesh_mut, geometry_bounds},
    },
    error::MeshLoadError,
    http::Transport,
    resources,
};

pub struct Viewer {
    pub scene: Scene,
    pub camera: Camera,
    pub projection: Projection,
    pub controller: OrbitController,
    config: ViewerConfig,
    disposed: bool,
}

impl Viewer {
    pub fn initialize(config: ViewerConfig, width: u32, height: u32) -> Self {
        let scene = Scene::new(&config);
        let camera = Camera::new(config.default_camera_position, config.default_target);
        let projection = Projection::new(
            width,
            height,
            cgmath::Deg(config.fov),
            config.znear,
            config.zfar,
        );
        let mut controller = OrbitController::new(&config);
        controller.set_viewport(width, height);
        log::info!("Viewer initialized at {width}x{height}");
        Self {
            scene,
            camera,
            projection,
            controller,
            config,
            disposed: false,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Zero sized dimensions (minimized window, collapsed container) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.projection.resize(width, height);
        self.controller.set_viewport(width, height);
    }

    /// Advances the controller's damping by one frame.
    pub fn update(&mut self) -> bool {
        let moved = self.controller.update(&mut self.camera);
        self.scene.update_world_transforms();
        moved
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        self.controller.handle_window_events(event, &self.camera)
    }

    pub fn clear_generated(&mut self) -> Option<MeshHandle> {
        let removed = self.scene.clear_generated().map(|(handle, _)| handle);
        if let Some(handle) = removed {
            log::info!("Removed generated object {:?}", handle);
        }
        removed
    }

    /// Shows `object` as the generated object and puts the camera back to its default pose.
    pub fn insert_generated(&mut self, object: Box<dyn SceneNode>) -> Result<MeshHandle, MeshLoadError> {
        if self.disposed {
            return Err(MeshLoadError::ViewerClosed);
        }
        let handle = self.scene.insert_generated(object);
        self.scene.update_world_transforms();
        self.controller.reset(&mut self.camera);
        Ok(handle)
    }

    pub fn dispose(&mut self) {
        if !self.disposed {
            self.scene.clear_generated();
            self.disposed = true;
            log::info!("Viewer disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// Where [`load_mesh`] puts its result.
#[allow(async_fn_in_trait)]
pub trait MeshTarget {
    async fn clear_generated(&self) -> Result<(), MeshLoadError>;

    async fn insert_generated(&self, object: Box<dyn SceneNode>) -> Result<MeshHandle, MeshLoadError>;
}

impl MeshTarget for RefCell<Viewer> {
    async fn clear_generated(&self) -> Result<(), MeshLoadError> {
        let mut viewer = self.borrow_mut();
        if viewer.is_disposed() {
            return Err(MeshLoadError::ViewerClosed);
        }
        viewer.clear_generated();
        Ok(())
    }

    async fn insert_generated(&self, object: Box<dyn SceneNode>) -> Result<MeshHandle, MeshLoadError> {
        self.borrow_mut().insert_generated(object)
    }
}

/**
 * Scales `object` uniformly so its largest extent is 2 and moves its bounding
 * box centre to the origin. Every mesh is flagged to cast and receive shadows.
 */
pub fn fit_to_view(object: &mut dyn SceneNode) {
    let bounds = geometry_bounds(object);
    object.set_local_transform(fit_transform(bounds.as_ref()));
    for_each_mesh_mut(object, &mut |mesh| {
        mesh.cast_shadow = true;
        mesh.receive_shadow = true;
    });
}

/// Fetches and parses the OBJ at `url` and fits it to the view.
pub async fn fetch_mesh<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
) -> Result<Box<dyn SceneNode>, MeshLoadError> {
    let obj_text = transport
        .get_text(url)
        .await
        .map_err(|e| MeshLoadError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    let mut object = resources::parse_obj(url, &obj_text)?;
    fit_to_view(object.as_mut());
    Ok(object)
}

/**
 * Replaces the generated object with the mesh at `url`.
 *
 * The previous object is removed before the fetch starts, so a failed load
 * leaves the scene without a generated object.
 */
pub async fn load_mesh<M, T>(target: &M, transport: &T, url: &str) -> Result<MeshHandle, MeshLoadError>
where
    M: MeshTarget + ?Sized,
    T: Transport + ?Sized,
{
    target.clear_generated().await?;
    let object = fetch_mesh(transport, url).await?;
    target.insert_generated(object).await
}
