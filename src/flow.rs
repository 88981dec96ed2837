//! Application event loop.
//!
//! The winit event loop owns the [`Viewer`] and, once the GPU is ready, the
//! [`Context`]. Code running outside the loop (the generation pipeline) reaches
//! the viewer through a [`ViewerProxy`], which turns every mutation into a
//! [`ViewerEvent`] and waits for the loop's answer on a oneshot channel.
//!
//! # Lifecycle Flow
//!
//! Each frame the loop:
//! 1. Advances the orbit controller's damping
//! 2. Recomputes world transforms and uploads new or changed buffers
//! 3. Writes the camera uniform
//! 4. Draws the grid and the generated object, then presents
//! 5. Requests the next redraw

use std::{fmt::Debug, future::Future, iter, sync::Arc};

use futures_intrusive::channel::shared::{OneshotSender, oneshot_channel};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::ViewerConfig,
    context::Context,
    data_structures::{
        model::DrawModel,
        scene_graph::{MeshHandle, SceneNode},
    },
    error::MeshLoadError,
    render::{Instanced, Lines, Render},
    viewer::{MeshTarget, Viewer},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// GPU state, available once the asynchronous device setup finished.
#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, config: &ViewerConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config).await?;
        Ok(Self {
            ctx,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
        }
    }

    fn render(&mut self, viewer: &mut Viewer) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        viewer
            .scene
            .write_to_buffers(&self.ctx.queue, &self.ctx.device);
        self.ctx.write_camera(viewer);

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let mut basics: Vec<Instanced> = Vec::new();
            let mut lines: Vec<Lines> = Vec::new();
            Render::Composed(vec![
                Render::Lines(Lines {
                    vertex: &self.ctx.grid_buffer,
                    amount: self.ctx.grid_vertices,
                }),
                Render::Defaults(viewer.scene.get_render()),
            ])
            .set_pipelines(&mut basics, &mut lines);

            render_pass.set_pipeline(&self.ctx.pipelines.grid);
            for line in lines {
                render_pass.draw_lines(line.vertex, 0..line.amount, &self.ctx.camera.bind_group);
            }

            render_pass.set_pipeline(&self.ctx.pipelines.basic);
            for instanced in basics {
                if instanced.amount == 0 || instanced.instance.size() == 0 {
                    log::warn!("Skipping a mesh with zero instances");
                    continue;
                }
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                render_pass.draw_mesh_instanced(
                    instanced.mesh,
                    0..instanced.amount as u32,
                    &self.ctx.camera.bind_group,
                    &self.ctx.light.bind_group,
                );
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

/// Requests the event loop handles on behalf of code running outside of it.
pub enum ViewerEvent {
    /// GPU setup finished (web only; native sets up synchronously).
    #[allow(dead_code)]
    Initialized(anyhow::Result<AppState>),
    ClearGenerated {
        reply: OneshotSender<Result<(), MeshLoadError>>,
    },
    InsertGenerated {
        object: Box<dyn SceneNode>,
        reply: OneshotSender<Result<MeshHandle, MeshLoadError>>,
    },
    Dispose,
}

impl Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(state) => f
                .debug_tuple("Initialized")
                .field(&state.is_ok())
                .finish(),
            Self::ClearGenerated { .. } => f.write_str("ClearGenerated"),
            Self::InsertGenerated { object, .. } => {
                f.debug_struct("InsertGenerated").field("object", object).finish()
            }
            Self::Dispose => f.write_str("Dispose"),
        }
    }
}

/**
 * A cloneable handle to the viewer owned by the event loop.
 *
 * Mesh changes are sent as [`ViewerEvent`]s; once the loop is gone every call
 * fails with [`MeshLoadError::ViewerClosed`].
 */
#[derive(Clone, Debug)]
pub struct ViewerProxy {
    proxy: EventLoopProxy<ViewerEvent>,
    #[cfg(not(target_arch = "wasm32"))]
    runtime: tokio::runtime::Handle,
}

impl ViewerProxy {
    /// Asks the event loop to drop the scene and GPU resources and stop.
    pub fn dispose(&self) {
        if self.proxy.send_event(ViewerEvent::Dispose).is_err() {
            log::warn!("Viewer was already closed");
        }
    }

    /**
     * Runs the future built by `task` next to the event loop.
     *
     * On the web it is spawned on the page's microtask queue. On desktop it
     * runs on a helper thread that blocks on the app's tokio runtime, so the
     * future itself does not have to be `Send`.
     */
    pub fn spawn<F, Fut>(&self, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        #[cfg(not(target_arch = "wasm32"))]
        {
            let runtime = self.runtime.clone();
            std::thread::spawn(move || runtime.block_on(task()));
        }
        #[cfg(target_arch = "wasm32")]
        {
            wasm_bindgen_futures::spawn_local(task());
        }
    }
}

impl MeshTarget for ViewerProxy {
    async fn clear_generated(&self) -> Result<(), MeshLoadError> {
        let (reply, receiver) = oneshot_channel();
        self.proxy
            .send_event(ViewerEvent::ClearGenerated { reply })
            .map_err(|_| MeshLoadError::ViewerClosed)?;
        receiver
            .receive()
            .await
            .unwrap_or(Err(MeshLoadError::ViewerClosed))
    }

    async fn insert_generated(&self, object: Box<dyn SceneNode>) -> Result<MeshHandle, MeshLoadError> {
        let (reply, receiver) = oneshot_channel();
        self.proxy
            .send_event(ViewerEvent::InsertGenerated { object, reply })
            .map_err(|_| MeshLoadError::ViewerClosed)?;
        receiver
            .receive()
            .await
            .unwrap_or(Err(MeshLoadError::ViewerClosed))
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewerEvent>,
    viewer: Viewer,
    state: Option<AppState>,
    #[cfg(target_arch = "wasm32")]
    container_id: Option<String>,
}

impl App {
    fn new(
        event_loop: &EventLoop<ViewerEvent>,
        config: ViewerConfig,
        #[cfg(target_arch = "wasm32")] container_id: Option<String>,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        // Real dimensions arrive with the first resize
        let viewer = Viewer::initialize(config, 1, 1);
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            viewer,
            state: None,
            #[cfg(target_arch = "wasm32")]
            container_id,
        })
    }

    fn viewer_proxy(&self) -> ViewerProxy {
        ViewerProxy {
            proxy: self.proxy.clone(),
            #[cfg(not(target_arch = "wasm32"))]
            runtime: self.async_runtime.handle().clone(),
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.viewer.resize(width, height);
        if let Some(state) = &mut self.state {
            state.resize(width, height);
        }
    }

    fn on_initialized(&mut self, state: AppState) {
        let size = state.ctx.window.inner_size();
        self.state = Some(state);
        self.resize(size.width, size.height);
        if let Some(state) = &self.state {
            state.ctx.window.request_redraw();
        }
    }

    fn dispose(&mut self, event_loop: &ActiveEventLoop) {
        self.viewer.dispose();
        // Dropping the context releases surface, buffers and pipelines
        self.state = None;
        event_loop.exit();
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.viewer.is_disposed() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("meshgen-viewer");

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            window_attributes = match self.container_id.as_deref().and_then(crate::web::create_canvas) {
                Some(canvas) => window_attributes.with_canvas(Some(canvas)),
                None => window_attributes.with_append(true),
            };
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create the viewer window: {e}");
                event_loop.exit();
                return;
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self
                .async_runtime
                .block_on(AppState::new(window, self.viewer.config()))
            {
                Ok(state) => self.on_initialized(state),
                Err(e) => {
                    log::error!("App initialization failed. Cannot create the main context: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let config = self.viewer.config().clone();
            wasm_bindgen_futures::spawn_local(async move {
                let state = AppState::new(window, &config).await;
                if proxy.send_event(ViewerEvent::Initialized(state)).is_err() {
                    log::warn!("Viewer closed before the GPU was ready");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Initialized(Ok(state)) => {
                // This is the message from our wasm `spawn_local`
                if self.viewer.is_disposed() {
                    return;
                }
                self.on_initialized(state);
            }
            ViewerEvent::Initialized(Err(e)) => {
                log::error!("App initialization failed. Cannot create the main context: {e:#}");
            }
            ViewerEvent::ClearGenerated { reply } => {
                let result = if self.viewer.is_disposed() {
                    Err(MeshLoadError::ViewerClosed)
                } else {
                    self.viewer.clear_generated();
                    Ok(())
                };
                if reply.send(result).is_err() {
                    log::warn!("Nobody waited for the cleared scene");
                }
            }
            ViewerEvent::InsertGenerated { object, reply } => {
                let result = self.viewer.insert_generated(object);
                if reply.send(result).is_err() {
                    log::warn!("Nobody waited for the inserted mesh");
                }
            }
            ViewerEvent::Dispose => self.dispose(event_loop),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if self.state.is_none() {
            return;
        }

        self.viewer.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => self.dispose(event_loop),
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                self.viewer.update();
                let Some(state) = &mut self.state else {
                    return;
                };
                match state.render(&mut self.viewer) {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

fn init_logger() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&JsValue::from_str(&e.to_string()));
        }
    }
}

/**
 * Opens the viewer window and runs the event loop until it is closed.
 *
 * `startup` is called once with a proxy to the viewer before the loop starts;
 * use it to spawn the generation pipeline.
 */
#[cfg(not(target_arch = "wasm32"))]
pub fn run<F>(config: ViewerConfig, startup: F) -> anyhow::Result<()>
where
    F: FnOnce(ViewerProxy),
{
    init_logger();

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;
    startup(app.viewer_proxy());

    event_loop.run_app(&mut app)?;

    Ok(())
}

/**
 * Starts the viewer inside the element `container_id` (a fresh canvas is
 * appended to it) and returns right away; the browser drives the loop.
 */
#[cfg(target_arch = "wasm32")]
pub fn run<F>(config: ViewerConfig, container_id: Option<String>, startup: F) -> anyhow::Result<()>
where
    F: FnOnce(ViewerProxy),
{
    use winit::platform::web::EventLoopExtWebSys;

    init_logger();

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;
    let app = App::new(&event_loop, config, container_id)?;
    startup(app.viewer_proxy());

    event_loop.spawn_app(app);

    Ok(())
}
