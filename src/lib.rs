//! meshgen-viewer
//!
//! A WASM-first 3D viewer with a form that asks a backend to generate a mesh
//! and shows the result. Submitting the form posts it to the generation
//! endpoint, the returned OBJ is fetched, centred, scaled to fit and swapped
//! into the scene in place of the previous one.
//!
//! High-level modules
//! - `camera`: camera, projection and the damped orbit controller
//! - `config`: viewer, pipeline and DOM configuration
//! - `context`: GPU context that owns device/queue/pipelines
//! - `data_structures`: scene graph, meshes, instances, bounds and the grid
//! - `error`: typed errors of the generation pipeline
//! - `flow`: the winit event loop and the proxy used to reach the viewer
//! - `generate`: the submit → generate → load pipeline
//! - `http`: form payloads and the backend transport
//! - `pipelines`: render pipelines (lit meshes, grid lines)
//! - `render`: render composition for pipeline batching
//! - `resources`: OBJ parsing into scene nodes
//! - `ui`: the form side of the page as seen by the pipeline
//! - `viewer`: scene, camera and mesh loading without GPU state
//! - `web`: DOM binding (wasm only)
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod generate;
pub mod http;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod ui;
pub mod viewer;

#[cfg(target_arch = "wasm32")]
pub mod web;

// Re-exports commonly used types for convenience in downstream code.
pub use data_structures::scene_graph::MeshHandle;
pub use error::{GenerateError, MeshLoadError, ProtocolError, TransportError};
pub use generate::GenerationPipeline;
pub use viewer::{Viewer, load_mesh};
