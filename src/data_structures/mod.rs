//! Scene data: meshes, transforms, bounds and the scene graph.
//!
//! - `bounds` holds axis-aligned boxes and the fit-to-view transform
//! - `grid` builds the reference grid's line list
//! - `instance` holds per-node transformation data and its GPU layout
//! - `model` contains CPU meshes, their GPU buffers and draw helpers
//! - `scene_graph` enables hierarchical scene organization
//! - `texture` wraps the depth buffer

pub mod bounds;
pub mod grid;
pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
