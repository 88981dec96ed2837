//! Scene graph and hierarchical scene organization.
//!
//! Imported objects are trees of [`SceneNode`]s: [`ContainerNode`]s group
//! children, [`ModelNode`]s carry a triangle [`Mesh`]. The [`Scene`] owns the
//! static environment (lights, grid) and at most one generated object, which is
//! addressed through the [`MeshHandle`] returned when it was inserted.

use std::fmt::Debug;

use log::{info, warn};
use wgpu::util::DeviceExt;

use crate::{
    config::{LightConfig, ViewerConfig},
    data_structures::{
        bounds::Aabb,
        grid::Grid,
        instance::{Instance, InstanceRaw},
        model::{GpuMesh, Mesh},
    },
    render::Instanced,
};

pub trait SceneNode: Send {
    fn name(&self) -> &str;

    fn get_local_transform(&self) -> &Instance;

    fn set_local_transform(&mut self, instance: Instance);

    fn set_local_transform_with(&mut self, mutation: &mut dyn FnMut(&mut Instance));

    fn get_world_transform(&self) -> &Instance;

    /**
     * Recomputes this node's world transform from `parents_world_transform` and
     * passes the result down to all children.
     */
    fn update_world_transforms(&mut self, parents_world_transform: &Instance);

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>>;

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>>;

    fn add_child(&mut self, child: Box<dyn SceneNode>);

    fn get_mesh(&self) -> Option<&Mesh> {
        None
    }

    fn get_mesh_mut(&mut self) -> Option<&mut Mesh> {
        None
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device);

    fn get_render(&self) -> Vec<Instanced<'_>>;
}

impl Debug for dyn SceneNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneNode")
            .field("name", &self.name())
            .field("children", self.get_children())
            .finish()
    }
}

pub struct ContainerNode {
    name: String,
    pub children: Vec<Box<dyn SceneNode>>,
    local: Instance,
    world: Instance,
}

impl ContainerNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            local: Instance::default(),
            world: Instance::default(),
        }
    }
}

impl SceneNode for ContainerNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_local_transform(&self) -> &Instance {
        &self.local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.local = instance;
    }

    fn set_local_transform_with(&mut self, mutation: &mut dyn FnMut(&mut Instance)) {
        mutation(&mut self.local);
    }

    fn get_world_transform(&self) -> &Instance {
        &self.world
    }

    fn update_world_transforms(&mut self, parents_world_transform: &Instance) {
        self.world = parents_world_transform * &self.local;
        for child in self.children.iter_mut() {
            child.update_world_transforms(&self.world);
        }
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) {
        self.get_children_mut()
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue, device));
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .collect()
    }
}

/**
 * A node that draws one mesh. GPU buffers are created on the first
 * `write_to_buffers` call, so nodes can be built and inspected without a device.
 */
pub struct ModelNode {
    children: Vec<Box<dyn SceneNode>>,
    mesh: Mesh,
    gpu_mesh: Option<GpuMesh>,
    instance_buffer: Option<wgpu::Buffer>,
    local: Instance,
    world: Instance,
}

impl ModelNode {
    pub fn new(mesh: Mesh) -> Self {
        Self {
            children: Vec::new(),
            mesh,
            gpu_mesh: None,
            instance_buffer: None,
            local: Instance::default(),
            world: Instance::default(),
        }
    }
}

impl SceneNode for ModelNode {
    fn name(&self) -> &str {
        &self.mesh.name
    }

    fn get_local_transform(&self) -> &Instance {
        &self.local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.local = instance;
    }

    fn set_local_transform_with(&mut self, mutation: &mut dyn FnMut(&mut Instance)) {
        mutation(&mut self.local);
    }

    fn get_world_transform(&self) -> &Instance {
        &self.world
    }

    fn update_world_transforms(&mut self, parents_world_transform: &Instance) {
        self.world = parents_world_transform * &self.local;
        for child in self.children.iter_mut() {
            child.update_world_transforms(&self.world);
        }
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn get_mesh(&self) -> Option<&Mesh> {
        Some(&self.mesh)
    }

    fn get_mesh_mut(&mut self) -> Option<&mut Mesh> {
        Some(&mut self.mesh)
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) {
        if self.gpu_mesh.is_none() && !self.mesh.indices.is_empty() {
            self.gpu_mesh = Some(self.mesh.upload(device));
        }
        let raw_instances: [InstanceRaw; 1] = [self.world.to_raw()];
        match &self.instance_buffer {
            Some(buffer) => queue.write_buffer(buffer, 0, bytemuck::cast_slice(&raw_instances)),
            None => {
                self.instance_buffer = Some(device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("Instance Buffer"),
                        contents: bytemuck::cast_slice(&raw_instances),
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    },
                ))
            }
        }
        self.get_children_mut()
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue, device));
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        let own = match (&self.gpu_mesh, &self.instance_buffer) {
            (Some(mesh), Some(instance)) => Some(Instanced {
                instance,
                mesh,
                amount: 1,
            }),
            _ => None,
        };
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .chain(own)
            .collect()
    }
}

/// Applies `f` to every mesh in the subtree rooted at `node`.
pub fn for_each_mesh_mut(node: &mut dyn SceneNode, f: &mut dyn FnMut(&mut Mesh)) {
    if let Some(mesh) = node.get_mesh_mut() {
        f(mesh);
    }
    for child in node.get_children_mut().iter_mut() {
        for_each_mesh_mut(child.as_mut(), f);
    }
}

pub fn count_meshes(node: &dyn SceneNode) -> usize {
    node.get_mesh().map_or(0, |_| 1)
        + node
            .get_children()
            .iter()
            .map(|child| count_meshes(child.as_ref()))
            .sum::<usize>()
}

fn collect_bounds(node: &dyn SceneNode, transform: &Instance, acc: &mut Option<Aabb>) {
    if let Some(mesh) = node.get_mesh() {
        for p in mesh.positions() {
            let p = transform.transform_point(p);
            match acc {
                Some(aabb) => aabb.expand(p),
                None => *acc = Some(Aabb::from_point(p)),
            }
        }
    }
    for child in node.get_children() {
        let child_transform = transform * child.get_local_transform();
        collect_bounds(child.as_ref(), &child_transform, acc);
    }
}

/// Bounds of the subtree's geometry in the coordinate space of `node`'s parent.
pub fn bounds(node: &dyn SceneNode) -> Option<Aabb> {
    let mut acc = None;
    collect_bounds(node, node.get_local_transform(), &mut acc);
    acc
}

/// Bounds of the subtree's geometry ignoring `node`'s own transform.
pub fn geometry_bounds(node: &dyn SceneNode) -> Option<Aabb> {
    let mut acc = None;
    collect_bounds(node, &Instance::default(), &mut acc);
    acc
}

/// Identifies the generated object currently shown by a [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(u64);

impl MeshHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// The root of everything the viewer draws.
pub struct Scene {
    pub background: wgpu::Color,
    pub light: LightConfig,
    pub grid: Grid,
    generated: Option<(MeshHandle, Box<dyn SceneNode>)>,
    next_handle: u64,
}

impl Scene {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            background: config.clear_colour(),
            light: config.light.clone(),
            grid: Grid::new(&config.grid),
            generated: None,
            next_handle: 1,
        }
    }

    /**
     * Inserts `object` as the generated object and returns its handle.
     *
     * Any object still present is evicted first: the scene holds at most one.
     */
    pub fn insert_generated(&mut self, object: Box<dyn SceneNode>) -> MeshHandle {
        if let Some((old, _)) = self.generated.take() {
            warn!("Generated object {:?} was still present and got replaced", old);
        }
        let handle = MeshHandle(self.next_handle);
        self.next_handle += 1;
        info!("Inserting generated object {:?} as {:?}", object.name(), handle);
        self.generated = Some((handle, object));
        handle
    }

    /// Removes the generated object, whichever handle it has.
    pub fn clear_generated(&mut self) -> Option<(MeshHandle, Box<dyn SceneNode>)> {
        self.generated.take()
    }

    /// Removes the generated object only if it is the one `handle` refers to.
    pub fn remove(&mut self, handle: MeshHandle) -> Option<Box<dyn SceneNode>> {
        match &self.generated {
            Some((current, _)) if *current == handle => self.generated.take().map(|(_, n)| n),
            _ => None,
        }
    }

    pub fn generated(&self) -> Option<(MeshHandle, &dyn SceneNode)> {
        self.generated
            .as_ref()
            .map(|(handle, node)| (*handle, node.as_ref()))
    }

    pub fn generated_handle(&self) -> Option<MeshHandle> {
        self.generated.as_ref().map(|(handle, _)| *handle)
    }

    pub fn generated_count(&self) -> usize {
        self.generated.iter().count()
    }

    pub fn update_world_transforms(&mut self) {
        if let Some((_, node)) = &mut self.generated {
            node.update_world_transforms(&Instance::default());
        }
    }

    pub fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) {
        if let Some((_, node)) = &mut self.generated {
            node.write_to_buffers(queue, device);
        }
    }

    pub fn get_render(&self) -> Vec<Instanced<'_>> {
        self.generated
            .as_ref()
            .map(|(_, node)| node.get_render())
            .unwrap_or_default()
    }
}
