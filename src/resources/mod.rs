use std::io::{BufReader, Cursor};

use crate::{
    data_structures::scene_graph::{ContainerNode, ModelNode, SceneNode},
    error::MeshLoadError,
};

/**
 * This module contains the logic for turning fetched OBJ text into scene nodes.
 */
pub mod mesh;

/// Last path segment of `url`, used to name the imported object.
pub fn file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
}

/**
 * Parses OBJ text into a container with one model node per object or group.
 *
 * Material libraries are not fetched; every part is drawn with the default
 * surface.
 */
pub fn parse_obj(url: &str, obj_text: &str) -> Result<Box<dyn SceneNode>, MeshLoadError> {
    let mut obj_reader = BufReader::new(Cursor::new(obj_text.as_bytes()));

    let (models, _materials) = tobj::load_obj_buf(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_p| Ok(Default::default()),
    )
    .map_err(|e| MeshLoadError::Parse {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if models.is_empty() {
        log::warn!("{url} contains no geometry");
    }

    let mut root = ContainerNode::new(file_name(url));
    for mesh in mesh::load_meshes(&models) {
        root.add_child(Box::new(ModelNode::new(mesh)));
    }
    Ok(Box::new(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_take_the_last_path_segment_as_file_name() {
        assert_eq!(file_name("/meshes/abc/model.obj"), "model.obj");
        assert_eq!(file_name("http://host/m.obj?x=1"), "m.obj");
        assert_eq!(file_name("model.obj"), "model.obj");
    }

    #[test]
    fn should_parse_without_loading_material_libraries() {
        let obj = "mtllib model.mtl\no tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

        let object = parse_obj("/meshes/model.obj", obj).unwrap();

        assert_eq!(object.name(), "model.obj");
        assert_eq!(object.get_children().len(), 1);
        let mesh = object.get_children()[0].get_mesh().unwrap();
        assert_eq!(mesh.indices.len(), 3);
    }

    #[test]
    fn should_report_unparsable_obj_text() {
        let result = parse_obj("/broken.obj", "v not a number\nf 1 2 3\n");

        assert!(matches!(
            result,
            Err(MeshLoadError::Parse { ref url, .. }) if url == "/broken.obj"
        ));
    }
}
