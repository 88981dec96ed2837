use cgmath::{InnerSpace, Point3};
use meshgen_viewer::{
    data_structures::scene_graph::{bounds, count_meshes},
    error::MeshLoadError,
    resources::parse_obj,
    viewer::load_mesh,
};

use crate::common::test_utils::{CUBE_OBJ, MockTransport, approx, box_obj, viewer};

mod common;

#[tokio::test]
async fn should_fit_the_loaded_object_into_a_centred_cube_of_edge_two() {
    let transport = MockTransport::new().with_mesh("/box.obj", box_obj([8.0, 4.0, -4.0], [12.0, 5.0, -3.0]));
    let viewer = viewer();

    load_mesh(&viewer, &transport, "/box.obj").await.unwrap();

    let viewer = viewer.borrow();
    let (_, object) = viewer.scene.generated().unwrap();
    assert!(approx(object.get_local_transform().scale.x, 0.5));

    let fitted = bounds(object).unwrap();
    let centre = fitted.center();
    assert!(approx(centre.x, 0.0) && approx(centre.y, 0.0) && approx(centre.z, 0.0), "{centre:?}");
    assert!(approx(fitted.max_dimension(), 2.0));
    assert!(approx(fitted.size().y, 0.5));
}

#[tokio::test]
async fn should_flag_every_mesh_for_shadows() {
    let transport = MockTransport::new().with_mesh("/cube.obj", CUBE_OBJ);
    let viewer = viewer();

    load_mesh(&viewer, &transport, "/cube.obj").await.unwrap();

    let viewer = viewer.borrow();
    let (_, object) = viewer.scene.generated().unwrap();
    assert_eq!(count_meshes(object), 1);
    for child in object.get_children() {
        let mesh = child.get_mesh().unwrap();
        assert!(mesh.cast_shadow && mesh.receive_shadow);
    }
}

#[tokio::test]
async fn should_replace_the_previous_object() {
    let transport = MockTransport::new()
        .with_mesh("/a.obj", CUBE_OBJ)
        .with_mesh("/b.obj", box_obj([0.0, 0.0, 0.0], [1.0, 2.0, 3.0]));
    let viewer = viewer();

    let first = load_mesh(&viewer, &transport, "/a.obj").await.unwrap();
    let second = load_mesh(&viewer, &transport, "/b.obj").await.unwrap();

    let viewer = viewer.borrow();
    assert_ne!(first, second);
    assert_eq!(viewer.scene.generated_count(), 1);
    let (handle, object) = viewer.scene.generated().unwrap();
    assert_eq!(handle, second);
    assert_eq!(object.name(), "b.obj");
}

#[tokio::test]
async fn should_reset_the_camera_when_a_mesh_is_loaded() {
    let transport = MockTransport::new().with_mesh("/cube.obj", CUBE_OBJ);
    let viewer = viewer();
    {
        let mut viewer = viewer.borrow_mut();
        viewer.controller.rotate_left(1.0);
        viewer.controller.dolly_out(3.0);
        for _ in 0..10 {
            viewer.update();
        }
        assert_ne!(viewer.camera.position, Point3::new(3.0, 2.0, 4.0));
    }

    load_mesh(&viewer, &transport, "/cube.obj").await.unwrap();

    let mut viewer = viewer.borrow_mut();
    assert_eq!(viewer.camera.position, Point3::new(3.0, 2.0, 4.0));
    assert_eq!(viewer.camera.target, Point3::new(0.0, 0.0, 0.0));
    // No leftover rotation is applied afterwards
    viewer.update();
    assert!((viewer.camera.position - Point3::new(3.0, 2.0, 4.0)).magnitude() < 1e-4);
}

#[tokio::test]
async fn should_leave_no_object_when_the_fetch_fails() {
    let transport = MockTransport::new().with_mesh("/cube.obj", CUBE_OBJ);
    let viewer = viewer();
    load_mesh(&viewer, &transport, "/cube.obj").await.unwrap();

    let result = load_mesh(&viewer, &transport, "/gone.obj").await;

    assert_eq!(
        result,
        Err(MeshLoadError::Fetch {
            url: "/gone.obj".to_string(),
            reason: "Request failed".to_string(),
        })
    );
    assert_eq!(viewer.borrow().scene.generated_count(), 0);
}

#[tokio::test]
async fn should_reject_unparsable_obj_text() {
    let transport = MockTransport::new().with_mesh("/broken.obj", "v not a number\nf 1 2 3\n");
    let viewer = viewer();

    let result = load_mesh(&viewer, &transport, "/broken.obj").await;

    assert!(matches!(result, Err(MeshLoadError::Parse { ref url, .. }) if url == "/broken.obj"));
    assert_eq!(viewer.borrow().scene.generated_count(), 0);
}

#[tokio::test]
async fn should_refuse_loads_after_dispose() {
    let transport = MockTransport::new().with_mesh("/cube.obj", CUBE_OBJ);
    let viewer = viewer();
    load_mesh(&viewer, &transport, "/cube.obj").await.unwrap();

    viewer.borrow_mut().dispose();
    viewer.borrow_mut().dispose();

    assert!(viewer.borrow().is_disposed());
    assert_eq!(viewer.borrow().scene.generated_count(), 0);
    assert_eq!(
        load_mesh(&viewer, &transport, "/cube.obj").await,
        Err(MeshLoadError::ViewerClosed)
    );
    assert!(transport.gets.borrow().len() == 1);
}

#[test]
fn should_compute_unit_normals_when_the_obj_has_none() {
    let object = parse_obj("/cube.obj", CUBE_OBJ).unwrap();

    assert_eq!(object.name(), "cube.obj");
    let mesh = object.get_children()[0].get_mesh().unwrap();
    assert_eq!(mesh.indices.len(), 36);
    for vertex in &mesh.vertices {
        let length = cgmath::Vector3::from(vertex.normal).magnitude();
        assert!(approx(length, 1.0), "{:?}", vertex.normal);
    }
}

#[test]
fn should_keep_normals_from_the_file() {
    let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 -1\nf 1//1 2//1 3//1\n";

    let object = parse_obj("/tri.obj", obj).unwrap();

    let mesh = object.get_children()[0].get_mesh().unwrap();
    assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, -1.0]));
}

#[test]
fn should_ignore_zero_sized_resizes() {
    let viewer = viewer();
    let mut viewer = viewer.borrow_mut();
    let aspect = viewer.projection.aspect();

    viewer.resize(0, 300);

    assert_eq!(viewer.projection.aspect(), aspect);
    viewer.resize(400, 400);
    assert!(approx(viewer.projection.aspect(), 1.0));
}
