use cgmath::{InnerSpace, Point3};
use meshgen_viewer::{
    camera::{Camera, OrbitController},
    config::ViewerConfig,
};

fn orbit() -> (Camera, OrbitController) {
    let config = ViewerConfig::default();
    let camera = Camera::new(config.default_camera_position, config.default_target);
    let mut controller = OrbitController::new(&config);
    controller.set_viewport(800, 600);
    (camera, controller)
}

fn azimuth(camera: &Camera) -> f32 {
    let offset = camera.position - camera.target;
    offset.x.atan2(offset.z)
}

#[test]
fn should_apply_a_fraction_of_the_rotation_per_frame() {
    let (mut camera, mut controller) = orbit();
    let start = azimuth(&camera);

    controller.rotate_left(0.5);
    assert!(controller.update(&mut camera));

    assert!((azimuth(&camera) - (start - 0.5 * 0.05)).abs() < 1e-4);
}

#[test]
fn should_converge_to_the_full_rotation() {
    let (mut camera, mut controller) = orbit();
    let start = azimuth(&camera);
    let radius = camera.distance();

    controller.rotate_left(0.5);
    for _ in 0..600 {
        controller.update(&mut camera);
    }

    assert!((azimuth(&camera) - (start - 0.5)).abs() < 1e-3);
    assert!((camera.distance() - radius).abs() < 1e-3);
    assert!(!controller.update(&mut camera));
}

#[test]
fn should_clamp_the_distance() {
    let (mut camera, mut controller) = orbit();

    controller.dolly_out(1e6);
    controller.update(&mut camera);
    assert!((camera.distance() - 500.0).abs() < 1e-2);

    controller.dolly_in(1e9);
    controller.update(&mut camera);
    assert!((camera.distance() - 0.1).abs() < 1e-4);
}

#[test]
fn should_not_flip_over_the_poles() {
    let (mut camera, mut controller) = orbit();
    controller.damping_factor = 0.0;

    controller.rotate_up(100.0);
    controller.update(&mut camera);
    let top = (camera.position - camera.target).normalize();
    assert!(top.y > 0.99);

    controller.rotate_up(-100.0);
    controller.update(&mut camera);
    let bottom = (camera.position - camera.target).normalize();
    assert!(bottom.y < -0.99);
}

#[test]
fn should_pan_the_target_with_the_camera() {
    let (mut camera, mut controller) = orbit();
    controller.damping_factor = 0.0;
    let offset = camera.position - camera.target;

    controller.pan(100.0, 0.0, &camera);
    controller.update(&mut camera);

    assert_ne!(camera.target, Point3::new(0.0, 0.0, 0.0));
    assert!(((camera.position - camera.target) - offset).magnitude() < 1e-4);
    assert!(camera.target.y.abs() < 1e-4);
}

#[test]
fn should_reset_to_the_default_pose() {
    let (mut camera, mut controller) = orbit();
    controller.rotate_left(1.0);
    controller.pan(40.0, 20.0, &camera);
    for _ in 0..5 {
        controller.update(&mut camera);
    }

    controller.reset(&mut camera);

    assert_eq!(camera.position, Point3::new(3.0, 2.0, 4.0));
    assert_eq!(camera.target, Point3::new(0.0, 0.0, 0.0));
    assert!(!controller.update(&mut camera));
}
