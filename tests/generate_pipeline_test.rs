use std::time::Duration;

use meshgen_viewer::{
    config::PipelineConfig,
    error::{GenerateError, MeshLoadError, ProtocolError, TransportError},
    generate::{Phase, STATUS_DONE, STATUS_GENERATING, STATUS_LOADING},
    http::FormPayload,
    viewer::load_mesh,
};

use crate::common::test_utils::{
    CUBE_OBJ, MockTransport, form, pipeline, pipeline_with, success_body,
};

mod common;

#[tokio::test]
async fn should_load_the_generated_mesh_end_to_end() {
    let transport = MockTransport::new()
        .reply(200, success_body("outputs/model_123.obj"))
        .with_mesh("/outputs/model_123.obj", CUBE_OBJ);
    let pipeline = pipeline(transport);

    let handle = pipeline.on_submit(form()).await.unwrap();

    let posts = pipeline.transport().posts.borrow();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, "/generate-3d");
    assert_eq!(posts[0].1, form());
    assert_eq!(*pipeline.transport().gets.borrow(), ["/outputs/model_123.obj"]);

    let ui = pipeline.ui();
    assert_eq!(*ui.statuses.borrow(), [STATUS_GENERATING, STATUS_LOADING, STATUS_DONE]);
    assert_eq!(*ui.results.borrow(), ["/outputs/model_123.obj"]);
    assert_eq!(*ui.submit_states.borrow(), [false, true]);

    let viewer = pipeline.target().borrow();
    assert_eq!(viewer.scene.generated_count(), 1);
    assert_eq!(viewer.scene.generated_handle(), Some(handle));
    assert_eq!(pipeline.phase(), Phase::Idle);
}

#[tokio::test]
async fn should_report_a_missing_mesh_file_and_leave_the_scene_alone() {
    let transport = MockTransport::new()
        .reply(200, r#"{"status":"error"}"#)
        .with_mesh("/previous.obj", CUBE_OBJ);
    let pipeline = pipeline(transport);
    let previous = load_mesh(pipeline.target(), pipeline.transport(), "/previous.obj")
        .await
        .unwrap();
    pipeline.transport().gets.borrow_mut().clear();

    let result = pipeline.on_submit(form()).await;

    assert_eq!(
        result,
        Err(GenerateError::Protocol(ProtocolError::MissingMeshFile))
    );
    let ui = pipeline.ui();
    assert_eq!(
        ui.last_status().as_deref(),
        Some("Error: Backend did not return a mesh_file")
    );
    assert!(ui.results.borrow().is_empty());
    assert_eq!(*ui.submit_states.borrow(), [false, true]);
    assert!(pipeline.transport().gets.borrow().is_empty());
    assert_eq!(
        pipeline.target().borrow().scene.generated_handle(),
        Some(previous)
    );
    assert_eq!(pipeline.phase(), Phase::Idle);
}

#[tokio::test]
async fn should_treat_a_null_status_as_a_missing_mesh_file() {
    for body in [
        r#"{"status":null}"#,
        r#"{"status":500,"mesh_file":"m.obj"}"#,
        r#"{"status":"error","mesh_file":42}"#,
    ] {
        let pipeline = pipeline(MockTransport::new().reply(200, body).with_mesh("/m.obj", CUBE_OBJ));

        let result = pipeline.on_submit(form()).await;

        assert_eq!(
            result,
            Err(GenerateError::Protocol(ProtocolError::MissingMeshFile)),
            "{body}"
        );
        assert_eq!(
            pipeline.ui().last_status().as_deref(),
            Some("Error: Backend did not return a mesh_file")
        );
        assert!(pipeline.transport().gets.borrow().is_empty());
    }
}

#[tokio::test]
async fn should_not_load_when_status_is_not_success() {
    let transport = MockTransport::new()
        .reply(200, r#"{"status":"queued","mesh_file":"outputs/m.obj"}"#)
        .with_mesh("/outputs/m.obj", CUBE_OBJ);
    let pipeline = pipeline(transport);

    let result = pipeline.on_submit(form()).await;

    assert_eq!(
        result,
        Err(GenerateError::Protocol(ProtocolError::MissingMeshFile))
    );
    assert!(pipeline.transport().gets.borrow().is_empty());
    assert_eq!(pipeline.target().borrow().scene.generated_count(), 0);
}

#[tokio::test]
async fn should_fail_on_non_2xx_status() {
    let pipeline = pipeline(MockTransport::new().reply(500, success_body("outputs/m.obj")));

    let result = pipeline.on_submit(form()).await;

    assert_eq!(
        result,
        Err(GenerateError::Transport(TransportError::Status(500)))
    );
    assert_eq!(pipeline.ui().last_status().as_deref(), Some("Error: Request failed"));
    assert_eq!(pipeline.ui().times_enabled(), 1);
}

#[tokio::test]
async fn should_fail_on_network_errors() {
    let pipeline = pipeline(MockTransport::new().fail("connection refused"));

    let result = pipeline.on_submit(form()).await;

    assert!(matches!(
        result,
        Err(GenerateError::Transport(TransportError::Network(_)))
    ));
    assert_eq!(
        pipeline.ui().last_status().as_deref(),
        Some("Error: Request failed: connection refused")
    );
    assert_eq!(pipeline.ui().times_enabled(), 1);
}

#[tokio::test]
async fn should_fail_on_invalid_json() {
    let pipeline = pipeline(MockTransport::new().reply(200, "<html>502</html>"));

    let result = pipeline.on_submit(form()).await;

    assert!(matches!(
        result,
        Err(GenerateError::Protocol(ProtocolError::InvalidJson(_)))
    ));
    assert!(
        pipeline
            .ui()
            .last_status()
            .is_some_and(|status| status.starts_with("Error: "))
    );
}

#[tokio::test]
async fn should_report_a_failed_mesh_fetch() {
    let pipeline = pipeline(MockTransport::new().reply(200, success_body("/missing.obj")));

    let result = pipeline.on_submit(form()).await;

    assert!(matches!(
        result,
        Err(GenerateError::MeshLoad(MeshLoadError::Fetch { ref url, .. })) if url == "/missing.obj"
    ));
    let ui = pipeline.ui();
    assert_eq!(*ui.results.borrow(), ["/missing.obj"]);
    assert_eq!(
        ui.last_status().as_deref(),
        Some("Error: Failed to fetch mesh /missing.obj: Request failed")
    );
    assert_eq!(*ui.submit_states.borrow(), [false, true]);
    assert_eq!(pipeline.target().borrow().scene.generated_count(), 0);
}

#[tokio::test]
async fn should_keep_exactly_one_generated_object_after_two_submissions() {
    let transport = MockTransport::new()
        .reply(200, success_body("a.obj"))
        .reply(200, success_body("b.obj"))
        .with_mesh("/a.obj", CUBE_OBJ)
        .with_mesh("/b.obj", CUBE_OBJ);
    let pipeline = pipeline(transport);

    let first = pipeline.on_submit(form()).await.unwrap();
    let second = pipeline.on_submit(form()).await.unwrap();

    assert_ne!(first, second);
    let viewer = pipeline.target().borrow();
    assert_eq!(viewer.scene.generated_count(), 1);
    assert_eq!(viewer.scene.generated_handle(), Some(second));
    assert_eq!(pipeline.ui().times_enabled(), 2);
}

#[tokio::test]
async fn should_discard_a_superseded_response() {
    let transport = MockTransport::new()
        .reply_after(Duration::from_millis(200), 200, success_body("slow.obj"))
        .reply_after(Duration::from_millis(10), 200, success_body("fast.obj"))
        .with_mesh("/slow.obj", CUBE_OBJ)
        .with_mesh("/fast.obj", CUBE_OBJ);
    let pipeline = pipeline(transport);

    let (slow, fast) = futures::join!(pipeline.on_submit(form()), pipeline.on_submit(form()));

    assert_eq!(slow, Err(GenerateError::Superseded));
    let fast = fast.unwrap();
    assert_eq!(*pipeline.transport().gets.borrow(), ["/fast.obj"]);
    assert_eq!(pipeline.target().borrow().scene.generated_handle(), Some(fast));
    assert_eq!(pipeline.ui().last_status().as_deref(), Some(STATUS_DONE));
    assert_eq!(pipeline.ui().times_enabled(), 2);
    assert_eq!(pipeline.latest_token(), 2);
}

#[tokio::test]
async fn should_time_out_and_reenable_submit() {
    let transport = MockTransport::new().reply_after(
        Duration::from_secs(5),
        200,
        success_body("late.obj"),
    );
    let pipeline = pipeline_with(
        transport,
        PipelineConfig {
            timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        },
    );

    let result = pipeline.on_submit(form()).await;

    assert!(matches!(result, Err(GenerateError::TimedOut(_))));
    assert_eq!(*pipeline.ui().submit_states.borrow(), [false, true]);
    assert!(
        pipeline
            .ui()
            .last_status()
            .is_some_and(|status| status.starts_with("Error: Timed out"))
    );
}

#[tokio::test]
async fn should_cancel_an_in_flight_submission() {
    let transport = MockTransport::new().reply_after(
        Duration::from_secs(5),
        200,
        success_body("late.obj"),
    );
    let pipeline = pipeline(transport);

    let (result, cancelled) = futures::join!(pipeline.on_submit(form()), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        pipeline.cancel()
    });

    assert!(cancelled);
    assert_eq!(result, Err(GenerateError::Cancelled));
    assert_eq!(pipeline.ui().last_status().as_deref(), Some("Error: Cancelled"));
    assert_eq!(*pipeline.ui().submit_states.borrow(), [false, true]);
    assert!(!pipeline.cancel());
}

#[tokio::test]
async fn should_fail_when_the_viewer_was_disposed() {
    let transport = MockTransport::new()
        .reply(200, success_body("m.obj"))
        .with_mesh("/m.obj", CUBE_OBJ);
    let pipeline = pipeline(transport);
    pipeline.target().borrow_mut().dispose();

    let result = pipeline.on_submit(form()).await;

    assert_eq!(
        result,
        Err(GenerateError::MeshLoad(MeshLoadError::ViewerClosed))
    );
    assert_eq!(pipeline.ui().times_enabled(), 1);
}

#[tokio::test]
async fn should_disable_submit_before_the_form_is_read() {
    let pipeline = pipeline(
        MockTransport::new()
            .reply(200, success_body("m.obj"))
            .with_mesh("/m.obj", CUBE_OBJ),
    );

    let (result, (statuses, submit_states, posted)) = futures::join!(
        pipeline.submit_with(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, GenerateError>(form())
        }),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let ui = pipeline.ui();
            (
                ui.statuses.borrow().clone(),
                ui.submit_states.borrow().clone(),
                pipeline.transport().posts.borrow().len(),
            )
        }
    );

    assert_eq!(statuses, [STATUS_GENERATING]);
    assert_eq!(submit_states, [false]);
    assert_eq!(posted, 0);
    assert!(result.is_ok());
    assert_eq!(*pipeline.ui().submit_states.borrow(), [false, true]);
}

#[tokio::test]
async fn should_show_a_form_read_failure_in_the_status() {
    let pipeline = pipeline(MockTransport::new().reply(200, success_body("m.obj")));

    let result = pipeline
        .submit_with(async {
            Err::<FormPayload, _>(GenerateError::Form("file is unreadable".to_string()))
        })
        .await;

    assert_eq!(
        result,
        Err(GenerateError::Form("file is unreadable".to_string()))
    );
    let ui = pipeline.ui();
    assert_eq!(
        ui.last_status().as_deref(),
        Some("Error: Cannot read the form: file is unreadable")
    );
    assert_eq!(*ui.submit_states.borrow(), [false, true]);
    assert!(pipeline.transport().posts.borrow().is_empty());
    assert_eq!(pipeline.phase(), Phase::Idle);
}

#[tokio::test]
async fn should_return_to_idle_after_a_cancelled_read() {
    let pipeline = pipeline(MockTransport::new().reply(200, success_body("m.obj")));

    let (result, cancelled) = futures::join!(
        pipeline.submit_with(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, GenerateError>(form())
        }),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            pipeline.cancel()
        }
    );

    assert!(cancelled);
    assert_eq!(result, Err(GenerateError::Cancelled));
    assert!(pipeline.transport().posts.borrow().is_empty());
    assert_eq!(pipeline.ui().last_status().as_deref(), Some("Error: Cancelled"));
    assert_eq!(pipeline.phase(), Phase::Idle);
}
