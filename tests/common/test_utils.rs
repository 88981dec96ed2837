#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    time::Duration,
};

use meshgen_viewer::{
    config::{PipelineConfig, ViewerConfig},
    error::TransportError,
    generate::GenerationPipeline,
    http::{FormPayload, HttpResponse, Transport},
    ui::FormUi,
    viewer::Viewer,
};

/// A unit cube centred on the origin, without normals.
pub(crate) const CUBE_OBJ: &str = "\
o cube
v -0.5 -0.5 -0.5
v 0.5 -0.5 -0.5
v 0.5 0.5 -0.5
v -0.5 0.5 -0.5
v -0.5 -0.5 0.5
v 0.5 -0.5 0.5
v 0.5 0.5 0.5
v -0.5 0.5 0.5
f 1 3 2
f 1 4 3
f 5 6 7
f 5 7 8
f 1 2 6
f 1 6 5
f 4 8 7
f 4 7 3
f 1 5 8
f 1 8 4
f 2 3 7
f 2 7 6
";

/// An axis-aligned box spanning `min` to `max` as OBJ text.
pub(crate) fn box_obj(min: [f32; 3], max: [f32; 3]) -> String {
    let mut obj = String::from("o box\n");
    for z in [min[2], max[2]] {
        for (x, y) in [(min[0], min[1]), (max[0], min[1]), (max[0], max[1]), (min[0], max[1])] {
            obj.push_str(&format!("v {x} {y} {z}\n"));
        }
    }
    // Same faces as the cube
    for face in CUBE_OBJ.lines().filter(|line| line.starts_with("f ")) {
        obj.push_str(face);
        obj.push('\n');
    }
    obj
}

pub(crate) fn success_body(mesh_file: &str) -> String {
    format!(r#"{{"status":"success","mesh_file":"{mesh_file}"}}"#)
}

pub(crate) fn form() -> FormPayload {
    FormPayload::new().text("prompt", "a small chair")
}

struct PostReply {
    delay: Duration,
    reply: Result<HttpResponse, TransportError>,
}

/// A backend that answers from a script and records every request.
#[derive(Default)]
pub(crate) struct MockTransport {
    replies: RefCell<VecDeque<PostReply>>,
    meshes: HashMap<String, String>,
    pub posts: RefCell<Vec<(String, FormPayload)>>,
    pub gets: RefCell<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, status: u16, body: impl Into<String>) -> Self {
        self.reply_after(Duration::ZERO, status, body)
    }

    pub fn reply_after(self, delay: Duration, status: u16, body: impl Into<String>) -> Self {
        self.replies.borrow_mut().push_back(PostReply {
            delay,
            reply: Ok(HttpResponse {
                status,
                body: body.into(),
            }),
        });
        self
    }

    pub fn fail(self, reason: &str) -> Self {
        self.replies.borrow_mut().push_back(PostReply {
            delay: Duration::ZERO,
            reply: Err(TransportError::Network(reason.to_string())),
        });
        self
    }

    pub fn with_mesh(mut self, url: &str, obj: impl Into<String>) -> Self {
        self.meshes.insert(url.to_string(), obj.into());
        self
    }
}

impl Transport for MockTransport {
    async fn post_form(&self, path: &str, form: FormPayload) -> Result<HttpResponse, TransportError> {
        self.posts.borrow_mut().push((path.to_string(), form));
        let next = self.replies.borrow_mut().pop_front();
        match next {
            Some(PostReply { delay, reply }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                reply
            }
            None => Err(TransportError::Network("no reply scripted".to_string())),
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, TransportError> {
        self.gets.borrow_mut().push(url.to_string());
        self.meshes
            .get(url)
            .cloned()
            .ok_or(TransportError::Status(404))
    }
}

/// Records everything the pipeline shows on the page.
#[derive(Default)]
pub(crate) struct RecordingUi {
    pub statuses: RefCell<Vec<String>>,
    pub submit_states: RefCell<Vec<bool>>,
    pub results: RefCell<Vec<String>>,
}

impl RecordingUi {
    pub fn last_status(&self) -> Option<String> {
        self.statuses.borrow().last().cloned()
    }

    pub fn times_enabled(&self) -> usize {
        self.submit_states.borrow().iter().filter(|enabled| **enabled).count()
    }
}

impl FormUi for RecordingUi {
    fn set_status(&self, status: &str) {
        self.statuses.borrow_mut().push(status.to_string());
    }

    fn set_submit_enabled(&self, enabled: bool) {
        self.submit_states.borrow_mut().push(enabled);
    }

    fn show_result(&self, mesh_url: &str) {
        self.results.borrow_mut().push(mesh_url.to_string());
    }
}

pub(crate) fn viewer() -> RefCell<Viewer> {
    RefCell::new(Viewer::initialize(ViewerConfig::default(), 800, 600))
}

pub(crate) type TestPipeline = GenerationPipeline<MockTransport, RecordingUi, RefCell<Viewer>>;

pub(crate) fn pipeline(transport: MockTransport) -> TestPipeline {
    pipeline_with(transport, PipelineConfig::default())
}

pub(crate) fn pipeline_with(transport: MockTransport, config: PipelineConfig) -> TestPipeline {
    GenerationPipeline::new(transport, RecordingUi::default(), viewer(), config)
}

pub(crate) fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}
