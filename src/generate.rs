//! The generate → fetch → load pipeline behind the form.
//!
//! One [`GenerationPipeline::on_submit`] call drives a whole submission: post
//! the form, validate the acknowledgement, load the returned mesh into the
//! viewer and report progress through the [`FormUi`] status line.
//!
//! Every submission takes a new request token. Work belonging to a token that
//! is no longer the latest stops with [`GenerateError::Superseded`] before it
//! can touch the scene.

use std::{
    cell::{Cell, RefCell},
    pin::pin,
    time::Duration,
};

use futures::future::{self, AbortHandle, Abortable, Either};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    config::PipelineConfig,
    data_structures::scene_graph::{MeshHandle, SceneNode},
    error::{GenerateError, GenerateResult, MeshLoadError, ProtocolError, TransportError},
    http::{FormPayload, Transport},
    ui::FormUi,
    viewer::{MeshTarget, load_mesh},
};

pub const SUCCESS_STATUS: &str = "success";
pub const STATUS_GENERATING: &str = "Generating 3D model...";
pub const STATUS_LOADING: &str = "Loading mesh into viewer...";
pub const STATUS_DONE: &str = "Done";

/// Where the latest submission is. `Done` and `Error` are reported as the
/// submission ends, after which the pipeline is back in `Idle`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
    AwaitingResponse,
    LoadingMesh,
    Done,
    Error(String),
}

/// The backend's acknowledgement of a generation request.
///
/// Fields are raw JSON: a `null` or non-string value is a missing mesh, not a
/// malformed body.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct GenerateResponse {
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub mesh_file: Option<Value>,
}

impl GenerateResponse {
    pub fn parse(body: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(body).map_err(|e| ProtocolError::InvalidJson(e.to_string()))
    }

    /// The generated mesh path, if the backend reported success and sent a non-empty one.
    pub fn mesh_file(&self) -> Result<&str, ProtocolError> {
        let succeeded = self.status.as_ref().and_then(Value::as_str) == Some(SUCCESS_STATUS);
        match self.mesh_file.as_ref().and_then(Value::as_str) {
            Some(mesh_file) if succeeded && !mesh_file.is_empty() => Ok(mesh_file),
            _ => Err(ProtocolError::MissingMeshFile),
        }
    }
}

/// Turns the backend's mesh path into a site-relative URL with exactly one leading `/`.
pub fn normalize_mesh_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// The status line shown for a failed submission.
pub fn error_status(err: &GenerateError) -> String {
    let message = err.to_string();
    if message.is_empty() {
        "Error: unknown".to_string()
    } else {
        format!("Error: {message}")
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[cfg(target_arch = "wasm32")]
pub async fn sleep(duration: Duration) {
    let millis = duration.as_millis().min(i32::MAX as u128) as i32;
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        if let Some(window) = web_sys::window() {
            if let Err(e) =
                window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
            {
                log::error!("Failed to schedule timeout: {e:?}");
            }
        }
    });
    if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
        log::error!("Timeout promise rejected: {e:?}");
    }
}

/// Re-enables the submit control when the submission ends, however it ends.
struct SubmitGuard<'a, U: FormUi> {
    ui: &'a U,
}

impl<U: FormUi> Drop for SubmitGuard<'_, U> {
    fn drop(&mut self) {
        self.ui.set_submit_enabled(true);
    }
}

/// A [`MeshTarget`] that refuses to change the scene once `token` is stale.
struct CurrentRequest<'a, M: MeshTarget> {
    target: &'a M,
    latest: &'a Cell<u64>,
    token: u64,
}

impl<M: MeshTarget> CurrentRequest<'_, M> {
    fn ensure_current(&self) -> Result<(), MeshLoadError> {
        if self.latest.get() == self.token {
            Ok(())
        } else {
            Err(MeshLoadError::Superseded)
        }
    }
}

impl<M: MeshTarget> MeshTarget for CurrentRequest<'_, M> {
    async fn clear_generated(&self) -> Result<(), MeshLoadError> {
        self.ensure_current()?;
        self.target.clear_generated().await
    }

    async fn insert_generated(&self, object: Box<dyn SceneNode>) -> Result<MeshHandle, MeshLoadError> {
        self.ensure_current()?;
        self.target.insert_generated(object).await
    }
}

pub struct GenerationPipeline<T: Transport, U: FormUi, M: MeshTarget> {
    transport: T,
    ui: U,
    target: M,
    config: PipelineConfig,
    latest: Cell<u64>,
    phase: RefCell<Phase>,
    in_flight: RefCell<Option<AbortHandle>>,
}

impl<T: Transport, U: FormUi, M: MeshTarget> GenerationPipeline<T, U, M> {
    pub fn new(transport: T, ui: U, target: M, config: PipelineConfig) -> Self {
        Self {
            transport,
            ui,
            target,
            config,
            latest: Cell::new(0),
            phase: RefCell::new(Phase::Idle),
            in_flight: RefCell::new(None),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn target(&self) -> &M {
        &self.target
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase.borrow().clone()
    }

    /// Token of the most recent submission; `0` before the first one.
    pub fn latest_token(&self) -> u64 {
        self.latest.get()
    }

    /// Aborts the latest submission if it is still running. Returns whether there was one.
    pub fn cancel(&self) -> bool {
        match self.in_flight.borrow_mut().take() {
            Some(handle) => {
                log::info!("Cancelling request {}", self.latest.get());
                handle.abort();
                true
            }
            None => false,
        }
    }

    fn set_phase(&self, token: u64, phase: Phase) {
        if self.latest.get() == token {
            log::info!("Request {token}: {phase:?}");
            *self.phase.borrow_mut() = phase;
        }
    }

    /**
     * Handles one form submission from start to finish.
     *
     * Failures are logged and shown in the status line; the returned error is
     * informational only. The submit control is re-enabled exactly once before
     * this returns.
     */
    pub async fn on_submit(&self, form: FormPayload) -> GenerateResult<MeshHandle> {
        self.submit_with(future::ready(Ok(form))).await
    }

    /// Like [`Self::on_submit`], for a form that still has to be read.
    ///
    /// The status line and the submit control change before `read_form` is
    /// polled. Reading counts as part of the request, so it can be cancelled,
    /// time out or fail with an error status.
    pub async fn submit_with<F>(&self, read_form: F) -> GenerateResult<MeshHandle>
    where
        F: Future<Output = GenerateResult<FormPayload>>,
    {
        let token = self.latest.get() + 1;
        self.latest.set(token);
        self.set_phase(token, Phase::Submitting);
        self.ui.set_status(STATUS_GENERATING);
        self.ui.set_submit_enabled(false);
        let _guard = SubmitGuard { ui: &self.ui };

        let (abort_handle, registration) = AbortHandle::new_pair();
        self.in_flight.replace(Some(abort_handle));

        let work = Abortable::new(self.run(token, read_form), registration);
        let outcome = match self.config.timeout {
            Some(timeout) => match future::select(pin!(work), pin!(sleep(timeout))).await {
                Either::Left((outcome, _)) => outcome,
                Either::Right(((), _)) => Ok(Err(GenerateError::TimedOut(timeout.as_secs()))),
            },
            None => work.await,
        };
        let result = outcome.unwrap_or(Err(GenerateError::Cancelled));

        if self.latest.get() == token {
            self.in_flight.replace(None);
        }

        match &result {
            Ok(handle) => {
                log::info!("Request {token} finished with {:?}", handle);
                if self.latest.get() == token {
                    self.ui.set_status(STATUS_DONE);
                }
                self.set_phase(token, Phase::Done);
            }
            Err(GenerateError::Superseded) => {
                log::warn!("Request {token} was superseded, discarding its result");
            }
            Err(e) => {
                log::error!("Request {token} failed: {e}");
                let status = error_status(e);
                if self.latest.get() == token {
                    self.ui.set_status(&status);
                }
                self.set_phase(token, Phase::Error(status));
            }
        }
        self.set_phase(token, Phase::Idle);
        result
    }

    async fn run<F>(&self, token: u64, read_form: F) -> GenerateResult<MeshHandle>
    where
        F: Future<Output = GenerateResult<FormPayload>>,
    {
        let form = read_form.await?;
        if self.latest.get() != token {
            return Err(GenerateError::Superseded);
        }
        self.set_phase(token, Phase::AwaitingResponse);
        let response = self.transport.post_form(&self.config.endpoint, form).await?;
        if self.latest.get() != token {
            return Err(GenerateError::Superseded);
        }
        if !response.is_success() {
            return Err(TransportError::Status(response.status).into());
        }

        let ack = GenerateResponse::parse(&response.body)?;
        let mesh_url = normalize_mesh_path(ack.mesh_file()?);

        self.ui.show_result(&mesh_url);
        self.ui.set_status(STATUS_LOADING);
        self.set_phase(token, Phase::LoadingMesh);

        let target = CurrentRequest {
            target: &self.target,
            latest: &self.latest,
            token,
        };
        load_mesh(&target, &self.transport, &mesh_url)
            .await
            .map_err(|e| match e {
                MeshLoadError::Superseded => GenerateError::Superseded,
                e => e.into(),
            })
    }
}
