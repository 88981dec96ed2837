//! Desktop front end.
//!
//! ```text
//! meshgen-viewer prompt="a wooden chair" image=@chair.png
//! ```
//!
//! Every argument is a form field; `@` reads a file. With at least one field
//! the form is submitted once at start-up. The backend is configured through
//! `MESHGEN_BASE_URL`, `MESHGEN_ENDPOINT` and `MESHGEN_TIMEOUT_SECS`.

#![cfg_attr(target_arch = "wasm32", allow(unused))]

use anyhow::{Context as _, bail};
use meshgen_viewer::{
    config::{PipelineConfig, ViewerConfig},
    flow,
    generate::GenerationPipeline,
    http::{FormPayload, HttpTransport},
    ui::LogUi,
};

#[cfg(not(target_arch = "wasm32"))]
fn parse_form(args: impl IntoIterator<Item = String>) -> anyhow::Result<FormPayload> {
    let mut form = FormPayload::new();
    for arg in args {
        let Some((name, value)) = arg.split_once('=') else {
            bail!("Expected name=value or name=@file, got {arg:?}");
        };
        form = match value.strip_prefix('@') {
            Some(path) => {
                let bytes = std::fs::read(path).with_context(|| format!("Cannot read {path}"))?;
                let file_name = std::path::Path::new(path)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.to_string());
                form.file(name, file_name, None, bytes)
            }
            None => form.text(name, value),
        };
    }
    Ok(form)
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    let form = parse_form(std::env::args().skip(1))?;
    let pipeline_config = PipelineConfig::from_env();
    let transport = HttpTransport::new(&pipeline_config)?;

    flow::run(ViewerConfig::default(), move |viewer| {
        if form.is_empty() {
            return;
        }
        let target = viewer.clone();
        viewer.spawn(move || async move {
            let pipeline = GenerationPipeline::new(transport, LogUi, target, pipeline_config);
            if let Err(e) = pipeline.on_submit(form).await {
                log::debug!("Submission ended with {e}");
            }
        });
    })
}

// The web build starts through `web::mount`
#[cfg(target_arch = "wasm32")]
fn main() {}
