//! Browser binding: mounts the viewer into the page and wires the form to the
//! generation pipeline.
//!
//! ```js
//! import init, { mount } from "./pkg/meshgen_viewer.js";
//! await init();
//! const viewer = mount();
//! // later: viewer.dispose();
//! ```

use std::rc::Rc;

use wasm_bindgen::{JsCast, prelude::*};
use web_sys::{Document, Element, HtmlAnchorElement, HtmlButtonElement, HtmlCanvasElement, HtmlFormElement};

use crate::{
    config::{DomConfig, PipelineConfig, ViewerConfig},
    error::GenerateError,
    flow::{self, ViewerProxy},
    generate::GenerationPipeline,
    http::{FormPayload, FormValue, HttpTransport},
    ui::FormUi,
};

type WebPipeline = GenerationPipeline<HttpTransport, DomUi, ViewerProxy>;

fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("No document available"))
}

/// The status line, result area and submit button of the page.
pub struct DomUi {
    status: Option<Element>,
    result: Option<Element>,
    mesh_link: Option<HtmlAnchorElement>,
    submit: Option<HtmlButtonElement>,
    hidden_class: String,
}

impl DomUi {
    pub fn new(document: &Document, form: &HtmlFormElement, config: &DomConfig) -> Self {
        let lookup = |id: &str| {
            let element = document.get_element_by_id(id);
            if element.is_none() {
                log::warn!("No element with id {id:?}");
            }
            element
        };
        let submit = form
            .query_selector("button[type=\"submit\"]")
            .ok()
            .flatten()
            .and_then(|button| button.dyn_into::<HtmlButtonElement>().ok());
        Self {
            status: lookup(&config.status_id),
            result: lookup(&config.result_id),
            mesh_link: lookup(&config.mesh_link_id).and_then(|link| link.dyn_into().ok()),
            submit,
            hidden_class: config.hidden_class.clone(),
        }
    }
}

impl FormUi for DomUi {
    fn set_status(&self, status: &str) {
        if let Some(element) = &self.status {
            element.set_text_content(Some(status));
        }
    }

    fn set_submit_enabled(&self, enabled: bool) {
        if let Some(button) = &self.submit {
            button.set_disabled(!enabled);
        }
    }

    fn show_result(&self, mesh_url: &str) {
        if let Some(link) = &self.mesh_link {
            link.set_href(mesh_url);
        }
        if let Some(result) = &self.result {
            if let Err(e) = result.class_list().remove_1(&self.hidden_class) {
                log::warn!("Cannot reveal the result area: {e:?}");
            }
        }
    }
}

/// Replaces the content of `container_id` with a canvas filling it.
pub(crate) fn create_canvas(container_id: &str) -> Option<HtmlCanvasElement> {
    let document = document().ok()?;
    let Some(container) = document.get_element_by_id(container_id) else {
        log::warn!("No viewer container with id {container_id:?}");
        return None;
    };
    let canvas = document
        .create_element("canvas")
        .ok()?
        .dyn_into::<HtmlCanvasElement>()
        .ok()?;
    let style = canvas.style();
    for (property, value) in [("width", "100%"), ("height", "100%"), ("display", "block")] {
        if let Err(e) = style.set_property(property, value) {
            log::warn!("Cannot style the canvas: {e:?}");
        }
    }
    container.set_inner_html("");
    container.append_child(&canvas).ok()?;
    Some(canvas)
}

/// Reads every field of `form`, including the bytes of selected files.
async fn read_form(form: &HtmlFormElement) -> Result<FormPayload, JsValue> {
    let form_data = web_sys::FormData::new_with_form(form)?;
    let entries = js_sys::try_iter(form_data.as_ref())?
        .ok_or_else(|| JsValue::from_str("FormData is not iterable"))?;

    let mut payload = FormPayload::new();
    for entry in entries {
        let entry: js_sys::Array = entry?.dyn_into()?;
        let name = entry.get(0).as_string().unwrap_or_default();
        let value = entry.get(1);
        match value.dyn_into::<web_sys::File>() {
            Ok(file) => {
                let buffer = wasm_bindgen_futures::JsFuture::from(file.array_buffer()).await?;
                let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
                let mime = Some(file.type_()).filter(|mime| !mime.is_empty());
                payload.push(
                    name,
                    FormValue::File {
                        file_name: file.name(),
                        mime,
                        bytes,
                    },
                );
            }
            Err(value) => payload.push(name, FormValue::Text(value.as_string().unwrap_or_default())),
        }
    }
    Ok(payload)
}

/// The mounted viewer as seen from JavaScript.
#[wasm_bindgen]
pub struct ViewerHandle {
    proxy: Option<ViewerProxy>,
    pipeline: Rc<std::cell::OnceCell<WebPipeline>>,
    form: Option<HtmlFormElement>,
    listener: Option<Closure<dyn FnMut(web_sys::Event)>>,
    container_id: String,
}

#[wasm_bindgen]
impl ViewerHandle {
    /// Aborts the running submission, if any.
    pub fn cancel(&self) -> bool {
        self.pipeline.get().is_some_and(|pipeline| pipeline.cancel())
    }

    /// Stops the render loop, releases the GPU resources and unbinds the form.
    pub fn dispose(&mut self) {
        if let Some(pipeline) = self.pipeline.get() {
            pipeline.cancel();
        }
        if let (Some(form), Some(listener)) = (&self.form, self.listener.take()) {
            if let Err(e) =
                form.remove_event_listener_with_callback("submit", listener.as_ref().unchecked_ref())
            {
                log::warn!("Cannot unbind the form: {e:?}");
            }
        }
        if let Some(proxy) = self.proxy.take() {
            proxy.dispose();
        }
        if let Ok(Some(container)) = document().map(|d| d.get_element_by_id(&self.container_id)) {
            container.set_inner_html("");
        }
    }
}

/**
 * Mounts the viewer into the page's `#viewer` element and binds `#gen-form`.
 */
#[wasm_bindgen]
pub fn mount() -> Result<ViewerHandle, JsValue> {
    mount_with(ViewerConfig::default(), PipelineConfig::default(), DomConfig::default())
}

pub fn mount_with(
    viewer_config: ViewerConfig,
    pipeline_config: PipelineConfig,
    dom: DomConfig,
) -> Result<ViewerHandle, JsValue> {
    let document = document()?;
    let form = document
        .get_element_by_id(&dom.form_id)
        .and_then(|form| form.dyn_into::<HtmlFormElement>().ok());

    let pipeline: Rc<std::cell::OnceCell<WebPipeline>> = Rc::new(std::cell::OnceCell::new());
    let mut proxy = None;
    flow::run(viewer_config, Some(dom.viewer_id.clone()), |viewer| proxy = Some(viewer))
        .map_err(|e| JsValue::from_str(&format!("{e:#}")))?;

    let listener = match (&form, &proxy) {
        (Some(form), Some(viewer)) => {
            let transport = HttpTransport::new(&pipeline_config)
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            let ui = DomUi::new(&document, form, &dom);
            if pipeline
                .set(GenerationPipeline::new(transport, ui, viewer.clone(), pipeline_config))
                .is_err()
            {
                return Err(JsValue::from_str("Viewer mounted twice"));
            }

            let submitted_form = form.clone();
            let pipeline = pipeline.clone();
            let listener = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
                event.prevent_default();
                let form = submitted_form.clone();
                let pipeline = pipeline.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    let Some(pipeline) = pipeline.get() else {
                        return;
                    };
                    let payload = async {
                        read_form(&form)
                            .await
                            .map_err(|e| GenerateError::Form(format!("{e:?}")))
                    };
                    if let Err(e) = pipeline.submit_with(payload).await {
                        log::debug!("Submission ended with {e}");
                    }
                });
            });
            form.add_event_listener_with_callback("submit", listener.as_ref().unchecked_ref())?;
            Some(listener)
        }
        _ => {
            log::warn!("No form with id {:?}, generation is disabled", dom.form_id);
            None
        }
    };

    Ok(ViewerHandle {
        proxy,
        pipeline,
        form,
        listener,
        container_id: dom.viewer_id,
    })
}
