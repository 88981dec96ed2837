//! HTTP access to the generation backend.
//!
//! The pipeline only talks to the [`Transport`] trait so it can run against a
//! recorded backend in tests. [`HttpTransport`] is the reqwest implementation
//! used on the web and on desktop.

use crate::{config::PipelineConfig, error::TransportError};

/// One field of a submitted form, in document order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
}

/// The opaque form payload forwarded to the backend as `multipart/form-data`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormPayload {
    fields: Vec<FormField>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, FormValue::Text(value.into()));
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.push(
            name,
            FormValue::File {
                file_name: file_name.into(),
                mime,
                bytes,
            },
        );
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: FormValue) {
        self.fields.push(FormField {
            name: name.into(),
            value,
        });
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_multipart(self) -> Result<reqwest::multipart::Form, TransportError> {
        let mut form = reqwest::multipart::Form::new();
        for field in self.fields {
            form = match field.value {
                FormValue::Text(text) => form.text(field.name, text),
                FormValue::File {
                    file_name,
                    mime,
                    bytes,
                } => {
                    let mut part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
                    if let Some(mime) = mime.filter(|m| !m.is_empty()) {
                        part = part
                            .mime_str(&mime)
                            .map_err(|e| TransportError::Network(e.to_string()))?;
                    }
                    form.part(field.name, part)
                }
            };
        }
        Ok(form)
    }
}

/// Status and body of an answered request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/**
 * How the pipeline reaches the backend.
 *
 * `post_form` reports any answered request, whatever its status; `get_text`
 * treats a non-2xx status as an error.
 */
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn post_form(&self, path: &str, form: FormPayload) -> Result<HttpResponse, TransportError>;

    async fn get_text(&self, url: &str) -> Result<String, TransportError>;
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: reqwest::Url,
}

#[cfg(target_arch = "wasm32")]
fn page_origin() -> Option<String> {
    web_sys::window()?.location().origin().ok()
}

impl HttpTransport {
    /// On the web every path is resolved against the page origin, elsewhere against `base_url`.
    pub fn new(config: &PipelineConfig) -> Result<Self, TransportError> {
        #[cfg(target_arch = "wasm32")]
        let base = match page_origin() {
            Some(origin) => format!("{origin}/"),
            None => config.base_url.clone(),
        };
        #[cfg(not(target_arch = "wasm32"))]
        let base = config.base_url.clone();

        let base = reqwest::Url::parse(&base)
            .map_err(|e| TransportError::Network(format!("invalid base url {base}: {e}")))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base,
        })
    }

    pub fn base(&self) -> &reqwest::Url {
        &self.base
    }

    pub fn resolve(&self, path: &str) -> Result<reqwest::Url, TransportError> {
        self.base
            .join(path)
            .map_err(|e| TransportError::Network(format!("invalid url {path}: {e}")))
    }
}

impl Transport for HttpTransport {
    async fn post_form(&self, path: &str, form: FormPayload) -> Result<HttpResponse, TransportError> {
        let url = self.resolve(path)?;
        log::info!("POST {url} with {} field(s)", form.fields().len());
        let response = self
            .client
            .post(url)
            .multipart(form.into_multipart()?)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }

    async fn get_text(&self, url: &str) -> Result<String, TransportError> {
        let url = self.resolve(url)?;
        log::info!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))
    }
}
