//! The form side of the page as seen by the generation pipeline.

/// Everything the pipeline changes outside the 3D view.
pub trait FormUi {
    /// Overwrites the single status line.
    fn set_status(&self, status: &str);

    fn set_submit_enabled(&self, enabled: bool);

    /// Points the result link at `mesh_url` and reveals the result area.
    fn show_result(&self, mesh_url: &str);
}

/// Writes the form state to the log. Used by the desktop build, which has no form.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogUi;

impl FormUi for LogUi {
    fn set_status(&self, status: &str) {
        log::info!("Status: {status}");
    }

    fn set_submit_enabled(&self, enabled: bool) {
        log::debug!("Submit enabled: {enabled}");
    }

    fn show_result(&self, mesh_url: &str) {
        log::info!("Mesh available at {mesh_url}");
    }
}
