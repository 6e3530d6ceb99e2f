//! HTTP client for the enhance and mesh services

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use sketchmesh_config::ServiceConfig;
use tracing::{debug, warn};

use crate::handle::{ImageHandle, MeshHandle};
use crate::{EnhanceRequest, GenerationBackend, GenerationError};

const PNG_MIME: &str = "image/png";

/// Multipart/form-data client for the two generation services
///
/// Enhance request fields: `prompt`, `sketch` (sketch.png) and, when
/// present, `negative_prompt`. Mesh request field: `image` (image.png).
/// Both services answer with the raw asset bytes.
pub struct RemoteServices {
    client: Client,
    enhance_url: String,
    mesh_url: String,
}

impl RemoteServices {
    pub fn new(
        enhance_url: impl Into<String>,
        mesh_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            enhance_url: enhance_url.into(),
            mesh_url: mesh_url.into(),
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, GenerationError> {
        Self::new(
            config.enhance_url.clone(),
            config.mesh_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn enhance_url(&self) -> &str {
        &self.enhance_url
    }

    pub fn mesh_url(&self) -> &str {
        &self.mesh_url
    }

    async fn post(&self, url: &str, form: Form) -> Result<Vec<u8>, GenerationError> {
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        read_body(response).await
    }
}

fn png_part(bytes: &[u8], file_name: &'static str) -> Result<Part, GenerationError> {
    Part::bytes(bytes.to_vec())
        .file_name(file_name)
        .mime_str(PNG_MIME)
        .map_err(|e| GenerationError::Validation(e.to_string()))
}

async fn read_body(response: Response) -> Result<Vec<u8>, GenerationError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        let message = match message.trim() {
            "" => status.canonical_reason().unwrap_or("request failed").to_string(),
            text => text.to_string(),
        };
        warn!("Service answered {}: {}", status, message);
        return Err(GenerationError::Remote {
            status: status.as_u16(),
            message,
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| GenerationError::Transport(e.to_string()))?;
    if bytes.is_empty() {
        return Err(GenerationError::Remote {
            status: status.as_u16(),
            message: "empty response body".to_string(),
        });
    }
    Ok(bytes.to_vec())
}

impl GenerationBackend for RemoteServices {
    async fn enhance(&self, request: EnhanceRequest) -> Result<ImageHandle, GenerationError> {
        let mut form = Form::new()
            .text("prompt", request.prompt)
            .part("sketch", png_part(request.sketch.bytes(), "sketch.png")?);
        if let Some(negative) = request.negative_prompt {
            form = form.text("negative_prompt", negative);
        }

        let bytes = self.post(&self.enhance_url, form).await?;
        Ok(ImageHandle::from(bytes))
    }

    async fn meshify(&self, image: ImageHandle) -> Result<MeshHandle, GenerationError> {
        let form = Form::new().part("image", png_part(image.bytes(), "image.png")?);
        let bytes = self.post(&self.mesh_url, form).await?;
        Ok(MeshHandle::from(bytes))
    }
}
