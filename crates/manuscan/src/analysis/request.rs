use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use secrecy::{ExposeSecret, SecretString};

use super::AnalysisError;

/// Model settings shared by every request of a batch.
#[derive(Debug)]
pub struct ModelParameters {
    pub model: String,
    pub temperature: f32,
    /// Per-run credential; blank or absent falls back to the client's default key.
    pub api_key: Option<SecretString>,
}

impl ModelParameters {
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            temperature,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }
}

impl Clone for ModelParameters {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            temperature: self.temperature,
            api_key: self
                .api_key
                .as_ref()
                .map(|k| SecretString::from(k.expose_secret().to_string())),
        }
    }
}

/// One image plus the instruction to apply to it.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub image_path: &'a Path,
    pub prompt: &'a str,
    pub parameters: &'a ModelParameters,
}

impl<'a> AnalysisRequest<'a> {
    pub fn new(image_path: &'a Path, prompt: &'a str, parameters: &'a ModelParameters) -> Self {
        Self {
            image_path,
            prompt,
            parameters,
        }
    }

    /// Reads the image and returns `(mime type, base64 payload)`.
    pub(crate) fn encode_image(&self) -> Result<(String, String), AnalysisError> {
        let bytes = std::fs::read(self.image_path).map_err(|e| AnalysisError::ReadImage {
            path: self.image_path.to_path_buf(),
            source: e,
        })?;
        let mime = mime_guess::from_path(self.image_path)
            .first()
            .filter(|m| m.type_() == mime_guess::mime::IMAGE)
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "image/jpeg".to_string());
        Ok((mime, STANDARD.encode(bytes)))
    }
}
