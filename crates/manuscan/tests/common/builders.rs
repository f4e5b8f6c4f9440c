//! Builders and doubles for pipeline tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use manuscan::analysis::{AnalysisClient, AnalysisError, AnalysisRequest};
use manuscan::config::Config;
use manuscan::normalize::{ExtractionStrategy, ResponseSchema};
use manuscan::pipeline::PipelineConfig;
use zip::write::SimpleFileOptions;

/// What [`ScriptedClient`] does for one file name.
#[derive(Debug, Clone)]
pub enum Script {
    Reply(String),
    Fail { status: u16 },
}

/// Answers by image file name. Unscripted images get the default reply.
pub struct ScriptedClient {
    scripts: HashMap<String, Script>,
    default_reply: String,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            default_reply: well_formed_reply(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, file_name: &str, body: &str) -> Self {
        self.scripts
            .insert(file_name.to_string(), Script::Reply(body.to_string()));
        self
    }

    pub fn fail(mut self, file_name: &str, status: u16) -> Self {
        self.scripts
            .insert(file_name.to_string(), Script::Fail { status });
        self
    }

    pub fn default_reply(mut self, body: &str) -> Self {
        self.default_reply = body.to_string();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// File names in call order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl AnalysisClient for ScriptedClient {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<String, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = request
            .image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.seen.lock().unwrap().push(name.clone());

        match self.scripts.get(&name) {
            Some(Script::Reply(body)) => Ok(body.clone()),
            Some(Script::Fail { status }) => Err(AnalysisError::Status {
                status: *status,
                body: "scripted failure".to_string(),
            }),
            None => Ok(self.default_reply.clone()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A fenced reply covering the default manuscript fields.
pub fn well_formed_reply() -> String {
    "```json\n{\n  \"Chinese character present\": false,\n  \"Chinese page number\": false,\n  \
     \"Arabic numeral present\": true,\n  \"Arabic numeral int\": 12,\n  \
     \"Illustration present\": true,\n  \"Illustration position\": \"left\",\n  \
     \"Illustration caption\": false,\n  \"Tibetian page number\": true,\n  \
     \"Frame present\": \"Red\"\n}\n```"
        .to_string()
}

/// Builder for [`PipelineConfig`] starting from the shipped defaults.
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::from_config(&Config::default(), None)
                .expect("default config resolves"),
        }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn extraction(mut self, extraction: ExtractionStrategy) -> Self {
        self.config.extraction = extraction;
        self
    }

    pub fn schema(mut self, schema: ResponseSchema) -> Self {
        self.config.schema = schema;
        self
    }

    pub fn require_all_fields(mut self) -> Self {
        self.config.schema = self.config.schema.require_all_fields(true);
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, image::ImageFormat::Jpeg)
}

pub fn tiff_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, image::ImageFormat::Tiff)
}

fn encode(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image::RgbImage::from_pixel(width, height, image::Rgb([200, 180, 150]))
        .write_to(&mut buf, format)
        .expect("encode test image");
    buf.into_inner()
}

/// Zip archive with the given members, in order.
pub fn zip_bytes(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(name.to_string(), SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(data).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}
