//! JSON document store backed by files or stdin/stdout.

use std::io::{self, Read};
use std::path::PathBuf;

use booking_engine::document::{ScheduleDocument, ScheduleStore};
use booking_engine::error::Result;
use booking_engine::EngineError;

/// Reads the schedule from `input` (stdin when absent) and writes it to
/// `output` (stdout when absent).
#[derive(Debug, Clone, Default)]
pub struct JsonFileStore {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
}

impl JsonFileStore {
    pub fn new(input: Option<PathBuf>, output: Option<PathBuf>) -> Self {
        Self { input, output }
    }
}

impl ScheduleStore for JsonFileStore {
    fn load_schedule(&self) -> Result<ScheduleDocument> {
        let content = match &self.input {
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                EngineError::Store(format!("Failed to read file {}: {}", path.display(), e))
            })?,
            None => {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .map_err(|e| EngineError::Store(format!("Failed to read from stdin: {}", e)))?;
                buf
            }
        };
        ScheduleDocument::from_json(&content)
    }

    fn save_schedule(&self, document: &ScheduleDocument) -> Result<()> {
        let json = document.to_json_pretty()?;
        match &self.output {
            Some(path) => std::fs::write(path, json).map_err(|e| {
                EngineError::Store(format!("Failed to write file {}: {}", path.display(), e))
            }),
            None => {
                println!("{}", json);
                Ok(())
            }
        }
    }
}
