// src/config.rs

use serde::Deserialize;
use std::{env, fs, path::Path};

/// Default config location, relative to the working directory.
pub const DEFAULT_PATH: &str = ".config/invoice_capture.toml";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub sheets: SheetsConfig,
    pub ocr: OcrConfig,
}

/// Destination and credential for the ledger append endpoint.
#[derive(Debug, Deserialize)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    /// May be left empty in the file; `SHEETS_API_KEY` is used instead so
    /// the key never has to live in a committed config.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_sheets_base_url")]
    pub base_url: String,
    #[serde(default = "default_range")]
    pub range: String,
}

#[derive(Debug, Deserialize)]
pub struct OcrConfig {
    pub endpoint: String,
    /// Empty means: read `OCR_API_KEY` from the environment.
    #[serde(default)]
    pub api_key: String,
    /// Language hint passed through to the OCR service.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_range() -> String {
    "A1".to_string()
}

fn default_language() -> String {
    "spa".to_string()
}

impl SheetsConfig {
    pub fn resolved_api_key(&self) -> String {
        if self.api_key.is_empty() {
            env::var("SHEETS_API_KEY").unwrap_or_default()
        } else {
            self.api_key.clone()
        }
    }
}

impl OcrConfig {
    pub fn resolved_api_key(&self) -> String {
        if self.api_key.is_empty() {
            env::var("OCR_API_KEY").unwrap_or_default()
        } else {
            self.api_key.clone()
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}
