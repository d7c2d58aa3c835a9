//! 问卷与作答文档加载
//!
//! 按扩展名识别格式：`.json` 走 JSON，`.yaml`/`.yml` 走 YAML。

use crate::error::{FlowError, Result};
use crate::models::{Question, ResponseValues};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// 问卷文档
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Survey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Survey {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let survey: Self = load_document(path)?;
        debug!(
            path = %path.display(),
            questions = survey.questions.len(),
            "问卷已加载"
        );
        Ok(survey)
    }
}

/// 加载作答快照（questionId -> 答案的对象）
pub fn load_answers(path: &Path) -> Result<ResponseValues> {
    load_document(path)
}

/// 文档格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            _ => Err(FlowError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = DocumentFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| FlowError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match format {
        DocumentFormat::Json => Ok(serde_json::from_str(&content)?),
        DocumentFormat::Yaml => Ok(serde_yaml::from_str(&content)?),
    }
}
