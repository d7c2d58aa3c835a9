//! 问卷引擎错误类型
//!
//! 只有文档加载会失败；求值、解析和校验都不返回错误。

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("读取文件失败 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON 解析失败: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML 解析失败: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("不支持的文件格式: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;
