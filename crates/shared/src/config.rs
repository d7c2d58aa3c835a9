//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::observability::ObservabilityConfig;

/// 答案插值（piping）配置
///
/// 控制 `{{questionId}}` 占位符被替换时的文本格式。
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipingConfig {
    /// 未作答、空字符串或空数组时显示的文本
    pub empty_answer_text: String,
    /// 多选答案的连接符
    pub list_separator: String,
    /// 布尔答案 true 的显示文本
    pub true_text: String,
    /// 布尔答案 false 的显示文本
    pub false_text: String,
}

impl Default for PipingConfig {
    fn default() -> Self {
        Self {
            empty_answer_text: "[no answer]".to_string(),
            list_separator: ", ".to_string(),
            true_text: "Yes".to_string(),
            false_text: "No".to_string(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub observability: ObservabilityConfig,
    pub piping: PipingConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（SURVEY_ 前缀，层级用双下划线，如 SURVEY_PIPING__LIST_SEPARATOR -> piping.list_separator）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        // .env 文件不存在时忽略
        dotenvy::dotenv().ok();

        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
        Self::load_from_dir(service_name, Path::new(&config_dir))
    }

    /// 从指定目录加载配置
    pub fn load_from_dir(service_name: &str, config_dir: &Path) -> Result<Self, ConfigError> {
        let env = std::env::var("SURVEY_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            .add_source(
                Environment::with_prefix("SURVEY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        // 观测配置沿用服务名，便于日志区分来源
        if config.observability.service_name.is_empty() {
            config.observability.service_name = config.service_name.clone();
        }

        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
