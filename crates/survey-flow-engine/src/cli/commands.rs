//! CLI 命令定义

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 问卷流程引擎命令行工具
///
/// 问卷和作答文件支持 JSON（`.json`）与 YAML（`.yaml`/`.yml`）。
#[derive(Parser, Debug)]
#[command(name = "flow-engine")]
#[command(version, about = "问卷流程解析工具")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 发布前校验
    ///
    /// 输出结构、逻辑、循环、插值四类问题；存在问题时以退出码 2 结束。
    Validate {
        /// 问卷文件
        survey: PathBuf,
    },

    /// 计算流程快照
    Resolve {
        /// 问卷文件
        survey: PathBuf,

        /// 作答文件（questionId -> 答案）
        #[arg(short, long)]
        answers: PathBuf,
    },

    /// 对文本做答案插值
    Pipe {
        /// 问卷文件
        survey: PathBuf,

        /// 作答文件（questionId -> 答案）
        #[arg(short, long)]
        answers: PathBuf,

        /// 含 `{{questionId}}` / `{{Qn}}` 占位符的文本
        #[arg(short, long)]
        text: String,
    },
}
