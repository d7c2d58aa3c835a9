//! CLI 模块
//!
//! - `validate` - 发布前校验问卷，输出 JSON 报告
//! - `resolve` - 根据作答快照计算流程快照
//! - `pipe` - 对任意文本做答案插值
//!
//! # 使用示例
//!
//! ```bash
//! flow-engine validate survey.yaml
//! flow-engine resolve survey.json --answers answers.json
//! flow-engine pipe survey.json --answers answers.json --text "Hi {{Q1}}"
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::CommandRunner;
