//! 命令执行器
//!
//! 把命令行参数转成文档加载和引擎调用，结果以 JSON 写入给定输出。

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::document::{load_answers, Survey};
use crate::piping::{PipingContext, PipingOptions, PipingResolver};
use crate::snapshot::FlowSnapshot;
use crate::validation::validate_survey;

/// 命令执行器
pub struct CommandRunner {
    piping: PipingOptions,
}

#[derive(Serialize)]
struct PipeOutput<'a> {
    text: &'a str,
    piped: String,
}

impl CommandRunner {
    pub fn new(piping: PipingOptions) -> Self {
        Self { piping }
    }

    /// 执行 validate 命令，返回问卷是否可发布
    pub fn run_validate(&self, survey_path: &Path, out: &mut impl Write) -> Result<bool> {
        let survey = load_survey(survey_path)?;
        let report = validate_survey(&survey.questions);

        write_json(out, &report)?;
        info!(
            survey = survey.id.as_deref().unwrap_or("-"),
            errors = report.error_count(),
            "校验完成"
        );
        Ok(report.is_publishable())
    }

    /// 执行 resolve 命令
    pub fn run_resolve(&self, survey_path: &Path, answers_path: &Path, out: &mut impl Write) -> Result<()> {
        let survey = load_survey(survey_path)?;
        let answers = load_answers(answers_path)
            .with_context(|| format!("无法加载作答文件 {}", answers_path.display()))?;

        let snapshot = FlowSnapshot::resolve(&survey.questions, &answers, &self.piping);
        write_json(out, &snapshot)
    }

    /// 执行 pipe 命令
    pub fn run_pipe(
        &self,
        survey_path: &Path,
        answers_path: &Path,
        text: &str,
        out: &mut impl Write,
    ) -> Result<()> {
        let survey = load_survey(survey_path)?;
        let answers = load_answers(answers_path)
            .with_context(|| format!("无法加载作答文件 {}", answers_path.display()))?;

        let context = PipingContext::for_questions(&survey.questions, &answers);
        let piped = PipingResolver::with_options(self.piping.clone()).apply(text, &context);
        write_json(out, &PipeOutput { text, piped })
    }
}

fn load_survey(path: &Path) -> Result<Survey> {
    Survey::from_path(path).with_context(|| format!("无法加载问卷文件 {}", path.display()))
}

fn write_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("输出序列化失败")?;
    writeln!(out)?;
    Ok(())
}
