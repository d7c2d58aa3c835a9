//! flow-engine 命令行入口

use std::io;
use std::process::ExitCode;

use clap::Parser;
use flow_engine::cli::{Cli, CommandRunner, Commands};
use flow_engine::PipingOptions;
use survey_shared::config::AppConfig;
use survey_shared::observability;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // 配置缺失或格式错误时退回默认配置，命令本身仍可运行
    let config = AppConfig::load("flow-engine").unwrap_or_else(|e| {
        eprintln!("配置加载失败，使用默认配置: {}", e);
        AppConfig::default()
    });

    let mut obs_config = config.observability.clone();
    if let Some(level) = cli.log_level {
        obs_config = obs_config.with_log_level(level);
    }
    observability::init(&obs_config)?;

    let runner = CommandRunner::new(PipingOptions::from(&config.piping));
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Validate { survey } => {
            if !runner.run_validate(&survey, &mut stdout)? {
                return Ok(ExitCode::from(2));
            }
        }
        Commands::Resolve { survey, answers } => {
            runner.run_resolve(&survey, &answers, &mut stdout)?;
        }
        Commands::Pipe {
            survey,
            answers,
            text,
        } => {
            runner.run_pipe(&survey, &answers, &text, &mut stdout)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
