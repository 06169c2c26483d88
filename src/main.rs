//! rsamalgam 命令行入口
#![allow(clippy::print_stderr, clippy::print_stdout)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rsamalgam::{
    BundleConfig, BundleConfigBuilder, Bundler, ConfigManager, StructuralValidator, discover_sources,
};

#[derive(Debug, Parser)]
#[command(name = "rsamalgam")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "合并 C/C++ 源码树为单头文件产物，并校验特性条件块")]
struct Cli {
    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// 通用配置参数
#[derive(Debug, Args)]
struct ConfigArgs {
    /// JSON 配置文件
    #[arg(long)]
    config: Option<PathBuf>,
    /// 项目根目录
    #[arg(long)]
    project_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// 生成合并产物
    Bundle {
        #[command(flatten)]
        config: ConfigArgs,
        /// 源码目录（缺省 <project>/src）
        #[arg(long)]
        source_dir: Option<PathBuf>,
        /// 头文件目录（缺省 <project>/include）
        #[arg(long)]
        include_dir: Option<PathBuf>,
        /// 输出目录（缺省 <project>/singleheader）
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// 启用的特性（名称或别名，可重复或逗号分隔），不指定则全部启用
        #[arg(long = "with", value_name = "FEATURE", value_delimiter = ',')]
        with: Vec<String>,
        /// 在产物中保留源码位置注释
        #[arg(long)]
        debug_sources: bool,
    },
    /// 校验特性条件块的结构
    Check {
        #[command(flatten)]
        config: ConfigArgs,
        /// 仅扫描 src/ 与 include/
        #[arg(long)]
        limit: bool,
        /// 以 JSON 输出校验结果
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Bundle {
            config,
            source_dir,
            include_dir,
            output_dir,
            with,
            debug_sources,
        } => {
            let mut builder = BundleConfigBuilder::from_config(load_config(&config)?);
            if let Some(dir) = source_dir {
                builder = builder.source_dir(dir);
            }
            if let Some(dir) = include_dir {
                builder = builder.include_dir(dir);
            }
            if let Some(dir) = output_dir {
                builder = builder.output_dir(dir);
            }
            if !with.is_empty() {
                builder = builder.enabled_features(with);
            }
            if debug_sources {
                builder = builder.debug_sources(true);
            }
            run_bundle(builder.build())
        }
        Commands::Check { config, limit, json } => run_check(load_config(&config)?, limit, json),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// 配置文件 < 环境变量 < 命令行参数
fn load_config(args: &ConfigArgs) -> Result<BundleConfig> {
    let mut config = match &args.config {
        Some(path) => ConfigManager::load_json(path)
            .with_context(|| format!("加载配置文件 {} 失败", path.display()))?,
        None => ConfigManager::get_default(),
    };
    if let Some(dir) = &args.project_dir {
        config.project_dir = dir.clone();
    }
    config.apply_env_overrides();
    Ok(config)
}

fn run_bundle(config: BundleConfig) -> Result<ExitCode> {
    let bundler = Bundler::new(config).context("配置校验失败")?;
    let enabled: Vec<&str> = bundler.enabled_features().map(|f| f.as_str()).collect();
    println!("启用特性: {}", enabled.join(", "));

    let files = bundler.run().context("合并失败")?;
    println!("已生成 {}", files.header.display());
    println!("已生成 {}", files.implementation.display());
    Ok(ExitCode::SUCCESS)
}

fn run_check(config: BundleConfig, limit: bool, json: bool) -> Result<ExitCode> {
    let root: &Path = &config.project_dir;
    let files = discover_sources(root, limit, &config.source_extensions);
    if files.is_empty() {
        eprintln!("未在 {} 下找到任何源文件", root.display());
        return Ok(ExitCode::FAILURE);
    }

    let validator = StructuralValidator::new(&config)?;
    let report = validator.check_files(&files, root);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.is_success() {
        println!("共扫描 {} 个文件", report.files_scanned);
        for (directive, count) in report.stats.entries() {
            println!("  {:<8} {}", directive, count);
        }
        println!("所有特性条件块均已正确配对并带有匹配的注释");
    } else {
        for diagnostic in &report.diagnostics {
            eprintln!("ERROR: {}", diagnostic);
        }
        eprintln!("发现 {} 个错误", report.diagnostics.len());
    }

    Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
