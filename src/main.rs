use anyhow::bail;
use clap::Parser;
use gofer_lib::config::AppConfig;
use gofer_lib::logging::{get_log_dir, SizeRotatingWriter};
use gofer_lib::{Registry, TaskList};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

const USAGE_EXAMPLE: &str = "Usage Example:
    gofer -f example.yaml
    gofer -r swap file1 file2";

/// 按任务列表（或单个 recipe）执行文件维护操作
#[derive(Parser, Debug)]
#[command(name = "gofer", version, about)]
struct Cli {
    /// 使用默认选项执行一个 recipe
    #[arg(short = 'r', long, conflicts_with = "file")]
    recipe: Option<String>,

    /// YAML 任务文件
    #[arg(short = 'f', long)]
    file: Option<PathBuf>,

    /// 只打印任务列表并检查参数，不执行
    #[arg(long, visible_alias = "dump")]
    dry_run: bool,

    /// 列出所有已注册的 recipe
    #[arg(long)]
    list: bool,

    /// 显示 recipe 的用法（需要 -r）
    #[arg(long, requires = "recipe")]
    usage: bool,

    /// 输出 debug 日志
    #[arg(long)]
    verbose: bool,

    /// 覆盖任务文件里的 names
    names: Vec<String>,
}

/// 初始化日志系统
fn init_logging(verbose: bool) {
    let log_dir = get_log_dir();
    let config = AppConfig::load(&log_dir).log;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        config.tracing_level()
    };
    let env_filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // 文件日志创建失败时只输出到控制台
    let file_layer = config
        .enabled
        .then(|| SizeRotatingWriter::new(&log_dir, config.max_size_mb).ok())
        .flatten()
        .map(|writer| {
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
        });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer);
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let registry = Registry::builtin()?;

    if cli.list {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut tasks = match (&cli.recipe, &cli.file) {
        (Some(recipe), None) => {
            if cli.usage {
                println!("{}", registry.create(recipe)?.help());
                return Ok(());
            }
            TaskList::from_recipe(&registry, recipe)?
        }
        (None, Some(file)) => TaskList::load(file)?,
        _ => bail!("{}", USAGE_EXAMPLE),
    };
    tasks.apply_names(cli.names);

    if cli.dry_run {
        print!("{}", tasks.to_yaml()?);
    }
    tasks.exec_all(&registry, !cli.dry_run)?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
