//! # 自定义壁纸工具：命令行入口
//!
//! 本文件仅负责参数解析、日志初始化与服务装配。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use wallpaper_vault::config::{AppConfig, resolve_data_dir};
use wallpaper_vault::processing::{ImageSource, OutputFormat, ProcessingProgress};
use wallpaper_vault::{AppError, WallpaperService};

#[derive(Parser, Debug)]
#[command(name = "wallpaper-vault")]
#[command(about = "Import, store and manage custom wallpapers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (defaults to <data-dir>/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import an image from a URL or a local file
    Import {
        /// http(s) URL or file path
        source: String,

        /// Declared MIME type for local files (sniffed when omitted)
        #[arg(long = "type")]
        mime_type: Option<String>,
    },

    /// List custom wallpapers
    #[command(alias = "ls")]
    List,

    /// Show one wallpaper's metadata as JSON
    Show { id: String },

    /// Write a wallpaper's full-size image to a file
    Export { id: String, path: PathBuf },

    /// Remove a wallpaper
    #[command(alias = "rm")]
    Remove { id: String },

    /// Remove every custom wallpaper
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("错误: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let data_dir = resolve_data_dir(cli.data_dir.as_deref())?;
    let config = AppConfig::load(&data_dir, cli.config.as_deref())?;
    log::info!("数据目录: {}", data_dir.display());

    let service = WallpaperService::open(&config, &data_dir)?;
    service.initialize().await;

    match cli.command {
        Commands::Import { source, mime_type } => {
            let source = ImageSource::from_cli_arg(&source, mime_type);
            let report = |p: ProcessingProgress| {
                eprintln!("[{:>3}%] {:<20} {}", p.progress, p.status.as_str(), p.message);
            };
            let imported = service.import(source, &report).await?;
            println!(
                "{}  {}  {}x{}  {}",
                imported.metadata.id,
                imported.metadata.name,
                imported.metadata.width,
                imported.metadata.height,
                imported.url
            );
        }
        Commands::List => {
            let wallpapers = service.list();
            if wallpapers.is_empty() {
                println!("（暂无自定义壁纸）");
            }
            for item in wallpapers {
                let created = item
                    .created_at_utc()
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{:<32} {:<28} {:>5}x{:<5} {:>8}KB  {}",
                    item.id,
                    item.name,
                    item.width,
                    item.height,
                    item.size_bytes / 1024,
                    created
                );
            }
        }
        Commands::Show { id } => {
            let item = service.get(&id)?;
            let json = serde_json::to_string_pretty(&item)
                .map_err(|e| AppError::Config(format!("序列化元数据失败: {}", e)))?;
            println!("{json}");
        }
        Commands::Export { id, path } => {
            let blob = service.blob(&id).await?;
            let target = with_default_extension(&path, &blob.content_type);
            tokio::fs::write(&target, &blob.bytes).await?;
            println!("{}", target.display());
        }
        Commands::Remove { id } => {
            service.remove(&id).await?;
            println!("已删除 {id}");
        }
        Commands::Clear => {
            let removed = service.clear().await;
            println!("已删除 {removed} 张自定义壁纸");
        }
    }

    Ok(())
}

/// 目标路径没有扩展名时，按内容类型补上。
fn with_default_extension(path: &Path, content_type: &str) -> PathBuf {
    match (path.extension(), OutputFormat::from_mime_type(content_type)) {
        (None, Some(format)) => path.with_extension(format.extension()),
        _ => path.to_path_buf(),
    }
}
