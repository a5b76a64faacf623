//! 应用配置模块
//!
//! # 设计思路
//!
//! 所有阈值集中在一份可选的 JSON 配置里，任何字段缺省都回落到默认值。
//! 配置文件损坏时不阻断启动：记录警告并使用默认配置。
//!
//! # 实现思路
//!
//! - 数据目录默认取平台数据目录（`directories::ProjectDirs`），可由命令行覆盖。
//! - 配置文件默认位于数据目录下的 `config.json`。
//! - `processing` 段直接复用 `ProcessingConfig`，`storage` 段描述文件名与数量上限。

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::processing::ProcessingConfig;

/// 配置文件默认文件名。
pub const CONFIG_FILE_NAME: &str = "config.json";

/// 存储相关配置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 元数据 JSON 文件名（相对数据目录）
    pub metadata_file: String,
    /// blob 数据库文件名（相对数据目录）
    pub blob_database: String,
    /// 建议的自定义壁纸数量上限
    pub max_wallpapers: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            metadata_file: "wallpapers.json".to_string(),
            blob_database: "wallpapers.db".to_string(),
            max_wallpapers: 20,
        }
    }
}

impl StorageConfig {
    pub fn metadata_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.metadata_file)
    }

    pub fn blob_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.blob_database)
    }
}

/// 应用配置。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub processing: ProcessingConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// 读取配置。
    ///
    /// 显式指定的配置文件必须存在；默认位置的配置文件缺失时使用默认值。
    pub fn load(data_dir: &Path, explicit: Option<&Path>) -> Result<Self, AppError> {
        let config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "配置文件不存在: {}",
                        path.display()
                    )));
                }
                load_config_from_path(path)
            }
            None => load_config_from_path(&data_dir.join(CONFIG_FILE_NAME)),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.processing
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        if self.storage.max_wallpapers == 0 {
            return Err(AppError::Config("max_wallpapers 必须大于 0".to_string()));
        }
        if self.storage.metadata_file.trim().is_empty() || self.storage.blob_database.trim().is_empty() {
            return Err(AppError::Config("存储文件名不能为空".to_string()));
        }
        Ok(())
    }
}

fn load_config_from_path(config_path: &Path) -> AppConfig {
    if !config_path.exists() {
        return AppConfig::default();
    }

    match fs::read_to_string(config_path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(config) => {
                log::info!("⚙️ 已加载配置文件: {}", config_path.display());
                config
            }
            Err(err) => {
                log::warn!("⚠️ 配置文件解析失败，使用默认配置: {} ({})", config_path.display(), err);
                AppConfig::default()
            }
        },
        Err(err) => {
            log::warn!("⚠️ 读取配置文件失败，使用默认配置: {} ({})", config_path.display(), err);
            AppConfig::default()
        }
    }
}

/// 平台默认数据目录。
pub fn default_data_dir() -> Result<PathBuf, AppError> {
    ProjectDirs::from("com", "wallpaper-vault", "wallpaper-vault")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| AppError::Config("无法确定应用数据目录".to_string()))
}

/// 解析数据目录（命令行覆盖优先）并确保其存在。
pub fn resolve_data_dir(override_dir: Option<&Path>) -> Result<PathBuf, AppError> {
    let dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => default_data_dir()?,
    };

    fs::create_dir_all(&dir).map_err(|e| {
        AppError::Config(format!("创建数据目录 '{}' 失败: {}", dir.display(), e))
    })?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_default_config_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig::load(dir.path(), None).expect("load");
        assert_eq!(config.storage, StorageConfig::default());
        assert_eq!(config.processing.target_width, 1920);
    }

    #[test]
    fn partial_config_merges_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "storage": { "max_wallpapers": 5 }, "processing": { "min_width": 1024 } }"#,
        )
        .expect("write config");

        let config = AppConfig::load(dir.path(), None).expect("load");
        assert_eq!(config.storage.max_wallpapers, 5);
        assert_eq!(config.storage.metadata_file, "wallpapers.json");
        assert_eq!(config.processing.min_width, 1024);
        assert_eq!(config.processing.fallback_quality, 78);
    }

    #[test]
    fn corrupt_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").expect("write config");

        let config = AppConfig::load(dir.path(), None).expect("load");
        assert_eq!(config.storage.max_wallpapers, 20);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = AppConfig::load(dir.path(), Some(&dir.path().join("nope.json")));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = AppConfig {
            storage: StorageConfig {
                max_wallpapers: 0,
                ..StorageConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn resolve_data_dir_creates_override() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("a").join("b");
        let resolved = resolve_data_dir(Some(&target)).expect("resolve");
        assert_eq!(resolved, target);
        assert!(target.is_dir());
    }
}
