//! # 元数据存储
//!
//! ## 设计思路
//!
//! 元数据体积小、启动时需要立即可用，与大体积的 blob 分层存放。
//! 落盘格式是带版本号的 JSON 信封 `{ "version": 1, "wallpapers": [...] }`，字段使用 camelCase。
//!
//! ## 实现思路
//!
//! - 文件不存在视为空列表。
//! - 旧版本（裸数组）在读取时迁移为当前信封格式并回写。
//! - 未知的更高版本直接拒绝，避免覆盖新版本写入的数据。
//! - 写入先落到临时文件再 `rename`，保证文件要么是旧内容要么是新内容。

use std::fs;
use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::StorageError;
use crate::processing::ProcessedWallpaper;

/// 当前元数据文件版本。
pub const METADATA_VERSION: u64 = 1;

/// 壁纸来源标签。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginalSource {
    Url,
    File,
}

impl OriginalSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::File => "file",
        }
    }
}

/// 自定义壁纸元数据。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallpaperMetadata {
    pub id: String,
    pub name: String,
    /// Unix 毫秒时间戳（UTC）。
    pub created_at: i64,
    pub original_source: OriginalSource,
    pub original_name: String,
    /// 处理后（缩放后）的宽度。
    pub width: u32,
    pub height: u32,
    /// 全尺寸编码数据的字节数。
    pub size_bytes: u64,
    pub thumbnail_data_url: String,
}

impl WallpaperMetadata {
    /// 由处理结果构建元数据，创建时间取当前时间。
    pub fn from_processed(id: impl Into<String>, processed: &ProcessedWallpaper) -> Self {
        Self {
            id: id.into(),
            name: processed.name.clone(),
            created_at: Utc::now().timestamp_millis(),
            original_source: processed.original_source,
            original_name: processed.original_name.clone(),
            width: processed.width,
            height: processed.height,
            size_bytes: processed.size_bytes,
            thumbnail_data_url: processed.thumbnail_data_url.clone(),
        }
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.created_at).single()
    }

    /// 校验元数据约束。
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.id.trim().is_empty() {
            return Err(StorageError::InvalidMetadata("壁纸 ID 不能为空".to_string()));
        }
        if !is_valid_thumbnail_data_url(&self.thumbnail_data_url) {
            return Err(StorageError::InvalidMetadata(format!(
                "{} 的缩略图不是合法的 data:image/...;base64 地址",
                self.id
            )));
        }
        Ok(())
    }
}

/// 判断字符串是否为 `data:image/<type>;base64,<payload>` 形式且 payload 可解码。
///
/// ```rust
/// use wallpaper_vault::storage::is_valid_thumbnail_data_url;
///
/// assert!(is_valid_thumbnail_data_url("data:image/jpeg;base64,AQID"));
/// assert!(!is_valid_thumbnail_data_url("data:text/plain;base64,AQID"));
/// assert!(!is_valid_thumbnail_data_url("data:image/png;base64,"));
/// ```
pub fn is_valid_thumbnail_data_url(value: &str) -> bool {
    let Some(rest) = value.strip_prefix("data:image/") else {
        return false;
    };
    let Some((subtype, payload)) = rest.split_once(";base64,") else {
        return false;
    };
    if subtype.is_empty() || payload.is_empty() {
        return false;
    }
    general_purpose::STANDARD.decode(payload).is_ok()
}

/// 元数据持久化接口（同步，读取开销很小）。
pub trait MetadataStore: Send + Sync {
    fn load(&self) -> Result<Vec<WallpaperMetadata>, StorageError>;

    fn save(&self, wallpapers: &[WallpaperMetadata]) -> Result<(), StorageError>;
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u64,
    wallpapers: &'a [WallpaperMetadata],
}

/// 解码结果：列表 + 是否由旧格式迁移而来。
pub(crate) struct DecodedMetadata {
    pub(crate) wallpapers: Vec<WallpaperMetadata>,
    pub(crate) migrated: bool,
}

pub(crate) fn encode_metadata(wallpapers: &[WallpaperMetadata]) -> Result<String, StorageError> {
    Ok(serde_json::to_string_pretty(&EnvelopeRef {
        version: METADATA_VERSION,
        wallpapers,
    })?)
}

pub(crate) fn decode_metadata(content: &str) -> Result<DecodedMetadata, StorageError> {
    let value: serde_json::Value = serde_json::from_str(content)?;

    match value {
        serde_json::Value::Array(_) => Ok(DecodedMetadata {
            wallpapers: serde_json::from_value(value)?,
            migrated: true,
        }),
        serde_json::Value::Object(mut object) => {
            let version = object
                .get("version")
                .and_then(serde_json::Value::as_u64)
                .ok_or_else(|| StorageError::InvalidMetadata("元数据缺少 version 字段".to_string()))?;

            if version != METADATA_VERSION {
                return Err(StorageError::UnsupportedVersion {
                    found: version,
                    supported: METADATA_VERSION,
                });
            }

            let wallpapers = match object.remove("wallpapers") {
                Some(list) => serde_json::from_value(list)?,
                None => Vec::new(),
            };
            Ok(DecodedMetadata {
                wallpapers,
                migrated: false,
            })
        }
        _ => Err(StorageError::InvalidMetadata(
            "元数据文件既不是对象也不是数组".to_string(),
        )),
    }
}

/// JSON 文件实现。
pub struct JsonMetadataStore {
    path: PathBuf,
}

impl JsonMetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl MetadataStore for JsonMetadataStore {
    fn load(&self) -> Result<Vec<WallpaperMetadata>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let decoded = decode_metadata(&content)?;
        let total = decoded.wallpapers.len();

        let wallpapers: Vec<WallpaperMetadata> = decoded
            .wallpapers
            .into_iter()
            .filter(|item| match item.validate() {
                Ok(()) => true,
                Err(err) => {
                    log::warn!("⚠️ 跳过不合法的壁纸元数据 {}: {}", item.id, err);
                    false
                }
            })
            .collect();

        if decoded.migrated {
            log::info!("🔁 元数据由旧格式迁移到 v{}，共 {} 条", METADATA_VERSION, wallpapers.len());
        }
        if decoded.migrated || wallpapers.len() != total {
            if let Err(err) = self.save(&wallpapers) {
                log::warn!("⚠️ 回写迁移后的元数据失败: {}", err);
            }
        }

        Ok(wallpapers)
    }

    fn save(&self, wallpapers: &[WallpaperMetadata]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = encode_metadata(wallpapers)?;
        let temp_path = self.temp_path();
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StorageError::Metadata(format!("替换元数据文件失败: {}", e))
        })?;

        log::debug!("💾 元数据已保存: {} 条 -> {}", wallpapers.len(), self.path.display());
        Ok(())
    }
}
