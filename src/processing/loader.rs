//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（URL / 本地文件 / 内存文件）的原始字节加载，并在“尽可能早”的阶段执行输入校验。
//! 体积与类型检查都发生在解码之前。
//!
//! ## 实现思路
//!
//! - URL：协议校验 + 有限重定向 + 状态码 + 内容类型 + 流式下载体积上限 + 文件签名。
//! - 文件：声明类型（或按签名推断）校验 + metadata 体积限制 + 读取。
//! - 内存文件：声明类型 + 字节长度校验。
//! - 所有失败统一映射为 `ProcessingError::Load`。

use std::path::Path;
use std::time::Duration;

use super::config::normalize_mime;
use super::source::{LocalFile, RawImageData};
use super::{ProcessingConfig, ProcessingError, WallpaperProcessor};

impl WallpaperProcessor {
    /// 从 URL 加载图片原始字节。
    pub(super) async fn load_from_url(
        &self,
        url: &str,
        config: &ProcessingConfig,
    ) -> Result<RawImageData, ProcessingError> {
        log::info!("🌐 开始下载图片 - URL: {}", Self::redact_url_for_log(url));

        let bytes = self.download_with_validation(url, config).await?;
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "url",
        })
    }

    /// 从本地路径加载图片原始字节。
    pub(super) async fn load_from_file(
        &self,
        file: &LocalFile,
        config: &ProcessingConfig,
    ) -> Result<RawImageData, ProcessingError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", file.path.display());

        let metadata = tokio::fs::metadata(&file.path)
            .await
            .map_err(|e| ProcessingError::Load(format!("无法读取文件信息：{}", e)))?;

        if !metadata.is_file() {
            return Err(ProcessingError::Load(format!(
                "不是普通文件：{}",
                file.path.display()
            )));
        }

        let declared = match &file.mime_type {
            Some(mime) => normalize_mime(mime),
            None => Self::sniff_mime_from_path(&file.path)?,
        };
        Self::validate_declared_type(&declared)?;
        Self::validate_size(metadata.len(), config)?;

        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|e| ProcessingError::Load(format!("无法读取图片文件：{}", e)))?;

        Ok(RawImageData {
            bytes,
            source_hint: "file",
        })
    }

    /// 从内存文件对象加载。
    pub(super) fn load_from_memory(
        &self,
        mime_type: &str,
        bytes: &[u8],
        config: &ProcessingConfig,
    ) -> Result<RawImageData, ProcessingError> {
        log::info!("📝 开始处理内存图片 - 类型: {} 大小: {} bytes", mime_type, bytes.len());

        Self::validate_declared_type(&normalize_mime(mime_type))?;
        Self::validate_size(bytes.len() as u64, config)?;

        Ok(RawImageData {
            bytes: bytes.to_vec(),
            source_hint: "memory",
        })
    }

    fn validate_declared_type(mime: &str) -> Result<(), ProcessingError> {
        if ProcessingConfig::is_accepted_mime(mime) {
            Ok(())
        } else {
            Err(ProcessingError::Load(format!(
                "不支持的图片类型：{}（支持 JPEG / PNG / WebP / AVIF / GIF / TIFF / BMP）",
                if mime.is_empty() { "未知" } else { mime }
            )))
        }
    }

    fn validate_size(size: u64, config: &ProcessingConfig) -> Result<(), ProcessingError> {
        if size > config.max_file_size {
            return Err(ProcessingError::Load(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                size as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        if size == 0 {
            return Err(ProcessingError::Load("图片内容为空".to_string()));
        }
        Ok(())
    }

    fn sniff_mime_from_path(path: &Path) -> Result<String, ProcessingError> {
        let kind = infer::get_from_path(path)
            .map_err(|e| ProcessingError::Load(format!("无法识别文件类型：{}", e)))?;

        Ok(kind
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_default())
    }

    /// 执行带校验的网络下载。
    ///
    /// 使用流式读取，体积超限时立即中止。
    async fn download_with_validation(
        &self,
        url: &str,
        config: &ProcessingConfig,
    ) -> Result<Vec<u8>, ProcessingError> {
        let mut current_url = Self::parse_http_url(url)?;
        let client = Self::build_http_client(config)?;

        for redirect_count in 0..=config.max_redirects {
            let response = client
                .get(current_url.clone())
                .header(reqwest::header::ACCEPT, "image/avif,image/webp,image/*,*/*;q=0.8")
                .send()
                .await
                .map_err(|e| Self::map_reqwest_error(e, current_url.as_str(), config))?;

            if response.status().is_redirection() {
                if redirect_count >= config.max_redirects {
                    return Err(ProcessingError::Load(format!(
                        "重定向次数超过限制（{}）",
                        config.max_redirects
                    )));
                }

                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| ProcessingError::Load("重定向响应缺少 Location 头".to_string()))?;

                let next_url = current_url
                    .join(location)
                    .map_err(|e| ProcessingError::Load(format!("重定向 URL 解析失败：{}", e)))?;
                let next_url = Self::parse_http_url(next_url.as_str())?;

                log::debug!("↪️ 跳转到: {}", Self::redact_url_for_log(next_url.as_str()));
                current_url = next_url;
                continue;
            }

            if !response.status().is_success() {
                return Err(ProcessingError::Load(format!(
                    "HTTP {}: {}",
                    response.status().as_u16(),
                    Self::status_message(response.status().as_u16())
                )));
            }

            if let Some(ct) = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
            {
                if !Self::is_image_content_type(ct) {
                    return Err(ProcessingError::Load(format!("不是图片类型：{}", ct)));
                }
            }

            if let Some(size) = response.content_length() {
                Self::validate_size(size.max(1), config)?;
            }

            let mut response = response;
            let mut buffer = Vec::new();
            let chunk_timeout = Duration::from_millis(config.stream_chunk_timeout_ms);

            loop {
                let next_chunk = tokio::time::timeout(chunk_timeout, response.chunk())
                    .await
                    .map_err(|_| ProcessingError::Load("下载数据流读取超时".to_string()))?
                    .map_err(|e| ProcessingError::Load(format!("下载失败：{}", e)))?;

                let Some(chunk) = next_chunk else {
                    break;
                };

                if (buffer.len() + chunk.len()) as u64 > config.max_file_size {
                    return Err(ProcessingError::Load("下载内容超过大小限制".to_string()));
                }
                buffer.extend_from_slice(&chunk);
            }

            log::debug!("✅ 下载完成 - {} bytes", buffer.len());
            return Ok(buffer);
        }

        Err(ProcessingError::Load("下载流程异常结束".to_string()))
    }

    fn parse_http_url(url: &str) -> Result<reqwest::Url, ProcessingError> {
        let parsed = reqwest::Url::parse(url.trim())
            .map_err(|e| ProcessingError::Load(format!("URL 格式错误：{}", e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ProcessingError::Load("仅支持 HTTP/HTTPS".to_string()));
        }

        Ok(parsed)
    }

    fn build_http_client(config: &ProcessingConfig) -> Result<reqwest::Client, ProcessingError> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProcessingError::Load(format!("无法创建 HTTP 客户端：{}", e)))
    }

    fn map_reqwest_error(e: reqwest::Error, url: &str, config: &ProcessingConfig) -> ProcessingError {
        let err_msg = e.to_string().replace(url, &Self::redact_url_for_log(url));

        if e.is_timeout() {
            ProcessingError::Load(format!("下载超时（{}秒）", config.download_timeout))
        } else if e.is_connect() {
            ProcessingError::Load(format!("无法连接：{}", err_msg))
        } else {
            ProcessingError::Load(format!("请求失败：{}", err_msg))
        }
    }

    fn is_image_content_type(content_type: &str) -> bool {
        content_type
            .split(';')
            .next()
            .map(|base| base.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
    }

    pub(super) fn redact_url_for_log(url: &str) -> String {
        let Ok(parsed) = reqwest::Url::parse(url) else {
            return "<invalid-url>".to_string();
        };

        let host = parsed.host_str().unwrap_or("<unknown-host>");
        let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();

        format!("{}://{}{}{}", parsed.scheme(), host, port, parsed.path())
    }

    fn status_message(code: u16) -> &'static str {
        match code {
            404 => "未找到",
            403 => "访问被拒绝",
            500..=599 => "服务器错误",
            _ => "请求失败",
        }
    }

    /// 通过文件签名（magic bytes）校验下载内容确实是图片。
    fn validate_image_signature(bytes: &[u8]) -> Result<(), ProcessingError> {
        if bytes.is_empty() {
            return Err(ProcessingError::Load("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| ProcessingError::Load("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ProcessingError::Load(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(())
    }
}
