//! # SQLite 二进制存储
//!
//! ## 设计思路
//!
//! 全尺寸壁纸体积较大，与元数据分开存放，只有在需要生成运行时句柄时才读取。
//! 使用 `rusqlite`（bundled SQLite）单表存储，按壁纸 ID 主键寻址。
//!
//! ## 实现思路
//!
//! - 连接包在 `Arc<Mutex<Connection>>` 中，所有访问经 `with_conn` 串行化。
//! - SQLite 调用是阻塞 IO，统一放到 `spawn_blocking` 执行，调用方拿到的是异步接口。
//! - 表结构版本由 `schema` 子模块通过 `PRAGMA user_version` 管理。

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};

use super::schema;
use super::{Blob, BlobStore, StorageError};

/// 基于 SQLite 的 `BlobStore` 实现。
pub struct SqliteBlobStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBlobStore {
    /// 打开（必要时创建）数据库文件并初始化表结构。
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::Blob(format!("创建数据库目录失败: {}", e)))?;
        }
        log::info!("数据库路径: {}", path.display());

        let conn = Connection::open(path)
            .map_err(|e| StorageError::Blob(format!("打开数据库失败: {}", e)))?;
        Self::from_connection(conn)
    }

    /// 纯内存数据库，进程退出即丢失。
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Blob(format!("打开内存数据库失败: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| StorageError::Blob(format!("获取数据库锁失败: {}", e)))?;
            op(&guard)
        })
        .await
        .map_err(|e| StorageError::Blob(format!("数据库任务异常终止: {}", e)))?
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn put(&self, id: &str, blob: Blob) -> Result<(), StorageError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO wallpaper_blobs (id, content_type, data, size_bytes, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    content_type = excluded.content_type,
                    data = excluded.data,
                    size_bytes = excluded.size_bytes,
                    updated_at = excluded.updated_at",
                params![
                    id,
                    blob.content_type,
                    blob.bytes.as_ref(),
                    blob.bytes.len() as i64,
                    chrono::Utc::now().timestamp_millis()
                ],
            )
            .map_err(|e| StorageError::Blob(format!("写入 {} 失败: {}", id, e)))?;
            log::debug!("💾 blob 已写入: {} ({} bytes)", id, blob.bytes.len());
            Ok(())
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<Blob>, StorageError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT content_type, data FROM wallpaper_blobs WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)),
                )
                .optional()
                .map_err(|e| StorageError::Blob(format!("读取 {} 失败: {}", id, e)))?;

            Ok(row.map(|(content_type, data)| Blob::new(data, content_type)))
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM wallpaper_blobs WHERE id = ?1", params![id])
                .map_err(|e| StorageError::Blob(format!("删除 {} 失败: {}", id, e)))?;
            Ok(())
        })
        .await
    }

    async fn ids(&self) -> Result<Vec<String>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM wallpaper_blobs ORDER BY id")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ids)
        })
        .await
    }
}
