//! Schema 初始化子模块
//!
//! ## 职责
//! - 创建 blob 表结构，拒绝更高版本的数据库
//! - 设置 SQLite 运行参数（WAL）
//!
//! ## 输入/输出
//! - 输入：`&Connection`
//! - 输出：`Result<(), StorageError>`
//!
//! ## 错误语义
//! - DDL 失败统一映射为 `StorageError::Blob`

use rusqlite::Connection;

use super::StorageError;

const SCHEMA_VERSION: i64 = 1;

fn get_user_version(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| StorageError::Blob(format!("读取数据库版本失败: {}", e)))
}

fn set_user_version(conn: &Connection, version: i64) -> Result<(), StorageError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| StorageError::Blob(format!("写入数据库版本失败: {}", e)))
}

fn create_blob_table(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS wallpaper_blobs (
            id TEXT PRIMARY KEY,
            content_type TEXT NOT NULL,
            data BLOB NOT NULL,
            size_bytes INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL DEFAULT 0
        );",
    )
    .map_err(|e| StorageError::Blob(format!("创建 blob 表失败: {}", e)))
}

pub(super) fn initialize_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch("PRAGMA journal_mode=WAL;").ok();

    let version = get_user_version(conn)?;
    if version > SCHEMA_VERSION {
        return Err(StorageError::Blob(format!(
            "数据库版本过新: current={}, supported={}",
            version, SCHEMA_VERSION
        )));
    }

    create_blob_table(conn)?;
    if version < SCHEMA_VERSION {
        set_user_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}
