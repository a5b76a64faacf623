//! 运行时对象 URL 注册表
//!
//! 相当于浏览器的 `URL.createObjectURL` / `revokeObjectURL`：把内存中的 blob 挂到一个
//! 临时的 `blob:` 地址上，直到被显式撤销。句柄只在进程内有效，从不持久化。

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::Blob;

/// 临时 `blob:` 地址。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 对象 URL 注册表。
pub struct ObjectUrlRegistry {
    entries: Mutex<HashMap<String, Blob>>,
    next_seq: AtomicU64,
    /// 进程级随机前缀，保证不同进程产生的地址不会混用。
    session: String,
}

impl Default for ObjectUrlRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        Self {
            entries: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
            session: format!("{:x}-{:x}", std::process::id(), nanos),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Blob>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 为 blob 创建新地址。
    pub fn create(&self, blob: Blob) -> ObjectUrl {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let url = format!("blob:wallpaper-vault/{}-{}", self.session, seq);
        self.entries().insert(url.clone(), blob);
        ObjectUrl(url)
    }

    /// 撤销地址并释放其持有的 blob；返回地址此前是否有效。
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        self.entries().remove(url.as_str()).is_some()
    }

    /// 解析地址对应的 blob（已撤销则为 `None`）。
    pub fn resolve(&self, url: &str) -> Option<Blob> {
        self.entries().get(url).cloned()
    }

    /// 尚未撤销的地址数量。
    pub fn live_count(&self) -> usize {
        self.entries().len()
    }
}
