//! # 自定义壁纸注册表
//!
//! ## 设计思路
//!
//! 元数据是“有哪些壁纸”的唯一事实来源；blob 存储只负责按 ID 存取字节。
//! 两层之间没有事务，因此靠写入顺序与启动时的对账维持一致：
//! - 写入：先写 blob，再写元数据，最后创建运行时句柄；元数据落盘失败时回滚 blob。
//! - 删除：尽力删除 blob，撤销句柄，无条件移除元数据。
//! - 启动：逐条加载 blob 生成句柄，缺失 blob 的元数据被丢弃；没有元数据的 blob 只记录日志。
//!
//! ## 实现思路
//!
//! - 元数据列表与句柄表放在同一把 `RwLock` 里，撤销句柄与更新列表在同一临界区完成。
//! - 锁不跨越 `await`：blob 读写先完成，再进入临界区。
//! - 对账由 `tokio::sync::Mutex<bool>` 保护，并发调用者排队，完成后再调用直接返回。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Blob, BlobStore, MetadataStore, ObjectUrl, ObjectUrlRegistry, StorageError, WallpaperMetadata};

#[derive(Default)]
struct RegistryState {
    wallpapers: Vec<WallpaperMetadata>,
    handles: HashMap<String, ObjectUrl>,
}

/// 自定义壁纸存储：元数据 + blob + 运行时句柄。
pub struct CustomWallpaperStore {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    object_urls: ObjectUrlRegistry,
    state: RwLock<RegistryState>,
    initialized: tokio::sync::Mutex<bool>,
}

impl CustomWallpaperStore {
    /// 创建存储并立即加载元数据（不触碰 blob）。
    pub fn open(
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Result<Self, StorageError> {
        let wallpapers = metadata.load()?;
        log::info!("📚 已加载 {} 条自定义壁纸元数据", wallpapers.len());

        Ok(Self {
            blobs,
            metadata,
            object_urls: ObjectUrlRegistry::new(),
            state: RwLock::new(RegistryState {
                wallpapers,
                handles: HashMap::new(),
            }),
            initialized: tokio::sync::Mutex::new(false),
        })
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 写入壁纸（同 ID 覆盖）。
    ///
    /// blob 写入失败时直接返回错误，元数据保持不变。
    /// 元数据落盘失败时回滚 blob：覆盖写恢复旧数据，新写入则删除。
    pub async fn add_wallpaper(
        &self,
        metadata: WallpaperMetadata,
        blob: Blob,
    ) -> Result<ObjectUrl, StorageError> {
        metadata.validate()?;

        let previous = if self.has_wallpaper(&metadata.id) {
            match self.blobs.get(&metadata.id).await {
                Ok(previous) => previous,
                Err(err) => {
                    log::warn!("⚠️ 读取 {} 的旧图片数据失败，覆盖后将无法回滚: {}", metadata.id, err);
                    None
                }
            }
        } else {
            None
        };

        self.blobs.put(&metadata.id, blob.clone()).await?;

        match self.commit(&metadata, blob) {
            Ok(url) => {
                log::info!("✅ 已保存自定义壁纸 {}（{}）", metadata.id, metadata.name);
                Ok(url)
            }
            Err(err) => {
                self.rollback_blob(&metadata.id, previous).await;
                Err(err)
            }
        }
    }

    /// 保存元数据并替换句柄；落盘失败时内存状态不变。
    fn commit(&self, metadata: &WallpaperMetadata, blob: Blob) -> Result<ObjectUrl, StorageError> {
        let mut state = self.write_state();

        let mut next = state.wallpapers.clone();
        match next.iter_mut().find(|item| item.id == metadata.id) {
            Some(existing) => *existing = metadata.clone(),
            None => next.push(metadata.clone()),
        }
        self.metadata.save(&next)?;
        state.wallpapers = next;

        if let Some(previous) = state.handles.remove(&metadata.id) {
            self.object_urls.revoke(&previous);
        }
        let url = self.object_urls.create(blob);
        state.handles.insert(metadata.id.clone(), url.clone());
        Ok(url)
    }

    async fn rollback_blob(&self, id: &str, previous: Option<Blob>) {
        let result = match previous {
            Some(previous) => self.blobs.put(id, previous).await,
            None => self.blobs.delete(id).await,
        };
        if let Err(err) = result {
            log::warn!("⚠️ 回滚 {} 的图片数据失败: {}", id, err);
        }
    }

    /// 删除壁纸；返回该 ID 此前是否存在。
    ///
    /// blob 删除失败与元数据落盘失败只记录日志，内存中的条目与句柄总会被移除。
    pub async fn remove_wallpaper(&self, id: &str) -> bool {
        if let Err(err) = self.blobs.delete(id).await {
            log::warn!("⚠️ 删除 {} 的图片数据失败，继续移除元数据: {}", id, err);
        }

        let mut state = self.write_state();

        if let Some(url) = state.handles.remove(id) {
            self.object_urls.revoke(&url);
        }

        let before = state.wallpapers.len();
        state.wallpapers.retain(|item| item.id != id);
        let existed = state.wallpapers.len() != before;

        if existed {
            if let Err(err) = self.metadata.save(&state.wallpapers) {
                log::warn!("⚠️ 删除 {} 后保存元数据失败: {}", id, err);
            }
            log::info!("🗑️ 已删除自定义壁纸 {}", id);
        }

        existed
    }

    /// 删除全部自定义壁纸，返回删除数量。
    pub async fn clear_all(&self) -> usize {
        let ids: Vec<String> = self
            .read_state()
            .wallpapers
            .iter()
            .map(|item| item.id.clone())
            .collect();

        let mut removed = 0;
        for id in ids {
            if self.remove_wallpaper(&id).await {
                removed += 1;
            }
        }
        removed
    }

    /// 直接从 blob 存储读取全尺寸数据。
    pub async fn get_blob(&self, id: &str) -> Result<Option<Blob>, StorageError> {
        self.blobs.get(id).await
    }

    /// 启动对账：为每条元数据加载 blob 并创建句柄，丢弃 blob 缺失的条目。
    ///
    /// 幂等；并发调用会等待首个调用完成。
    pub async fn initialize_object_urls(&self) {
        let mut initialized = self.initialized.lock().await;
        if *initialized {
            return;
        }

        let pending: Vec<String> = {
            let state = self.read_state();
            state
                .wallpapers
                .iter()
                .filter(|item| !state.handles.contains_key(&item.id))
                .map(|item| item.id.clone())
                .collect()
        };

        let mut loaded = Vec::with_capacity(pending.len());
        let mut dangling = HashSet::new();
        for id in pending {
            match self.blobs.get(&id).await {
                Ok(Some(blob)) => loaded.push((id, blob)),
                Ok(None) => {
                    log::warn!("⚠️ 壁纸 {} 缺少图片数据，已从列表移除", id);
                    dangling.insert(id);
                }
                Err(err) => {
                    log::warn!("⚠️ 读取壁纸 {} 的图片数据失败，已从列表移除: {}", id, err);
                    dangling.insert(id);
                }
            }
        }

        let created = {
            let mut state = self.write_state();

            let mut created = 0;
            for (id, blob) in loaded {
                let still_listed = state.wallpapers.iter().any(|item| item.id == id);
                if still_listed && !state.handles.contains_key(&id) {
                    let url = self.object_urls.create(blob);
                    state.handles.insert(id, url);
                    created += 1;
                }
            }

            if !dangling.is_empty() {
                let RegistryState { wallpapers, handles } = &mut *state;
                wallpapers.retain(|item| !dangling.contains(&item.id) || handles.contains_key(&item.id));
                if let Err(err) = self.metadata.save(wallpapers) {
                    log::warn!("⚠️ 对账后保存元数据失败: {}", err);
                }
            }

            created
        };

        match self.orphan_blob_ids().await {
            Ok(orphans) if !orphans.is_empty() => {
                log::warn!("⚠️ 存在 {} 个没有元数据的图片数据，不会显示: {:?}", orphans.len(), orphans);
            }
            Ok(_) => {}
            Err(err) => log::warn!("⚠️ 列举图片数据失败: {}", err),
        }

        *initialized = true;
        log::info!(
            "🔗 自定义壁纸对账完成 - 句柄 {} 个，丢弃 {} 条",
            created,
            dangling.len()
        );
    }

    /// blob 存储中存在、但元数据列表里没有的 ID。
    async fn orphan_blob_ids(&self) -> Result<Vec<String>, StorageError> {
        let stored = self.blobs.ids().await?;
        let listed = self.ids();
        Ok(stored.into_iter().filter(|id| !listed.contains(id)).collect())
    }

    pub async fn is_initialized(&self) -> bool {
        *self.initialized.lock().await
    }

    /// 全尺寸图片的运行时地址。
    pub fn get_wallpaper_url(&self, id: &str) -> Option<ObjectUrl> {
        self.read_state().handles.get(id).cloned()
    }

    /// 缩略图 Data URL（直接取自元数据）。
    pub fn get_thumbnail_url(&self, id: &str) -> Option<String> {
        self.read_state()
            .wallpapers
            .iter()
            .find(|item| item.id == id)
            .map(|item| item.thumbnail_data_url.clone())
    }

    pub fn has_wallpaper(&self, id: &str) -> bool {
        self.read_state().wallpapers.iter().any(|item| item.id == id)
    }

    pub fn get_wallpaper(&self, id: &str) -> Option<WallpaperMetadata> {
        self.read_state()
            .wallpapers
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    /// 全部元数据快照（保持写入顺序）。
    pub fn wallpapers(&self) -> Vec<WallpaperMetadata> {
        self.read_state().wallpapers.clone()
    }

    pub fn ids(&self) -> HashSet<String> {
        self.read_state()
            .wallpapers
            .iter()
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read_state().wallpapers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 句柄注册表（用于解析地址与泄漏检查）。
    pub fn object_urls(&self) -> &ObjectUrlRegistry {
        &self.object_urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JsonMetadataStore, OriginalSource, SqliteBlobStore};

    fn metadata(id: &str) -> WallpaperMetadata {
        WallpaperMetadata {
            id: id.to_string(),
            name: "Test".to_string(),
            created_at: 1_700_000_000_000,
            original_source: OriginalSource::File,
            original_name: "test.png".to_string(),
            width: 1920,
            height: 1080,
            size_bytes: 3,
            thumbnail_data_url: "data:image/jpeg;base64,AQID".to_string(),
        }
    }

    fn open(dir: &tempfile::TempDir) -> (Arc<SqliteBlobStore>, CustomWallpaperStore) {
        let blobs = Arc::new(SqliteBlobStore::open(&dir.path().join("blobs.db")).expect("blobs"));
        let meta = Arc::new(JsonMetadataStore::new(dir.path().join("wallpapers.json")));
        let store = CustomWallpaperStore::open(blobs.clone(), meta).expect("open store");
        (blobs, store)
    }

    #[tokio::test]
    async fn add_creates_handle_and_persists_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (_, store) = open(&dir);

        let url = store
            .add_wallpaper(metadata("custom-a"), Blob::new(&b"abc"[..], "image/jpeg"))
            .await
            .expect("add");

        assert!(store.has_wallpaper("custom-a"));
        assert_eq!(store.get_wallpaper_url("custom-a"), Some(url.clone()));
        assert_eq!(
            store.get_thumbnail_url("custom-a").as_deref(),
            Some("data:image/jpeg;base64,AQID")
        );
        assert_eq!(
            store.object_urls().resolve(url.as_str()).map(|b| b.bytes.to_vec()),
            Some(b"abc".to_vec())
        );

        let (_, reopened) = open(&dir);
        assert_eq!(reopened.wallpapers(), vec![metadata("custom-a")]);
        assert!(reopened.get_wallpaper_url("custom-a").is_none());
    }

    #[tokio::test]
    async fn add_rejects_invalid_thumbnail_without_writing_blob() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (blobs, store) = open(&dir);

        let mut bad = metadata("custom-bad");
        bad.thumbnail_data_url = "not-a-data-url".to_string();
        let result = store.add_wallpaper(bad, Blob::new(&b"x"[..], "image/jpeg")).await;

        assert!(matches!(result, Err(StorageError::InvalidMetadata(_))));
        assert!(!store.has_wallpaper("custom-bad"));
        assert!(blobs.get("custom-bad").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn remove_is_unconditional_and_revokes_handle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (_, store) = open(&dir);
        store
            .add_wallpaper(metadata("custom-a"), Blob::new(&b"abc"[..], "image/jpeg"))
            .await
            .expect("add");

        assert!(store.remove_wallpaper("custom-a").await);
        assert!(!store.has_wallpaper("custom-a"));
        assert!(store.get_wallpaper_url("custom-a").is_none());
        assert_eq!(store.object_urls().live_count(), 0);
        assert!(store.get_blob("custom-a").await.expect("get").is_none());

        assert!(!store.remove_wallpaper("custom-a").await);
    }

    #[tokio::test]
    async fn initialization_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let (_, store) = open(&dir);
            store
                .add_wallpaper(metadata("custom-a"), Blob::new(&b"abc"[..], "image/jpeg"))
                .await
                .expect("add");
        }

        let (_, store) = open(&dir);
        assert!(!store.is_initialized().await);
        store.initialize_object_urls().await;
        store.initialize_object_urls().await;

        assert!(store.is_initialized().await);
        assert!(store.get_wallpaper_url("custom-a").is_some());
        assert_eq!(store.object_urls().live_count(), 1);
    }

    #[tokio::test]
    async fn orphan_blobs_are_reported_but_not_listed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (blobs, store) = open(&dir);
        store
            .add_wallpaper(metadata("custom-a"), Blob::new(&b"abc"[..], "image/jpeg"))
            .await
            .expect("add");
        blobs
            .put("custom-orphan", Blob::new(&b"zzz"[..], "image/jpeg"))
            .await
            .expect("seed orphan");

        store.initialize_object_urls().await;

        assert_eq!(
            store.orphan_blob_ids().await.expect("orphans"),
            vec!["custom-orphan".to_string()]
        );
        assert!(!store.has_wallpaper("custom-orphan"));
        assert_eq!(store.object_urls().live_count(), 1);
    }

    #[tokio::test]
    async fn clear_all_removes_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (_, store) = open(&dir);
        for id in ["custom-a", "custom-b", "custom-c"] {
            store
                .add_wallpaper(metadata(id), Blob::new(&b"abc"[..], "image/jpeg"))
                .await
                .expect("add");
        }

        assert_eq!(store.clear_all().await, 3);
        assert!(store.is_empty());
        assert_eq!(store.object_urls().live_count(), 0);
    }
}
