//! # 进度上报
//!
//! 每次阶段切换时向调用方回调一次 `ProcessingProgress`，进度值单调不减。
//! 这是一条旁路输出，不影响返回值。

use serde::Serialize;

/// 进度状态标签。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingStatus {
    Loading,
    Validating,
    Resizing,
    Converting,
    GeneratingThumbnail,
    Saving,
    Complete,
    Error,
}

impl ProcessingStatus {
    /// 阶段对应的固定进度值；`Error` 沿用最近一次进度。
    pub fn nominal_progress(self) -> Option<u8> {
        match self {
            Self::Loading => Some(5),
            Self::Validating => Some(20),
            Self::Resizing => Some(35),
            Self::Converting => Some(55),
            Self::GeneratingThumbnail => Some(75),
            Self::Saving => Some(90),
            Self::Complete => Some(100),
            Self::Error => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Validating => "validating",
            Self::Resizing => "resizing",
            Self::Converting => "converting",
            Self::GeneratingThumbnail => "generating-thumbnail",
            Self::Saving => "saving",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

/// 单次进度信号。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingProgress {
    pub status: ProcessingStatus,
    /// 0~100。
    pub progress: u8,
    /// 可直接展示的说明文字。
    pub message: String,
}

/// 进度回调签名。
pub type ProgressSink<'a> = dyn Fn(ProcessingProgress) + Send + Sync + 'a;

/// 包装回调，保证进度单调不减并记住最近值。
pub(crate) struct ProgressTracker<'a> {
    sink: &'a ProgressSink<'a>,
    last: std::sync::atomic::AtomicU8,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a ProgressSink<'a>) -> Self {
        Self {
            sink,
            last: std::sync::atomic::AtomicU8::new(0),
        }
    }

    pub(crate) fn emit(&self, status: ProcessingStatus, message: impl Into<String>) {
        use std::sync::atomic::Ordering;

        let last = self.last.load(Ordering::SeqCst);
        let progress = status.nominal_progress().unwrap_or(last).max(last);
        self.last.store(progress, Ordering::SeqCst);

        (self.sink)(ProcessingProgress {
            status,
            progress,
            message: message.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn status_serializes_as_kebab_case() {
        let json = serde_json::to_string(&ProcessingStatus::GeneratingThumbnail)
            .expect("serialize status");
        assert_eq!(json, "\"generating-thumbnail\"");
        assert_eq!(ProcessingStatus::GeneratingThumbnail.as_str(), "generating-thumbnail");
    }

    #[test]
    fn tracker_keeps_progress_monotonic_and_error_reuses_last_value() {
        let seen = Mutex::new(Vec::new());
        let sink = |p: ProcessingProgress| seen.lock().expect("lock").push(p);
        let tracker = ProgressTracker::new(&sink);

        tracker.emit(ProcessingStatus::Loading, "a");
        tracker.emit(ProcessingStatus::Resizing, "b");
        tracker.emit(ProcessingStatus::Error, "boom");

        let seen = seen.into_inner().expect("lock");
        let values: Vec<u8> = seen.iter().map(|p| p.progress).collect();
        assert_eq!(values, vec![5, 35, 35]);
        assert_eq!(seen[2].status, ProcessingStatus::Error);
        assert_eq!(seen[2].message, "boom");
    }
}
