//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 流水线只有三类失败：加载、校验、编码。每一类都携带可直接展示给用户的文案，
//! 调用侧通过 `code()` / `stage()` 做分支处理或上报。

/// 壁纸处理统一错误类型。
///
/// 该类型会在服务层被上转为 `AppError`，最终透传给 UI。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessingError {
    /// 来源不可达、不可读、已损坏，或类型/体积不被接受。
    #[error("图片加载失败：{0}")]
    Load(String),

    /// 解码后的图片不满足最小尺寸策略。
    #[error("图片校验未通过：{0}")]
    Validation(String),

    /// 当前运行时没有任何编码器能产出结果。
    #[error("图片编码失败：{0}")]
    Encode(String),
}

impl ProcessingError {
    /// 稳定错误码，供 UI 做分支展示。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Load(_) => "E_LOAD",
            Self::Validation(_) => "E_VALIDATION",
            Self::Encode(_) => "E_ENCODE",
        }
    }

    /// 出错所在阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Load(_) => "load",
            Self::Validation(_) => "validate",
            Self::Encode(_) => "encode",
        }
    }

    /// 同一会话内重试是否有意义（三类错误均不自动重试）。
    pub fn is_retryable(&self) -> bool {
        false
    }
}

impl From<ProcessingError> for String {
    fn from(error: ProcessingError) -> Self {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_stages_are_stable() {
        assert_eq!(ProcessingError::Load("x".into()).code(), "E_LOAD");
        assert_eq!(ProcessingError::Validation("x".into()).stage(), "validate");
        assert_eq!(ProcessingError::Encode("x".into()).code(), "E_ENCODE");
        assert!(!ProcessingError::Encode("x".into()).is_retryable());
    }

    #[test]
    fn display_keeps_detail_message() {
        let err = ProcessingError::Validation("宽度 640px 小于最小要求 800px".into());
        assert!(err.to_string().contains("640px"));
    }
}
