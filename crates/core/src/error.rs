//! 错误类型

use thiserror::Error;

use crate::logo::HeuristicKind;

/// 页面操作失败（读取内容、查找文字、改写内容流等）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("内容流解析失败: {0}")]
    Content(String),

    #[error("缺少资源 {0}")]
    MissingResource(String),

    #[error("不支持的编码: {0}")]
    Encoding(String),

    #[error("图像处理失败: {0}")]
    Image(String),

    #[error("{0}")]
    Other(String),
}

/// 单条启发式失败；只记录日志，不影响其余启发式
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{heuristic} heuristic failed: {source}")]
pub struct HeuristicError {
    pub heuristic: HeuristicKind,
    #[source]
    pub source: SurfaceError,
}

/// 单个目标词查找失败；只记录日志，继续下一个词
#[derive(Error, Debug, Clone, PartialEq)]
#[error("search for '{word}' failed: {source}")]
pub struct WordSearchError {
    pub word: String,
    #[source]
    pub source: SurfaceError,
}
