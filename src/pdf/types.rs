use serde::{Deserialize, Serialize};
use shield_core::{LogRecord, ProcessingLog};

use crate::config::ShieldConfig;

/// 页面处理模式
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
  #[default]
  Auto,           // 根据扫描件判定自动选择
  Sequential,     // 逐页顺序处理
  Concurrent,     // 线程池并行处理（扫描件）
}

/// 部分覆盖的图片如何处理
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ImageRedaction {
  #[default]
  BlankPixels,    // 覆盖区域的像素改为白色（页面私有副本）
  Remove,         // 整个图片摆放删除
}

/// 页面内容类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageContentType {
  Text,           // 包含文字操作符 (Tj/TJ)
  PathDrawn,      // 主要是路径绘制
  ImageBased,     // 主要是图片（扫描件）
  Mixed,          // 混合类型
  Empty,          // 空页面
}

/// PDF 分析结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfAnalysis {
  pub page_count: usize,
  pub page_types: Vec<PageContentType>,
  pub is_scanned: bool,
  pub has_metadata: bool,
  pub recommended_mode: ProcessingMode,
}

/// 一次文件处理请求
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
  pub input_path: String,
  pub output_path: String,
  #[serde(default)]
  pub words: Vec<String>,
  #[serde(default)]
  pub config: ShieldConfig,
}

/// 处理结果：输出字节与结构化日志
#[derive(Debug, Clone)]
pub struct ProcessOutput {
  pub bytes: Vec<u8>,
  pub log: ProcessingLog,
  pub mode: ProcessingMode,
  pub pages: usize,
  /// 处理失败、原样保留的页码
  pub failed_pages: Vec<u32>,
}

impl ProcessOutput {
  pub fn records(&self) -> &[LogRecord] {
    self.log.records()
  }

  /// 旧版纯文本日志
  pub fn lines(&self) -> Vec<String> {
    self.log.lines()
  }
}

/// 输出校验：仍可提取到的目标词
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Residual {
  pub page: u32,
  pub word: String,
  pub occurrences: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
  pub pages_checked: usize,
  pub residuals: Vec<Residual>,
  pub warnings: Vec<String>,
}

impl VerifyReport {
  pub fn is_clean(&self) -> bool {
    self.residuals.is_empty()
  }
}
