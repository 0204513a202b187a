//! 处理日志
//!
//! 每条记录带页码、类型和细节；旧版的纯文本行只是 `Display` 的渲染结果。

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    HeaderProtected,
    ImageRemoved,
    FixedPositionsProtected,
    HeaderGraphicsProtected,
    BrandingTextProtected,
    WatermarkAdded,
    FallbackWatermarkAdded,
    WordFound,
    SmallTextFound,
    RedactionsApplied,
    HeuristicFailure,
    WordSearchFailure,
    WatermarkFailure,
    PageFailure,
}

impl LogKind {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            LogKind::HeuristicFailure
                | LogKind::WordSearchFailure
                | LogKind::WatermarkFailure
                | LogKind::PageFailure
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// 页码，从 1 开始
    pub page: u32,
    pub kind: LogKind,
    #[serde(default)]
    pub detail: String,
}

impl LogRecord {
    pub fn new(page: u32, kind: LogKind) -> Self {
        Self {
            page,
            kind,
            detail: String::new(),
        }
    }

    pub fn with_detail(page: u32, kind: LogKind, detail: impl Into<String>) -> Self {
        Self {
            page,
            kind,
            detail: detail.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind.is_error()
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let page = self.page;
        let detail = &self.detail;
        match self.kind {
            LogKind::HeaderProtected => write!(f, "Applied top area protection on page {page}"),
            LogKind::ImageRemoved => {
                write!(f, "Removed image on page {page}")?;
                if !detail.is_empty() {
                    write!(f, ", {detail}")?;
                }
                Ok(())
            }
            LogKind::FixedPositionsProtected => write!(f, "Applied targeted protection on page {page}"),
            LogKind::HeaderGraphicsProtected => {
                write!(f, "Protected header area with graphics on page {page}")
            }
            LogKind::BrandingTextProtected => {
                write!(f, "Protected branding text '{detail}' on page {page}")
            }
            LogKind::WatermarkAdded => write!(f, "Added logo watermark indicator on page {page}"),
            LogKind::FallbackWatermarkAdded => {
                write!(f, "Added general header watermark indicator on page {page}")
            }
            LogKind::WordFound => write!(f, "Found word to mask: '{detail}' on page {page}"),
            LogKind::SmallTextFound => write!(f, "Found small text to mask: '{detail}' on page {page}"),
            LogKind::RedactionsApplied => write!(f, "Applied {detail} redactions on page {page}"),
            LogKind::HeuristicFailure => write!(f, "Logo heuristic error: page {page}: {detail}"),
            LogKind::WordSearchFailure => write!(f, "Word search error: page {page}: {detail}"),
            LogKind::WatermarkFailure => write!(f, "Watermark error: page {page}: {detail}"),
            LogKind::PageFailure => write!(f, "Page processing error: page {page}: {detail}"),
        }
    }
}

/// 只追加的处理日志
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingLog {
    records: Vec<LogRecord>,
}

impl ProcessingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: LogRecord) {
        if record.is_error() {
            log::warn!("[Shield] {}", record);
        } else {
            log::info!("[Shield] {}", record);
        }
        self.records.push(record);
    }

    /// 合并另一份日志（不再重复输出到 `log`）
    pub fn append(&mut self, other: ProcessingLog) {
        self.records.extend(other.records);
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<LogRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, kind: LogKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    pub fn for_page(&self, page: u32) -> impl Iterator<Item = &LogRecord> {
        self.records.iter().filter(move |r| r.page == page)
    }

    /// 渲染为旧版的纯文本行
    pub fn lines(&self) -> Vec<String> {
        self.records.iter().map(|r| r.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_rendering() {
        assert_eq!(
            LogRecord::new(1, LogKind::ImageRemoved).to_string(),
            "Removed image on page 1"
        );
        assert_eq!(
            LogRecord::with_detail(2, LogKind::WordFound, "Confidential").to_string(),
            "Found word to mask: 'Confidential' on page 2"
        );
        assert_eq!(
            LogRecord::with_detail(3, LogKind::PageFailure, "bad stream").to_string(),
            "Page processing error: page 3: bad stream"
        );
    }

    #[test]
    fn test_append_and_count() {
        let mut a = ProcessingLog::new();
        a.push(LogRecord::new(1, LogKind::HeaderProtected));
        let mut b = ProcessingLog::new();
        b.push(LogRecord::new(2, LogKind::HeaderProtected));
        b.push(LogRecord::with_detail(2, LogKind::PageFailure, "x"));
        a.append(b);

        assert_eq!(a.len(), 3);
        assert_eq!(a.count(LogKind::HeaderProtected), 2);
        assert_eq!(a.for_page(2).count(), 2);
        assert_eq!(a.lines()[0], "Applied top area protection on page 1");
    }
}
