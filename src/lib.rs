//! Data Shield：PDF logo 删除与敏感文字遮盖
//!
//! 页面无关的检测、水印与遮盖逻辑在 `shield-core`；
//! 这里提供基于 lopdf 的页面实现和整份文档的处理流程。

pub mod config;
pub mod pdf;

pub use config::{load_config, save_config, ConfigError, ShieldConfig, WORKERS_ENV};
pub use pdf::{
    analyze_pdf, analyze_pdf_bytes, analyze_pdf_file, is_scanned, merge_edit, process, process_bytes,
    process_file, verify_output, ImageRedaction, PageContentType, PageEdit, PageSnapshot, PdfAnalysis,
    PdfPage, ProcessOutput, ProcessRequest, ProcessingMode, Residual, ShieldError, VerifyReport,
};

pub use shield_core::{
    LogKind, LogRecord, LogoOptions, MaskOptions, MaskWidthPolicy, PageOptions, PageSurface, ProcessingLog,
    SmallTextOptions, WatermarkOptions,
};
