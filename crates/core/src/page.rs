//! 单页处理：检测 → 删除 → 水印 → 遮盖
//!
//! 顺序固定：水印必须画在删除之后，否则会被同一批删除抹掉；
//! 遮盖在最后，避免查找到水印标签。

use serde::{Deserialize, Serialize};

use crate::error::SurfaceError;
use crate::logo::{detect_logo_regions, LogoOptions};
use crate::mask::{mask_words, MaskOptions};
use crate::record::ProcessingLog;
use crate::region::RedactionBatch;
use crate::surface::PageSurface;
use crate::watermark::{annotate_watermarks, WatermarkOptions};

/// 单页处理参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageOptions {
    pub remove_logos: bool,
    pub logo: LogoOptions,
    pub watermark: WatermarkOptions,
    pub mask: MaskOptions,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            remove_logos: true,
            logo: LogoOptions::default(),
            watermark: WatermarkOptions::default(),
            mask: MaskOptions::default(),
        }
    }
}

/// 单页处理结果
#[derive(Debug, Clone, Default)]
pub struct PageReport {
    pub page: u32,
    pub logo_regions: usize,
    pub logo_redactions: usize,
    pub heuristic_failures: usize,
    pub watermarks: usize,
    pub masked_occurrences: usize,
    pub word_failures: usize,
    pub log: ProcessingLog,
}

impl PageReport {
    /// 页面是否被改动
    pub fn touched(&self) -> bool {
        self.logo_redactions > 0 || self.watermarks > 0 || self.masked_occurrences > 0
    }
}

/// 处理一页
///
/// 启发式、查词、水印的失败都记录在日志里；只有删除或写入失败才返回错误。
pub fn process_page(page: &mut dyn PageSurface, words: &[String], options: &PageOptions) -> Result<PageReport, SurfaceError> {
    let mut report = PageReport {
        page: page.number(),
        ..Default::default()
    };

    if options.remove_logos {
        let detection = detect_logo_regions(page, &options.logo);
        report.logo_regions = detection.regions.len();
        report.heuristic_failures = detection.failures.len();

        let mut batch = RedactionBatch::new();
        batch.extend_regions(&detection.regions);
        if !batch.is_empty() {
            report.logo_redactions = page.apply_redactions(&batch)?;
        }
        report.log.append(detection.log.clone());

        let watermark_log = annotate_watermarks(page, &detection, &options.watermark);
        report.watermarks = watermark_log
            .records()
            .iter()
            .filter(|r| !r.is_error())
            .count();
        report.log.append(watermark_log);
    }

    let masked = mask_words(page, words, &options.mask)?;
    report.masked_occurrences = masked.occurrences.len() + masked.small_text_redactions;
    report.word_failures = masked.failures.len();
    report.log.append(masked.log);

    Ok(report)
}
