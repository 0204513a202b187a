//! Logo 区域检测
//!
//! 五条启发式互不依赖，逐条运行；任何一条失败只记录日志，
//! 其余启发式照常执行。

use serde::{Deserialize, Serialize};
use std::fmt;

mod heuristics;
pub use heuristics::{branding_text, embedded_images, fixed_positions, header_band, header_drawings};

use crate::error::{HeuristicError, SurfaceError};
use crate::record::{LogKind, LogRecord, ProcessingLog};
use crate::region::{Region, RegionSource};
use crate::surface::PageSurface;

/// 默认品牌词汇：常见公司后缀以及样例文档中的名称
pub const DEFAULT_BRANDING_PATTERNS: &[&str] = &[
    "Sliced",
    "Invoices",
    "SlicedInvoices",
    "Logo",
    "Ltd",
    "Inc",
    "GmbH",
    "Software",
    "Company",
    "CPB",
    "Limited",
    "Corp",
    "Corporation",
    "Technologies",
    "Tech",
    "Solutions",
    "Systems",
    "Services",
    "Group",
    "International",
    "Holdings",
    "Enterprises",
];

/// 启发式类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicKind {
    HeaderBand,
    Images,
    FixedPositions,
    Drawings,
    BrandingText,
}

impl HeuristicKind {
    pub const ALL: [HeuristicKind; 5] = [
        HeuristicKind::HeaderBand,
        HeuristicKind::Images,
        HeuristicKind::FixedPositions,
        HeuristicKind::Drawings,
        HeuristicKind::BrandingText,
    ];

    fn run(&self, page: &dyn PageSurface, options: &LogoOptions) -> Result<Vec<Region>, SurfaceError> {
        match self {
            HeuristicKind::HeaderBand => header_band(page, options),
            HeuristicKind::Images => embedded_images(page, options),
            HeuristicKind::FixedPositions => fixed_positions(page, options),
            HeuristicKind::Drawings => header_drawings(page, options),
            HeuristicKind::BrandingText => branding_text(page, options),
        }
    }
}

impl fmt::Display for HeuristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HeuristicKind::HeaderBand => "header band",
            HeuristicKind::Images => "image",
            HeuristicKind::FixedPositions => "fixed position",
            HeuristicKind::Drawings => "drawing",
            HeuristicKind::BrandingText => "branding text",
        };
        f.write_str(name)
    }
}

/// 品牌文字命中后的扩展距离
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrandingMargin {
    pub left: f32,
    pub vertical: f32,
    pub right: f32,
}

impl Default for BrandingMargin {
    fn default() -> Self {
        Self {
            left: 20.0,
            vertical: 10.0,
            right: 150.0,
        }
    }
}

/// Logo 检测参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogoOptions {
    /// 页眉带高度占页高比例
    pub header_fraction: f32,
    /// “顶部区域”下边界占页高比例，图片提升、矢量图、品牌文字、水印都以此为界
    pub top_zone_fraction: f32,
    /// 固定位置区域高度占页高比例
    pub fixed_band_fraction: f32,
    /// 图片外扩距离
    pub image_margin: f32,
    pub branding_margin: BrandingMargin,
    pub branding_patterns: Vec<String>,
}

impl Default for LogoOptions {
    fn default() -> Self {
        Self {
            header_fraction: 0.15,
            top_zone_fraction: 0.20,
            fixed_band_fraction: 0.12,
            image_margin: 5.0,
            branding_margin: BrandingMargin::default(),
            branding_patterns: DEFAULT_BRANDING_PATTERNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// 单页检测结果
#[derive(Debug, Clone, Default)]
pub struct LogoDetection {
    /// 全部区域（含只删除不放水印的）
    pub regions: Vec<Region>,
    pub failures: Vec<HeuristicError>,
    pub log: ProcessingLog,
}

impl LogoDetection {
    /// 水印候选区域
    pub fn candidates(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(|r| r.candidate)
    }

    pub fn has_header_region(&self) -> bool {
        self.regions.iter().any(|r| r.source == RegionSource::HeaderArea)
    }
}

/// 运行全部启发式
pub fn detect_logo_regions(page: &dyn PageSurface, options: &LogoOptions) -> LogoDetection {
    let mut detection = LogoDetection::default();
    let number = page.number();

    for kind in HeuristicKind::ALL {
        match kind.run(page, options) {
            Ok(regions) => {
                record_findings(&mut detection.log, number, kind, &regions);
                detection.regions.extend(regions);
            }
            Err(source) => {
                let err = HeuristicError { heuristic: kind, source };
                detection
                    .log
                    .push(LogRecord::with_detail(number, LogKind::HeuristicFailure, err.to_string()));
                detection.failures.push(err);
            }
        }
    }

    detection
}

fn record_findings(log: &mut ProcessingLog, page: u32, kind: HeuristicKind, regions: &[Region]) {
    match kind {
        HeuristicKind::HeaderBand => {
            if !regions.is_empty() {
                log.push(LogRecord::new(page, LogKind::HeaderProtected));
            }
        }
        HeuristicKind::Images => {
            for region in regions {
                let detail = region.note.clone().unwrap_or_default();
                log.push(LogRecord::with_detail(page, LogKind::ImageRemoved, detail));
            }
        }
        HeuristicKind::FixedPositions => {
            if !regions.is_empty() {
                log.push(LogRecord::new(page, LogKind::FixedPositionsProtected));
            }
        }
        HeuristicKind::Drawings => {
            if !regions.is_empty() {
                log.push(LogRecord::new(page, LogKind::HeaderGraphicsProtected));
            }
        }
        HeuristicKind::BrandingText => {
            for region in regions {
                let pattern = region.pattern.clone().unwrap_or_default();
                log.push(LogRecord::with_detail(page, LogKind::BrandingTextProtected, pattern));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::region::Priority;
    use crate::testing::MemoryPage;

    #[test]
    fn test_failing_heuristic_does_not_stop_others() {
        let mut page = MemoryPage::letter(4);
        page.fail_images = true;
        page.add_text("Globex Corporation", Rect::new(300.0, 30.0, 420.0, 42.0));

        let detection = detect_logo_regions(&page, &LogoOptions::default());

        assert_eq!(detection.failures.len(), 1);
        assert_eq!(detection.failures[0].heuristic, HeuristicKind::Images);
        assert_eq!(detection.log.count(LogKind::HeuristicFailure), 1);
        // 其余启发式照常产出
        assert!(detection.has_header_region());
        assert!(detection.regions.iter().any(|r| r.source == RegionSource::FixedPosition));
        assert!(detection.regions.iter().any(|r| r.source == RegionSource::BrandingText));
    }

    #[test]
    fn test_scenario_header_image_on_letter_page() {
        let mut page = MemoryPage::letter(1);
        page.add_image("Im0", Rect::new(0.0, 0.0, 200.0, 50.0), None);

        let detection = detect_logo_regions(&page, &LogoOptions::default());

        let image = detection
            .regions
            .iter()
            .find(|r| r.source == RegionSource::Image)
            .unwrap();
        assert_eq!(image.priority, Priority::High);
        assert!(detection
            .log
            .lines()
            .iter()
            .any(|l| l.starts_with("Removed image on page 1")));
    }

    #[test]
    fn test_overlapping_branding_patterns_all_reported() {
        let mut page = MemoryPage::letter(2);
        page.add_text("SlicedInvoices", Rect::new(50.0, 20.0, 134.0, 32.0));

        let detection = detect_logo_regions(&page, &LogoOptions::default());
        let patterns: Vec<_> = detection
            .regions
            .iter()
            .filter_map(|r| r.pattern.as_deref())
            .collect();
        assert_eq!(patterns, vec!["Sliced", "Invoices", "SlicedInvoices"]);
        assert_eq!(detection.log.count(LogKind::BrandingTextProtected), 3);
    }
}
