//! 水印标注
//!
//! 在已删除的 logo 位置画一个半透明的虚线框并写上标签，提示读者此处
//! 原有品牌标识。候选按优先级贪心放置，每页最多三处。

use serde::{Deserialize, Serialize};

use crate::geometry::{overlap_exceeds, Point, Rect};
use crate::logo::LogoDetection;
use crate::record::{LogKind, LogRecord, ProcessingLog};
use crate::region::{Color, Region, RegionSource};
use crate::surface::{PageSurface, RectStyle, StandardFont, TextAnchor, TextStyle};

/// 水印外观
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatermarkStyle {
    pub label: String,
    pub stroke: Color,
    pub fill: Color,
    pub fill_opacity: f32,
    pub line_width: f32,
    pub dash: [f32; 2],
    pub font_size: f32,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            label: "LOGO".to_string(),
            stroke: Color::rgb(0.7, 0.0, 0.7),
            fill: Color::rgb(0.98, 0.9, 0.98),
            fill_opacity: 0.3,
            line_width: 1.0,
            dash: [1.0, 1.0],
            font_size: 14.0,
        }
    }
}

impl WatermarkStyle {
    fn rect_style(&self) -> RectStyle {
        RectStyle {
            stroke: Some(self.stroke),
            fill: Some(self.fill),
            fill_opacity: self.fill_opacity,
            line_width: self.line_width,
            dash: Some(self.dash),
        }
    }

    fn text_style(&self) -> TextStyle {
        TextStyle {
            font: StandardFont::HelveticaBold,
            size: self.font_size,
            color: self.stroke,
            anchor: TextAnchor::Center,
        }
    }
}

/// 水印参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatermarkOptions {
    pub enabled: bool,
    /// 每页最多放置数量
    pub max_per_page: usize,
    /// 候选下边界须在页高此比例以内
    pub top_zone_fraction: f32,
    /// 候选缩放系数
    pub shrink: f32,
    pub min_width: f32,
    pub min_height: f32,
    /// 裁剪到页面后小于此尺寸的放弃
    pub min_drawn_width: f32,
    pub min_drawn_height: f32,
    /// 与已放置水印的最大重叠比例
    pub max_overlap: f32,
    /// 兜底水印位置（页宽、页高比例：x0, y0, x1, y1）
    pub fallback: [f32; 4],
    pub style: WatermarkStyle,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_per_page: 3,
            top_zone_fraction: 0.20,
            shrink: 0.9,
            min_width: 100.0,
            min_height: 20.0,
            min_drawn_width: 40.0,
            min_drawn_height: 20.0,
            max_overlap: 0.30,
            fallback: [0.4, 0.02, 0.6, 0.08],
            style: WatermarkStyle::default(),
        }
    }
}

/// 一处计划放置的水印
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub rect: Rect,
    /// 来源候选；兜底水印为 None
    pub source: Option<RegionSource>,
}

impl Placement {
    pub fn is_fallback(&self) -> bool {
        self.source.is_none()
    }
}

/// 候选缩放到实际绘制的矩形；过小时返回 None
fn adjust(rect: &Rect, bounds: &Rect, options: &WatermarkOptions) -> Option<Rect> {
    let width = options.min_width.max(rect.width() * options.shrink);
    let height = options.min_height.max(rect.height() * options.shrink);
    let drawn = rect.grow_centered(width, height).clip_to(bounds);
    if drawn.width() < options.min_drawn_width || drawn.height() < options.min_drawn_height {
        return None;
    }
    Some(drawn)
}

/// 计算放置方案
///
/// 候选按优先级稳定排序（同级保持检测顺序），只考虑下边界位于顶部区域内的；
/// 与已放置水印重叠超过阈值的跳过。一处都没放且存在页眉区域时使用兜底位置。
pub fn plan_watermarks<'a>(
    candidates: impl IntoIterator<Item = &'a Region>,
    bounds: Rect,
    has_header: bool,
    options: &WatermarkOptions,
) -> Vec<Placement> {
    let mut ordered: Vec<&Region> = candidates.into_iter().filter(|r| r.candidate).collect();
    ordered.sort_by_key(|r| r.priority);

    let top_zone = bounds.y0 + bounds.height() * options.top_zone_fraction;
    let mut placed: Vec<Placement> = Vec::new();

    for region in ordered {
        if placed.len() >= options.max_per_page {
            break;
        }
        if region.rect.y1 > top_zone {
            continue;
        }
        let Some(drawn) = adjust(&region.rect, &bounds, options) else {
            continue;
        };
        if placed
            .iter()
            .any(|p| overlap_exceeds(&p.rect, &drawn, options.max_overlap))
        {
            continue;
        }
        placed.push(Placement {
            rect: drawn,
            source: Some(region.source),
        });
    }

    if placed.is_empty() && has_header && options.max_per_page > 0 {
        let [x0, y0, x1, y1] = options.fallback;
        let w = bounds.width();
        let h = bounds.height();
        placed.push(Placement {
            rect: Rect::new(
                bounds.x0 + w * x0,
                bounds.y0 + h * y0,
                bounds.x0 + w * x1,
                bounds.y0 + h * y1,
            ),
            source: None,
        });
    }

    placed
}

/// 在页面上绘制水印；单处失败只记日志，不影响其余
pub fn draw_watermarks(page: &mut dyn PageSurface, placements: &[Placement], style: &WatermarkStyle) -> ProcessingLog {
    let mut log = ProcessingLog::new();
    let number = page.number();
    let rect_style = style.rect_style();
    let text_style = style.text_style();

    for placement in placements {
        let result = page.draw_rect(&placement.rect, &rect_style).and_then(|_| {
            let center: Point = placement.rect.center();
            page.insert_text(center, &style.label, &text_style)
        });
        match result {
            Ok(()) => {
                let kind = if placement.is_fallback() {
                    LogKind::FallbackWatermarkAdded
                } else {
                    LogKind::WatermarkAdded
                };
                log.push(LogRecord::new(number, kind));
            }
            Err(e) => {
                log.push(LogRecord::with_detail(number, LogKind::WatermarkFailure, e.to_string()));
            }
        }
    }

    log
}

/// 根据检测结果规划并绘制水印
pub fn annotate_watermarks(
    page: &mut dyn PageSurface,
    detection: &LogoDetection,
    options: &WatermarkOptions,
) -> ProcessingLog {
    if !options.enabled {
        return ProcessingLog::new();
    }
    let placements = plan_watermarks(
        detection.candidates(),
        page.bounds(),
        detection.has_header_region(),
        options,
    );
    log::debug!("[Watermark] 页面 {} 计划放置 {} 处水印", page.number(), placements.len());
    draw_watermarks(page, &placements, &options.style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logo::{detect_logo_regions, LogoOptions};
    use crate::region::Priority;
    use crate::testing::MemoryPage;

    fn letter() -> Rect {
        Rect::new(0.0, 0.0, 612.0, 792.0)
    }

    fn assert_pairwise_overlap(placements: &[Placement], ratio: f32) {
        for (i, a) in placements.iter().enumerate() {
            for b in &placements[i + 1..] {
                assert!(
                    !overlap_exceeds(&a.rect, &b.rect, ratio),
                    "{:?} overlaps {:?}",
                    a.rect,
                    b.rect
                );
            }
        }
    }

    #[test]
    fn test_header_image_gets_first_watermark() {
        let mut page = MemoryPage::letter(1);
        page.add_image("Im0", Rect::new(0.0, 0.0, 200.0, 50.0), None);
        let detection = detect_logo_regions(&page, &LogoOptions::default());

        let options = WatermarkOptions::default();
        let placements = plan_watermarks(detection.candidates(), page.bounds(), true, &options);

        assert!(!placements.is_empty());
        assert!(placements.len() <= 3);
        assert_eq!(placements[0].source, Some(RegionSource::Image));
        // 图片外扩后 210x60，缩放为 189x54，中心 (100, 25)，上沿裁剪到 0
        let first = placements[0].rect;
        assert!((first.width() - 189.0).abs() < 0.01);
        assert_eq!(first.y0, 0.0);
        assert!((first.y1 - 52.0).abs() < 0.01);
        assert_pairwise_overlap(&placements, 0.30);
    }

    #[test]
    fn test_at_most_three_and_inside_top_zone() {
        let regions: Vec<Region> = (0..6)
            .map(|i| {
                let x = i as f32 * 100.0;
                Region::new(Rect::new(x, 10.0, x + 90.0, 60.0), RegionSource::Image, Priority::High)
            })
            .chain(std::iter::once(Region::new(
                Rect::new(0.0, 300.0, 200.0, 400.0),
                RegionSource::Image,
                Priority::High,
            )))
            .collect();

        let placements = plan_watermarks(&regions, letter(), true, &WatermarkOptions::default());
        assert_eq!(placements.len(), 3);
        for p in &placements {
            assert!(p.rect.y1 <= 792.0 * 0.2);
        }
        assert_pairwise_overlap(&placements, 0.30);
    }

    #[test]
    fn test_lower_priority_loses_overlap() {
        let regions = vec![
            Region::new(Rect::new(0.0, 0.0, 244.8, 95.0), RegionSource::FixedPosition, Priority::Medium),
            Region::new(Rect::new(10.0, 10.0, 230.0, 90.0), RegionSource::BrandingText, Priority::High),
        ];
        let placements = plan_watermarks(&regions, letter(), true, &WatermarkOptions::default());
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].source, Some(RegionSource::BrandingText));
    }

    #[test]
    fn test_fallback_when_nothing_fits() {
        let below = vec![Region::new(
            Rect::new(100.0, 400.0, 300.0, 500.0),
            RegionSource::Image,
            Priority::High,
        )];
        let options = WatermarkOptions::default();

        let placements = plan_watermarks(&below, letter(), true, &options);
        assert_eq!(placements.len(), 1);
        assert!(placements[0].is_fallback());
        let r = placements[0].rect;
        assert!((r.x0 - 244.8).abs() < 0.01);
        assert!((r.y0 - 15.84).abs() < 0.01);
        assert!((r.x1 - 367.2).abs() < 0.01);
        assert!((r.y1 - 63.36).abs() < 0.01);

        // 没有页眉区域时不放兜底
        assert!(plan_watermarks(&below, letter(), false, &options).is_empty());
    }

    #[test]
    fn test_tiny_corner_candidate_skipped() {
        let corner = vec![Region::new(
            Rect::new(600.0, 0.0, 612.0, 10.0),
            RegionSource::BrandingText,
            Priority::High,
        )];
        let placements = plan_watermarks(&corner, letter(), false, &WatermarkOptions::default());
        assert!(placements.is_empty());
    }

    #[test]
    fn test_draw_records_and_failures() {
        let mut page = MemoryPage::letter(2);
        page.add_image("Im0", Rect::new(0.0, 0.0, 200.0, 50.0), None);
        let detection = detect_logo_regions(&page, &LogoOptions::default());

        let log = annotate_watermarks(&mut page, &detection, &WatermarkOptions::default());
        assert_eq!(log.count(LogKind::WatermarkAdded), page.drawn.len());
        assert_eq!(page.inserted.len(), page.drawn.len());
        assert!(page.inserted.iter().all(|(_, text, style)| {
            text == "LOGO" && style.font == StandardFont::HelveticaBold && style.size == 14.0
        }));

        let mut broken = MemoryPage::letter(3);
        broken.fail_draw = true;
        let detection = detect_logo_regions(&broken, &LogoOptions::default());
        let log = annotate_watermarks(&mut broken, &detection, &WatermarkOptions::default());
        assert!(log.count(LogKind::WatermarkFailure) >= 1);
        assert_eq!(log.count(LogKind::WatermarkAdded), 0);
        assert!(broken.drawn.is_empty());
    }

    #[test]
    fn test_disabled_draws_nothing() {
        let mut page = MemoryPage::letter(1);
        let detection = detect_logo_regions(&page, &LogoOptions::default());
        let options = WatermarkOptions {
            enabled: false,
            ..Default::default()
        };
        assert!(annotate_watermarks(&mut page, &detection, &options).is_empty());
        assert!(page.drawn.is_empty());
    }
}
