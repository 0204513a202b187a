//! 五条 logo 启发式
//!
//! 每条启发式都是页面到区域列表的纯函数，相互独立，结果可以重叠，
//! 重叠的候选由水印阶段去重。

use super::LogoOptions;
use crate::error::SurfaceError;
use crate::geometry::Rect;
use crate::region::{Priority, Region, RegionSource};
use crate::surface::PageSurface;

/// 页眉带：页面顶部 15% 总是作为低优先级候选
pub fn header_band(page: &dyn PageSurface, options: &LogoOptions) -> Result<Vec<Region>, SurfaceError> {
    let bounds = page.bounds();
    let rect = Rect::new(
        bounds.x0,
        bounds.y0,
        bounds.x1,
        bounds.y0 + bounds.height() * options.header_fraction,
    );
    Ok(vec![Region::new(rect, RegionSource::HeaderArea, Priority::Low)])
}

/// 嵌入图片：每处摆放外扩 5pt；位于顶部区域的提升为高优先级，
/// 其余图片同样删除，但不参与水印
pub fn embedded_images(page: &dyn PageSurface, options: &LogoOptions) -> Result<Vec<Region>, SurfaceError> {
    let top_zone = top_zone_limit(page, options);
    let mut regions = Vec::new();

    for image in page.images()? {
        let expanded = image.rect.expand_uniform(options.image_margin);
        let mut region = Region::new(expanded, RegionSource::Image, Priority::High);
        if let Some(profile) = image.profile {
            let kind = if profile.looks_like_logo() { "logo-like" } else { "raster" };
            region.note = Some(format!(
                "{} {}x{} {}",
                image.name, profile.pixel_width, profile.pixel_height, kind
            ));
        } else {
            region.note = Some(image.name.clone());
        }
        if expanded.y0 >= top_zone {
            region = region.removal_only();
        }
        regions.push(region);
    }

    Ok(regions)
}

/// 固定位置：顶部 12% 的左、右、中三个区域，与实际内容无关
pub fn fixed_positions(page: &dyn PageSurface, options: &LogoOptions) -> Result<Vec<Region>, SurfaceError> {
    let bounds = page.bounds();
    let w = bounds.width();
    let bottom = bounds.y0 + bounds.height() * options.fixed_band_fraction;

    let bands = [(0.0, 0.40), (0.60, 1.0), (0.30, 0.70)];
    Ok(bands
        .iter()
        .map(|(left, right)| {
            let rect = Rect::new(bounds.x0 + w * left, bounds.y0, bounds.x0 + w * right, bottom);
            Region::new(rect, RegionSource::FixedPosition, Priority::Medium)
        })
        .collect())
}

/// 矢量图形：顶部区域存在任何绘制时删除整个顶部区域（高优先级），
/// 各绘制自身的边界框作为水印候选
pub fn header_drawings(page: &dyn PageSurface, options: &LogoOptions) -> Result<Vec<Region>, SurfaceError> {
    let bounds = page.bounds();
    let limit = top_zone_limit(page, options);
    let zone = Rect::new(bounds.x0, bounds.y0, bounds.x1, limit);

    let drawings = page.drawings(&zone)?;
    if drawings.is_empty() {
        return Ok(Vec::new());
    }
    log::debug!(
        "[Logo] 页面 {} 顶部区域发现 {} 处矢量绘制",
        page.number(),
        drawings.len()
    );

    let mut regions = vec![Region::new(zone, RegionSource::Drawing, Priority::High).removal_only()];
    regions.extend(
        drawings
            .into_iter()
            .filter(|rect| rect.y0 < limit)
            .map(|rect| Region::new(rect, RegionSource::Drawing, Priority::High)),
    );
    Ok(regions)
}

/// 品牌文字：顶部区域内命中的公司后缀等词汇，向右大幅扩展以覆盖完整名称
pub fn branding_text(page: &dyn PageSurface, options: &LogoOptions) -> Result<Vec<Region>, SurfaceError> {
    let top_zone = top_zone_limit(page, options);
    let margin = &options.branding_margin;
    let mut regions = Vec::new();

    for pattern in &options.branding_patterns {
        if pattern.is_empty() {
            continue;
        }
        for hit in page.search_for(pattern)? {
            if hit.y1 >= top_zone {
                continue;
            }
            let rect = hit.expand(margin.left, margin.vertical, margin.right, margin.vertical);
            regions.push(
                Region::new(rect, RegionSource::BrandingText, Priority::High).with_pattern(pattern.clone()),
            );
        }
    }

    Ok(regions)
}

/// 顶部区域下边界（默认页高 20%）
fn top_zone_limit(page: &dyn PageSurface, options: &LogoOptions) -> f32 {
    let bounds = page.bounds();
    bounds.y0 + bounds.height() * options.top_zone_fraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::ImageProfile;
    use crate::testing::MemoryPage;

    fn options() -> LogoOptions {
        LogoOptions::default()
    }

    #[test]
    fn test_header_band_is_top_fifteen_percent() {
        let page = MemoryPage::letter(1);
        let regions = header_band(&page, &options()).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].rect, Rect::new(0.0, 0.0, 612.0, 792.0 * 0.15));
        assert_eq!(regions[0].priority, Priority::Low);
    }

    #[test]
    fn test_header_image_is_high_priority_candidate() {
        let mut page = MemoryPage::letter(1);
        page.add_image("Im0", Rect::new(0.0, 0.0, 200.0, 50.0), None);
        page.add_image("Im1", Rect::new(100.0, 400.0, 300.0, 500.0), None);

        let regions = embedded_images(&page, &options()).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].rect, Rect::new(-5.0, -5.0, 205.0, 55.0));
        assert_eq!(regions[0].priority, Priority::High);
        assert!(regions[0].candidate);
        // 页面中部的图片仍然删除，但不放水印
        assert!(!regions[1].candidate);
    }

    #[test]
    fn test_image_note_uses_profile() {
        let mut page = MemoryPage::letter(1);
        page.add_image(
            "Im0",
            Rect::new(10.0, 10.0, 110.0, 30.0),
            Some(ImageProfile {
                pixel_width: 150,
                pixel_height: 20,
                white_ratio: 0.7,
            }),
        );
        let regions = embedded_images(&page, &options()).unwrap();
        assert_eq!(regions[0].note.as_deref(), Some("Im0 150x20 logo-like"));
    }

    #[test]
    fn test_fixed_positions() {
        let page = MemoryPage::letter(1);
        let regions = fixed_positions(&page, &options()).unwrap();
        assert_eq!(regions.len(), 3);
        let bottom = 792.0 * 0.12;
        assert_eq!(regions[0].rect, Rect::new(0.0, 0.0, 612.0 * 0.40, bottom));
        assert_eq!(regions[1].rect, Rect::new(612.0 * 0.60, 0.0, 612.0, bottom));
        assert!(regions.iter().all(|r| r.priority == Priority::Medium));
    }

    #[test]
    fn test_drawings_only_in_top_zone() {
        let mut page = MemoryPage::letter(1);
        assert!(header_drawings(&page, &options()).unwrap().is_empty());

        page.drawings.push(Rect::new(50.0, 600.0, 100.0, 650.0));
        assert!(header_drawings(&page, &options()).unwrap().is_empty());

        page.drawings.push(Rect::new(50.0, 20.0, 100.0, 60.0));
        let regions = header_drawings(&page, &options()).unwrap();
        assert_eq!(regions.len(), 2);
        // 整个顶部区域删除
        assert_eq!(regions[0].rect, Rect::new(0.0, 0.0, 612.0, 792.0 * 0.2));
        assert_eq!(regions[0].priority, Priority::High);
        assert!(!regions[0].candidate);
        // 绘制本身作为水印候选
        assert_eq!(regions[1].rect, Rect::new(50.0, 20.0, 100.0, 60.0));
        assert!(regions[1].candidate);
    }

    #[test]
    fn test_branding_text_expansion() {
        let mut page = MemoryPage::letter(1);
        page.add_text("Acme Ltd", Rect::new(100.0, 40.0, 148.0, 52.0));
        page.add_text("Footer Ltd", Rect::new(100.0, 700.0, 160.0, 712.0));

        let regions = branding_text(&page, &options()).unwrap();
        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(region.pattern.as_deref(), Some("Ltd"));
        // "Ltd" 位于 "Acme Ltd" 的第 6-8 个字符
        let hit = page.search_for("Ltd").unwrap()[0];
        assert_eq!(region.rect, Rect::new(hit.x0 - 20.0, hit.y0 - 10.0, hit.x1 + 150.0, hit.y1 + 10.0));
    }
}
