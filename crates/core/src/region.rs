//! 候选区域与脱敏请求

use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

/// 区域来源（由哪条启发式产生）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionSource {
    HeaderArea,
    Image,
    FixedPosition,
    Drawing,
    BrandingText,
}

impl RegionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionSource::HeaderArea => "header-area",
            RegionSource::Image => "image",
            RegionSource::FixedPosition => "fixed-position",
            RegionSource::Drawing => "drawing",
            RegionSource::BrandingText => "branding-text",
        }
    }
}

/// 置信度排序，数值越小越可能是真实 logo
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Priority {
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

/// 候选 logo 区域
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub rect: Rect,
    pub source: RegionSource,
    pub priority: Priority,
    /// 命中的品牌文字（仅 branding-text）
    pub pattern: Option<String>,
    /// 是否参与水印占位；页面下方的图片只删除，不放水印
    pub candidate: bool,
    /// 附加说明（如图片资源名与像素尺寸），写入日志
    pub note: Option<String>,
}

impl Region {
    pub fn new(rect: Rect, source: RegionSource, priority: Priority) -> Self {
        Self {
            rect,
            source,
            priority,
            pattern: None,
            candidate: true,
            note: None,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// 只删除、不作为水印候选
    pub fn removal_only(mut self) -> Self {
        self.candidate = false;
        self
    }
}

/// RGB 颜色，分量范围 0-1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// 一次脱敏请求：删除矩形内的内容并用纯色填充
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RedactionRequest {
    pub rect: Rect,
    pub fill: Color,
}

impl RedactionRequest {
    pub fn white(rect: Rect) -> Self {
        Self {
            rect,
            fill: Color::WHITE,
        }
    }
}

/// 单页待应用的脱敏批次
///
/// 同一矩形、同一颜色的请求只保留一份，重复排队不会重复填充。
#[derive(Debug, Clone, Default)]
pub struct RedactionBatch {
    requests: Vec<RedactionRequest>,
}

impl RedactionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入请求；返回是否为新请求
    pub fn push(&mut self, request: RedactionRequest) -> bool {
        if request.rect.is_empty() || self.requests.contains(&request) {
            return false;
        }
        self.requests.push(request);
        true
    }

    pub fn extend_regions<'a>(&mut self, regions: impl IntoIterator<Item = &'a Region>) {
        for region in regions {
            self.push(RedactionRequest::white(region.rect));
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn requests(&self) -> &[RedactionRequest] {
        &self.requests
    }

    pub fn rects(&self) -> Vec<Rect> {
        self.requests.iter().map(|r| r.rect).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let mut p = vec![Priority::Low, Priority::High, Priority::Medium];
        p.sort();
        assert_eq!(p, vec![Priority::High, Priority::Medium, Priority::Low]);
        assert_eq!(Priority::Medium.rank(), 2);
    }

    #[test]
    fn test_batch_deduplicates_same_fill() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let mut batch = RedactionBatch::new();
        assert!(batch.push(RedactionRequest::white(rect)));
        assert!(!batch.push(RedactionRequest::white(rect)));
        // 不同颜色视为不同请求
        assert!(batch.push(RedactionRequest {
            rect,
            fill: Color::BLACK
        }));
        // 空矩形直接丢弃
        assert!(!batch.push(RedactionRequest::white(Rect::new(5.0, 5.0, 5.0, 9.0))));
        assert_eq!(batch.len(), 2);
    }
}
