//! 统一页面接口定义
//!
//! 检测、脱敏、水印与文字遮盖都只依赖 `PageSurface`，
//! 具体的 PDF 实现（内容流解析与改写）由上层 crate 提供。

use crate::error::SurfaceError;
use crate::geometry::{Point, Rect};
use crate::region::{Color, RedactionBatch};
use serde::{Deserialize, Serialize};

/// 页面上一处图片摆放
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    /// 资源名（如 `Im0`）
    pub name: String,
    pub rect: Rect,
    /// 像素特征；图片无法解码时为 None
    pub profile: Option<ImageProfile>,
}

/// 图片像素特征
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageProfile {
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// 亮度 > 240 的像素占比
    pub white_ratio: f32,
}

impl ImageProfile {
    /// 小尺寸且留白多或细长的图片更像 logo
    pub fn looks_like_logo(&self) -> bool {
        let pixels = self.pixel_width as u64 * self.pixel_height as u64;
        if !(100..=10_000).contains(&pixels) || self.pixel_width == 0 || self.pixel_height == 0 {
            return false;
        }
        let w = self.pixel_width as f32;
        let h = self.pixel_height as f32;
        self.white_ratio > 0.5 || w / h > 5.0 || h / w > 5.0
    }
}

/// 一段可提取的文字及其字号
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub rect: Rect,
    pub font_size: f32,
}

/// 矩形绘制样式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectStyle {
    pub stroke: Option<Color>,
    pub fill: Option<Color>,
    /// 填充不透明度 0-1
    pub fill_opacity: f32,
    pub line_width: f32,
    /// 虚线 [实线长度, 间隔]
    pub dash: Option<[f32; 2]>,
}

/// 插入文字使用的标准字体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }
}

/// 文字锚点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAnchor {
    /// `origin` 为基线起点
    BaselineStart,
    /// `origin` 为文字中心
    Center,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font: StandardFont,
    pub size: f32,
    pub color: Color,
    pub anchor: TextAnchor,
}

/// 页面操作接口
///
/// 读取类方法反映当前内容；`apply_redactions` 之后，先前读取到的坐标
/// 仍可作为几何数据用于绘制，但不应再用来读取内容。
pub trait PageSurface {
    /// 页码，从 1 开始
    fn number(&self) -> u32;

    /// 页面边界（页面空间）
    fn bounds(&self) -> Rect;

    /// 所有图片摆放位置
    fn images(&self) -> Result<Vec<ImagePlacement>, SurfaceError>;

    /// 与 `clip` 相交的矢量绘制边界框
    fn drawings(&self, clip: &Rect) -> Result<Vec<Rect>, SurfaceError>;

    /// 逐字（区分大小写）查找文字，返回每处出现的边界框
    fn search_for(&self, needle: &str) -> Result<Vec<Rect>, SurfaceError>;

    /// 页面上的文字片段
    fn text_spans(&self) -> Result<Vec<TextSpan>, SurfaceError>;

    /// 一次性应用整批脱敏，返回应用的请求数
    fn apply_redactions(&mut self, batch: &RedactionBatch) -> Result<usize, SurfaceError>;

    fn draw_rect(&mut self, rect: &Rect, style: &RectStyle) -> Result<(), SurfaceError>;

    fn insert_text(&mut self, origin: Point, text: &str, style: &TextStyle) -> Result<(), SurfaceError>;

    fn width(&self) -> f32 {
        self.bounds().width()
    }

    fn height(&self) -> f32 {
        self.bounds().height()
    }
}
