//! 测试用内存页面

use crate::error::SurfaceError;
use crate::geometry::{Point, Rect};
use crate::region::RedactionBatch;
use crate::surface::{ImagePlacement, ImageProfile, PageSurface, RectStyle, TextSpan, TextStyle};

/// 等宽字符的内存页面：文字按片段矩形平均分配字宽
#[derive(Debug, Clone)]
pub struct MemoryPage {
    pub number: u32,
    pub bounds: Rect,
    pub images: Vec<ImagePlacement>,
    pub drawings: Vec<Rect>,
    pub spans: Vec<TextSpan>,
    pub fail_images: bool,
    pub fail_draw: bool,
    /// 查找这些词时返回错误
    pub fail_search: Vec<String>,
    pub applied: Vec<RedactionBatch>,
    pub drawn: Vec<(Rect, RectStyle)>,
    pub inserted: Vec<(Point, String, TextStyle)>,
}

impl MemoryPage {
    /// US Letter 612x792
    pub fn letter(number: u32) -> Self {
        Self {
            number,
            bounds: Rect::new(0.0, 0.0, 612.0, 792.0),
            images: Vec::new(),
            drawings: Vec::new(),
            spans: Vec::new(),
            fail_images: false,
            fail_draw: false,
            fail_search: Vec::new(),
            applied: Vec::new(),
            drawn: Vec::new(),
            inserted: Vec::new(),
        }
    }

    pub fn add_image(&mut self, name: &str, rect: Rect, profile: Option<ImageProfile>) {
        self.images.push(ImagePlacement {
            name: name.to_string(),
            rect,
            profile,
        });
    }

    /// 字号取矩形高度
    pub fn add_text(&mut self, text: &str, rect: Rect) {
        self.add_span(text, rect, rect.height());
    }

    pub fn add_span(&mut self, text: &str, rect: Rect, font_size: f32) {
        self.spans.push(TextSpan {
            text: text.to_string(),
            rect,
            font_size,
        });
    }

    /// 当前全部文字（片段之间以换行分隔）
    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn char_rect(span: &TextSpan, index: usize, len: usize) -> Rect {
        let count = span.text.chars().count().max(1);
        let cw = span.rect.width() / count as f32;
        Rect::new(
            span.rect.x0 + cw * index as f32,
            span.rect.y0,
            span.rect.x0 + cw * (index + len) as f32,
            span.rect.y1,
        )
    }
}

impl PageSurface for MemoryPage {
    fn number(&self) -> u32 {
        self.number
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn images(&self) -> Result<Vec<ImagePlacement>, SurfaceError> {
        if self.fail_images {
            return Err(SurfaceError::Content("broken image stream".to_string()));
        }
        Ok(self.images.clone())
    }

    fn drawings(&self, clip: &Rect) -> Result<Vec<Rect>, SurfaceError> {
        Ok(self.drawings.iter().filter(|d| d.intersects(clip)).copied().collect())
    }

    fn search_for(&self, needle: &str) -> Result<Vec<Rect>, SurfaceError> {
        if self.fail_search.iter().any(|w| w == needle) {
            return Err(SurfaceError::Other(format!("search failed for {}", needle)));
        }
        let len = needle.chars().count();
        let mut hits = Vec::new();
        for span in &self.spans {
            for (byte, _) in span.text.match_indices(needle) {
                let index = span.text[..byte].chars().count();
                hits.push(Self::char_rect(span, index, len));
            }
        }
        Ok(hits)
    }

    fn text_spans(&self) -> Result<Vec<TextSpan>, SurfaceError> {
        Ok(self.spans.clone())
    }

    fn apply_redactions(&mut self, batch: &RedactionBatch) -> Result<usize, SurfaceError> {
        let rects = batch.rects();
        for span in &mut self.spans {
            let snapshot = span.clone();
            span.text = snapshot
                .text
                .chars()
                .enumerate()
                .map(|(i, c)| {
                    let cell = Self::char_rect(&snapshot, i, 1);
                    if rects.iter().any(|r| r.intersects(&cell)) {
                        ' '
                    } else {
                        c
                    }
                })
                .collect();
        }
        self.images.retain(|img| !rects.iter().any(|r| r.intersects(&img.rect)));
        self.drawings.retain(|d| !rects.iter().any(|r| r.contains_rect(d)));
        self.applied.push(batch.clone());
        Ok(batch.len())
    }

    fn draw_rect(&mut self, rect: &Rect, style: &RectStyle) -> Result<(), SurfaceError> {
        if self.fail_draw {
            return Err(SurfaceError::Other("draw rejected".to_string()));
        }
        self.drawn.push((*rect, style.clone()));
        Ok(())
    }

    fn insert_text(&mut self, origin: Point, text: &str, style: &TextStyle) -> Result<(), SurfaceError> {
        self.inserted.push((origin, text.to_string(), style.clone()));
        Ok(())
    }
}
