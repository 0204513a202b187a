//! 页面几何工具
//!
//! 所有坐标均为页面空间（单位：pt），原点在页面左上角，Y 轴向下。
//! PDF 用户空间（原点左下角）到页面空间的转换由 PDF 后端负责。

use serde::{Deserialize, Serialize};

/// 页面上的一个点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 轴对齐矩形 (x0, y0) - (x1, y1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// 由两个角点构造，自动归一化
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x0: a.x.min(b.x),
            y0: a.y.min(b.y),
            x1: a.x.max(b.x),
            y1: a.y.max(b.y),
        }
    }

    /// 包含所有点的最小矩形
    pub fn bounding(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut rect = Self::new(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            rect.x0 = rect.x0.min(p.x);
            rect.y0 = rect.y0.min(p.y);
            rect.x1 = rect.x1.max(p.x);
            rect.y1 = rect.y1.max(p.y);
        }
        Some(rect)
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn center(&self) -> Point {
        Point::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// 四周各扩展指定距离（负数为收缩）
    pub fn expand(&self, left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            x0: self.x0 - left,
            y0: self.y0 - top,
            x1: self.x1 + right,
            y1: self.y1 + bottom,
        }
    }

    pub fn expand_uniform(&self, margin: f32) -> Self {
        self.expand(margin, margin, margin, margin)
    }

    /// 交集；不相交时返回 None
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let rect = Rect {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        };
        if rect.is_empty() {
            None
        } else {
            Some(rect)
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }

    pub fn intersection_area(&self, other: &Rect) -> f32 {
        self.intersection(other).map(|r| r.area()).unwrap_or(0.0)
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    /// 裁剪到边界内
    pub fn clip_to(&self, bounds: &Rect) -> Rect {
        Rect {
            x0: self.x0.max(bounds.x0),
            y0: self.y0.max(bounds.y0),
            x1: self.x1.min(bounds.x1),
            y1: self.y1.min(bounds.y1),
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// 保持中心不变，调整为 `width` × `height`
    pub fn grow_centered(&self, width: f32, height: f32) -> Rect {
        let c = self.center();
        Rect {
            x0: c.x - width / 2.0,
            y0: c.y - height / 2.0,
            x1: c.x + width / 2.0,
            y1: c.y + height / 2.0,
        }
    }
}

/// 交集面积是否超过任一矩形面积的 `ratio`
pub fn overlap_exceeds(a: &Rect, b: &Rect, ratio: f32) -> bool {
    let shared = a.intersection_area(b);
    if shared <= 0.0 {
        return false;
    }
    shared > ratio * a.area() || shared > ratio * b.area()
}
