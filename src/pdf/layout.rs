//! 内容流版面解析
//!
//! 逐个操作符跟踪图形状态与文字状态，得到每个字形、图片、表单和路径在
//! 页面坐标（左上角原点）中的位置，并记录其在操作序列中的下标，供改写使用。
//! 表单 XObject 的内容按 `Matrix × CTM` 递归解析，结果带上所属表单的路径。

use std::ops::Range;

use lopdf::{content::Operation, Object};
use shield_core::{Point, Rect, TextSpan};

use super::fonts::FontMetrics;
use super::snapshot::ContentScope;
use super::utils::{get_number, matrix_from_operands, multiply, transform, Matrix, PageBox, IDENTITY};

/// 字形下沿、上沿（相对字号）
const GLYPH_DESCENT: f32 = -0.2;
const GLYPH_ASCENT: f32 = 0.8;

/// 进入一个表单的 `Do` 调用
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormStep {
    /// `Do` 在上层操作序列中的下标
    pub op_index: usize,
    pub name: String,
}

/// 从页面到某段内容流经过的表单；空路径即页面自身
pub type ContentPath = Vec<FormStep>;

/// 一个已绘制的字形
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub owner: ContentPath,
    /// 所在操作的下标
    pub op_index: usize,
    /// TJ 数组内的元素下标；Tj / ' / " 为 0
    pub item_index: usize,
    pub byte_start: usize,
    pub byte_len: usize,
    pub text: String,
    pub rect: Rect,
    /// 基线在页面坐标中的 y
    pub baseline: f32,
    pub font: String,
    /// 页面上的有效字号
    pub font_size: f32,
    /// 字宽（1/1000 em）
    pub width: f32,
    /// Tf 设置的字号
    pub tfs: f32,
    pub char_spacing: f32,
    pub word_spacing: f32,
    pub is_space: bool,
}

impl Glyph {
    /// 删除该字形后，为保持后续字形位置需要插入的 TJ 数值
    pub fn removal_adjustment(&self) -> f32 {
        if self.tfs == 0.0 {
            return 0.0;
        }
        let spacing = self.char_spacing + if self.is_space { self.word_spacing } else { 0.0 };
        -(self.width + spacing * 1000.0 / self.tfs)
    }
}

/// XObject 种类
#[derive(Debug, Clone, PartialEq)]
pub enum XObjectKind {
    Image,
    Form { bbox: Rect, matrix: Matrix },
    Other,
}

/// 一次 `Do` 调用
#[derive(Debug, Clone, PartialEq)]
pub struct XObjectUse {
    pub owner: ContentPath,
    pub op_index: usize,
    pub name: String,
    pub rect: Rect,
    pub is_image: bool,
}

/// 一条已绘制的路径，`ops` 覆盖从构造到绘制的全部操作
#[derive(Debug, Clone, PartialEq)]
pub struct PathUse {
    pub owner: ContentPath,
    pub ops: Range<usize>,
    pub rect: Rect,
}

/// 同一基线上的一行文字
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLine {
    pub text: String,
    /// 与 `text.char_indices()` 一一对应；补出的空格为 None
    slots: Vec<Option<usize>>,
}

impl TextLine {
    fn push(&mut self, text: &str, glyph: Option<usize>) {
        for c in text.chars() {
            self.text.push(c);
            self.slots.push(glyph);
        }
    }

    /// 字节区间内的字形下标
    fn glyphs_in(&self, range: Range<usize>) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .text
            .char_indices()
            .zip(self.slots.iter())
            .filter(|((offset, _), _)| range.contains(offset))
            .filter_map(|(_, slot)| *slot)
            .collect();
        out.dedup();
        out
    }
}

/// 一个单词及其边界框
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub glyphs: Vec<Glyph>,
    pub xobjects: Vec<XObjectUse>,
    pub paths: Vec<PathUse>,
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
    font: Option<String>,
    font_size: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            font: None,
            font_size: 12.0,
        }
    }
}

struct Interpreter<'a> {
    page_box: &'a PageBox,
    fallback_font: FontMetrics,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    path_start: Option<usize>,
    path_points: Vec<Point>,
    path_clip: bool,
    owner: ContentPath,
    layout: PageLayout,
}

fn name_operand(operands: &[Object], index: usize) -> Option<String> {
    match operands.get(index) {
        Some(Object::Name(name)) => Some(String::from_utf8_lossy(name).to_string()),
        _ => None,
    }
}

fn number_operand(operands: &[Object], index: usize) -> Option<f32> {
    operands.get(index).and_then(get_number)
}

fn translation(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

impl<'a> Interpreter<'a> {
    fn to_page(&self, m: &Matrix, x: f32, y: f32) -> Point {
        let (ux, uy) = transform(m, x, y);
        self.page_box.to_page(ux, uy)
    }

    fn current_font<'s>(&'s self, scope: &'s ContentScope) -> &'s FontMetrics {
        self.state
            .font
            .as_ref()
            .and_then(|key| scope.fonts.get(key))
            .unwrap_or(&self.fallback_font)
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = multiply(&translation(tx, 0.0), &self.text_matrix);
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&translation(tx, ty), &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn show_string(&mut self, scope: &ContentScope, op_index: usize, item_index: usize, bytes: &[u8]) {
        let decoded = self.current_font(scope).decode(bytes);
        let tfs = self.state.font_size;
        let th = self.state.horizontal_scale;
        let font_key = self.state.font.clone().unwrap_or_default();

        for glyph in decoded {
            let user = multiply(&self.text_matrix, &self.state.ctm);
            let render = multiply(&[tfs * th, 0.0, 0.0, tfs, 0.0, self.state.rise], &user);
            let w = glyph.width / 1000.0;
            let corners = [
                self.to_page(&render, 0.0, GLYPH_DESCENT),
                self.to_page(&render, w, GLYPH_DESCENT),
                self.to_page(&render, 0.0, GLYPH_ASCENT),
                self.to_page(&render, w, GLYPH_ASCENT),
            ];
            let origin = self.to_page(&render, 0.0, 0.0);
            let effective_size = tfs.abs() * (user[2] * user[2] + user[3] * user[3]).sqrt();

            let word_spacing = if glyph.is_space { self.state.word_spacing } else { 0.0 };
            let tx = (w * tfs + self.state.char_spacing + word_spacing) * th;

            if let Some(rect) = Rect::bounding(&corners) {
                self.layout.glyphs.push(Glyph {
                    owner: self.owner.clone(),
                    op_index,
                    item_index,
                    byte_start: glyph.byte_start,
                    byte_len: glyph.byte_len,
                    text: glyph.text,
                    rect,
                    baseline: origin.y,
                    font: font_key.clone(),
                    font_size: effective_size,
                    width: glyph.width,
                    tfs,
                    char_spacing: self.state.char_spacing,
                    word_spacing: self.state.word_spacing,
                    is_space: glyph.is_space,
                });
            }
            self.advance(tx);
        }
    }

    fn show_array(&mut self, scope: &ContentScope, op_index: usize, items: &[Object]) {
        for (item_index, item) in items.iter().enumerate() {
            match item {
                Object::String(bytes, _) => self.show_string(scope, op_index, item_index, bytes),
                other => {
                    if let Some(n) = get_number(other) {
                        let tx = -n / 1000.0 * self.state.font_size * self.state.horizontal_scale;
                        self.advance(tx);
                    }
                }
            }
        }
    }

    fn add_path_points(&mut self, op_index: usize, points: &[(f32, f32)]) {
        if self.path_start.is_none() {
            self.path_start = Some(op_index);
        }
        let ctm = self.state.ctm;
        for (x, y) in points {
            let p = self.to_page(&ctm, *x, *y);
            self.path_points.push(p);
        }
    }

    fn finish_path(&mut self, op_index: usize, painted: bool) {
        if let Some(start) = self.path_start.take() {
            if painted && !self.path_clip {
                if let Some(rect) = Rect::bounding(&self.path_points) {
                    self.layout.paths.push(PathUse {
                        owner: self.owner.clone(),
                        ops: start..op_index + 1,
                        rect,
                    });
                }
            }
        }
        self.path_points.clear();
        self.path_clip = false;
    }

    fn place_xobject(&mut self, scope: &ContentScope, op_index: usize, name: String) {
        let ctm = self.state.ctm;
        let (corners, is_image) = match scope.xobjects.get(&name) {
            Some(XObjectKind::Image) => (
                [
                    self.to_page(&ctm, 0.0, 0.0),
                    self.to_page(&ctm, 1.0, 0.0),
                    self.to_page(&ctm, 0.0, 1.0),
                    self.to_page(&ctm, 1.0, 1.0),
                ],
                true,
            ),
            Some(XObjectKind::Form { bbox, matrix }) => {
                let m = multiply(matrix, &ctm);
                (
                    [
                        self.to_page(&m, bbox.x0, bbox.y0),
                        self.to_page(&m, bbox.x1, bbox.y0),
                        self.to_page(&m, bbox.x0, bbox.y1),
                        self.to_page(&m, bbox.x1, bbox.y1),
                    ],
                    false,
                )
            }
            _ => {
                log::debug!("[Layout] 跳过未知 XObject: {}", name);
                return;
            }
        };
        if let Some(rect) = Rect::bounding(&corners) {
            self.layout.xobjects.push(XObjectUse {
                owner: self.owner.clone(),
                op_index,
                name: name.clone(),
                rect,
                is_image,
            });
        }
        if let (false, Some(form), Some(XObjectKind::Form { matrix, .. })) =
            (is_image, scope.forms.get(&name), scope.xobjects.get(&name))
        {
            self.run_form(form.operations.as_slice(), &form.scope, multiply(matrix, &ctm), op_index, name);
        }
    }

    /// 执行表单内容：图形状态在表单内外隔离，文字矩阵与未完成路径不跨越边界
    fn run_form(&mut self, ops: &[Operation], scope: &ContentScope, ctm: Matrix, op_index: usize, name: String) {
        let saved_state = self.state.clone();
        let saved_depth = self.stack.len();
        let saved_text = (self.text_matrix, self.line_matrix);

        self.state.ctm = ctm;
        self.path_start = None;
        self.path_points.clear();
        self.owner.push(FormStep { op_index, name });
        self.run(ops, scope);
        self.owner.pop();

        self.stack.truncate(saved_depth);
        self.state = saved_state;
        (self.text_matrix, self.line_matrix) = saved_text;
        self.path_start = None;
        self.path_points.clear();
        self.path_clip = false;
    }

    fn run(&mut self, ops: &[Operation], scope: &ContentScope) {
        for (index, op) in ops.iter().enumerate() {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => self.stack.push(self.state.clone()),
                "Q" => {
                    if let Some(saved) = self.stack.pop() {
                        self.state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_from_operands(operands) {
                        self.state.ctm = multiply(&m, &self.state.ctm);
                    }
                }
                "BT" => {
                    self.text_matrix = IDENTITY;
                    self.line_matrix = IDENTITY;
                }
                "Tm" => {
                    if let Some(m) = matrix_from_operands(operands) {
                        self.text_matrix = m;
                        self.line_matrix = m;
                    }
                }
                "Td" => {
                    if let (Some(tx), Some(ty)) = (number_operand(operands, 0), number_operand(operands, 1)) {
                        self.next_line(tx, ty);
                    }
                }
                "TD" => {
                    if let (Some(tx), Some(ty)) = (number_operand(operands, 0), number_operand(operands, 1)) {
                        self.state.leading = -ty;
                        self.next_line(tx, ty);
                    }
                }
                "T*" => self.next_line(0.0, -self.state.leading),
                "Tc" => {
                    if let Some(v) = number_operand(operands, 0) {
                        self.state.char_spacing = v;
                    }
                }
                "Tw" => {
                    if let Some(v) = number_operand(operands, 0) {
                        self.state.word_spacing = v;
                    }
                }
                "Tz" => {
                    if let Some(v) = number_operand(operands, 0) {
                        self.state.horizontal_scale = v / 100.0;
                    }
                }
                "TL" => {
                    if let Some(v) = number_operand(operands, 0) {
                        self.state.leading = v;
                    }
                }
                "Ts" => {
                    if let Some(v) = number_operand(operands, 0) {
                        self.state.rise = v;
                    }
                }
                "Tf" => {
                    self.state.font = name_operand(operands, 0);
                    if let Some(size) = number_operand(operands, 1) {
                        self.state.font_size = size;
                    }
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show_string(scope, index, 0, bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        self.show_array(scope, index, items);
                    }
                }
                "'" => {
                    self.next_line(0.0, -self.state.leading);
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show_string(scope, index, 0, bytes);
                    }
                }
                "\"" => {
                    if let (Some(aw), Some(ac)) = (number_operand(operands, 0), number_operand(operands, 1)) {
                        self.state.word_spacing = aw;
                        self.state.char_spacing = ac;
                    }
                    self.next_line(0.0, -self.state.leading);
                    if let Some(Object::String(bytes, _)) = operands.get(2) {
                        self.show_string(scope, index, 0, bytes);
                    }
                }
                "Do" => {
                    if let Some(name) = name_operand(operands, 0) {
                        self.place_xobject(scope, index, name);
                    }
                }
                "m" | "l" => {
                    if let (Some(x), Some(y)) = (number_operand(operands, 0), number_operand(operands, 1)) {
                        self.add_path_points(index, &[(x, y)]);
                    }
                }
                "c" | "v" | "y" => {
                    let values: Vec<f32> = operands.iter().filter_map(get_number).collect();
                    let points: Vec<(f32, f32)> = values.chunks(2).filter(|c| c.len() == 2).map(|c| (c[0], c[1])).collect();
                    self.add_path_points(index, &points);
                }
                "re" => {
                    let values: Vec<f32> = operands.iter().filter_map(get_number).collect();
                    if values.len() == 4 {
                        let (x, y, w, h) = (values[0], values[1], values[2], values[3]);
                        self.add_path_points(index, &[(x, y), (x + w, y), (x, y + h), (x + w, y + h)]);
                    }
                }
                "h" => {
                    if self.path_start.is_none() {
                        self.path_start = Some(index);
                    }
                }
                "W" | "W*" => self.path_clip = true,
                "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => self.finish_path(index, true),
                "n" => self.finish_path(index, false),
                _ => {}
            }
        }
    }
}

/// 解析一页的操作序列，连同其中可解析的表单
pub fn analyze(ops: &[Operation], scope: &ContentScope, page_box: &PageBox) -> PageLayout {
    let mut interpreter = Interpreter {
        page_box,
        fallback_font: FontMetrics::fallback(),
        state: GraphicsState::default(),
        stack: Vec::new(),
        text_matrix: IDENTITY,
        line_matrix: IDENTITY,
        path_start: None,
        path_points: Vec::new(),
        path_clip: false,
        owner: ContentPath::new(),
        layout: PageLayout::default(),
    };
    interpreter.run(ops, scope);
    interpreter.layout
}

fn union_rects(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
    rects.into_iter().reduce(|a, b| a.union(&b))
}

impl PageLayout {
    /// 按基线把字形分行，字形间距较大处补一个空格
    pub fn lines(&self) -> Vec<TextLine> {
        let mut lines = Vec::new();
        let mut current: Option<TextLine> = None;
        let mut last: Option<&Glyph> = None;

        for (index, glyph) in self.glyphs.iter().enumerate() {
            if glyph.text.is_empty() {
                continue;
            }
            let tolerance = (glyph.font_size * 0.5).max(1.0);
            let same_line = last.map_or(false, |prev| {
                (prev.baseline - glyph.baseline).abs() <= tolerance && glyph.rect.x0 >= prev.rect.x0 - tolerance
            });

            if !same_line {
                if let Some(line) = current.take() {
                    lines.push(line);
                }
            }
            let line = current.get_or_insert_with(TextLine::default);

            if let (true, Some(prev)) = (same_line, last) {
                let gap = glyph.rect.x0 - prev.rect.x1;
                if gap > glyph.font_size * 0.25
                    && !prev.text.ends_with(char::is_whitespace)
                    && !glyph.text.starts_with(char::is_whitespace)
                {
                    line.push(" ", None);
                }
            }
            line.push(&glyph.text, Some(index));
            last = Some(glyph);
        }

        if let Some(line) = current {
            lines.push(line);
        }
        lines
    }

    /// 全部可提取文字，每行一段
    pub fn text(&self) -> String {
        self.lines().into_iter().map(|l| l.text).collect::<Vec<_>>().join("\n")
    }

    /// 区分大小写查找，返回每处出现的边界框
    pub fn search(&self, needle: &str) -> Vec<Rect> {
        if needle.is_empty() {
            return Vec::new();
        }
        let mut hits = Vec::new();
        for line in self.lines() {
            for (start, found) in line.text.match_indices(needle) {
                let glyphs = line.glyphs_in(start..start + found.len());
                if let Some(rect) = union_rects(glyphs.iter().map(|i| self.glyphs[*i].rect)) {
                    hits.push(rect);
                }
            }
        }
        hits
    }

    /// 按字体与字号切分的文字片段
    pub fn spans(&self) -> Vec<TextSpan> {
        let mut spans = Vec::new();
        for line in self.lines() {
            let mut current: Option<(TextSpan, String)> = None;
            for (c, slot) in line.text.chars().zip(line.slots.iter()) {
                let Some(index) = slot else {
                    if let Some((span, _)) = current.as_mut() {
                        span.text.push(c);
                    }
                    continue;
                };
                let glyph = &self.glyphs[*index];
                let same_run = current.as_ref().map_or(false, |(span, font)| {
                    *font == glyph.font && (span.font_size - glyph.font_size).abs() < 0.01
                });
                if same_run {
                    if let Some((span, _)) = current.as_mut() {
                        span.text.push(c);
                        span.rect = span.rect.union(&glyph.rect);
                    }
                } else {
                    if let Some((span, _)) = current.take() {
                        spans.push(span);
                    }
                    current = Some((
                        TextSpan {
                            text: c.to_string(),
                            rect: glyph.rect,
                            font_size: glyph.font_size,
                        },
                        glyph.font.clone(),
                    ));
                }
            }
            if let Some((span, _)) = current {
                spans.push(span);
            }
        }
        spans
    }

    /// 以空白切分的单词
    pub fn words(&self) -> Vec<Word> {
        let mut words = Vec::new();
        for line in self.lines() {
            let mut text = String::new();
            let mut rect: Option<Rect> = None;
            for (c, slot) in line.text.chars().zip(line.slots.iter()) {
                if c.is_whitespace() {
                    if let Some(r) = rect.take() {
                        words.push(Word {
                            text: std::mem::take(&mut text),
                            rect: r,
                        });
                    }
                    text.clear();
                    continue;
                }
                text.push(c);
                if let Some(index) = slot {
                    let glyph_rect = self.glyphs[*index].rect;
                    rect = Some(rect.map_or(glyph_rect, |r| r.union(&glyph_rect)));
                }
            }
            if let Some(r) = rect {
                words.push(Word { text, rect: r });
            }
        }
        words
    }

    pub fn images(&self) -> impl Iterator<Item = &XObjectUse> {
        self.xobjects.iter().filter(|x| x.is_image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Content;
    use shield_core::StandardFont;

    use crate::pdf::snapshot::FormSource;

    fn letter() -> PageBox {
        PageBox {
            llx: 0.0,
            lly: 0.0,
            urx: 612.0,
            ury: 792.0,
            rotation: 0,
        }
    }

    fn scope() -> ContentScope {
        let mut scope = ContentScope::default();
        scope.fonts.insert("F1".to_string(), FontMetrics::standard(StandardFont::Helvetica));
        scope.xobjects.insert("Im0".to_string(), XObjectKind::Image);
        scope.xobjects.insert(
            "Fm0".to_string(),
            XObjectKind::Form {
                bbox: Rect::new(0.0, 0.0, 10.0, 10.0),
                matrix: IDENTITY,
            },
        );
        scope
    }

    fn decode(content: &str) -> Vec<Operation> {
        Content::decode(content.as_bytes()).unwrap().operations
    }

    fn layout_of(content: &str) -> PageLayout {
        analyze(&decode(content), &scope(), &letter())
    }

    #[test]
    fn test_glyph_positions() {
        let layout = layout_of("BT /F1 10 Tf 100 700 Td (AB) Tj ET");
        assert_eq!(layout.glyphs.len(), 2);

        let a = &layout.glyphs[0];
        assert!((a.rect.x0 - 100.0).abs() < 0.01);
        assert!((a.rect.x1 - 106.67).abs() < 0.01);
        assert!((a.baseline - 92.0).abs() < 0.01);
        // 上沿 0.8em，下沿 0.2em
        assert!((a.rect.y0 - 84.0).abs() < 0.01);
        assert!((a.rect.y1 - 94.0).abs() < 0.01);

        let b = &layout.glyphs[1];
        assert!((b.rect.x0 - 106.67).abs() < 0.01);
        assert_eq!(b.byte_start, 1);
    }

    #[test]
    fn test_search_across_tj_items() {
        let layout = layout_of("BT /F1 12 Tf 72 720 Td [(Conf) -20 (idential) ( report)] TJ ET");
        let hits = layout.search("Confidential");
        assert_eq!(hits.len(), 1);
        assert!((hits[0].x0 - 72.0).abs() < 0.01);
        assert!(layout.search("confidential").is_empty());
        assert_eq!(layout.text(), "Confidential report");
    }

    #[test]
    fn test_lines_and_virtual_spaces() {
        let layout = layout_of(
            "BT /F1 12 Tf 72 720 Td (Hello) Tj 100 0 Td (World) Tj 0 -20 Td (Next) Tj ET",
        );
        let lines = layout.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Hello World");
        assert_eq!(lines[1].text, "Next");

        let words = layout.words();
        assert_eq!(words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>(), vec!["Hello", "World", "Next"]);
    }

    #[test]
    fn test_spans_split_by_size() {
        let layout = layout_of("BT /F1 12 Tf 72 720 Td (Big) Tj /F1 4 Tf (tiny) Tj ET");
        let spans = layout.spans();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "Big");
        assert_eq!(spans[1].text, "tiny");
        assert!((spans[1].font_size - 4.0).abs() < 0.01);
    }

    #[test]
    fn test_images_forms_and_paths() {
        let layout = layout_of(
            "q 200 0 0 50 10 732 cm /Im0 Do Q \
             q 1 0 0 1 300 700 cm /Fm0 Do Q \
             0 0 m 10 10 l S \
             50 50 100 100 re W n \
             20 20 5 5 re f",
        );
        let images: Vec<_> = layout.images().collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].rect, Rect::new(10.0, 10.0, 210.0, 60.0));

        let form = layout.xobjects.iter().find(|x| !x.is_image).unwrap();
        assert_eq!(form.rect, Rect::new(300.0, 82.0, 310.0, 92.0));

        // 裁剪路径不记录
        assert_eq!(layout.paths.len(), 2);
        assert_eq!(layout.paths[0].ops, 8..11);
        assert_eq!(layout.paths[1].rect, Rect::new(20.0, 767.0, 25.0, 772.0));
    }

    #[test]
    fn test_removal_adjustment() {
        let layout = layout_of("BT /F1 10 Tf 2 Tc 5 Tw ( ) Tj ET");
        let space = &layout.glyphs[0];
        assert!(space.is_space);
        // -(278 + (2 + 5) * 1000 / 10)
        assert!((space.removal_adjustment() + 978.0).abs() < 0.01);
    }

    #[test]
    fn test_form_content_is_interpreted() {
        let mut scope = scope();
        let mut form_scope = ContentScope::default();
        form_scope.fonts = scope.fonts.clone();
        scope.forms.insert(
            "Fm0".to_string(),
            FormSource {
                dict: lopdf::Dictionary::new(),
                operations: decode("BT /F1 10 Tf 0 0 Td (Logo) Tj ET"),
                scope: form_scope,
            },
        );
        scope.xobjects.insert(
            "Fm0".to_string(),
            XObjectKind::Form {
                bbox: Rect::new(0.0, 0.0, 100.0, 20.0),
                matrix: [1.0, 0.0, 0.0, 1.0, 0.0, 10.0],
            },
        );

        let ops = decode("BT /F1 12 Tf 72 400 Td (Body) Tj ET q 1 0 0 1 50 700 cm /Fm0 Do Q (after) Tj");
        let layout = analyze(&ops, &scope, &letter());

        let hits = layout.search("Logo");
        assert_eq!(hits.len(), 1);
        // 表单矩阵 (0, 10) 再叠加 cm (50, 700)，基线在 PDF y=710
        assert!((hits[0].x0 - 50.0).abs() < 0.01);
        let logo = layout.glyphs.iter().find(|g| g.text == "L").unwrap();
        assert!((logo.baseline - 82.0).abs() < 0.01);
        assert_eq!(
            logo.owner,
            vec![FormStep {
                op_index: 7,
                name: "Fm0".to_string()
            }]
        );
        assert!(layout.glyphs.iter().filter(|g| g.text == "B").all(|g| g.owner.is_empty()));

        // 表单外的文字矩阵不受表单内 BT/Td 影响
        let after = layout.glyphs.iter().find(|g| g.text == "a").unwrap();
        assert!(after.owner.is_empty());
        assert!((after.baseline - 392.0).abs() < 0.01);
    }
}
