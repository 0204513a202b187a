use std::collections::BTreeMap;
use std::ops::Range;

use lopdf::{content::Operation, Object, StringFormat};
use shield_core::{Color, Rect, RectStyle};

use super::layout::Glyph;

/// 字形是否被脱敏区域覆盖：中心点落在区域内，或重叠面积过半
pub fn covers_glyph(area: &Rect, glyph: &Glyph) -> bool {
    let center = glyph.rect.center();
    if center.x >= area.x0 && center.x <= area.x1 && center.y >= area.y0 && center.y <= area.y1 {
        return true;
    }
    let glyph_area = glyph.rect.area();
    glyph_area > 0.0 && area.intersection_area(&glyph.rect) / glyph_area >= 0.5
}

/// 待删除的一个字形
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphCut {
    pub item_index: usize,
    pub bytes: Range<usize>,
    /// 补偿位移（TJ 数值）
    pub adjustment: f32,
}

impl From<&Glyph> for GlyphCut {
    fn from(glyph: &Glyph) -> Self {
        Self {
            item_index: glyph.item_index,
            bytes: glyph.byte_start..glyph.byte_start + glyph.byte_len,
            adjustment: glyph.removal_adjustment(),
        }
    }
}

/// 按操作下标分组
pub fn group_cuts<'a>(glyphs: impl IntoIterator<Item = &'a Glyph>) -> BTreeMap<usize, Vec<GlyphCut>> {
    let mut grouped: BTreeMap<usize, Vec<GlyphCut>> = BTreeMap::new();
    for glyph in glyphs {
        grouped.entry(glyph.op_index).or_default().push(GlyphCut::from(glyph));
    }
    grouped
}

fn push_adjustment(out: &mut Vec<Object>, adjustment: f32) {
    if adjustment == 0.0 {
        return;
    }
    let merged = match out.last() {
        Some(Object::Real(n)) => Some(*n + adjustment),
        Some(Object::Integer(n)) => Some(*n as f32 + adjustment),
        _ => None,
    };
    match merged {
        Some(value) => {
            let last = out.len() - 1;
            out[last] = Object::Real(value);
        }
        None => out.push(Object::Real(adjustment)),
    }
}

/// 删除字符串中被覆盖的字形，用数值位移替代以保持后续字形位置
fn cut_string(bytes: &[u8], format: StringFormat, cuts: &[&GlyphCut], out: &mut Vec<Object>) {
    let mut kept: Vec<u8> = Vec::new();
    let mut position = 0;
    let mut ordered: Vec<&&GlyphCut> = cuts.iter().collect();
    ordered.sort_by_key(|c| c.bytes.start);

    for cut in ordered {
        if cut.bytes.start < position || cut.bytes.end > bytes.len() {
            continue;
        }
        kept.extend_from_slice(&bytes[position..cut.bytes.start]);
        if !kept.is_empty() {
            out.push(Object::String(std::mem::take(&mut kept), format));
        }
        push_adjustment(out, cut.adjustment);
        position = cut.bytes.end;
    }
    kept.extend_from_slice(&bytes[position..]);
    if !kept.is_empty() {
        out.push(Object::String(kept, format));
    }
}

fn string_operand(obj: Option<&Object>) -> Option<(&[u8], StringFormat)> {
    match obj {
        Some(Object::String(bytes, format)) => Some((bytes.as_slice(), *format)),
        _ => None,
    }
}

fn cuts_for(cuts: &[GlyphCut], item: usize) -> Vec<&GlyphCut> {
    cuts.iter().filter(|c| c.item_index == item).collect()
}

/// 改写一个文字显示操作；`'` 和 `"` 拆成换行加 TJ
pub fn rewrite_text_op(op: &Operation, cuts: &[GlyphCut]) -> Vec<Operation> {
    let mut items: Vec<Object> = Vec::new();
    let mut prefix: Vec<Operation> = Vec::new();

    match op.operator.as_str() {
        "Tj" | "'" => {
            let Some((bytes, format)) = string_operand(op.operands.first()) else {
                return vec![op.clone()];
            };
            cut_string(bytes, format, &cuts_for(cuts, 0), &mut items);
            if op.operator == "'" {
                prefix.push(Operation::new("T*", vec![]));
            }
        }
        "\"" => {
            let Some((bytes, format)) = string_operand(op.operands.get(2)) else {
                return vec![op.clone()];
            };
            cut_string(bytes, format, &cuts_for(cuts, 0), &mut items);
            prefix.push(Operation::new("Tw", vec![op.operands[0].clone()]));
            prefix.push(Operation::new("Tc", vec![op.operands[1].clone()]));
            prefix.push(Operation::new("T*", vec![]));
        }
        "TJ" => {
            let Some(Object::Array(array)) = op.operands.first() else {
                return vec![op.clone()];
            };
            for (index, item) in array.iter().enumerate() {
                match item {
                    Object::String(bytes, format) => cut_string(bytes, *format, &cuts_for(cuts, index), &mut items),
                    Object::Integer(n) => push_adjustment(&mut items, *n as f32),
                    Object::Real(n) => push_adjustment(&mut items, *n),
                    other => items.push(other.clone()),
                }
            }
        }
        _ => return vec![op.clone()],
    }

    log::debug!("[TextCut] {} 删除 {} 个字形", op.operator, cuts.len());
    prefix.push(Operation::new("TJ", vec![Object::Array(items)]));
    prefix
}

fn rgb_operands(color: &Color) -> Vec<Object> {
    vec![Object::Real(color.r), Object::Real(color.g), Object::Real(color.b)]
}

fn re_operands(rect: (f32, f32, f32, f32)) -> Vec<Object> {
    vec![
        Object::Real(rect.0),
        Object::Real(rect.1),
        Object::Real(rect.2),
        Object::Real(rect.3),
    ]
}

/// 纯色填充矩形（PDF 坐标：左下角、宽、高）
pub fn fill_rect_ops(rect: (f32, f32, f32, f32), color: &Color) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new("rg", rgb_operands(color)),
        Operation::new("re", re_operands(rect)),
        Operation::new("f", vec![]),
        Operation::new("Q", vec![]),
    ]
}

/// 带描边、虚线与填充透明度的矩形；`opacity_state` 为 ExtGState 资源名
pub fn styled_rect_ops(rect: (f32, f32, f32, f32), style: &RectStyle, opacity_state: Option<&str>) -> Vec<Operation> {
    let mut ops = vec![Operation::new("q", vec![])];

    if let Some(fill) = &style.fill {
        if let Some(name) = opacity_state {
            ops.push(Operation::new("gs", vec![Object::Name(name.as_bytes().to_vec())]));
        }
        ops.push(Operation::new("rg", rgb_operands(fill)));
        ops.push(Operation::new("re", re_operands(rect)));
        ops.push(Operation::new("f", vec![]));
    }

    if let Some(stroke) = &style.stroke {
        // 描边不受填充透明度影响
        if style.fill.is_some() && opacity_state.is_some() {
            ops.push(Operation::new("Q", vec![]));
            ops.push(Operation::new("q", vec![]));
        }
        ops.push(Operation::new("RG", rgb_operands(stroke)));
        ops.push(Operation::new("w", vec![Object::Real(style.line_width)]));
        if let Some([on, off]) = style.dash {
            ops.push(Operation::new(
                "d",
                vec![Object::Array(vec![Object::Real(on), Object::Real(off)]), Object::Integer(0)],
            ));
        }
        ops.push(Operation::new("re", re_operands(rect)));
        ops.push(Operation::new("S", vec![]));
    }

    ops.push(Operation::new("Q", vec![]));
    ops
}

/// 在基线起点 (x, y) 写入一行文字
pub fn text_ops(x: f32, y: f32, font_resource: &str, size: f32, color: &Color, encoded: Vec<u8>) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new("BT", vec![]),
        Operation::new("rg", rgb_operands(color)),
        Operation::new(
            "Tf",
            vec![Object::Name(font_resource.as_bytes().to_vec()), Object::Real(size)],
        ),
        Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
        Operation::new("Tj", vec![Object::String(encoded, StringFormat::Literal)]),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// TJ 数组渲染成字符串列表，数字按整数显示
    fn tj_items(op: &Operation) -> Vec<String> {
        match &op.operands[0] {
            Object::Array(items) => items
                .iter()
                .map(|item| match item {
                    Object::String(bytes, _) => String::from_utf8_lossy(bytes).to_string(),
                    Object::Real(n) => format!("{}", n),
                    Object::Integer(n) => n.to_string(),
                    other => format!("{:?}", other),
                })
                .collect(),
            other => panic!("不是 TJ 数组: {:?}", other),
        }
    }

    fn cut(item_index: usize, bytes: Range<usize>, adjustment: f32) -> GlyphCut {
        GlyphCut {
            item_index,
            bytes,
            adjustment,
        }
    }

    #[test]
    fn test_tj_becomes_array_with_adjustment() {
        let op = Operation::new("Tj", vec![Object::string_literal("Hello")]);
        let out = rewrite_text_op(&op, &[cut(0, 1..2, -556.0), cut(0, 2..3, -222.0)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].operator, "TJ");
        assert_eq!(tj_items(&out[0]), vec!["H", "-778", "lo"]);
    }

    #[test]
    fn test_tj_array_merges_existing_numbers() {
        let op = Operation::new(
            "TJ",
            vec![Object::Array(vec![
                Object::string_literal("AB"),
                Object::Integer(-100),
                Object::string_literal("C"),
            ])],
        );
        let out = rewrite_text_op(&op, &[cut(0, 1..2, -667.0)]);
        assert_eq!(tj_items(&out[0]), vec!["A", "-767", "C"]);
    }

    #[test]
    fn test_quote_operators_split_into_line_break() {
        let op = Operation::new("'", vec![Object::string_literal("X")]);
        let out = rewrite_text_op(&op, &[cut(0, 0..1, -600.0)]);
        let operators: Vec<&str> = out.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(operators, vec!["T*", "TJ"]);
        assert_eq!(tj_items(&out[1]), vec!["-600"]);

        let op = Operation::new(
            "\"",
            vec![Object::Integer(2), Object::Integer(1), Object::string_literal("ab")],
        );
        let out = rewrite_text_op(&op, &[cut(0, 0..1, -500.0)]);
        let operators: Vec<&str> = out.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(operators, vec!["Tw", "Tc", "T*", "TJ"]);
    }

    #[test]
    fn test_styled_rect_ops() {
        let style = RectStyle {
            stroke: Some(Color::BLACK),
            fill: Some(Color::WHITE),
            fill_opacity: 0.3,
            line_width: 1.0,
            dash: Some([1.0, 1.0]),
        };
        let ops = styled_rect_ops((0.0, 0.0, 10.0, 10.0), &style, Some("GS0"));
        let operators: Vec<&str> = ops.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(
            operators,
            vec!["q", "gs", "rg", "re", "f", "Q", "q", "RG", "w", "d", "re", "S", "Q"]
        );
    }
}
