use super::types::PageContentType;
use lopdf::{content::Operation, Dictionary, Document, Object, Stream};
use shield_core::{Point, Rect, SurfaceError};

/// 仿射矩阵 [a b c d e f]
pub type Matrix = [f32; 6];

pub const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// 矩阵乘法 `m × n`（先应用 m，再应用 n）
pub fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
  [
    m[0] * n[0] + m[1] * n[2],
    m[0] * n[1] + m[1] * n[3],
    m[2] * n[0] + m[3] * n[2],
    m[2] * n[1] + m[3] * n[3],
    m[4] * n[0] + m[5] * n[2] + n[4],
    m[4] * n[1] + m[5] * n[3] + n[5],
  ]
}

pub fn transform(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
  (x * m[0] + y * m[2] + m[4], x * m[1] + y * m[3] + m[5])
}

/// 从操作数读取 6 个数字组成矩阵
pub fn matrix_from_operands(operands: &[Object]) -> Option<Matrix> {
  if operands.len() < 6 {
    return None;
  }
  let mut m = IDENTITY;
  for (slot, obj) in m.iter_mut().zip(operands.iter()) {
    *slot = get_number(obj)?;
  }
  Some(m)
}

/// 页面边界与旋转
///
/// `shield-core` 使用左上角为原点、y 向下的页面坐标；
/// 这里负责与 PDF 用户空间（左下角原点）互相转换。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
  pub llx: f32,
  pub lly: f32,
  pub urx: f32,
  pub ury: f32,
  pub rotation: i32,
}

impl PageBox {
  pub fn width(&self) -> f32 {
    self.urx - self.llx
  }

  pub fn height(&self) -> f32 {
    self.ury - self.lly
  }

  /// 页面坐标下的边界
  pub fn bounds(&self) -> Rect {
    Rect::new(0.0, 0.0, self.width(), self.height())
  }

  pub fn to_page(&self, x: f32, y: f32) -> Point {
    Point::new(x - self.llx, self.ury - y)
  }

  pub fn to_pdf(&self, point: Point) -> (f32, f32) {
    (point.x + self.llx, self.ury - point.y)
  }

  /// 页面矩形 → `re` 操作数（左下角 x, y, 宽, 高）
  pub fn rect_to_pdf(&self, rect: &Rect) -> (f32, f32, f32, f32) {
    let (x, y) = self.to_pdf(Point::new(rect.x0, rect.y1));
    (x, y, rect.width(), rect.height())
  }
}

/// 从数组对象中提取边界框坐标
fn extract_box_values(arr: &[Object]) -> Option<(f32, f32, f32, f32)> {
  let values: Vec<f32> = arr.iter().filter_map(get_number).collect();
  if values.len() == 4 {
    // 规范化，允许反向给出的角点
    Some((
      values[0].min(values[2]),
      values[1].min(values[3]),
      values[0].max(values[2]),
      values[1].max(values[3]),
    ))
  } else {
    None
  }
}

/// 沿 Parent 链查找可继承的页面属性
fn inherited<'a>(doc: &'a Document, page_id: lopdf::ObjectId, key: &[u8]) -> Option<&'a Object> {
  let mut current = doc.get_dictionary(page_id).ok();
  // 防止循环引用
  let mut depth = 0;
  while let Some(dict) = current {
    if let Ok(value) = dict.get(key) {
      return Some(value);
    }
    depth += 1;
    if depth > 32 {
      break;
    }
    current = match dict.get(b"Parent") {
      Ok(Object::Reference(parent)) => doc.get_dictionary(*parent).ok(),
      _ => None,
    };
  }
  None
}

/// 获取页面的旋转角度
fn get_page_rotation(doc: &Document, page_id: lopdf::ObjectId) -> i32 {
  match inherited(doc, page_id, b"Rotate").map(|obj| resolve(doc, obj)) {
    Some(Object::Integer(rotate)) => (*rotate as i32).rem_euclid(360),
    _ => 0,
  }
}

/// 获取页面的有效边界框（优先使用 CropBox，否则使用 MediaBox）
pub fn get_page_box(doc: &Document, page_id: lopdf::ObjectId) -> PageBox {
  let rotation = get_page_rotation(doc, page_id);
  if rotation != 0 {
    log::debug!("[MediaBox] 页面旋转角度: {} 度，几何按未旋转页面计算", rotation);
  }

  let lookup = |key: &[u8]| -> Option<(f32, f32, f32, f32)> {
    match inherited(doc, page_id, key).map(|obj| resolve(doc, obj)) {
      Some(Object::Array(arr)) => extract_box_values(arr),
      _ => None,
    }
  };

  let (llx, lly, urx, ury) = lookup(b"CropBox")
    .or_else(|| lookup(b"MediaBox"))
    .unwrap_or_else(|| {
      log::warn!("[MediaBox] 使用默认 Letter 尺寸");
      (0.0, 0.0, 612.0, 792.0)
    });

  PageBox {
    llx,
    lly,
    urx,
    ury,
    rotation,
  }
}

/// 从 Object 获取数值
pub fn get_number(obj: &Object) -> Option<f32> {
  match obj {
    Object::Integer(i) => Some(*i as f32),
    Object::Real(r) => Some(*r),
    _ => None,
  }
}

/// 解引用（最多跟随若干层）
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
  let mut current = obj;
  for _ in 0..8 {
    match current {
      Object::Reference(id) => match doc.get_object(*id) {
        Ok(target) => current = target,
        Err(_) => return current,
      },
      _ => return current,
    }
  }
  current
}

pub fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
  match resolve(doc, obj) {
    Object::Dictionary(dict) => Some(dict),
    Object::Stream(stream) => Some(&stream.dict),
    _ => None,
  }
}

/// 页面资源字典（含继承），Font / XObject / ExtGState 子字典展开为内联
pub fn get_page_resources(doc: &Document, page_id: lopdf::ObjectId) -> Dictionary {
  let resources = inherited(doc, page_id, b"Resources")
    .and_then(|obj| resolve_dict(doc, obj))
    .cloned()
    .unwrap_or_default();
  inline_resources(doc, resources)
}

/// 把资源字典的 Font / XObject / ExtGState 子字典展开为内联
pub fn inline_resources(doc: &Document, mut resources: Dictionary) -> Dictionary {
  for key in [b"Font".as_slice(), b"XObject".as_slice(), b"ExtGState".as_slice()] {
    let inline = resources
      .get(key)
      .ok()
      .and_then(|obj| resolve_dict(doc, obj))
      .cloned();
    if let Some(dict) = inline {
      resources.set(key, Object::Dictionary(dict));
    }
  }
  resources
}

/// 获取流内容（支持压缩和未压缩的流）
pub fn get_stream_content(stream: &Stream) -> Vec<u8> {
  match stream.decompressed_content() {
    Ok(data) => data,
    Err(_) => stream.content.clone(),
  }
}

/// 获取页面的内容流数据；没有 Contents 的页面返回空内容
pub fn get_page_content(doc: &Document, page_id: lopdf::ObjectId) -> Result<Vec<u8>, SurfaceError> {
  let dict = doc
    .get_dictionary(page_id)
    .map_err(|e| SurfaceError::MissingResource(format!("页面对象 {:?}: {}", page_id, e)))?;

  let contents = match dict.get(b"Contents") {
    Ok(contents) => contents,
    Err(_) => return Ok(Vec::new()),
  };

  match resolve(doc, contents) {
    Object::Stream(stream) => Ok(get_stream_content(stream)),
    Object::Array(arr) => {
      let mut all_content = Vec::new();
      for item in arr {
        match resolve(doc, item) {
          Object::Stream(stream) => {
            all_content.extend(get_stream_content(stream));
            all_content.push(b'\n');
          }
          other => {
            return Err(SurfaceError::Content(format!("内容数组中存在非流对象: {:?}", other)));
          }
        }
      }
      Ok(all_content)
    }
    other => Err(SurfaceError::Content(format!("无法获取页面内容: {:?}", other))),
  }
}

/// 检测页面内容类型
pub fn detect_page_content_type(operations: &[Operation]) -> PageContentType {
  let mut has_text_ops = false;
  let mut has_path_ops = false;
  let mut has_image_ops = false;
  let mut path_op_count = 0;
  let mut text_op_count = 0;

  for op in operations {
    match op.operator.as_str() {
      "Tj" | "TJ" | "'" | "\"" => {
        has_text_ops = true;
        text_op_count += 1;
      }
      "m" | "l" | "c" | "v" | "y" | "h" | "re" => {
        has_path_ops = true;
        path_op_count += 1;
      }
      "Do" | "BI" => has_image_ops = true,
      _ => {}
    }
  }

  log::debug!(
    "[ContentType] text_ops={}, path_ops={}, image_ops={}",
    text_op_count,
    path_op_count,
    has_image_ops
  );

  // 纯图片页面（扫描件）
  if !has_text_ops && !has_path_ops && has_image_ops {
    return PageContentType::ImageBased;
  }

  // 有文字且路径操作不多（表格边框等）
  if has_text_ops && path_op_count < 500 {
    return PageContentType::Text;
  }

  if !has_text_ops && path_op_count > 500 {
    return PageContentType::PathDrawn;
  }

  if has_text_ops || has_path_ops || has_image_ops {
    return PageContentType::Mixed;
  }

  PageContentType::Empty
}
