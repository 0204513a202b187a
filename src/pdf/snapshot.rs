//! 页面快照与合并
//!
//! 快照把一页需要的数据（内容流、资源、字体度量、图片流、表单内容）复制出来，
//! 可以交给工作线程独立处理；处理结果以 `PageEdit` 的形式由单一写入方
//! 合并回文档。

use std::collections::{BTreeMap, BTreeSet};

use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, ObjectId, Stream};
use shield_core::{Rect, SurfaceError};

use super::fonts::FontMetrics;
use super::layout::XObjectKind;
use super::utils::{
  get_number, get_page_box, get_page_content, get_page_resources, get_stream_content, inline_resources,
  matrix_from_operands, resolve, resolve_dict, PageBox, IDENTITY,
};

/// 表单嵌套的最大解析深度
const MAX_FORM_DEPTH: usize = 8;

/// 一段内容流可用的资源
#[derive(Debug, Clone, Default)]
pub struct ContentScope {
  /// 内联展开后的资源字典
  pub resources: Dictionary,
  pub fonts: BTreeMap<String, FontMetrics>,
  pub xobjects: BTreeMap<String, XObjectKind>,
  /// 图片 XObject 的原始流
  pub images: BTreeMap<String, Stream>,
  /// 可解析的表单 XObject
  pub forms: BTreeMap<String, FormSource>,
  /// 处理过程中新建的私有副本
  pub created: BTreeSet<String>,
}

impl ContentScope {
  /// 沿表单名路径找到嵌套的资源范围
  pub fn descend<'a, I>(&self, names: I) -> Option<&ContentScope>
  where
    I: IntoIterator<Item = &'a str>,
  {
    let mut scope = self;
    for name in names {
      scope = &scope.forms.get(name)?.scope;
    }
    Some(scope)
  }
}

/// 表单 XObject：原字典、解码后的操作序列和它自己的资源
#[derive(Debug, Clone)]
pub struct FormSource {
  pub dict: Dictionary,
  pub operations: Vec<Operation>,
  pub scope: ContentScope,
}

impl FormSource {
  /// 以当前操作序列生成新的表单流
  pub fn to_stream(&self) -> Result<Stream, SurfaceError> {
    let content = Content {
      operations: self.operations.clone(),
    }
    .encode()
    .map_err(|e| SurfaceError::Encoding(format!("表单内容编码失败: {}", e)))?;
    // 只保留本表单自己调用的 XObject，替换前的原对象不再被引用
    let invoked: BTreeSet<&[u8]> = self
      .operations
      .iter()
      .filter(|op| op.operator == "Do")
      .filter_map(|op| match op.operands.first() {
        Some(Object::Name(name)) => Some(name.as_slice()),
        _ => None,
      })
      .collect();
    let mut resources = self.scope.resources.clone();
    if let Ok(Object::Dictionary(xobjects)) = resources.get_mut(b"XObject") {
      let unused: Vec<Vec<u8>> = xobjects
        .iter()
        .map(|(name, _)| name.clone())
        .filter(|name| !invoked.contains(name.as_slice()))
        .collect();
      for name in unused {
        xobjects.remove(&name);
      }
    }

    let mut dict = self.dict.clone();
    dict.remove(b"Filter");
    dict.remove(b"DecodeParms");
    dict.set("Resources", Object::Dictionary(resources));
    let mut stream = Stream::new(dict, content);
    stream.compress().ok();
    Ok(stream)
  }
}

#[derive(Debug, Clone)]
pub struct PageSnapshot {
  /// 页码，从 1 开始
  pub number: u32,
  pub page_id: ObjectId,
  pub page_box: PageBox,
  /// 读取失败时保留错误，交给处理该页的任务上报
  pub content: Result<Vec<u8>, SurfaceError>,
  pub scope: ContentScope,
}

fn form_bbox(dict: &Dictionary) -> Rect {
  let values: Vec<f32> = match dict.get(b"BBox") {
    Ok(Object::Array(arr)) => arr.iter().filter_map(get_number).collect(),
    _ => Vec::new(),
  };
  if values.len() == 4 {
    Rect::new(
      values[0].min(values[2]),
      values[1].min(values[3]),
      values[0].max(values[2]),
      values[1].max(values[3]),
    )
  } else {
    Rect::new(0.0, 0.0, 0.0, 0.0)
  }
}

fn capture_form(
  doc: &Document,
  name: &str,
  stream: &Stream,
  parent_resources: &Dictionary,
  depth: usize,
  visiting: &mut Vec<ObjectId>,
) -> Option<FormSource> {
  let operations = match Content::decode(&get_stream_content(stream)) {
    Ok(content) => content.operations,
    Err(e) => {
      log::warn!("[Snapshot] 表单 {} 内容流解析失败，按不透明对象处理: {}", name, e);
      return None;
    }
  };
  // 没有 Resources 的表单沿用上层资源
  let resources = match stream.dict.get(b"Resources").ok().and_then(|obj| resolve_dict(doc, obj)) {
    Some(dict) => inline_resources(doc, dict.clone()),
    None => parent_resources.clone(),
  };
  Some(FormSource {
    dict: stream.dict.clone(),
    operations,
    scope: capture_scope(doc, resources, depth + 1, visiting),
  })
}

fn capture_scope(doc: &Document, resources: Dictionary, depth: usize, visiting: &mut Vec<ObjectId>) -> ContentScope {
  let mut scope = ContentScope::default();

  if let Ok(Object::Dictionary(font_dict)) = resources.get(b"Font") {
    for (name, obj) in font_dict.iter() {
      if let Some(dict) = resolve_dict(doc, obj) {
        scope
          .fonts
          .insert(String::from_utf8_lossy(name).to_string(), FontMetrics::from_dict(doc, dict));
      }
    }
  }

  if let Ok(Object::Dictionary(xobject_dict)) = resources.get(b"XObject") {
    for (name, obj) in xobject_dict.iter() {
      let name = String::from_utf8_lossy(name).to_string();
      let kind = match resolve(doc, obj) {
        Object::Stream(stream) => match stream.dict.get(b"Subtype") {
          Ok(Object::Name(n)) if n == b"Image" => {
            scope.images.insert(name.clone(), stream.clone());
            XObjectKind::Image
          }
          Ok(Object::Name(n)) if n == b"Form" => {
            let id = match obj {
              Object::Reference(id) => Some(*id),
              _ => None,
            };
            let cyclic = id.map_or(false, |id| visiting.contains(&id));
            if depth >= MAX_FORM_DEPTH || cyclic {
              log::warn!("[Snapshot] 表单 {} 嵌套过深或循环引用，不解析内容", name);
            } else {
              visiting.extend(id);
              if let Some(form) = capture_form(doc, &name, stream, &resources, depth, visiting) {
                scope.forms.insert(name.clone(), form);
              }
              if id.is_some() {
                visiting.pop();
              }
            }
            XObjectKind::Form {
              bbox: form_bbox(&stream.dict),
              matrix: match stream.dict.get(b"Matrix") {
                Ok(Object::Array(arr)) => matrix_from_operands(arr).unwrap_or(IDENTITY),
                _ => IDENTITY,
              },
            }
          }
          _ => XObjectKind::Other,
        },
        _ => XObjectKind::Other,
      };
      scope.xobjects.insert(name, kind);
    }
  }

  scope.resources = resources;
  scope
}

impl PageSnapshot {
  pub fn capture(doc: &Document, number: u32, page_id: ObjectId) -> Self {
    let page_box = get_page_box(doc, page_id);
    let content = get_page_content(doc, page_id);
    let scope = capture_scope(doc, get_page_resources(doc, page_id), 0, &mut Vec::new());

    log::debug!(
      "[Snapshot] 第 {} 页: fonts={}, xobjects={}, images={}, forms={}",
      number,
      scope.fonts.len(),
      scope.xobjects.len(),
      scope.images.len(),
      scope.forms.len()
    );

    Self {
      number,
      page_id,
      page_box,
      content,
      scope,
    }
  }
}

/// 页面私有的新 XObject；表单副本可以带有自己的嵌套副本
#[derive(Debug, Clone)]
pub struct NewXObject {
  pub stream: Stream,
  pub nested: BTreeMap<String, NewXObject>,
}

/// 一页的处理结果
#[derive(Debug, Clone)]
pub struct PageEdit {
  pub number: u32,
  pub page_id: ObjectId,
  /// 新内容流；None 表示该页未改动
  pub content: Option<Vec<u8>>,
  pub resources: Dictionary,
  /// 按资源名
  pub new_xobjects: BTreeMap<String, NewXObject>,
}

impl PageEdit {
  pub fn is_modified(&self) -> bool {
    self.content.is_some()
  }
}

/// 把新对象写入文档并登记到资源字典的 XObject 下
fn attach_xobjects(doc: &mut Document, resources: &mut Dictionary, new: BTreeMap<String, NewXObject>) {
  if new.is_empty() {
    return;
  }
  let mut xobjects = match resources.get(b"XObject") {
    Ok(Object::Dictionary(dict)) => dict.clone(),
    _ => Dictionary::new(),
  };
  for (name, object) in new {
    let id = add_xobject(doc, object);
    xobjects.set(name.as_bytes().to_vec(), Object::Reference(id));
  }
  resources.set("XObject", Object::Dictionary(xobjects));
}

fn add_xobject(doc: &mut Document, object: NewXObject) -> ObjectId {
  let mut stream = object.stream;
  if !object.nested.is_empty() {
    let mut resources = match stream.dict.get(b"Resources") {
      Ok(Object::Dictionary(dict)) => dict.clone(),
      _ => Dictionary::new(),
    };
    attach_xobjects(doc, &mut resources, object.nested);
    stream.dict.set("Resources", Object::Dictionary(resources));
  }
  doc.add_object(Object::Stream(stream))
}

/// 把一页的结果写回文档；返回是否有改动
pub fn merge_edit(doc: &mut Document, edit: PageEdit) -> Result<bool, SurfaceError> {
  let Some(content) = edit.content else {
    return Ok(false);
  };

  let mut resources = edit.resources;
  attach_xobjects(doc, &mut resources, edit.new_xobjects);

  let mut stream = Stream::new(Dictionary::new(), content);
  stream.compress().ok();
  let content_id = doc.add_object(Object::Stream(stream));

  let page = doc
    .get_object_mut(edit.page_id)
    .and_then(Object::as_dict_mut)
    .map_err(|e| SurfaceError::MissingResource(format!("第 {} 页页面对象: {}", edit.number, e)))?;
  page.set("Resources", Object::Dictionary(resources));
  page.set("Contents", Object::Reference(content_id));

  log::debug!("[Merge] 第 {} 页写回完成", edit.number);
  Ok(true)
}
