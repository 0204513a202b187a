//! `PageSurface` 的 PDF 实现
//!
//! 读取类方法基于内容流版面解析（含表单内容）；脱敏直接改写操作序列（删除字形、
//! 路径、图片摆放），表单和部分覆盖的图片改写为页面私有副本。绘制与写入文字
//! 追加到覆盖层，最后一并生成新内容流。

use std::collections::{BTreeMap, BTreeSet};

use lopdf::{
  content::{Content, Operation},
  dictionary, Dictionary, Object, Stream,
};
use shield_core::{
  ImagePlacement, PageSurface, Point, Rect, RectStyle, RedactionBatch, StandardFont, SurfaceError, TextAnchor,
  TextSpan, TextStyle,
};

use super::fonts::{encode_win_ansi, standard_text_width};
use super::image::{blank_image_regions, profile_image, PixelMask};
use super::layout::{analyze, ContentPath, Glyph, PageLayout, XObjectKind, XObjectUse};
use super::snapshot::{ContentScope, FormSource, NewXObject, PageEdit, PageSnapshot};
use super::text::{covers_glyph, fill_rect_ops, group_cuts, rewrite_text_op, styled_rect_ops, text_ops, GlyphCut};
use super::types::ImageRedaction;

/// 居中文字的基线相对中心的下移（相对字号）
const CENTER_BASELINE_SHIFT: f32 = 0.35;

pub struct PdfPage {
  snapshot: PageSnapshot,
  operations: Vec<Operation>,
  layout: PageLayout,
  image_mode: ImageRedaction,
  overlays: Vec<Operation>,
  /// 私有副本的编号
  copies: usize,
  /// 页面内容中被删除或替换掉的 XObject 名
  replaced: BTreeSet<String>,
  modified: bool,
}

/// 一段内容流（页面或表单）上的改写计划
#[derive(Default)]
struct ContentPlan {
  cuts: BTreeMap<usize, Vec<GlyphCut>>,
  dropped: BTreeSet<usize>,
  /// 部分覆盖的图片：`Do` 下标 → (原名, 清除后的图片流)
  images: BTreeMap<usize, (String, Stream)>,
  /// 内容被改写的子表单：`Do` 下标 → (原名, 改写后的表单)
  forms: BTreeMap<usize, (String, FormSource)>,
}

fn font_resource_name(font: StandardFont) -> &'static str {
  match font {
    StandardFont::Helvetica => "ShieldF1",
    StandardFont::HelveticaBold => "ShieldF2",
  }
}

fn scope_names(path: &[super::layout::FormStep]) -> impl Iterator<Item = &str> {
  path.iter().map(|step| step.name.as_str())
}

fn do_name(op: &Operation) -> Option<String> {
  match (op.operator.as_str(), op.operands.first()) {
    ("Do", Some(Object::Name(name))) => Some(String::from_utf8_lossy(name).to_string()),
    _ => None,
  }
}

fn do_names(operations: &[Operation]) -> BTreeSet<String> {
  operations.iter().filter_map(do_name).collect()
}

/// 内容流及其引用的表单里出现过的全部 XObject 名
fn referenced_names(scope: &ContentScope, operations: &[Operation], out: &mut BTreeSet<String>) {
  for name in do_names(operations) {
    if let Some(form) = scope.forms.get(&name) {
      referenced_names(&form.scope, &form.operations, out);
    }
    out.insert(name);
  }
}

/// 已是本页副本的沿用原名，否则取一个未占用的新名
fn private_name(scope: &ContentScope, source: &str, prefix: &str, copies: &mut usize) -> String {
  if scope.created.contains(source) {
    return source.to_string();
  }
  loop {
    let name = format!("{}{}", prefix, copies);
    *copies += 1;
    if !scope.xobjects.contains_key(&name) {
      return name;
    }
  }
}

/// 在一段内容流上执行改写计划，返回被删除或替换掉的 XObject 名
fn apply_plan(
  operations: &mut Vec<Operation>,
  scope: &mut ContentScope,
  plan: ContentPlan,
  copies: &mut usize,
) -> BTreeSet<String> {
  let mut renamed: BTreeMap<usize, String> = BTreeMap::new();
  for (op_index, (source, stream)) in plan.images {
    let name = private_name(scope, &source, "ShieldIm", copies);
    scope.xobjects.insert(name.clone(), XObjectKind::Image);
    scope.images.insert(name.clone(), stream);
    scope.created.insert(name.clone());
    renamed.insert(op_index, name);
  }
  for (op_index, (source, form)) in plan.forms {
    let name = private_name(scope, &source, "ShieldFm", copies);
    let kind = scope.xobjects.get(&source).cloned().unwrap_or(XObjectKind::Other);
    scope.xobjects.insert(name.clone(), kind);
    scope.forms.insert(name.clone(), form);
    scope.created.insert(name.clone());
    renamed.insert(op_index, name);
  }

  let mut replaced = BTreeSet::new();
  let mut rewritten = Vec::with_capacity(operations.len());
  for (index, op) in operations.iter().enumerate() {
    if plan.dropped.contains(&index) {
      replaced.extend(do_name(op));
      continue;
    }
    if let Some(glyph_cuts) = plan.cuts.get(&index) {
      rewritten.extend(rewrite_text_op(op, glyph_cuts));
    } else if let Some(new_name) = renamed.get(&index) {
      replaced.extend(do_name(op));
      rewritten.push(Operation::new("Do", vec![Object::Name(new_name.as_bytes().to_vec())]));
    } else {
      rewritten.push(op.clone());
    }
  }
  *operations = rewritten;
  replaced
}

/// 某条路径是否位于整体删除的表单之内
fn under_dropped(plans: &BTreeMap<ContentPath, ContentPlan>, path: &ContentPath) -> bool {
  (0..path.len()).any(|depth| {
    plans
      .get(&path[..depth])
      .map_or(false, |plan| plan.dropped.contains(&path[depth].op_index))
  })
}

/// 内容流引用到的私有副本，连同它们各自的嵌套副本
fn private_xobjects(scope: &ContentScope, operations: &[Operation]) -> Result<BTreeMap<String, NewXObject>, SurfaceError> {
  let mut out = BTreeMap::new();
  for name in do_names(operations) {
    if !scope.created.contains(&name) {
      continue;
    }
    let object = if let Some(form) = scope.forms.get(&name) {
      NewXObject {
        stream: form.to_stream()?,
        nested: private_xobjects(&form.scope, &form.operations)?,
      }
    } else if let Some(image) = scope.images.get(&name) {
      NewXObject {
        stream: image.clone(),
        nested: BTreeMap::new(),
      }
    } else {
      continue;
    };
    out.insert(name, object);
  }
  Ok(out)
}

impl PdfPage {
  /// 解码内容流并完成版面解析
  pub fn open(snapshot: PageSnapshot, image_mode: ImageRedaction) -> Result<Self, SurfaceError> {
    let data = snapshot.content.clone()?;
    let operations = Content::decode(&data)
      .map_err(|e| SurfaceError::Content(format!("第 {} 页内容流解析失败: {}", snapshot.number, e)))?
      .operations;
    let layout = analyze(&operations, &snapshot.scope, &snapshot.page_box);

    log::debug!(
      "[PdfPage] 第 {} 页: ops={}, glyphs={}, xobjects={}, paths={}",
      snapshot.number,
      operations.len(),
      layout.glyphs.len(),
      layout.xobjects.len(),
      layout.paths.len()
    );

    Ok(Self {
      snapshot,
      operations,
      layout,
      image_mode,
      overlays: Vec::new(),
      copies: 0,
      replaced: BTreeSet::new(),
      modified: false,
    })
  }

  pub fn layout(&self) -> &PageLayout {
    &self.layout
  }

  /// 可提取的全部文字
  pub fn text(&self) -> String {
    self.layout.text()
  }

  fn set_resource(&mut self, category: &str, name: &str, value: Object) {
    let resources = &mut self.snapshot.scope.resources;
    let mut dict = match resources.get(category.as_bytes()) {
      Ok(Object::Dictionary(dict)) => dict.clone(),
      _ => Dictionary::new(),
    };
    if dict.has(name.as_bytes()) {
      return;
    }
    dict.set(name.as_bytes().to_vec(), value);
    resources.set(category.as_bytes().to_vec(), Object::Dictionary(dict));
  }

  fn ensure_font(&mut self, font: StandardFont) -> &'static str {
    let name = font_resource_name(font);
    self.set_resource(
      "Font",
      name,
      Object::Dictionary(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
      }),
    );
    name
  }

  fn ensure_opacity_state(&mut self, opacity: f32) -> String {
    let percent = (opacity.clamp(0.0, 1.0) * 100.0).round() as u32;
    let name = format!("ShieldGS{}", percent);
    self.set_resource(
      "ExtGState",
      &name,
      Object::Dictionary(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(percent as f32 / 100.0),
      }),
    );
    name
  }

  /// 部分覆盖的图片：生成清除后的图片流；失败时返回 None
  fn blank_partial_image(&self, placement: &XObjectUse, areas: &[Rect]) -> Option<Stream> {
    let scope = self.snapshot.scope.descend(scope_names(&placement.owner))?;
    let stream = scope.images.get(&placement.name)?;
    let masks: Vec<PixelMask> = areas
      .iter()
      .filter_map(|area| PixelMask::from_placement(&placement.rect, area))
      .collect();
    match blank_image_regions(stream, &masks) {
      Ok(Some(blanked)) => Some(blanked),
      Ok(None) => {
        log::warn!("[PdfPage] 第 {} 页图片 {} 无法解码，改为删除", self.snapshot.number, placement.name);
        None
      }
      Err(e) => {
        log::warn!(
          "[PdfPage] 第 {} 页图片 {} 重新编码失败: {}，改为删除",
          self.snapshot.number,
          placement.name,
          e
        );
        None
      }
    }
  }

  /// 按所在内容流收集本批脱敏要做的改写
  fn plan_redactions(&self, areas: &[Rect]) -> BTreeMap<ContentPath, ContentPlan> {
    let mut plans: BTreeMap<ContentPath, ContentPlan> = BTreeMap::new();

    // 文字：被覆盖的字形
    let mut covered: BTreeMap<ContentPath, Vec<&Glyph>> = BTreeMap::new();
    for glyph in &self.layout.glyphs {
      if areas.iter().any(|area| covers_glyph(area, glyph)) {
        covered.entry(glyph.owner.clone()).or_default().push(glyph);
      }
    }
    for (owner, glyphs) in covered {
      plans.entry(owner).or_default().cuts = group_cuts(glyphs);
    }

    // 图片与表单
    for placement in &self.layout.xobjects {
      let touching: Vec<Rect> = areas.iter().filter(|a| a.intersects(&placement.rect)).copied().collect();
      if touching.is_empty() {
        continue;
      }
      if touching.iter().any(|a| a.contains_rect(&placement.rect)) {
        plans.entry(placement.owner.clone()).or_default().dropped.insert(placement.op_index);
        continue;
      }
      if !placement.is_image {
        log::debug!("[PdfPage] 第 {} 页表单 {} 部分覆盖，只改写其中内容", self.snapshot.number, placement.name);
        continue;
      }
      let blanked = match self.image_mode {
        ImageRedaction::BlankPixels => self.blank_partial_image(placement, &touching),
        ImageRedaction::Remove => None,
      };
      let plan = plans.entry(placement.owner.clone()).or_default();
      match blanked {
        Some(stream) => {
          plan.images.insert(placement.op_index, (placement.name.clone(), stream));
        }
        None => {
          plan.dropped.insert(placement.op_index);
        }
      }
    }

    // 矢量路径：整体落在某个区域内才删除
    for path in &self.layout.paths {
      if areas.iter().any(|area| area.contains_rect(&path.rect)) {
        plans.entry(path.owner.clone()).or_default().dropped.extend(path.ops.clone());
      }
    }

    let inside_dropped: Vec<ContentPath> = plans.keys().filter(|path| under_dropped(&plans, path)).cloned().collect();
    for path in inside_dropped {
      plans.remove(&path);
    }
    plans
  }

  /// 生成写回文档所需的结果
  pub fn into_edit(self) -> Result<PageEdit, SurfaceError> {
    if !self.modified {
      return Ok(PageEdit {
        number: self.snapshot.number,
        page_id: self.snapshot.page_id,
        content: None,
        resources: self.snapshot.scope.resources,
        new_xobjects: BTreeMap::new(),
      });
    }

    let new_xobjects = private_xobjects(&self.snapshot.scope, &self.operations)?;
    let mut referenced = BTreeSet::new();
    referenced_names(&self.snapshot.scope, &self.operations, &mut referenced);

    let mut operations = Vec::with_capacity(self.operations.len() + self.overlays.len() + 2);
    operations.push(Operation::new("q", vec![]));
    operations.extend(self.operations);
    operations.push(Operation::new("Q", vec![]));
    operations.extend(self.overlays);
    let encoded = Content { operations }
      .encode()
      .map_err(|e| SurfaceError::Encoding(format!("第 {} 页内容流编码失败: {}", self.snapshot.number, e)))?;

    // 不再使用的原对象从页面资源中移除
    let mut resources = self.snapshot.scope.resources;
    if let Ok(Object::Dictionary(xobjects)) = resources.get_mut(b"XObject") {
      for name in self.replaced.difference(&referenced) {
        if xobjects.remove(name.as_bytes()).is_some() {
          log::debug!("[PdfPage] 第 {} 页移除资源 {}", self.snapshot.number, name);
        }
      }
    }

    Ok(PageEdit {
      number: self.snapshot.number,
      page_id: self.snapshot.page_id,
      content: Some(encoded),
      resources,
      new_xobjects,
    })
  }
}

impl PageSurface for PdfPage {
  fn number(&self) -> u32 {
    self.snapshot.number
  }

  fn bounds(&self) -> Rect {
    self.snapshot.page_box.bounds()
  }

  fn images(&self) -> Result<Vec<ImagePlacement>, SurfaceError> {
    Ok(
      self
        .layout
        .images()
        .map(|placement| ImagePlacement {
          name: placement.name.clone(),
          rect: placement.rect,
          profile: self
            .snapshot
            .scope
            .descend(scope_names(&placement.owner))
            .and_then(|scope| scope.images.get(&placement.name))
            .and_then(profile_image),
        })
        .collect(),
    )
  }

  fn drawings(&self, clip: &Rect) -> Result<Vec<Rect>, SurfaceError> {
    Ok(
      self
        .layout
        .paths
        .iter()
        .map(|path| path.rect)
        .filter(|rect| rect.intersects(clip))
        .collect(),
    )
  }

  fn search_for(&self, needle: &str) -> Result<Vec<Rect>, SurfaceError> {
    Ok(self.layout.search(needle))
  }

  fn text_spans(&self) -> Result<Vec<TextSpan>, SurfaceError> {
    Ok(self.layout.spans())
  }

  fn apply_redactions(&mut self, batch: &RedactionBatch) -> Result<usize, SurfaceError> {
    if batch.is_empty() {
      return Ok(0);
    }
    let mut plans = self.plan_redactions(&batch.rects());
    let glyphs: usize = plans.values().flat_map(|plan| plan.cuts.values()).map(Vec::len).sum();
    let dropped: usize = plans.values().map(|plan| plan.dropped.len()).sum();

    // 由深到浅生成表单副本，挂到上一层的计划里
    let mut form_copies = 0;
    while let Some(path) = plans.keys().filter(|p| !p.is_empty()).max_by_key(|p| p.len()).cloned() {
      let Some(plan) = plans.remove(&path) else {
        break;
      };
      let Some((step, parent)) = path.split_last() else {
        break;
      };
      let source = self
        .snapshot
        .scope
        .descend(scope_names(parent))
        .and_then(|scope| scope.forms.get(&step.name))
        .cloned();
      let Some(mut form) = source else {
        log::warn!("[PdfPage] 第 {} 页找不到表单 {}", self.snapshot.number, step.name);
        continue;
      };
      apply_plan(&mut form.operations, &mut form.scope, plan, &mut self.copies);
      plans
        .entry(parent.to_vec())
        .or_default()
        .forms
        .insert(step.op_index, (step.name.clone(), form));
      form_copies += 1;
    }

    let page_plan = plans.remove(&ContentPath::new()).unwrap_or_default();
    let replaced = apply_plan(&mut self.operations, &mut self.snapshot.scope, page_plan, &mut self.copies);
    self.replaced.extend(replaced);

    log::info!(
      "[PdfPage] 第 {} 页应用 {} 个脱敏区域: 字形 {}, 删除操作 {}, 表单副本 {}",
      self.snapshot.number,
      batch.len(),
      glyphs,
      dropped,
      form_copies
    );

    for request in batch.requests() {
      let rect = self.snapshot.page_box.rect_to_pdf(&request.rect);
      self.overlays.extend(fill_rect_ops(rect, &request.fill));
    }

    self.layout = analyze(&self.operations, &self.snapshot.scope, &self.snapshot.page_box);
    self.modified = true;
    Ok(batch.len())
  }

  fn draw_rect(&mut self, rect: &Rect, style: &RectStyle) -> Result<(), SurfaceError> {
    if rect.is_empty() {
      return Err(SurfaceError::Other(format!("空矩形: {:?}", rect)));
    }
    let opacity_state = match style.fill {
      Some(_) if style.fill_opacity < 1.0 => Some(self.ensure_opacity_state(style.fill_opacity)),
      _ => None,
    };
    let pdf_rect = self.snapshot.page_box.rect_to_pdf(rect);
    self
      .overlays
      .extend(styled_rect_ops(pdf_rect, style, opacity_state.as_deref()));
    self.modified = true;
    Ok(())
  }

  fn insert_text(&mut self, origin: Point, text: &str, style: &TextStyle) -> Result<(), SurfaceError> {
    if text.is_empty() {
      return Ok(());
    }
    let font = self.ensure_font(style.font);
    let baseline = match style.anchor {
      TextAnchor::BaselineStart => origin,
      TextAnchor::Center => {
        let width = standard_text_width(style.font, text, style.size);
        Point::new(origin.x - width / 2.0, origin.y + style.size * CENTER_BASELINE_SHIFT)
      }
    };
    let (x, y) = self.snapshot.page_box.to_pdf(baseline);
    self
      .overlays
      .extend(text_ops(x, y, font, style.size, &style.color, encode_win_ansi(text)));
    self.modified = true;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use lopdf::Document;
  use shield_core::{Color, RedactionRequest};

  use crate::pdf::test_support::{form_xobject, gray_image, register_xobject, single_page_doc};

  fn open_first(doc: &Document, mode: ImageRedaction) -> PdfPage {
    let page_id = doc.get_pages()[&1];
    PdfPage::open(PageSnapshot::capture(doc, 1, page_id), mode).unwrap()
  }

  #[test]
  fn test_search_and_redact_text() {
    let doc = single_page_doc("BT /F1 12 Tf 72 720 Td (Top Secret memo) Tj ET", vec![]);
    let mut page = open_first(&doc, ImageRedaction::BlankPixels);

    let hits = page.search_for("Secret").unwrap();
    assert_eq!(hits.len(), 1);

    let mut batch = RedactionBatch::new();
    batch.push(RedactionRequest::white(hits[0]));
    assert_eq!(page.apply_redactions(&batch).unwrap(), 1);

    assert!(page.search_for("Secret").unwrap().is_empty());
    assert_eq!(page.text(), "Top  memo");

    // "memo" 的位置不变
    let memo = page.search_for("memo").unwrap();
    let original = open_first(&doc, ImageRedaction::BlankPixels).search_for("memo").unwrap();
    assert!((memo[0].x0 - original[0].x0).abs() < 0.01);
  }

  #[test]
  fn test_untouched_page_has_no_edit() {
    let doc = single_page_doc("BT /F1 12 Tf 72 720 Td (Hello) Tj ET", vec![]);
    let page = open_first(&doc, ImageRedaction::BlankPixels);
    let edit = page.into_edit().unwrap();
    assert!(!edit.is_modified());
  }

  #[test]
  fn test_covered_image_is_removed_and_partial_is_blanked() {
    let content = "q 100 0 0 50 10 732 cm /Im0 Do Q q 100 0 0 50 300 732 cm /Im0 Do Q";
    let doc = single_page_doc(content, vec![("Im0", gray_image(10, 10, 0))]);
    let mut page = open_first(&doc, ImageRedaction::BlankPixels);
    assert_eq!(page.images().unwrap().len(), 2);

    let mut batch = RedactionBatch::new();
    // 完全覆盖第一张，部分覆盖第二张
    batch.push(RedactionRequest::white(Rect::new(0.0, 0.0, 120.0, 70.0)));
    batch.push(RedactionRequest::white(Rect::new(290.0, 0.0, 340.0, 70.0)));
    page.apply_redactions(&batch).unwrap();

    let images = page.images().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].name, "ShieldIm0");

    let edit = page.into_edit().unwrap();
    assert!(edit.is_modified());
    assert_eq!(edit.new_xobjects.len(), 1);
    assert!(edit.new_xobjects.contains_key("ShieldIm0"));
    // 原图片已没有引用
    let xobjects = edit.resources.get(b"XObject").and_then(Object::as_dict).unwrap();
    assert!(!xobjects.has(b"Im0"));
  }

  #[test]
  fn test_text_inside_form_is_redacted_in_private_copy() {
    let mut doc = single_page_doc("q 1 0 0 1 0 0 cm /Fm0 Do Q", vec![]);
    register_xobject(
      &mut doc,
      "Fm0",
      form_xobject("BT /F1 12 Tf 72 500 Td (This is Confidential) Tj ET", &[]),
    );
    let mut page = open_first(&doc, ImageRedaction::BlankPixels);

    let hits = page.search_for("Confidential").unwrap();
    assert_eq!(hits.len(), 1);

    let mut batch = RedactionBatch::new();
    batch.push(RedactionRequest::white(hits[0]));
    page.apply_redactions(&batch).unwrap();
    assert!(page.search_for("Confidential").unwrap().is_empty());
    assert!(page.text().starts_with("This is"));

    let edit = page.into_edit().unwrap();
    let copy = edit.new_xobjects.get("ShieldFm0").unwrap();
    let ops = Content::decode(&crate::pdf::utils::get_stream_content(&copy.stream)).unwrap().operations;
    assert!(ops.iter().any(|op| op.operator == "TJ"));
    let xobjects = edit.resources.get(b"XObject").and_then(Object::as_dict).unwrap();
    assert!(!xobjects.has(b"Fm0"));
  }

  #[test]
  fn test_form_shared_with_unredacted_placement_is_kept() {
    let mut doc = single_page_doc(
      "q 1 0 0 1 0 0 cm /Fm0 Do Q q 1 0 0 1 0 -300 cm /Fm0 Do Q",
      vec![],
    );
    register_xobject(&mut doc, "Fm0", form_xobject("BT /F1 12 Tf 72 500 Td (Secret) Tj ET", &[]));
    let mut page = open_first(&doc, ImageRedaction::BlankPixels);

    let hits = page.search_for("Secret").unwrap();
    assert_eq!(hits.len(), 2);
    let mut batch = RedactionBatch::new();
    batch.push(RedactionRequest::white(hits[0]));
    page.apply_redactions(&batch).unwrap();
    assert_eq!(page.search_for("Secret").unwrap().len(), 1);

    let edit = page.into_edit().unwrap();
    assert_eq!(edit.new_xobjects.len(), 1);
    let xobjects = edit.resources.get(b"XObject").and_then(Object::as_dict).unwrap();
    assert!(xobjects.has(b"Fm0"));
  }

  #[test]
  fn test_remove_mode_drops_partial_image() {
    let content = "q 100 0 0 50 300 732 cm /Im0 Do Q";
    let doc = single_page_doc(content, vec![("Im0", gray_image(10, 10, 0))]);
    let mut page = open_first(&doc, ImageRedaction::Remove);

    let mut batch = RedactionBatch::new();
    batch.push(RedactionRequest::white(Rect::new(290.0, 0.0, 340.0, 70.0)));
    page.apply_redactions(&batch).unwrap();
    assert!(page.images().unwrap().is_empty());
  }

  #[test]
  fn test_drawn_overlays_and_inserted_text() {
    let doc = single_page_doc("", vec![]);
    let mut page = open_first(&doc, ImageRedaction::BlankPixels);
    let style = RectStyle {
      stroke: Some(Color::BLACK),
      fill: Some(Color::WHITE),
      fill_opacity: 0.3,
      line_width: 1.0,
      dash: None,
    };
    page.draw_rect(&Rect::new(10.0, 10.0, 110.0, 40.0), &style).unwrap();
    page
      .insert_text(
        Point::new(60.0, 25.0),
        "LOGO",
        &TextStyle {
          font: StandardFont::HelveticaBold,
          size: 14.0,
          color: Color::BLACK,
          anchor: TextAnchor::Center,
        },
      )
      .unwrap();
    assert!(page.draw_rect(&Rect::new(0.0, 0.0, 0.0, 0.0), &style).is_err());

    let edit = page.into_edit().unwrap();
    let fonts = edit.resources.get(b"Font").and_then(Object::as_dict).unwrap();
    assert!(fonts.has(b"ShieldF2"));
    let states = edit.resources.get(b"ExtGState").and_then(Object::as_dict).unwrap();
    assert!(states.has(b"ShieldGS30"));

    let content = Content::decode(&edit.content.unwrap()).unwrap();
    let tj = content.operations.iter().find(|op| op.operator == "Tj").unwrap();
    assert!(matches!(&tj.operands[0], Object::String(bytes, _) if bytes.as_slice() == b"LOGO"));
  }

  #[test]
  fn test_broken_content_fails_open() {
    let mut doc = single_page_doc("", vec![]);
    let page_id = doc.get_pages()[&1];
    doc
      .get_object_mut(page_id)
      .and_then(Object::as_dict_mut)
      .unwrap()
      .set("Contents", Object::Integer(42));
    let snapshot = PageSnapshot::capture(&doc, 1, page_id);
    assert!(matches!(
      PdfPage::open(snapshot, ImageRedaction::BlankPixels),
      Err(SurfaceError::Content(_))
    ));
  }
}
