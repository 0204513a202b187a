//! 文档分析：扫描件判定与页面内容类型

use lopdf::{content::Content, Document, Object};

use super::layout::Word;
use super::snapshot::PageSnapshot;
use super::surface::PdfPage;
use super::types::{ImageRedaction, PageContentType, PdfAnalysis, ProcessingMode};
use super::utils::{detect_page_content_type, get_page_content};
use super::ShieldError;

/// 判定时最多抽查的页数
const SAMPLE_PAGES: usize = 3;
const MIN_WORDS: usize = 10;
const MIN_TEXT_CHARS: usize = 50;
const MIN_AVG_WORD_LEN: f32 = 2.5;
/// 单词内平均每字符宽度超过该值视为字距异常（OCR 痕迹）
const WIDE_CHAR_WIDTH: f32 = 20.0;
const WIDE_SPACING_SHARE: f32 = 0.3;

/// 单页是否像扫描件
fn page_looks_scanned(words: &[Word], text: &str, has_images: bool) -> bool {
  if has_images && (words.len() < MIN_WORDS || text.trim().chars().count() < MIN_TEXT_CHARS) {
    log::debug!("[Scan] 文字很少且含图片: words={}", words.len());
    return true;
  }
  if words.is_empty() {
    return false;
  }

  let total_chars: usize = words.iter().map(|w| w.text.chars().count()).sum();
  let avg_word_len = total_chars as f32 / words.len() as f32;
  if avg_word_len < MIN_AVG_WORD_LEN {
    log::debug!("[Scan] 平均单词长度过短: {:.2}", avg_word_len);
    return true;
  }

  // 每个字距异常的字符间隔计一次
  let wide_gaps: usize = words
    .iter()
    .filter_map(|w| {
      let chars = w.text.chars().count();
      if chars <= 2 || w.rect.width() <= 0.0 {
        return None;
      }
      (w.rect.width() / chars as f32 > WIDE_CHAR_WIDTH).then_some(chars - 1)
    })
    .sum();
  if wide_gaps > 0 && wide_gaps as f32 > words.len() as f32 * WIDE_SPACING_SHARE {
    log::debug!("[Scan] 字距异常: {} / {}", wide_gaps, words.len());
    return true;
  }

  false
}

/// 扫描件判定：抽查前几页，出错时按非扫描件处理
pub fn is_scanned(doc: &Document) -> bool {
  for (number, page_id) in doc.get_pages().into_iter().take(SAMPLE_PAGES) {
    let snapshot = PageSnapshot::capture(doc, number, page_id);
    let has_images = !snapshot.scope.images.is_empty();
    let page = match PdfPage::open(snapshot, ImageRedaction::default()) {
      Ok(page) => page,
      Err(e) => {
        log::warn!("[Scan] 第 {} 页分析失败，按非扫描件处理: {}", number, e);
        return false;
      }
    };

    let layout = page.layout();
    if page_looks_scanned(&layout.words(), &layout.text(), has_images) {
      log::info!("[Scan] 第 {} 页判定为扫描件", number);
      return true;
    }
  }
  false
}

fn check_has_metadata(doc: &Document) -> bool {
  // 检查 Info 字典
  if doc.trailer.has(b"Info") {
    return true;
  }
  // 检查 XMP Metadata
  if let Ok(Object::Reference(catalog_ref)) = doc.trailer.get(b"Root") {
    if let Ok(Object::Dictionary(catalog)) = doc.get_object(*catalog_ref) {
      return catalog.has(b"Metadata");
    }
  }
  false
}

/// 分析已加载的文档
pub fn analyze_pdf(doc: &Document) -> PdfAnalysis {
  let pages = doc.get_pages();

  // 检测每页的内容类型
  let page_types: Vec<PageContentType> = pages
    .values()
    .map(|page_id| {
      let operations = get_page_content(doc, *page_id)
        .ok()
        .and_then(|data| Content::decode(&data).ok())
        .map(|content| content.operations)
        .unwrap_or_default();
      detect_page_content_type(&operations)
    })
    .collect();

  let is_scanned = is_scanned(doc);
  let recommended_mode = if is_scanned {
    ProcessingMode::Concurrent
  } else {
    ProcessingMode::Sequential
  };

  PdfAnalysis {
    page_count: pages.len(),
    page_types,
    is_scanned,
    has_metadata: check_has_metadata(doc),
    recommended_mode,
  }
}

pub fn analyze_pdf_bytes(bytes: &[u8]) -> Result<PdfAnalysis, ShieldError> {
  let doc = Document::load_mem(bytes).map_err(ShieldError::Load)?;
  Ok(analyze_pdf(&doc))
}

/// 分析 PDF 文件
pub fn analyze_pdf_file(pdf_path: &str) -> Result<PdfAnalysis, ShieldError> {
  let bytes = std::fs::read(pdf_path)?;
  analyze_pdf_bytes(&bytes)
}
