//! 输出校验：重新解析保存后的文档，确认目标词已无法提取

use lopdf::Document;
use shield_core::normalize_words;

use super::snapshot::PageSnapshot;
use super::surface::PdfPage;
use super::types::{ImageRedaction, Residual, VerifyReport};
use super::ShieldError;

pub fn verify_output<S: AsRef<str>>(bytes: &[u8], words: &[S]) -> Result<VerifyReport, ShieldError> {
  let doc = Document::load_mem(bytes).map_err(ShieldError::Load)?;
  let words = normalize_words(words);
  let mut report = VerifyReport::default();

  for (number, page_id) in doc.get_pages() {
    let snapshot = PageSnapshot::capture(&doc, number, page_id);
    let page = match PdfPage::open(snapshot, ImageRedaction::default()) {
      Ok(page) => page,
      Err(e) => {
        report.warnings.push(format!("page {}: {}", number, e));
        continue;
      }
    };
    report.pages_checked += 1;

    for word in &words {
      let occurrences = page.layout().search(word).len();
      if occurrences > 0 {
        log::warn!("[Verify] 第 {} 页仍可提取 '{}' ({} 处)", number, word, occurrences);
        report.residuals.push(Residual {
          page: number,
          word: word.clone(),
          occurrences,
        });
      }
    }
  }

  log::info!(
    "[Verify] 检查 {} 页, 残留 {} 项, 警告 {} 项",
    report.pages_checked,
    report.residuals.len(),
    report.warnings.len()
  );
  Ok(report)
}
