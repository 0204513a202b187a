mod types;
mod utils;
mod fonts;
mod layout;
mod text;
mod image;
mod snapshot;
mod surface;
mod metadata;
mod detection;
mod verify;
#[cfg(test)]
mod test_support;

pub use types::{
  ImageRedaction, PageContentType, PdfAnalysis, ProcessOutput, ProcessRequest,
  ProcessingMode, Residual, VerifyReport,
};
pub use detection::{analyze_pdf, analyze_pdf_bytes, analyze_pdf_file, is_scanned};
pub use snapshot::{merge_edit, PageEdit, PageSnapshot};
pub use surface::PdfPage;
pub use verify::verify_output;

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use lopdf::{Document, ObjectId};
use rayon::prelude::*;
use shield_core::{
  normalize_words, process_page, LogKind, LogRecord, PageOptions, PageReport, ProcessingLog, SurfaceError,
};

use crate::config::{ConfigError, ShieldConfig};

#[derive(Debug, thiserror::Error)]
pub enum ShieldError {
  #[error("无法加载 PDF: {0}")]
  Load(#[source] lopdf::Error),
  #[error("保存失败: {0}")]
  Save(#[source] std::io::Error),
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error("线程池创建失败: {0}")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),
  #[error("第 {page} 页处理失败: {message}")]
  Page { page: u32, message: String },
}

/// 一页任务的结果
struct PageOutcome {
  number: u32,
  result: Result<(PageEdit, PageReport), String>,
}

fn run_page(
  snapshot: PageSnapshot,
  words: &[String],
  options: &PageOptions,
  image_mode: ImageRedaction,
) -> Result<(PageEdit, PageReport), SurfaceError> {
  let mut page = PdfPage::open(snapshot, image_mode)?;
  let report = process_page(&mut page, words, options)?;
  let edit = page.into_edit()?;
  Ok((edit, report))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    format!("panic: {}", message)
  } else if let Some(message) = payload.downcast_ref::<String>() {
    format!("panic: {}", message)
  } else {
    "panic".to_string()
  }
}

/// 处理一页；错误与 panic 都转成失败结果
fn run_page_guarded(
  snapshot: PageSnapshot,
  words: &[String],
  options: &PageOptions,
  image_mode: ImageRedaction,
) -> PageOutcome {
  let number = snapshot.number;
  let result = match panic::catch_unwind(AssertUnwindSafe(|| run_page(snapshot, words, options, image_mode))) {
    Ok(Ok(done)) => Ok(done),
    Ok(Err(e)) => Err(e.to_string()),
    Err(payload) => Err(panic_message(payload)),
  };
  if let Err(message) = &result {
    log::warn!("[Pipeline] 第 {} 页处理失败: {}", number, message);
  }
  PageOutcome { number, result }
}

/// 逐页顺序处理；默认遇到失败页立即返回错误
fn process_sequential(
  doc: &Document,
  pages: &[(u32, ObjectId)],
  words: &[String],
  options: &PageOptions,
  config: &ShieldConfig,
) -> Result<Vec<PageOutcome>, ShieldError> {
  let mut outcomes = Vec::with_capacity(pages.len());
  for (number, page_id) in pages {
    let snapshot = PageSnapshot::capture(doc, *number, *page_id);
    let outcome = run_page_guarded(snapshot, words, options, config.image_redaction);
    if let Err(message) = &outcome.result {
      if !config.skip_failed_pages {
        return Err(ShieldError::Page {
          page: *number,
          message: message.clone(),
        });
      }
    }
    outcomes.push(outcome);
  }
  Ok(outcomes)
}

/// 线程池并行处理；单页失败不影响其他页
fn process_concurrent(
  doc: &Document,
  pages: &[(u32, ObjectId)],
  words: &[String],
  options: &PageOptions,
  config: &ShieldConfig,
) -> Result<Vec<PageOutcome>, ShieldError> {
  let snapshots: Vec<PageSnapshot> = pages
    .iter()
    .map(|(number, page_id)| PageSnapshot::capture(doc, *number, *page_id))
    .collect();

  let workers = config.worker_count();
  log::info!("[Pipeline] 并行处理 {} 页，线程数 {}", snapshots.len(), workers);

  let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
  let image_mode = config.image_redaction;
  let outcomes: Vec<PageOutcome> = pool.install(|| {
    snapshots
      .into_par_iter()
      .map(|snapshot| run_page_guarded(snapshot, words, options, image_mode))
      .collect()
  });
  Ok(outcomes)
}

fn resolve_mode(doc: &Document, config: &ShieldConfig) -> ProcessingMode {
  match config.mode {
    ProcessingMode::Auto => {
      if is_scanned(doc) {
        ProcessingMode::Concurrent
      } else {
        ProcessingMode::Sequential
      }
    }
    mode => mode,
  }
}

/// 处理内存中的 PDF
pub fn process_bytes<S: AsRef<str>>(
  bytes: &[u8],
  words: &[S],
  config: &ShieldConfig,
) -> Result<ProcessOutput, ShieldError> {
  config.validate()?;
  let mut doc = Document::load_mem(bytes).map_err(ShieldError::Load)?;
  let words = normalize_words(words);
  let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();

  let mode = resolve_mode(&doc, config);
  let options = config.page_options(mode == ProcessingMode::Concurrent);
  log::info!(
    "[Pipeline] 开始处理: {} 页, {} 个目标词, 模式 {:?}",
    pages.len(),
    words.len(),
    mode
  );

  let outcomes = match mode {
    ProcessingMode::Concurrent => process_concurrent(&doc, &pages, &words, &options, config)?,
    _ => process_sequential(&doc, &pages, &words, &options, config)?,
  };

  // 单一写入方按页序合并
  let mut log = ProcessingLog::new();
  let mut failed_pages = Vec::new();
  let mut touched_pages = 0;
  let mut rewritten = false;
  for outcome in outcomes {
    match outcome.result {
      Ok((edit, report)) => {
        if report.touched() {
          touched_pages += 1;
        }
        log.append(report.log);
        match merge_edit(&mut doc, edit) {
          Ok(modified) => rewritten |= modified,
          Err(e) => {
            log.push(LogRecord::with_detail(outcome.number, LogKind::PageFailure, e.to_string()));
            failed_pages.push(outcome.number);
          }
        }
      }
      Err(message) => {
        log.push(LogRecord::with_detail(outcome.number, LogKind::PageFailure, message));
        failed_pages.push(outcome.number);
      }
    }
  }

  // 被替换的原图片、表单不再有引用
  if rewritten {
    let pruned = doc.prune_objects();
    log::debug!("[Pipeline] 清理无引用对象 {} 个", pruned.len());
  }

  if config.stamp_metadata {
    if let Err(e) = metadata::set_redaction_metadata(&mut doc) {
      log::warn!("[Pipeline] 写入元信息失败: {}", e);
    }
  }

  doc.compress();
  let mut output = Vec::new();
  doc.save_to(&mut output).map_err(ShieldError::Save)?;

  log::info!(
    "[Pipeline] 处理完成: 改动 {} 页, {} 条日志, 失败页 {:?}",
    touched_pages,
    log.len(),
    failed_pages
  );

  Ok(ProcessOutput {
    bytes: output,
    log,
    mode,
    pages: pages.len(),
    failed_pages,
  })
}

/// 读取、处理并写出文件
pub fn process_file<S: AsRef<str>>(
  input: &Path,
  output: &Path,
  words: &[S],
  config: &ShieldConfig,
) -> Result<ProcessOutput, ShieldError> {
  let bytes = fs::read(input)?;
  let result = process_bytes(&bytes, words, config)?;
  if let Some(dir) = output.parent() {
    fs::create_dir_all(dir)?;
  }
  fs::write(output, &result.bytes)?;
  log::info!("[Pipeline] 已写出 {}", output.display());
  Ok(result)
}

pub fn process(request: &ProcessRequest) -> Result<ProcessOutput, ShieldError> {
  process_file(
    Path::new(&request.input_path),
    Path::new(&request.output_path),
    &request.words,
    &request.config,
  )
}
