//! 文字遮盖
//!
//! 查找目标词的全部出现位置，整页一次性删除，再在原位置写入 `X` 串。
//! 坐标在删除之前采集，删除之后不再读取页面内容。

use serde::{Deserialize, Serialize};

use crate::error::{SurfaceError, WordSearchError};
use crate::geometry::{Point, Rect};
use crate::record::{LogKind, LogRecord, ProcessingLog};
use crate::region::{Color, RedactionBatch, RedactionRequest};
use crate::surface::{PageSurface, StandardFont, TextAnchor, TextStyle};

/// 遮盖串长度的计算方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MaskWidthPolicy {
    /// 每处出现按自身宽度计算
    #[default]
    PerOccurrence,
    /// 同一个词的所有出现都使用最后一处的宽度（旧版行为）
    PerWordLegacy,
}

/// 小字号补充扫描
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SmallTextOptions {
    pub enabled: bool,
    /// 字号不大于此值的片段参与扫描
    pub max_font_size: f32,
}

impl Default for SmallTextOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            max_font_size: 6.0,
        }
    }
}

/// 遮盖参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaskOptions {
    pub mask_char: char,
    /// 每个遮盖字符对应的原文宽度
    pub char_width: f32,
    pub min_chars: usize,
    pub font_size: f32,
    /// 写入位置相对原矩形上沿的下移距离
    pub baseline_offset: f32,
    pub color: Color,
    pub width_policy: MaskWidthPolicy,
    pub small_text: SmallTextOptions,
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self {
            mask_char: 'X',
            char_width: 6.0,
            min_chars: 3,
            font_size: 12.0,
            baseline_offset: 5.0,
            color: Color::BLACK,
            width_policy: MaskWidthPolicy::PerOccurrence,
            small_text: SmallTextOptions::default(),
        }
    }
}

/// 单个遮盖串的长度上限
pub const MAX_MASK_CHARS: usize = 1024;

impl MaskOptions {
    /// 宽度 `width` 对应的遮盖串，长度在 `min_chars` 与 [`MAX_MASK_CHARS`] 之间
    pub fn mask_for(&self, width: f32) -> String {
        let count = if width.is_finite() && width > 0.0 && self.char_width > 0.0 {
            (width / self.char_width).floor().min(MAX_MASK_CHARS as f32) as usize
        } else {
            0
        };
        std::iter::repeat(self.mask_char)
            .take(count.max(self.min_chars).min(MAX_MASK_CHARS))
            .collect()
    }

    fn text_style(&self) -> TextStyle {
        TextStyle {
            font: StandardFont::Helvetica,
            size: self.font_size,
            color: self.color,
            anchor: TextAnchor::BaselineStart,
        }
    }
}

/// 一处被遮盖的文字
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedOccurrence {
    pub word: String,
    /// 删除前采集的位置
    pub rect: Rect,
    pub mask: String,
}

/// 单页遮盖结果
#[derive(Debug, Clone, Default)]
pub struct MaskOutcome {
    pub occurrences: Vec<MaskedOccurrence>,
    pub redactions_applied: usize,
    pub small_text_redactions: usize,
    pub failures: Vec<WordSearchError>,
    pub log: ProcessingLog,
}

/// 去掉首尾空白并丢弃空词
pub fn normalize_words<S: AsRef<str>>(words: &[S]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.as_ref().trim())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// 遮盖页面上的目标词
///
/// 查找失败的词只记日志；删除或写入失败则整页失败。
pub fn mask_words(page: &mut dyn PageSurface, words: &[String], options: &MaskOptions) -> Result<MaskOutcome, SurfaceError> {
    let mut outcome = MaskOutcome::default();
    let number = page.number();
    let bounds = page.bounds();
    // 只按页面内可见的部分计宽度
    let visible_width = |rect: &Rect| rect.intersection(&bounds).map_or(0.0, |r| r.width());
    let words = normalize_words(words);

    let mut batch = RedactionBatch::new();
    for word in &words {
        let hits = match page.search_for(word) {
            Ok(hits) => hits,
            Err(source) => {
                let err = WordSearchError {
                    word: word.clone(),
                    source,
                };
                outcome
                    .log
                    .push(LogRecord::with_detail(number, LogKind::WordSearchFailure, err.to_string()));
                outcome.failures.push(err);
                continue;
            }
        };
        if hits.is_empty() {
            continue;
        }
        outcome
            .log
            .push(LogRecord::with_detail(number, LogKind::WordFound, word.clone()));

        let legacy_width = hits.last().map(visible_width).unwrap_or_default();
        for rect in hits {
            batch.push(RedactionRequest::white(rect));
            let width = match options.width_policy {
                MaskWidthPolicy::PerOccurrence => visible_width(&rect),
                MaskWidthPolicy::PerWordLegacy => legacy_width,
            };
            outcome.occurrences.push(MaskedOccurrence {
                word: word.clone(),
                rect,
                mask: options.mask_for(width),
            });
        }
    }

    if !batch.is_empty() {
        outcome.redactions_applied = page.apply_redactions(&batch)?;
        outcome.log.push(LogRecord::with_detail(
            number,
            LogKind::RedactionsApplied,
            outcome.redactions_applied.to_string(),
        ));

        let style = options.text_style();
        for occurrence in &outcome.occurrences {
            let origin = Point::new(occurrence.rect.x0, occurrence.rect.y0 + options.baseline_offset);
            page.insert_text(origin, &occurrence.mask, &style)?;
        }
    }

    if options.small_text.enabled && !words.is_empty() {
        outcome.small_text_redactions = sweep_small_text(page, &words, options, &mut outcome.log)?;
    }

    Ok(outcome)
}

/// 小字号片段中（不区分大小写）包含目标词的，整段删除，不写遮盖串
fn sweep_small_text(
    page: &mut dyn PageSurface,
    words: &[String],
    options: &MaskOptions,
    log: &mut ProcessingLog,
) -> Result<usize, SurfaceError> {
    let number = page.number();
    let lowered: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

    let mut batch = RedactionBatch::new();
    for span in page.text_spans()? {
        if span.font_size > options.small_text.max_font_size {
            continue;
        }
        let text = span.text.trim();
        if text.is_empty() {
            continue;
        }
        let haystack = text.to_lowercase();
        if lowered.iter().any(|w| haystack.contains(w.as_str())) && batch.push(RedactionRequest::white(span.rect)) {
            log.push(LogRecord::with_detail(number, LogKind::SmallTextFound, text));
        }
    }

    if batch.is_empty() {
        return Ok(0);
    }
    let applied = page.apply_redactions(&batch)?;
    log.push(LogRecord::with_detail(
        number,
        LogKind::RedactionsApplied,
        format!("{} small text", applied),
    ));
    Ok(applied)
}
