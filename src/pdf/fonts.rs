//! 字体度量与字符解码
//!
//! 字宽优先取字体字典的 /Widths（或 CID 字体的 /W），其次是 Helvetica /
//! Courier 标准度量，最后按 ASCII 0.55em、其他 1em 估算。

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object};
use shield_core::StandardFont;

use super::utils::{get_number, get_stream_content, resolve, resolve_dict};

/// Helvetica 在 32..=126 的字宽（1/1000 em）
const HELVETICA_WIDTHS: [u16; 95] = [
  278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
  556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
  1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
  667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
  333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
  556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];

/// Helvetica-Bold 在 32..=126 的字宽
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
  278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
  556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 48-63
  975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 64-79
  667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 80-95
  333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 96-111
  611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 112-126
];

/// 已知标准字体族
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StandardFamily {
  Helvetica,
  HelveticaBold,
  Courier,
}

impl StandardFamily {
  fn from_base_font(name: &str) -> Option<Self> {
    // 去掉子集前缀 ABCDEF+
    let name = name.split_once('+').map(|(_, rest)| rest).unwrap_or(name);
    if name.contains("Courier") {
      Some(StandardFamily::Courier)
    } else if name.contains("Helvetica") || name.contains("Arial") {
      if name.contains("Bold") {
        Some(StandardFamily::HelveticaBold)
      } else {
        Some(StandardFamily::Helvetica)
      }
    } else {
      None
    }
  }

  fn width(&self, code: u32) -> Option<f32> {
    if !(32..=126).contains(&code) {
      return None;
    }
    let index = (code - 32) as usize;
    match self {
      StandardFamily::Helvetica => Some(HELVETICA_WIDTHS[index] as f32),
      StandardFamily::HelveticaBold => Some(HELVETICA_BOLD_WIDTHS[index] as f32),
      StandardFamily::Courier => Some(600.0),
    }
  }
}

impl From<StandardFont> for StandardFamily {
  fn from(font: StandardFont) -> Self {
    match font {
      StandardFont::Helvetica => StandardFamily::Helvetica,
      StandardFont::HelveticaBold => StandardFamily::HelveticaBold,
    }
  }
}

/// 估算单个字符的宽度（1/1000 em）
fn estimate_char_width(code: u32) -> f32 {
  if code < 128 {
    550.0
  } else {
    1000.0
  }
}

/// 用标准字体写入文字时的宽度（pt）
pub fn standard_text_width(font: StandardFont, text: &str, size: f32) -> f32 {
  let family = StandardFamily::from(font);
  text
    .chars()
    .map(|c| family.width(c as u32).unwrap_or_else(|| estimate_char_width(c as u32)))
    .sum::<f32>()
    * size
    / 1000.0
}

/// 把文字编码为 WinAnsi 字节；无法表示的字符写为 `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
  text
    .chars()
    .map(|c| match c as u32 {
      0x20..=0x7e | 0xa0..=0xff => c as u32 as u8,
      _ => match c {
        '€' => 0x80,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        _ => b'?',
      },
    })
    .collect()
}

fn decode_win_ansi(byte: u8) -> char {
  match byte {
    0x80 => '€',
    0x91 => '‘',
    0x92 => '’',
    0x93 => '“',
    0x94 => '”',
    0x95 => '•',
    0x96 => '–',
    0x97 => '—',
    _ => byte as char,
  }
}

/// 字符串中的一个字形
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGlyph {
  pub code: u32,
  /// 在原字符串中的字节位置
  pub byte_start: usize,
  pub byte_len: usize,
  pub text: String,
  /// 字宽（1/1000 em）
  pub width: f32,
  /// 单字节编码 32，字间距 Tw 对其生效
  pub is_space: bool,
}

/// 字体度量
#[derive(Debug, Clone, PartialEq)]
pub struct FontMetrics {
  pub base_font: String,
  two_byte: bool,
  first_char: u32,
  widths: Vec<f32>,
  cid_widths: BTreeMap<u32, f32>,
  default_width: Option<f32>,
  standard: Option<StandardFamily>,
  to_unicode: BTreeMap<u32, String>,
}

impl Default for FontMetrics {
  fn default() -> Self {
    Self {
      base_font: String::new(),
      two_byte: false,
      first_char: 0,
      widths: Vec::new(),
      cid_widths: BTreeMap::new(),
      default_width: None,
      standard: None,
      to_unicode: BTreeMap::new(),
    }
  }
}

impl FontMetrics {
  /// 未知字体：全部按估算宽度
  pub fn fallback() -> Self {
    Self::default()
  }

  /// 插入文字用的标准字体
  pub fn standard(font: StandardFont) -> Self {
    Self {
      base_font: font.base_font().to_string(),
      standard: Some(StandardFamily::from(font)),
      ..Self::default()
    }
  }

  pub fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
    let base_font = match dict.get(b"BaseFont").map(|o| resolve(doc, o)) {
      Ok(Object::Name(name)) => String::from_utf8_lossy(name).to_string(),
      _ => String::new(),
    };
    let subtype = match dict.get(b"Subtype") {
      Ok(Object::Name(name)) => name.clone(),
      _ => Vec::new(),
    };

    let mut metrics = Self {
      standard: StandardFamily::from_base_font(&base_font),
      base_font,
      ..Self::default()
    };

    if let Ok(obj) = dict.get(b"ToUnicode") {
      if let Object::Stream(stream) = resolve(doc, obj) {
        metrics.to_unicode = parse_to_unicode(&get_stream_content(stream));
      }
    }

    if subtype == b"Type0" {
      metrics.two_byte = true;
      metrics.load_cid_widths(doc, dict);
    } else {
      metrics.load_simple_widths(doc, dict);
    }

    log::debug!(
      "[Font] {} two_byte={} widths={} cid_widths={} to_unicode={}",
      metrics.base_font,
      metrics.two_byte,
      metrics.widths.len(),
      metrics.cid_widths.len(),
      metrics.to_unicode.len()
    );
    metrics
  }

  fn load_simple_widths(&mut self, doc: &Document, dict: &Dictionary) {
    self.first_char = dict
      .get(b"FirstChar")
      .ok()
      .and_then(|o| get_number(resolve(doc, o)))
      .map(|v| v.max(0.0) as u32)
      .unwrap_or(0);
    if let Ok(Object::Array(arr)) = dict.get(b"Widths").map(|o| resolve(doc, o)) {
      self.widths = arr
        .iter()
        .map(|o| get_number(resolve(doc, o)).unwrap_or(0.0))
        .collect();
    }
    self.default_width = dict
      .get(b"FontDescriptor")
      .ok()
      .and_then(|o| resolve_dict(doc, o))
      .and_then(|d| d.get(b"MissingWidth").ok())
      .and_then(|o| get_number(resolve(doc, o)))
      .filter(|w| *w > 0.0);
  }

  fn load_cid_widths(&mut self, doc: &Document, dict: &Dictionary) {
    let descendant = match dict.get(b"DescendantFonts").map(|o| resolve(doc, o)) {
      Ok(Object::Array(arr)) => arr.first().and_then(|o| resolve_dict(doc, o)),
      _ => None,
    };
    let Some(descendant) = descendant else {
      return;
    };

    self.default_width = Some(
      descendant
        .get(b"DW")
        .ok()
        .and_then(|o| get_number(resolve(doc, o)))
        .unwrap_or(1000.0),
    );

    let entries = match descendant.get(b"W").map(|o| resolve(doc, o)) {
      Ok(Object::Array(arr)) => arr,
      _ => return,
    };

    // 两种格式：c [w1 w2 ...] 或 c_first c_last w
    let mut i = 0;
    while i < entries.len() {
      let Some(start) = get_number(resolve(doc, &entries[i])) else {
        break;
      };
      let start = start as u32;
      match entries.get(i + 1).map(|o| resolve(doc, o)) {
        Some(Object::Array(list)) => {
          for (offset, w) in list.iter().enumerate() {
            if let Some(w) = get_number(resolve(doc, w)) {
              self.cid_widths.insert(start + offset as u32, w);
            }
          }
          i += 2;
        }
        Some(end) => {
          let end = get_number(end).map(|v| v as u32);
          let width = entries.get(i + 2).and_then(|o| get_number(resolve(doc, o)));
          match (end, width) {
            (Some(end), Some(width)) if end >= start && end - start < 65_536 => {
              for cid in start..=end {
                self.cid_widths.insert(cid, width);
              }
            }
            _ => break,
          }
          i += 3;
        }
        None => break,
      }
    }
  }

  /// 字宽（1/1000 em）
  pub fn width(&self, code: u32) -> f32 {
    if self.two_byte {
      return self
        .cid_widths
        .get(&code)
        .copied()
        .or(self.default_width)
        .unwrap_or(1000.0);
    }

    if code >= self.first_char {
      if let Some(w) = self.widths.get((code - self.first_char) as usize) {
        if *w > 0.0 {
          return *w;
        }
      }
    }
    self
      .standard
      .and_then(|s| s.width(code))
      .or(self.default_width)
      .unwrap_or_else(|| estimate_char_width(code))
  }

  fn decode_code(&self, code: u32) -> String {
    if let Some(text) = self.to_unicode.get(&code) {
      return text.clone();
    }
    if self.two_byte {
      char::from_u32(code).map(String::from).unwrap_or_default()
    } else {
      decode_win_ansi(code as u8).to_string()
    }
  }

  /// 把字符串字节拆分为字形
  pub fn decode(&self, bytes: &[u8]) -> Vec<DecodedGlyph> {
    let step = if self.two_byte { 2 } else { 1 };
    bytes
      .chunks(step)
      .enumerate()
      .map(|(i, chunk)| {
        let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32);
        DecodedGlyph {
          code,
          byte_start: i * step,
          byte_len: chunk.len(),
          text: self.decode_code(code),
          width: self.width(code),
          is_space: !self.two_byte && code == 32,
        }
      })
      .collect()
  }
}

fn parse_hex(token: &str) -> Option<(u32, usize)> {
  let digits: String = token.chars().filter(|c| c.is_ascii_hexdigit()).collect();
  if digits.is_empty() || digits.len() > 8 {
    return None;
  }
  u32::from_str_radix(&digits, 16).ok().map(|v| (v, digits.len()))
}

fn hex_to_string(token: &str) -> String {
  let digits: Vec<u8> = token
    .chars()
    .filter(|c| c.is_ascii_hexdigit())
    .filter_map(|c| c.to_digit(16).map(|d| d as u8))
    .collect();
  let units: Vec<u16> = digits
    .chunks(4)
    .filter(|c| c.len() == 4)
    .map(|c| c.iter().fold(0u16, |acc, d| (acc << 4) | *d as u16))
    .collect();
  if units.is_empty() && digits.len() == 2 {
    return (((digits[0] << 4) | digits[1]) as char).to_string();
  }
  String::from_utf16_lossy(&units)
}

/// CMap 词法单元
#[derive(Debug, Clone, PartialEq)]
enum CMapToken {
  Hex(String),
  Open,
  Close,
  Word(String),
}

fn tokenize_cmap(data: &str) -> Vec<CMapToken> {
  let mut tokens = Vec::new();
  let mut chars = data.chars().peekable();
  while let Some(c) = chars.next() {
    match c {
      '<' => {
        let mut hex = String::new();
        for h in chars.by_ref() {
          if h == '>' {
            break;
          }
          hex.push(h);
        }
        tokens.push(CMapToken::Hex(hex));
      }
      '[' => tokens.push(CMapToken::Open),
      ']' => tokens.push(CMapToken::Close),
      '%' => {
        for h in chars.by_ref() {
          if h == '\n' || h == '\r' {
            break;
          }
        }
      }
      c if c.is_whitespace() => {}
      c => {
        let mut word = String::from(c);
        while let Some(&n) = chars.peek() {
          if n.is_whitespace() || matches!(n, '<' | '[' | ']') {
            break;
          }
          word.push(n);
          chars.next();
        }
        tokens.push(CMapToken::Word(word));
      }
    }
  }
  tokens
}

/// 解析 ToUnicode CMap 的 bfchar / bfrange
pub fn parse_to_unicode(data: &[u8]) -> BTreeMap<u32, String> {
  let text = String::from_utf8_lossy(data);
  let tokens = tokenize_cmap(&text);
  let mut map = BTreeMap::new();

  let mut i = 0;
  while i < tokens.len() {
    match &tokens[i] {
      CMapToken::Word(w) if w == "beginbfchar" => {
        i += 1;
        while i + 1 < tokens.len() {
          match (&tokens[i], &tokens[i + 1]) {
            (CMapToken::Hex(src), CMapToken::Hex(dst)) => {
              if let Some((code, _)) = parse_hex(src) {
                map.insert(code, hex_to_string(dst));
              }
              i += 2;
            }
            _ => break,
          }
        }
      }
      CMapToken::Word(w) if w == "beginbfrange" => {
        i += 1;
        while i + 2 < tokens.len() {
          let (lo, hi) = match (&tokens[i], &tokens[i + 1]) {
            (CMapToken::Hex(lo), CMapToken::Hex(hi)) => match (parse_hex(lo), parse_hex(hi)) {
              (Some((lo, _)), Some((hi, _))) if hi >= lo && hi - lo < 65_536 => (lo, hi),
              _ => break,
            },
            _ => break,
          };
          match &tokens[i + 2] {
            CMapToken::Hex(dst) => {
              let base: Vec<u16> = hex_to_string(dst).encode_utf16().collect();
              for (offset, code) in (lo..=hi).enumerate() {
                let mut units = base.clone();
                if let Some(last) = units.last_mut() {
                  *last = last.wrapping_add(offset as u16);
                }
                map.insert(code, String::from_utf16_lossy(&units));
              }
              i += 3;
            }
            CMapToken::Open => {
              let mut j = i + 3;
              let mut code = lo;
              while j < tokens.len() && tokens[j] != CMapToken::Close {
                if let CMapToken::Hex(dst) = &tokens[j] {
                  if code <= hi {
                    map.insert(code, hex_to_string(dst));
                  }
                  code += 1;
                }
                j += 1;
              }
              i = j + 1;
            }
            _ => break,
          }
        }
      }
      _ => i += 1,
    }
  }

  map
}
