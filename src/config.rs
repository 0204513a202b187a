use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use shield_core::{LogoOptions, MaskOptions, PageOptions, SmallTextOptions, WatermarkOptions};

use crate::pdf::{ImageRedaction, ProcessingMode};

/// 工作线程数环境变量
pub const WORKERS_ENV: &str = "SHIELD_WORKERS";

const DEFAULT_MAX_WORKERS: usize = 4;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ShieldConfig {
    // ============ 处理流程 ============
    /// 删除 logo 区域
    pub remove_logos: bool,
    /// 在删除位置绘制占位水印
    pub add_watermarks: bool,
    /// 顺序 / 并行 / 自动
    pub mode: ProcessingMode,
    /// 并行模式的线程数；为空时取环境变量或 CPU 数（最多 4）
    pub worker_threads: Option<usize>,
    /// 顺序模式下页面失败时跳过该页继续，而不是整个文档失败
    pub skip_failed_pages: bool,

    // ============ 各阶段参数 ============
    pub logo: LogoOptions,
    pub watermark: WatermarkOptions,
    pub mask: MaskOptions,
    /// 小字号补充扫描，只在并行（扫描件）模式下生效
    pub small_text_sweep: SmallTextOptions,

    // ============ 输出 ============
    pub image_redaction: ImageRedaction,
    /// 写入 Producer / ModDate 等元信息
    pub stamp_metadata: bool,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            remove_logos: true,
            add_watermarks: true,
            mode: ProcessingMode::Auto,
            worker_threads: None,
            skip_failed_pages: false,
            logo: LogoOptions::default(),
            watermark: WatermarkOptions::default(),
            mask: MaskOptions::default(),
            small_text_sweep: SmallTextOptions {
                enabled: true,
                ..SmallTextOptions::default()
            },
            image_redaction: ImageRedaction::default(),
            stamp_metadata: true,
        }
    }
}

impl ShieldConfig {
    /// 单页参数；`concurrent` 为真时启用小字号扫描
    pub fn page_options(&self, concurrent: bool) -> PageOptions {
        let mut watermark = self.watermark.clone();
        watermark.enabled = watermark.enabled && self.add_watermarks;

        let mut mask = self.mask.clone();
        mask.small_text = if concurrent {
            self.small_text_sweep.clone()
        } else {
            SmallTextOptions {
                enabled: false,
                ..self.small_text_sweep.clone()
            }
        };

        PageOptions {
            remove_logos: self.remove_logos,
            logo: self.logo.clone(),
            watermark,
            mask,
        }
    }

    /// 检查取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mask = &self.mask;
        if !(mask.char_width.is_finite() && mask.char_width > 0.0) {
            return Err(ConfigError::Invalid(format!("mask.charWidth 必须大于 0: {}", mask.char_width)));
        }
        if !(mask.font_size.is_finite() && mask.font_size > 0.0) {
            return Err(ConfigError::Invalid(format!("mask.fontSize 必须大于 0: {}", mask.font_size)));
        }
        Ok(())
    }

    /// 并行模式线程数：环境变量优先，其次配置，最后按 CPU 数
    pub fn worker_count(&self) -> usize {
        let env = std::env::var(WORKERS_ENV).ok();
        resolve_worker_count(env.as_deref(), self.worker_threads)
    }
}

fn default_worker_count() -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(DEFAULT_MAX_WORKERS);
    available.min(DEFAULT_MAX_WORKERS).max(1)
}

fn resolve_worker_count(env: Option<&str>, configured: Option<usize>) -> usize {
    env.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
        .or(configured.filter(|v| *v > 0))
        .unwrap_or_else(default_worker_count)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("配置无效: {0}")]
    Invalid(String),
}

/// 读取配置文件；文件不存在时返回默认配置
pub fn load_config(path: &Path) -> Result<ShieldConfig, ConfigError> {
    if !path.exists() {
        log::info!("[Config] {} 不存在，使用默认配置", path.display());
        return Ok(ShieldConfig::default());
    }
    let raw = fs::read_to_string(path)?;
    let config: ShieldConfig = serde_json::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &ShieldConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let raw = serde_json::to_string_pretty(config)?;
    fs::write(path, raw)?;
    Ok(())
}
