// ==========================================
// 企业档案导入 - 列内容分类器实现
// ==========================================
// 职责: 采样每列非空值，按固定优先级的模式检测器推断列类型
// 说明: 只看单元格内容，不看表头文本
// ==========================================

use crate::config::ImportConfig;
use crate::domain::import::{ContentAnalysis, RawImportRow};
use crate::domain::profile::FieldKey;
use crate::importer::importer_trait::ContentClassifier as ContentClassifierTrait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

static SIRET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{14}$").unwrap());

static SIREN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{9}$").unwrap());

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").unwrap()
});

static WEBSITE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?(?:www\.)?[a-z0-9](?:[a-z0-9\-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9\-]*[a-z0-9])?)*\.[a-z]{2,}(?::\d+)?(?:[/?#]\S*)?$",
    )
    .unwrap()
});

// 法国号码: 0X XX XX XX XX / +33 X XX XX XX XX / 0033...
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:\+|00)33[\s.\-]?(?:\(0\)[\s.\-]?)?[1-9]|0[1-9])(?:[\s.\-]?\d{2}){4}$")
        .unwrap()
});

/// 去除数字串中的分组空白（含不间断空格）
fn compact_digits(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect()
}

/// 单值类型检测（优先级: SIRET → SIREN → email → website → phone）
///
/// # 返回
/// - Some(FieldKey): 第一个命中的检测器
/// - None: 无检测器命中
pub fn detect_value(value: &str) -> Option<FieldKey> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let compact = compact_digits(value);
    if SIRET_RE.is_match(&compact) {
        return Some(FieldKey::Siret);
    }
    if SIREN_RE.is_match(&compact) {
        return Some(FieldKey::Siren);
    }
    if EMAIL_RE.is_match(value) {
        return Some(FieldKey::Email);
    }
    if WEBSITE_RE.is_match(value) {
        return Some(FieldKey::Website);
    }
    if PHONE_RE.is_match(value) {
        return Some(FieldKey::Phone);
    }
    None
}

pub struct ContentClassifier {
    sample_size: usize,
    min_detect_ratio: f64,
    min_sample_count: usize,
}

impl Default for ContentClassifier {
    fn default() -> Self {
        Self::from_config(&ImportConfig::default())
    }
}

impl ContentClassifier {
    pub fn new(sample_size: usize, min_detect_ratio: f64, min_sample_count: usize) -> Self {
        Self {
            sample_size,
            min_detect_ratio,
            min_sample_count,
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(
            config.sample_size,
            config.min_detect_ratio,
            config.min_sample_count,
        )
    }

    /// 分析单列
    fn analyze_column(&self, column: &str, rows: &[RawImportRow]) -> ContentAnalysis {
        let samples: Vec<&str> = rows
            .iter()
            .filter_map(|row| row.get(column))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .take(self.sample_size)
            .collect();
        let sample_count = samples.len();

        let mut counts: HashMap<FieldKey, usize> = HashMap::new();
        for value in &samples {
            if let Some(field) = detect_value(value) {
                *counts.entry(field).or_insert(0) += 1;
            }
        }

        // 取多数类型；票数相同按检测器优先级
        let plurality = DETECTOR_ORDER
            .iter()
            .filter_map(|f| counts.get(f).map(|c| (*f, *c)))
            .fold(None, |best: Option<(FieldKey, usize)>, (field, count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((field, count)),
            });

        let (candidate, match_ratio) = match plurality {
            Some((field, count)) if sample_count > 0 => {
                (Some(field), count as f64 / sample_count as f64)
            }
            _ => (None, 0.0),
        };

        let detected_type = candidate.filter(|_| {
            match_ratio >= self.min_detect_ratio && sample_count >= self.min_sample_count
        });

        debug!(
            column = %column,
            sample_count = sample_count,
            match_ratio = match_ratio,
            detected = ?detected_type,
            "列内容分析完成"
        );

        ContentAnalysis {
            source_column: column.to_string(),
            detected_type,
            match_ratio,
            sample_count,
        }
    }
}

const DETECTOR_ORDER: [FieldKey; 5] = [
    FieldKey::Siret,
    FieldKey::Siren,
    FieldKey::Email,
    FieldKey::Website,
    FieldKey::Phone,
];

impl ContentClassifierTrait for ContentClassifier {
    fn analyze_columns(&self, rows: &[RawImportRow]) -> Vec<ContentAnalysis> {
        let columns: Vec<&str> = match rows.first() {
            Some(first) => first.raw_data.iter().map(|(k, _)| k.as_str()).collect(),
            None => return Vec::new(),
        };

        columns
            .into_iter()
            .map(|column| self.analyze_column(column, rows))
            .collect()
    }
}
