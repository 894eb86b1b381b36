// ==========================================
// 企业档案导入 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 标识清洗 / 整数与年份解析 / 名称规范化
// ==========================================

use crate::importer::importer_trait::DataCleaner as DataCleanerTrait;
use chrono::{Datelike, NaiveDate};
use unicode_normalization::UnicodeNormalization;

/// 年份字段可接受的日期格式（按顺序尝试）
const YEAR_DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"];

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn clean_text(&self, value: &str) -> String {
        value.trim().to_string()
    }

    fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn clean_identifier(&self, value: &str) -> String {
        value
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, '.' | '-' | '\u{a0}'))
            .collect()
    }

    fn parse_integer(&self, value: &str) -> Option<i64> {
        let compact: String = value
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, '\u{a0}' | '\u{202f}' | '\''))
            .collect();
        if compact.is_empty() {
            return None;
        }

        if let Ok(v) = compact.parse::<i64>() {
            return Some(v);
        }

        // 千位分隔符: 1,250,000 / 1.250.000
        for sep in [',', '.'] {
            if is_grouped(&compact, sep) {
                return compact.replace(sep, "").parse::<i64>().ok();
            }
        }

        // 电子表格数值单元格可能带 ".0"
        compact
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    }
}

/// 文本折叠：去重音、小写、非字母数字转空格、压缩空白
///
/// 表头匹配与企业名称去重键共用
pub fn fold_text(value: &str) -> String {
    let folded: String = value
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 按 3 位分组的数字串（首组 1-3 位）
fn is_grouped(value: &str, sep: char) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let groups: Vec<&str> = digits.split(sep).collect();
    if groups.len() < 2 {
        return false;
    }
    let head = groups[0];
    if head.is_empty() || head.len() > 3 || !head.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    groups[1..]
        .iter()
        .all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}

impl DataCleaner {
    /// 企业名称规范化（用于去重键）
    ///
    /// # 规则
    /// - 去重音、小写
    /// - 非字母数字转空格、压缩空白
    pub fn normalize_company_name(&self, value: &str) -> String {
        fold_text(value)
    }

    /// 解析年份
    ///
    /// # 规则
    /// - 整数值仅接受 4 位年份（1000-9999）
    /// - 日期形态取年份部分：2015-03-01 / 01/03/2015 / 2015-03-01 00:00:00
    pub fn parse_year(&self, value: &str) -> Option<i64> {
        if let Some(year) = self.parse_integer(value) {
            return (1000..=9999).contains(&year).then_some(year);
        }

        let date_part = value.trim().split([' ', 'T']).next()?;
        YEAR_DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
            .map(|d| i64::from(d.year()))
    }

    /// 清洗邮箱（TRIM + 小写）
    pub fn clean_email(&self, value: &str) -> String {
        self.clean_text(value).to_lowercase()
    }
}
