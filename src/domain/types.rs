// ==========================================
// 企业档案导入 - 领域类型定义
// ==========================================
// 职责: 置信度 / 行状态 / 去重策略 等枚举
// 序列化格式: snake_case (与前端一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 映射置信度 (Confidence)
// ==========================================
// 有序: Low < Medium < High，协调器按此比较
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,    // 未匹配
    Medium, // 模糊匹配 / 内容部分吻合
    High,   // 精确匹配 / 内容高度吻合
}

impl Confidence {
    /// 由内容匹配率推导置信度
    ///
    /// # 规则
    /// - ratio >= high_threshold → High
    /// - ratio >= medium_threshold → Medium
    /// - 其他 → Low
    pub fn from_match_ratio(ratio: f64, high_threshold: f64, medium_threshold: f64) -> Self {
        if ratio >= high_threshold {
            Confidence::High
        } else if ratio >= medium_threshold {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

// ==========================================
// 行状态 (Row Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Valid,   // 可导入
    Pending, // 可导入，但缺少推荐字段
    Invalid, // 缺少必填字段，不可导入
}

impl RowStatus {
    /// 是否允许进入落库流程
    pub fn is_importable(&self) -> bool {
        !matches!(self, RowStatus::Invalid)
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStatus::Valid => write!(f, "valid"),
            RowStatus::Pending => write!(f, "pending"),
            RowStatus::Invalid => write!(f, "invalid"),
        }
    }
}

// ==========================================
// 去重策略 (Duplicate Strategy)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateStrategy {
    #[default]
    Skip,   // 已存在则跳过
    Create, // 无论是否存在都创建
}

impl DuplicateStrategy {
    /// 从配置字符串解析（大小写不敏感）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Some(DuplicateStrategy::Skip),
            "create" => Some(DuplicateStrategy::Create),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            DuplicateStrategy::Skip => "skip",
            DuplicateStrategy::Create => "create",
        }
    }
}

impl fmt::Display for DuplicateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
