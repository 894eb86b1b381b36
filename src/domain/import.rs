// ==========================================
// 企业档案导入 - 导入管线领域模型
// ==========================================
// 职责: 解析行 / 列映射 / 内容分析 / 处理后行 / 批量导入状态与结果
// 生命周期: 仅在一次导入流程内
// ==========================================

use crate::domain::profile::{FieldKey, ProfileData};
use crate::domain::types::{Confidence, DuplicateStrategy, RowStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// 跳过列的目标字段标记
pub const SKIP_TARGET: &str = "_skip";

// ==========================================
// RawImportRow - 原始数据行
// ==========================================
// 解析后不可变；raw_data 保持表头列顺序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawImportRow {
    pub row_number: usize, // 1-based，仅计数据行（不含表头）
    pub raw_data: Vec<(String, String)>,
}

impl RawImportRow {
    pub fn new(row_number: usize, raw_data: Vec<(String, String)>) -> Self {
        Self {
            row_number,
            raw_data,
        }
    }

    /// 按列名取值
    pub fn get(&self, column: &str) -> Option<&str> {
        self.raw_data
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_blank(&self) -> bool {
        self.raw_data.iter().all(|(_, v)| v.trim().is_empty())
    }
}

// ==========================================
// SheetInfo - 工作表元信息（仅多表电子表格）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub name: String,
    pub row_count: usize,    // 数据行数（不含表头）
    pub column_count: usize,
}

// ==========================================
// ParsedFile - 解析结果
// ==========================================
// 多表且未指定工作表时 rows 为空，调用方需带表名再次解析
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedFile {
    pub headers: Vec<String>,
    pub rows: Vec<RawImportRow>,
    pub is_spreadsheet: bool,
    pub available_sheets: Vec<SheetInfo>,
    pub selected_sheet: Option<String>,
}

impl ParsedFile {
    /// 是否需要调用方选择工作表
    pub fn needs_sheet_selection(&self) -> bool {
        self.is_spreadsheet && self.selected_sheet.is_none() && self.available_sheets.len() > 1
    }
}

// ==========================================
// MappingTarget - 列映射目标
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum MappingTarget {
    Field(FieldKey),
    Skip,
}

impl MappingTarget {
    pub fn field(&self) -> Option<FieldKey> {
        match self {
            MappingTarget::Field(f) => Some(*f),
            MappingTarget::Skip => None,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, MappingTarget::Skip)
    }
}

impl fmt::Display for MappingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingTarget::Field(field) => write!(f, "{}", field),
            MappingTarget::Skip => write!(f, "{}", SKIP_TARGET),
        }
    }
}

impl From<MappingTarget> for String {
    fn from(target: MappingTarget) -> Self {
        target.to_string()
    }
}

impl TryFrom<String> for MappingTarget {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim() == SKIP_TARGET {
            return Ok(MappingTarget::Skip);
        }
        FieldKey::from_str(&value)
            .map(MappingTarget::Field)
            .ok_or_else(|| format!("unknown target field: {}", value))
    }
}

// ==========================================
// ColumnMappingItem - 列映射项
// ==========================================
// source_column 在同一映射集合内唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMappingItem {
    pub source_column: String,
    pub target_field: MappingTarget,
    pub confidence: Confidence,
    pub sample_values: Vec<String>, // 最多 3 个
    pub is_required: bool,
}

// ==========================================
// ContentAnalysis - 列内容分析
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    pub source_column: String,
    pub detected_type: Option<FieldKey>,
    pub match_ratio: f64, // [0, 1]
    pub sample_count: usize,
}

// ==========================================
// FinalMapping - 定稿映射
// ==========================================
// columns 保持源列顺序；dropped 记录因同字段重复而被舍弃的列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalMapping {
    pub columns: Vec<(String, FieldKey)>,
    pub dropped: Vec<(String, FieldKey)>,
}

impl FinalMapping {
    pub fn target_of(&self, column: &str) -> Option<FieldKey> {
        self.columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, f)| *f)
    }

    pub fn maps_field(&self, field: FieldKey) -> bool {
        self.columns.iter().any(|(_, f)| *f == field)
    }
}

// ==========================================
// ProcessedImportRow - 转换校验后的行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedImportRow {
    pub row_number: usize,
    pub profile_data: ProfileData,
    pub status: RowStatus,
    pub validation_errors: Vec<String>,
    pub validation_warnings: Vec<String>,
}

// ==========================================
// RowError - 行级错误
// ==========================================
// 行级错误只记录在结果中，不中断批次
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum RowError {
    #[error("{0}")]
    MissingRequiredField(String),

    #[error("enrichment failed: {0}")]
    Enrichment(String),

    #[error("persistence failed: {0}")]
    Persistence(String),
}

// ==========================================
// ImportOptions - 批量导入参数
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub user_id: String,
    pub duplicate_strategy: DuplicateStrategy,
    pub enable_registry_enrichment: bool,
    pub skip_enrichment_on_error: bool,
    pub batch_size: usize,
    pub delay_between_rows: Duration,
    /// 进度快照通道；每个快照都是完整替换而非增量，通道已满时丢弃
    pub progress: Option<mpsc::Sender<ImportBatchStatus>>,
}

impl ImportOptions {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            duplicate_strategy: DuplicateStrategy::Skip,
            enable_registry_enrichment: false,
            skip_enrichment_on_error: true,
            batch_size: 10,
            delay_between_rows: Duration::ZERO,
            progress: None,
        }
    }

    pub fn with_duplicate_strategy(mut self, strategy: DuplicateStrategy) -> Self {
        self.duplicate_strategy = strategy;
        self
    }

    pub fn with_enrichment(mut self, enabled: bool, skip_on_error: bool) -> Self {
        self.enable_registry_enrichment = enabled;
        self.skip_enrichment_on_error = skip_on_error;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_between_rows = delay;
        self
    }

    pub fn with_progress(mut self, sender: mpsc::Sender<ImportBatchStatus>) -> Self {
        self.progress = Some(sender);
        self
    }
}

// ==========================================
// ImportBatchStatus - 批量导入进度
// ==========================================
// 不变式: processed == successful + skipped + failed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportBatchStatus {
    pub processed: usize,
    pub total_rows: usize,
    pub successful: usize,
    pub skipped: usize,
    pub failed: usize,
    pub current_action: String,
}

impl ImportBatchStatus {
    pub fn new(total_rows: usize) -> Self {
        Self {
            total_rows,
            current_action: "starting".to_string(),
            ..Default::default()
        }
    }

    pub fn record_success(&mut self, action: String) {
        self.successful += 1;
        self.processed += 1;
        self.current_action = action;
    }

    pub fn record_skip(&mut self, action: String) {
        self.skipped += 1;
        self.processed += 1;
        self.current_action = action;
    }

    pub fn record_failure(&mut self, action: String) {
        self.failed += 1;
        self.processed += 1;
        self.current_action = action;
    }

    pub fn is_consistent(&self) -> bool {
        self.processed == self.successful + self.skipped + self.failed
    }
}

// ==========================================
// 行级导入结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedRow {
    pub row: ProcessedImportRow,
    pub profile_id: String,
    pub enriched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRow {
    pub row: ProcessedImportRow,
    pub error: RowError,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportStats {
    pub enriched_rows: usize,
    pub enrichment_rate: f64, // 百分比 [0, 100]
}

// ==========================================
// ImportResult - 批量导入结果
// ==========================================
// successful/skipped/failed/not_attempted 按 row_number 划分全部输入行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    pub batch_id: String,
    pub successful_rows: Vec<ImportedRow>,
    pub skipped_rows: Vec<ProcessedImportRow>,
    pub failed_rows: Vec<FailedRow>,
    /// 取消后未尝试的行（未取消时为空）
    pub not_attempted: Vec<ProcessedImportRow>,
    pub cancelled: bool,
    pub stats: ImportStats,
    pub batch_status: ImportBatchStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl ImportResult {
    /// 结果覆盖的全部行数
    pub fn accounted_rows(&self) -> usize {
        self.successful_rows.len()
            + self.skipped_rows.len()
            + self.failed_rows.len()
            + self.not_attempted.len()
    }
}
