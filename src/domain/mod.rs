// ==========================================
// 企业档案导入 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod import;
pub mod profile;
pub mod types;

// 重导出核心类型
pub use import::{
    ColumnMappingItem, ContentAnalysis, FailedRow, FinalMapping, ImportBatchStatus, ImportOptions,
    ImportResult, ImportStats, ImportedRow, MappingTarget, ParsedFile, ProcessedImportRow,
    RawImportRow, RowError, SheetInfo, SKIP_TARGET,
};
pub use profile::{FieldKey, MatchKey, ProfileData, RECOMMENDED_FIELDS, REQUIRED_FIELDS};
pub use types::{Confidence, DuplicateStrategy, RowStatus};
