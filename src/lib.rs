// ==========================================
// 企业档案导入 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 表格导入管线（由宿主应用调用，不含 UI / CLI）
// 流程: 解析 → 表头映射 ∥ 内容分类 → 映射调和 → 行转换 → 批量导入
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 导入层 - 管线各阶段
pub mod importer;

// 注册库补全 - 外部协作方接口
pub mod enrichment;

// 数据仓储层 - 数据访问
pub mod repository;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Confidence, DuplicateStrategy, RowStatus};

// 领域实体
pub use domain::{
    ColumnMappingItem, ContentAnalysis, FieldKey, FinalMapping, ImportBatchStatus, ImportOptions,
    ImportResult, MatchKey, ParsedFile, ProcessedImportRow, ProfileData, RawImportRow, SheetInfo,
};

// 导入管线
pub use importer::{BatchImporter, ImportAnalysis, ImportError, ProfileImporter, ProfileImporterImpl};

// 协作方
pub use config::{ConfigManager, ImportConfig, ImportConfigReader};
pub use enrichment::{EnrichmentError, LookupOutcome, RegistryLookup, RegistryRecord};
pub use repository::{ProfileStore, SqliteProfileStore};

// ==========================================
// 常量定义
// ==========================================

// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 库名称
pub const APP_NAME: &str = "企业档案导入";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
