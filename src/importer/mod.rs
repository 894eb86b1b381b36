// ==========================================
// 企业档案导入 - 导入层
// ==========================================
// 职责: 表格文件 → 列映射推断 → 行校验 → 限速批量导入
// 支持: CSV, XLSX, XLS
// ==========================================

// 模块声明
pub mod batch_importer;
pub mod conflict_handler;
pub mod content_classifier;
pub mod data_cleaner;
pub mod error;
pub mod file_parser;
pub mod header_mapper;
pub mod importer_trait;
pub mod mapping_reconciler;
pub mod profile_importer_impl;
pub mod row_transformer;

// 重导出核心类型
pub use batch_importer::BatchImporter;
pub use conflict_handler::{match_key, ConflictHandler as ConflictHandlerImpl};
pub use content_classifier::ContentClassifier as ContentClassifierImpl;
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use error::{ImportError, ImportResult, RowError};
pub use file_parser::{CsvParser, ExcelParser, FileFormat, UniversalFileParser};
pub use header_mapper::{normalize_header, HeaderMapper as HeaderMapperImpl};
pub use mapping_reconciler::{
    apply_overrides, finalize_mapping, MappingReconciler as MappingReconcilerImpl,
};
pub use profile_importer_impl::ProfileImporterImpl;
pub use row_transformer::RowTransformer as RowTransformerImpl;

// 重导出 Trait 接口
pub use importer_trait::{
    ConflictHandler, ContentClassifier, DataCleaner, FileParser, HeaderMapper, ImportAnalysis,
    MappingReconciler, ProfileImporter, RowTransformer,
};
