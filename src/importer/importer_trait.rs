// ==========================================
// 企业档案导入 - 导入管线 Trait
// ==========================================
// 职责: 定义各阶段接口（不包含实现）
// 流程: 解析 → 表头映射 ∥ 内容分类 → 映射调和 → 行转换 → 批量导入
// ==========================================

use crate::domain::import::{
    ColumnMappingItem, ContentAnalysis, FinalMapping, ImportOptions, ParsedFile,
    ProcessedImportRow, RawImportRow,
};
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

// ==========================================
// ImportAnalysis - 解析 + 映射推断结果
// ==========================================
// 多表电子表格未选表时 mappings 为空
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportAnalysis {
    pub parsed: ParsedFile,
    pub mappings: Vec<ColumnMappingItem>,
}

// ==========================================
// ProfileImporter Trait
// ==========================================
// 用途: 档案导入主接口
// 实现者: ProfileImporterImpl
#[async_trait]
pub trait ProfileImporter: Send + Sync {
    /// 解析文件并推断列映射
    ///
    /// # 参数
    /// - bytes: 文件内容
    /// - declared_format: 声明的扩展名/MIME/文件名（可选，缺省时按魔数嗅探）
    /// - selected_sheet: 工作表名（多表电子表格的第二阶段调用）
    ///
    /// # 返回
    /// - Ok(ImportAnalysis): 解析结果 + 调和后的映射
    /// - Err: UnreadableFile / EmptyFile / UnsupportedFormat / SheetNotFound
    async fn analyze(
        &self,
        bytes: &[u8],
        declared_format: Option<&str>,
        selected_sheet: Option<&str>,
    ) -> ImportResult<ImportAnalysis>;

    /// 按映射转换并校验全部行
    ///
    /// # 参数
    /// - rows: 原始数据行
    /// - mappings: 调和（及用户覆盖）后的映射
    /// - overrides: 用户指定的 源列 → 目标字段（"_skip" 表示跳过）
    ///
    /// # 返回
    /// - Ok(Vec<ProcessedImportRow>): 与输入同序
    /// - Err: MappingConflict / UnknownField
    fn prepare(
        &self,
        rows: &[RawImportRow],
        mappings: &[ColumnMappingItem],
        overrides: &HashMap<String, String>,
    ) -> ImportResult<Vec<ProcessedImportRow>>;

    /// 批量导入（限速、去重、补全、持久化）
    ///
    /// # 说明
    /// - 行级失败只记录在结果中，不会返回 Err
    /// - cancel 触发后剩余行进入 not_attempted
    async fn import(
        &self,
        rows: Vec<ProcessedImportRow>,
        options: &ImportOptions,
        cancel: &CancellationToken,
    ) -> crate::domain::import::ImportResult;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 表格解析接口
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件字节为表头 + 数据行
    ///
    /// # 参数
    /// - bytes: 文件内容
    /// - selected_sheet: 工作表名（CSV 忽略）
    fn parse(&self, bytes: &[u8], selected_sheet: Option<&str>) -> ImportResult<ParsedFile>;
}

// ==========================================
// HeaderMapper Trait
// ==========================================
// 用途: 基于表头文本推断映射
// 实现者: HeaderMapper
pub trait HeaderMapper: Send + Sync {
    /// 每个表头生成一个映射项（同序）
    fn detect_from_headers(&self, headers: &[String]) -> Vec<ColumnMappingItem>;
}

// ==========================================
// ContentClassifier Trait
// ==========================================
// 用途: 基于单元格内容推断类型（不看表头）
// 实现者: ContentClassifier
pub trait ContentClassifier: Send + Sync {
    /// 每个源列生成一个内容分析（按首行列顺序）
    fn analyze_columns(&self, rows: &[RawImportRow]) -> Vec<ContentAnalysis>;
}

// ==========================================
// MappingReconciler Trait
// ==========================================
// 用途: 合并表头映射与内容分析
// 实现者: MappingReconciler
pub trait MappingReconciler: Send + Sync {
    /// 返回新的映射列表，不修改输入
    fn reconcile(
        &self,
        header_mappings: &[ColumnMappingItem],
        content_analyses: &[ContentAnalysis],
    ) -> Vec<ColumnMappingItem>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 单元格值清洗
// 实现者: DataCleaner
pub trait DataCleaner: Send + Sync {
    /// 去除首尾空白
    fn clean_text(&self, value: &str) -> String;

    /// 标准化 NULL 值（空字符串/空白 → None）
    fn normalize_null(&self, value: Option<String>) -> Option<String>;

    /// 标识类字段清洗（去除空格/点/横线）
    fn clean_identifier(&self, value: &str) -> String;

    /// 解析整数（容忍空格、不间断空格、千位分隔符）
    ///
    /// # 返回
    /// - Some(i64): 解析成功
    /// - None: 无法解析
    fn parse_integer(&self, value: &str) -> Option<i64>;
}

// ==========================================
// RowTransformer Trait
// ==========================================
// 用途: 原始行 → 档案数据 + 校验状态
// 实现者: RowTransformer
pub trait RowTransformer: Send + Sync {
    fn transform(&self, row: &RawImportRow, mapping: &FinalMapping) -> ProcessedImportRow;
}

// ==========================================
// ConflictHandler Trait
// ==========================================
// 用途: 同文件内重复检测
// 实现者: ConflictHandler
pub trait ConflictHandler: Send + Sync {
    /// 检测同文件内重复档案
    ///
    /// # 返回
    /// - Vec<(行号, 首次出现行号)>: 重复记录列表（不包括第一次出现）
    fn detect_duplicates(&self, rows: &[ProcessedImportRow]) -> Vec<(usize, usize)>;
}
