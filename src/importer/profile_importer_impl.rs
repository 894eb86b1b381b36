// ==========================================
// 企业档案导入 - 档案导入器实现
// ==========================================
// 职责: 整合导入流程，从文件字节到档案存储
// 流程: 解析 → 表头映射 ∥ 内容分类 → 调和 → (用户覆盖 + 定稿) → 行转换 → 批量导入
// ==========================================

use crate::config::{ImportConfig, ImportConfigReader};
use crate::domain::import::{ColumnMappingItem, ImportOptions, ProcessedImportRow, RawImportRow};
use crate::enrichment::RegistryLookup;
use crate::importer::batch_importer::BatchImporter;
use crate::importer::content_classifier::ContentClassifier;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::header_mapper::HeaderMapper;
use crate::importer::importer_trait::{
    ConflictHandler, ContentClassifier as ContentClassifierTrait, HeaderMapper as HeaderMapperTrait,
    ImportAnalysis, MappingReconciler as MappingReconcilerTrait, ProfileImporter, RowTransformer,
};
use crate::importer::mapping_reconciler::{apply_overrides, finalize_mapping, MappingReconciler};
use crate::repository::ProfileStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

// ==========================================
// ProfileImporterImpl - 档案导入器实现
// ==========================================
pub struct ProfileImporterImpl<C>
where
    C: ImportConfigReader,
{
    // 配置读取器
    config: C,

    // 导入组件
    file_parser: UniversalFileParser,
    header_mapper: HeaderMapper,
    row_transformer: Box<dyn RowTransformer>,
    conflict_handler: Box<dyn ConflictHandler>,
    batch_importer: BatchImporter,
}

impl<C> ProfileImporterImpl<C>
where
    C: ImportConfigReader,
{
    /// 创建新的 ProfileImporter 实例
    ///
    /// # 参数
    /// - config: 配置读取器
    /// - store: 档案存储
    /// - registry: 企业注册库（可选）
    pub fn new(
        config: C,
        store: Arc<dyn ProfileStore>,
        registry: Option<Arc<dyn RegistryLookup>>,
    ) -> Self {
        Self::with_components(
            config,
            Box::new(crate::importer::row_transformer::RowTransformer::new()),
            Box::new(crate::importer::conflict_handler::ConflictHandler),
            BatchImporter::new(store, registry),
        )
    }

    /// 使用自定义组件创建
    pub fn with_components(
        config: C,
        row_transformer: Box<dyn RowTransformer>,
        conflict_handler: Box<dyn ConflictHandler>,
        batch_importer: BatchImporter,
    ) -> Self {
        Self {
            config,
            file_parser: UniversalFileParser,
            header_mapper: HeaderMapper,
            row_transformer,
            conflict_handler,
            batch_importer,
        }
    }

    /// 读取配置快照
    async fn load_config(&self) -> ImportResult<ImportConfig> {
        self.config
            .load_import_config()
            .await
            .map_err(|e| ImportError::InternalError(format!("配置读取失败: {}", e)))
    }

    /// 按配置默认值构造导入参数
    pub async fn default_options(&self, user_id: &str) -> ImportResult<ImportOptions> {
        let config = self.load_config().await?;
        Ok(ImportOptions::from_config(user_id, &config))
    }
}

#[async_trait]
impl<C> ProfileImporter for ProfileImporterImpl<C>
where
    C: ImportConfigReader + Send + Sync,
{
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn analyze(
        &self,
        bytes: &[u8],
        declared_format: Option<&str>,
        selected_sheet: Option<&str>,
    ) -> ImportResult<ImportAnalysis> {
        let config = self.load_config().await?;

        // === 步骤 1: 解析文件 ===
        let parsed = self.file_parser.parse(bytes, declared_format, selected_sheet)?;
        if parsed.needs_sheet_selection() {
            info!(sheets = parsed.available_sheets.len(), "多工作表文件，等待选择工作表");
            return Ok(ImportAnalysis {
                parsed,
                mappings: Vec::new(),
            });
        }

        // === 步骤 2: 表头映射 ∥ 内容分类 ===
        let header_items = self.header_mapper.attach_samples(
            self.header_mapper.detect_from_headers(&parsed.headers),
            &parsed.rows,
        );
        let analyses = ContentClassifier::from_config(&config).analyze_columns(&parsed.rows);

        // === 步骤 3: 调和 ===
        let mappings = MappingReconciler::from_config(&config).reconcile(&header_items, &analyses);

        info!(
            columns = mappings.len(),
            mapped = mappings.iter().filter(|m| !m.target_field.is_skip()).count(),
            rows = parsed.rows.len(),
            "列映射推断完成"
        );
        for item in &mappings {
            debug!(
                column = %item.source_column,
                target = %item.target_field,
                confidence = %item.confidence,
                "列映射"
            );
        }

        Ok(ImportAnalysis { parsed, mappings })
    }

    fn prepare(
        &self,
        rows: &[RawImportRow],
        mappings: &[ColumnMappingItem],
        overrides: &HashMap<String, String>,
    ) -> ImportResult<Vec<ProcessedImportRow>> {
        let items = apply_overrides(mappings, overrides)?;
        let mapping = finalize_mapping(&items)?;

        let mut processed: Vec<ProcessedImportRow> = rows
            .iter()
            .map(|row| self.row_transformer.transform(row, &mapping))
            .collect();

        // 同文件内重复：仅警告，是否跳过由批量导入的去重策略决定
        let duplicates: HashMap<usize, usize> = self
            .conflict_handler
            .detect_duplicates(&processed)
            .into_iter()
            .collect();
        for row in &mut processed {
            if let Some(first_row) = duplicates.get(&row.row_number) {
                row.validation_warnings
                    .push(format!("duplicate of row {}", first_row));
            }
        }

        info!(
            rows = processed.len(),
            importable = processed.iter().filter(|r| r.status.is_importable()).count(),
            duplicates = duplicates.len(),
            "行转换完成"
        );
        Ok(processed)
    }

    async fn import(
        &self,
        rows: Vec<ProcessedImportRow>,
        options: &ImportOptions,
        cancel: &CancellationToken,
    ) -> crate::domain::import::ImportResult {
        self.batch_importer.run(rows, options, cancel).await
    }
}
