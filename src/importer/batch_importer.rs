// ==========================================
// 企业档案导入 - 批量导入器实现
// ==========================================
// 职责: 逐行 去重检查 → 注册库补全 → 持久化，限速 + 进度 + 取消
// 行状态机:
//   pending → 去重检查 → { skipped | 补全 → { 已补全 | 补全失败 } → 持久化 → { succeeded | failed } }
// 约束:
//   - 分块按序处理，块内逐行串行（行间延迟是外部 API 限速手段）
//   - 行级失败只记录，不重试、不中断批次
//   - 不变式: processed == successful + skipped + failed
// ==========================================

use crate::domain::import::{
    FailedRow, ImportBatchStatus, ImportOptions, ImportResult, ImportStats, ImportedRow,
    ProcessedImportRow, RowError,
};
use crate::domain::profile::ProfileData;
use crate::domain::types::DuplicateStrategy;
use crate::enrichment::{LookupOutcome, RegistryLookup};
use crate::importer::conflict_handler::match_key;
use crate::repository::ProfileStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 单行处理结果
enum RowOutcome {
    Imported(ImportedRow),
    Skipped(ProcessedImportRow),
    Failed(FailedRow),
}

/// 补全阶段结果
enum EnrichmentStep {
    Applied,
    NotApplied,
    Failed(RowError),
}

// ==========================================
// BatchImporter - 批量导入器
// ==========================================
pub struct BatchImporter {
    // 档案存储
    store: Arc<dyn ProfileStore>,

    // 注册库（未配置时跳过补全）
    registry: Option<Arc<dyn RegistryLookup>>,
}

impl BatchImporter {
    /// 创建新的 BatchImporter 实例
    ///
    /// # 参数
    /// - store: 档案存储
    /// - registry: 企业注册库（可选）
    pub fn new(store: Arc<dyn ProfileStore>, registry: Option<Arc<dyn RegistryLookup>>) -> Self {
        Self { store, registry }
    }

    /// 执行批量导入
    ///
    /// # 参数
    /// - rows: 转换校验后的行（invalid 行直接记为失败，不尝试持久化）
    /// - options: 导入参数（user_id 显式传入）
    /// - cancel: 取消令牌（行间及延迟期间检查）
    ///
    /// # 返回
    /// - ImportResult: 每个输入行恰好落入 successful / skipped / failed / not_attempted 之一
    #[instrument(
        skip(self, rows, options, cancel),
        fields(batch_id = tracing::field::Empty, user_id = %options.user_id, total_rows = rows.len())
    )]
    pub async fn run(
        &self,
        rows: Vec<ProcessedImportRow>,
        options: &ImportOptions,
        cancel: &CancellationToken,
    ) -> ImportResult {
        let start_time = Instant::now();
        let started_at = Utc::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        let total_rows = rows.len();
        let batch_size = options.batch_size.max(1);
        info!(
            batch_id = %batch_id,
            total_rows = total_rows,
            batch_size = batch_size,
            strategy = %options.duplicate_strategy,
            "开始批量导入"
        );

        let mut status = ImportBatchStatus::new(total_rows);
        self.publish(options, &status);

        let mut successful_rows = Vec::new();
        let mut skipped_rows = Vec::new();
        let mut failed_rows = Vec::new();
        let mut not_attempted = Vec::new();
        let mut cancelled = false;

        let mut pending = rows.into_iter().enumerate().peekable();
        while let Some((index, row)) = pending.next() {
            if cancel.is_cancelled() {
                cancelled = true;
                not_attempted.push(row);
                not_attempted.extend(pending.by_ref().map(|(_, r)| r));
                break;
            }

            if index % batch_size == 0 {
                debug!(
                    chunk = index / batch_size + 1,
                    chunks = (total_rows + batch_size - 1) / batch_size,
                    "开始处理分块"
                );
            }

            let row_number = row.row_number;
            match self.process_row(row, options).await {
                RowOutcome::Imported(imported) => {
                    status.record_success(format!("row {} imported", row_number));
                    successful_rows.push(imported);
                }
                RowOutcome::Skipped(skipped) => {
                    status.record_skip(format!("row {} skipped (duplicate)", row_number));
                    skipped_rows.push(skipped);
                }
                RowOutcome::Failed(failed) => {
                    status.record_failure(format!("row {} failed: {}", row_number, failed.error));
                    failed_rows.push(failed);
                }
            }
            self.publish(options, &status);

            // 行间限速（最后一行之后不等待）
            if pending.peek().is_some() && !options.delay_between_rows.is_zero() {
                let interrupted = tokio::select! {
                    _ = cancel.cancelled() => true,
                    _ = tokio::time::sleep(options.delay_between_rows) => false,
                };
                if interrupted {
                    cancelled = true;
                    not_attempted.extend(pending.by_ref().map(|(_, r)| r));
                    break;
                }
            }
        }

        if cancelled {
            warn!(
                processed = status.processed,
                not_attempted = not_attempted.len(),
                "批量导入已取消"
            );
        }

        let enriched_rows = successful_rows.iter().filter(|r| r.enriched).count();
        let enrichment_rate = if successful_rows.is_empty() {
            0.0
        } else {
            enriched_rows as f64 / successful_rows.len() as f64 * 100.0
        };

        info!(
            batch_id = %batch_id,
            successful = successful_rows.len(),
            skipped = skipped_rows.len(),
            failed = failed_rows.len(),
            not_attempted = not_attempted.len(),
            enrichment_rate = enrichment_rate,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "批量导入完成"
        );

        ImportResult {
            batch_id,
            successful_rows,
            skipped_rows,
            failed_rows,
            not_attempted,
            cancelled,
            stats: ImportStats {
                enriched_rows,
                enrichment_rate,
            },
            batch_status: status,
            started_at,
            finished_at: Utc::now(),
            elapsed: start_time.elapsed(),
        }
    }

    /// 推送进度快照（不等待接收端）
    ///
    /// 快照是全量状态，通道已满时丢弃本次快照；接收端已关闭时忽略
    fn publish(&self, options: &ImportOptions, status: &ImportBatchStatus) {
        if let Some(sender) = &options.progress {
            match sender.try_send(status.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug!(processed = status.processed, "进度通道已满，丢弃快照");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("进度接收端已关闭");
                }
            }
        }
    }

    /// 处理单行
    async fn process_row(&self, mut row: ProcessedImportRow, options: &ImportOptions) -> RowOutcome {
        let row_number = row.row_number;

        // === 阶段 0: 校验门禁 ===
        if !row.status.is_importable() {
            let message = if row.validation_errors.is_empty() {
                "company_name required".to_string()
            } else {
                row.validation_errors.join("; ")
            };
            debug!(row_number = row_number, error = %message, "无效行，不尝试持久化");
            return RowOutcome::Failed(FailedRow {
                row,
                error: RowError::MissingRequiredField(message),
            });
        }

        // === 阶段 1: 去重检查 ===
        if let Some(key) = match_key(&row.profile_data) {
            match self.store.exists(&options.user_id, &key).await {
                Ok(true) => match options.duplicate_strategy {
                    DuplicateStrategy::Skip => {
                        debug!(row_number = row_number, key = %key, "档案已存在，跳过");
                        return RowOutcome::Skipped(row);
                    }
                    DuplicateStrategy::Create => {
                        debug!(row_number = row_number, key = %key, "档案已存在，按策略继续创建");
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!(row_number = row_number, error = %e, "去重检查失败");
                    return RowOutcome::Failed(FailedRow {
                        row,
                        error: RowError::Persistence(e.to_string()),
                    });
                }
            }
        }

        // === 阶段 2: 注册库补全 ===
        let enriched = if options.enable_registry_enrichment {
            match self.enrich(&mut row, options).await {
                EnrichmentStep::Applied => true,
                EnrichmentStep::NotApplied => false,
                EnrichmentStep::Failed(error) => {
                    return RowOutcome::Failed(FailedRow { row, error });
                }
            }
        } else {
            false
        };

        // === 阶段 3: 持久化 ===
        match self.store.create(&options.user_id, &row.profile_data).await {
            Ok(profile_id) => {
                debug!(row_number = row_number, profile_id = %profile_id, enriched = enriched, "档案已创建");
                RowOutcome::Imported(ImportedRow {
                    row,
                    profile_id,
                    enriched,
                })
            }
            Err(e) => {
                warn!(row_number = row_number, error = %e, "档案持久化失败");
                RowOutcome::Failed(FailedRow {
                    row,
                    error: RowError::Persistence(e.to_string()),
                })
            }
        }
    }

    /// 注册库补全：只填充用户留空的字段
    async fn enrich(&self, row: &mut ProcessedImportRow, options: &ImportOptions) -> EnrichmentStep {
        let registry = match &self.registry {
            Some(r) => r,
            None => {
                debug!(row_number = row.row_number, "未配置注册库，跳过补全");
                return EnrichmentStep::NotApplied;
            }
        };

        let identifier = [row.profile_data.siret.as_deref(), row.profile_data.siren.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string);
        let identifier = match identifier {
            Some(id) => id,
            None => return EnrichmentStep::NotApplied,
        };

        match registry.lookup(&identifier).await {
            Ok(LookupOutcome::Found(record)) => {
                let overlay: ProfileData = record.into();
                let filled = row.profile_data.fill_blanks_from(&overlay);
                debug!(
                    row_number = row.row_number,
                    filled = filled.len(),
                    "注册库补全完成"
                );
                EnrichmentStep::Applied
            }
            Ok(LookupOutcome::NotFound) => {
                row.validation_warnings
                    .push(format!("{} not found in registry", identifier));
                EnrichmentStep::NotApplied
            }
            Err(e) if options.skip_enrichment_on_error => {
                warn!(row_number = row.row_number, error = %e, "注册库补全失败，按未补全继续");
                row.validation_warnings
                    .push(format!("enrichment skipped: {}", e));
                EnrichmentStep::NotApplied
            }
            Err(e) => {
                warn!(row_number = row.row_number, error = %e, "注册库补全失败");
                EnrichmentStep::Failed(RowError::Enrichment(e.to_string()))
            }
        }
    }
}
