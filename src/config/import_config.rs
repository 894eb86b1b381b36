// ==========================================
// 企业档案导入 - 导入参数快照
// ==========================================
// 职责: 导入管线可调参数（内容分类阈值 / 批量节奏 / 去重与补全开关）
// 来源: ImportConfigReader::load_import_config
// ==========================================

use crate::domain::import::ImportOptions;
use crate::domain::types::DuplicateStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ==========================================
// ImportConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    // ===== 内容分类 =====
    pub sample_size: usize,       // 每列采样的非空值数量
    pub min_detect_ratio: f64,    // 判定类型 / high 置信度阈值
    pub medium_detect_ratio: f64, // medium 置信度阈值
    pub min_sample_count: usize,  // 判定类型所需最少样本数

    // ===== 批量导入 =====
    pub default_batch_size: usize,
    pub default_delay_ms: u64,
    pub default_duplicate_strategy: DuplicateStrategy,
    pub enable_registry_enrichment: bool,
    pub skip_enrichment_on_error: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            sample_size: 50,
            min_detect_ratio: 0.8,
            medium_detect_ratio: 0.5,
            min_sample_count: 3,
            default_batch_size: 10,
            default_delay_ms: 200,
            default_duplicate_strategy: DuplicateStrategy::Skip,
            enable_registry_enrichment: true,
            skip_enrichment_on_error: true,
        }
    }
}

impl ImportOptions {
    /// 由配置快照构造导入参数
    pub fn from_config(user_id: impl Into<String>, config: &ImportConfig) -> Self {
        ImportOptions::new(user_id)
            .with_duplicate_strategy(config.default_duplicate_strategy)
            .with_enrichment(
                config.enable_registry_enrichment,
                config.skip_enrichment_on_error,
            )
            .with_batch_size(config.default_batch_size)
            .with_delay(Duration::from_millis(config.default_delay_ms))
    }
}
