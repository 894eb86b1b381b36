// ==========================================
// 企业档案导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管线所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::import_config::ImportConfig;
use crate::domain::types::DuplicateStrategy;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入管线所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 内容分类配置 =====

    /// 每列采样的非空值数量
    ///
    /// # 默认值
    /// - 50
    async fn get_sample_size(&self) -> Result<usize, Box<dyn Error>>;

    /// 内容检测阈值（同时作为 high 置信度阈值）
    ///
    /// # 默认值
    /// - 0.8
    async fn get_min_detect_ratio(&self) -> Result<f64, Box<dyn Error>>;

    /// medium 置信度阈值
    ///
    /// # 默认值
    /// - 0.5
    async fn get_medium_detect_ratio(&self) -> Result<f64, Box<dyn Error>>;

    /// 判定类型所需最少样本数
    ///
    /// # 默认值
    /// - 3
    async fn get_min_sample_count(&self) -> Result<usize, Box<dyn Error>>;

    // ===== 批量导入配置 =====

    /// 默认批大小
    ///
    /// # 默认值
    /// - 10
    async fn get_default_batch_size(&self) -> Result<usize, Box<dyn Error>>;

    /// 默认行间延迟（毫秒）
    ///
    /// # 默认值
    /// - 200
    async fn get_default_delay_ms(&self) -> Result<u64, Box<dyn Error>>;

    /// 默认去重策略
    ///
    /// # 默认值
    /// - skip
    async fn get_default_duplicate_strategy(&self) -> Result<DuplicateStrategy, Box<dyn Error>>;

    /// 是否启用企业注册库补全
    ///
    /// # 默认值
    /// - true
    async fn get_enable_registry_enrichment(&self) -> Result<bool, Box<dyn Error>>;

    /// 补全失败时是否仍持久化（不补全）
    ///
    /// # 默认值
    /// - true
    async fn get_skip_enrichment_on_error(&self) -> Result<bool, Box<dyn Error>>;

    /// 读取完整配置快照
    async fn load_import_config(&self) -> Result<ImportConfig, Box<dyn Error>> {
        // 逐项绑定：错误值不得跨越下一个 await
        let sample_size = self.get_sample_size().await?;
        let min_detect_ratio = self.get_min_detect_ratio().await?;
        let medium_detect_ratio = self.get_medium_detect_ratio().await?;
        let min_sample_count = self.get_min_sample_count().await?;
        let default_batch_size = self.get_default_batch_size().await?;
        let default_delay_ms = self.get_default_delay_ms().await?;
        let default_duplicate_strategy = self.get_default_duplicate_strategy().await?;
        let enable_registry_enrichment = self.get_enable_registry_enrichment().await?;
        let skip_enrichment_on_error = self.get_skip_enrichment_on_error().await?;

        Ok(ImportConfig {
            sample_size,
            min_detect_ratio,
            medium_detect_ratio,
            min_sample_count,
            default_batch_size,
            default_delay_ms,
            default_duplicate_strategy,
            enable_registry_enrichment,
            skip_enrichment_on_error,
        })
    }
}
