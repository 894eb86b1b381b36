// ==========================================
// Mock 配置实现 - 用于集成测试
// ==========================================

use async_trait::async_trait;
use profile_import::config::{ImportConfig, ImportConfigReader};
use profile_import::domain::types::DuplicateStrategy;
use std::error::Error;

/// Mock 配置结构
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub config: ImportConfig,
}

#[allow(dead_code)]
impl MockConfig {
    /// 创建默认配置
    pub fn default() -> Self {
        Self {
            config: ImportConfig::default(),
        }
    }

    /// 无延迟、不补全（加快测试）
    pub fn fast() -> Self {
        let mut config = ImportConfig::default();
        config.default_delay_ms = 0;
        config.enable_registry_enrichment = false;
        Self { config }
    }

    /// 自定义内容分类阈值
    pub fn with_detection(min_detect_ratio: f64, min_sample_count: usize) -> Self {
        let mut mock = Self::fast();
        mock.config.min_detect_ratio = min_detect_ratio;
        mock.config.min_sample_count = min_sample_count;
        mock
    }
}

#[async_trait]
impl ImportConfigReader for MockConfig {
    async fn get_sample_size(&self) -> Result<usize, Box<dyn Error>> {
        Ok(self.config.sample_size)
    }

    async fn get_min_detect_ratio(&self) -> Result<f64, Box<dyn Error>> {
        Ok(self.config.min_detect_ratio)
    }

    async fn get_medium_detect_ratio(&self) -> Result<f64, Box<dyn Error>> {
        Ok(self.config.medium_detect_ratio)
    }

    async fn get_min_sample_count(&self) -> Result<usize, Box<dyn Error>> {
        Ok(self.config.min_sample_count)
    }

    async fn get_default_batch_size(&self) -> Result<usize, Box<dyn Error>> {
        Ok(self.config.default_batch_size)
    }

    async fn get_default_delay_ms(&self) -> Result<u64, Box<dyn Error>> {
        Ok(self.config.default_delay_ms)
    }

    async fn get_default_duplicate_strategy(&self) -> Result<DuplicateStrategy, Box<dyn Error>> {
        Ok(self.config.default_duplicate_strategy)
    }

    async fn get_enable_registry_enrichment(&self) -> Result<bool, Box<dyn Error>> {
        Ok(self.config.enable_registry_enrichment)
    }

    async fn get_skip_enrichment_on_error(&self) -> Result<bool, Box<dyn Error>> {
        Ok(self.config.skip_enrichment_on_error)
    }
}
