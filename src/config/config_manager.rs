// ==========================================
// 企业档案导入 - 配置管理器
// ==========================================
// 职责: 导入参数加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// 规则: 键不存在 → 默认值；值格式错误 → ConfigValueError
// ==========================================

use crate::config::import_config::ImportConfig;
use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::types::DuplicateStrategy;
use crate::importer::error::ImportError;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        debug!(key = %key, value = %value, "配置已更新");
        Ok(())
    }

    /// 读取并解析配置值；不存在时返回默认值
    fn get_parsed_or_default<T: FromStr>(
        &self,
        key: &str,
        default: T,
    ) -> Result<T, Box<dyn Error>>
    where
        T::Err: std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|e| {
                Box::new(ImportError::ConfigValueError {
                    key: key.to_string(),
                    value: raw.clone(),
                    message: e.to_string(),
                }) as Box<dyn Error>
            }),
        }
    }

    /// 读取比例配置，要求在 [0, 1]
    fn get_ratio_or_default(&self, key: &str, default: f64) -> Result<f64, Box<dyn Error>> {
        let value = self.get_parsed_or_default(key, default)?;
        if !(0.0..=1.0).contains(&value) {
            return Err(Box::new(ImportError::ConfigValueError {
                key: key.to_string(),
                value: value.to_string(),
                message: "比例必须在 [0, 1] 之间".to_string(),
            }));
        }
        Ok(value)
    }

    /// 读取正整数配置
    fn get_positive_or_default(&self, key: &str, default: usize) -> Result<usize, Box<dyn Error>> {
        let value = self.get_parsed_or_default(key, default)?;
        if value == 0 {
            return Err(Box::new(ImportError::ConfigValueError {
                key: key.to_string(),
                value: value.to_string(),
                message: "必须大于 0".to_string(),
            }));
        }
        Ok(value)
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    // ===== 内容分类配置 =====

    async fn get_sample_size(&self) -> Result<usize, Box<dyn Error>> {
        self.get_positive_or_default(
            config_keys::SAMPLE_SIZE,
            ImportConfig::default().sample_size,
        )
    }

    async fn get_min_detect_ratio(&self) -> Result<f64, Box<dyn Error>> {
        self.get_ratio_or_default(
            config_keys::MIN_DETECT_RATIO,
            ImportConfig::default().min_detect_ratio,
        )
    }

    async fn get_medium_detect_ratio(&self) -> Result<f64, Box<dyn Error>> {
        self.get_ratio_or_default(
            config_keys::MEDIUM_DETECT_RATIO,
            ImportConfig::default().medium_detect_ratio,
        )
    }

    async fn get_min_sample_count(&self) -> Result<usize, Box<dyn Error>> {
        self.get_parsed_or_default(
            config_keys::MIN_SAMPLE_COUNT,
            ImportConfig::default().min_sample_count,
        )
    }

    // ===== 批量导入配置 =====

    async fn get_default_batch_size(&self) -> Result<usize, Box<dyn Error>> {
        self.get_positive_or_default(
            config_keys::DEFAULT_BATCH_SIZE,
            ImportConfig::default().default_batch_size,
        )
    }

    async fn get_default_delay_ms(&self) -> Result<u64, Box<dyn Error>> {
        self.get_parsed_or_default(
            config_keys::DEFAULT_DELAY_MS,
            ImportConfig::default().default_delay_ms,
        )
    }

    async fn get_default_duplicate_strategy(&self) -> Result<DuplicateStrategy, Box<dyn Error>> {
        match self.get_config_value(config_keys::DEFAULT_DUPLICATE_STRATEGY)? {
            None => Ok(ImportConfig::default().default_duplicate_strategy),
            Some(raw) => DuplicateStrategy::from_str(&raw).ok_or_else(|| {
                Box::new(ImportError::ConfigValueError {
                    key: config_keys::DEFAULT_DUPLICATE_STRATEGY.to_string(),
                    value: raw.clone(),
                    message: "仅支持 skip / create".to_string(),
                }) as Box<dyn Error>
            }),
        }
    }

    async fn get_enable_registry_enrichment(&self) -> Result<bool, Box<dyn Error>> {
        self.get_parsed_or_default(
            config_keys::ENABLE_REGISTRY_ENRICHMENT,
            ImportConfig::default().enable_registry_enrichment,
        )
    }

    async fn get_skip_enrichment_on_error(&self) -> Result<bool, Box<dyn Error>> {
        self.get_parsed_or_default(
            config_keys::SKIP_ENRICHMENT_ON_ERROR,
            ImportConfig::default().skip_enrichment_on_error,
        )
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 内容分类
    pub const SAMPLE_SIZE: &str = "import_sample_size";
    pub const MIN_DETECT_RATIO: &str = "import_min_detect_ratio";
    pub const MEDIUM_DETECT_RATIO: &str = "import_medium_detect_ratio";
    pub const MIN_SAMPLE_COUNT: &str = "import_min_sample_count";

    // 批量导入
    pub const DEFAULT_BATCH_SIZE: &str = "import_default_batch_size";
    pub const DEFAULT_DELAY_MS: &str = "import_default_delay_ms";
    pub const DEFAULT_DUPLICATE_STRATEGY: &str = "import_default_duplicate_strategy";
    pub const ENABLE_REGISTRY_ENRICHMENT: &str = "import_enable_registry_enrichment";
    pub const SKIP_ENRICHMENT_ON_ERROR: &str = "import_skip_enrichment_on_error";
}
