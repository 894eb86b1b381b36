// ==========================================
// 企业档案导入 - 档案存储 Repository 实现
// ==========================================
// 职责: business_profile 表读写（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::profile::{MatchKey, ProfileData};
use crate::importer::data_cleaner::DataCleaner;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::profile_store::ProfileStore;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

// ==========================================
// SqliteProfileStore
// ==========================================
pub struct SqliteProfileStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProfileStore {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与 ConfigManager 共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 统计用户档案数量
    pub fn count_by_user(&self, user_id: &str) -> RepositoryResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM business_profile WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 按 ID 读取档案
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<ProfileData>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT profile_json FROM business_profile WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn exists(&self, user_id: &str, key: &MatchKey) -> RepositoryResult<bool> {
        let conn = self.lock()?;

        let sql = match key {
            MatchKey::Siret(_) => {
                "SELECT 1 FROM business_profile WHERE user_id = ?1 AND siret = ?2 LIMIT 1"
            }
            MatchKey::CompanyName(_) => {
                "SELECT 1 FROM business_profile WHERE user_id = ?1 AND normalized_name = ?2 LIMIT 1"
            }
        };

        let found = conn
            .query_row(sql, params![user_id, key.value()], |_row| Ok(true))
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    async fn create(&self, user_id: &str, profile: &ProfileData) -> RepositoryResult<String> {
        let id = Uuid::new_v4().to_string();
        let siret = profile
            .siret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let normalized_name = profile
            .company_name
            .as_deref()
            .map(|n| DataCleaner.normalize_company_name(n))
            .filter(|n| !n.is_empty());
        let profile_json = serde_json::to_string(profile)?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO business_profile (
                id, user_id, siret, normalized_name, profile_json, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                id,
                user_id,
                siret,
                normalized_name,
                profile_json,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(id)
    }
}
