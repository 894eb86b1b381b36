// ==========================================
// 企业档案导入 - 档案存储 Trait
// ==========================================
// 职责: 定义档案去重查询与写入接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::profile::{MatchKey, ProfileData};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ProfileStore Trait
// ==========================================
// 用途: 批量导入时逐行调用（每行至多各一次）
// 实现者: SqliteProfileStore（使用 rusqlite）
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// 该用户下是否已存在匹配的档案
    ///
    /// # 参数
    /// - user_id: 用户 ID（显式传入，不依赖会话上下文）
    /// - key: 去重键（SIRET 或规范化名称）
    async fn exists(&self, user_id: &str, key: &MatchKey) -> RepositoryResult<bool>;

    /// 创建档案
    ///
    /// # 返回
    /// - Ok(String): 新档案 ID
    /// - Err: 数据库错误
    async fn create(&self, user_id: &str, profile: &ProfileData) -> RepositoryResult<String>;
}
