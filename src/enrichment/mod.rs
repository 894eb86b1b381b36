// ==========================================
// 企业档案导入 - 企业注册库补全
// ==========================================
// 职责: 定义外部注册库查询接口（不包含 HTTP 实现）
// 说明: 按 SIRET/SIREN 查询；NotFound 不是失败，Err 才是失败
// ==========================================

use crate::domain::profile::ProfileData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 注册库查询错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnrichmentError {
    #[error("注册库暂时不可用: {0}")]
    Transient(String),

    #[error("无效的企业标识: {0}")]
    InvalidIdentifier(String),
}

/// Result 类型别名
pub type EnrichmentResult<T> = Result<T, EnrichmentError>;

// ==========================================
// RegistryRecord - 注册库返回的企业信息
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub company_name: Option<String>,
    pub siren: Option<String>,
    pub siret: Option<String>,
    pub naf_code: Option<String>,
    pub legal_form: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub employee_count: Option<i64>,
    pub creation_year: Option<i64>,
}

impl From<RegistryRecord> for ProfileData {
    fn from(record: RegistryRecord) -> Self {
        ProfileData {
            company_name: record.company_name,
            siret: record.siret,
            siren: record.siren,
            legal_form: record.legal_form,
            naf_code: record.naf_code,
            employee_count: record.employee_count,
            creation_year: record.creation_year,
            address: record.address,
            postal_code: record.postal_code,
            city: record.city,
            region: record.region,
            ..Default::default()
        }
    }
}

/// 查询结果
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(RegistryRecord),
    NotFound,
}

// ==========================================
// RegistryLookup Trait
// ==========================================
// 用途: 外部企业注册库查询（限速 API）
// 实现者: 宿主应用提供
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    /// 按 SIRET（14 位）或 SIREN（9 位）查询
    ///
    /// # 返回
    /// - Ok(Found): 查到企业信息
    /// - Ok(NotFound): 注册库中不存在
    /// - Err: 暂时性错误（单行内不重试）
    async fn lookup(&self, siret_or_siren: &str) -> EnrichmentResult<LookupOutcome>;
}
