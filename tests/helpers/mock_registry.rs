// ==========================================
// Mock 企业注册库 - 用于集成测试
// ==========================================

use async_trait::async_trait;
use profile_import::enrichment::{
    EnrichmentError, EnrichmentResult, LookupOutcome, RegistryLookup, RegistryRecord,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// 按标识返回预置记录；未预置的标识返回 NotFound
#[derive(Default)]
pub struct MockRegistry {
    records: HashMap<String, RegistryRecord>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, identifier: &str, record: RegistryRecord) -> Self {
        self.records.insert(identifier.to_string(), record);
        self
    }

    /// 该标识查询时返回暂时性错误
    pub fn with_failure(mut self, identifier: &str) -> Self {
        self.failing.insert(identifier.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryLookup for MockRegistry {
    async fn lookup(&self, siret_or_siren: &str) -> EnrichmentResult<LookupOutcome> {
        self.calls.lock().unwrap().push(siret_or_siren.to_string());

        if self.failing.contains(siret_or_siren) {
            return Err(EnrichmentError::Transient("503 Service Unavailable".to_string()));
        }
        Ok(match self.records.get(siret_or_siren) {
            Some(record) => LookupOutcome::Found(record.clone()),
            None => LookupOutcome::NotFound,
        })
    }
}
