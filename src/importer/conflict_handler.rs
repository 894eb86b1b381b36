// ==========================================
// 企业档案导入 - 冲突处理器实现
// ==========================================
// 职责: 计算去重键，检测同文件内重复档案
// 去重键: SIRET 优先；缺失时用规范化企业名称
// ==========================================

use crate::domain::import::ProcessedImportRow;
use crate::domain::profile::{MatchKey, ProfileData};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::importer_trait::ConflictHandler as ConflictHandlerTrait;
use std::collections::HashMap;

/// 计算档案去重键
///
/// # 返回
/// - Some(MatchKey::Siret): SIRET 非空
/// - Some(MatchKey::CompanyName): 无 SIRET，名称规范化后非空
/// - None: 两者皆空
pub fn match_key(profile: &ProfileData) -> Option<MatchKey> {
    if let Some(siret) = profile.siret.as_deref().map(str::trim) {
        if !siret.is_empty() {
            return Some(MatchKey::Siret(siret.to_string()));
        }
    }

    let name = DataCleaner.normalize_company_name(profile.company_name.as_deref()?);
    if name.is_empty() {
        None
    } else {
        Some(MatchKey::CompanyName(name))
    }
}

pub struct ConflictHandler;

impl ConflictHandlerTrait for ConflictHandler {
    /// 检测同文件内重复档案
    ///
    /// # 返回
    /// - Vec<(行号, 首次出现行号)>: 重复记录列表（不包括第一次出现）
    ///
    /// invalid 行不会被导入，既不参与比较也不作为首次出现
    fn detect_duplicates(&self, rows: &[ProcessedImportRow]) -> Vec<(usize, usize)> {
        let mut first_occurrence: HashMap<MatchKey, usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for row in rows.iter().filter(|r| r.status.is_importable()) {
            if let Some(key) = match_key(&row.profile_data) {
                if let Some(first_row) = first_occurrence.get(&key) {
                    duplicates.push((row.row_number, *first_row));
                } else {
                    first_occurrence.insert(key, row.row_number);
                }
            }
        }

        duplicates
    }
}
