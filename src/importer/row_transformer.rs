// ==========================================
// 企业档案导入 - 行转换器实现
// ==========================================
// 职责: 原始行 → ProfileData（逐字段清洗/类型转换）→ 校验状态
// 校验:
//   - 必填字段为空 → invalid + 错误
//   - 推荐字段为空 → pending + 警告
//   - 其他 → valid
// ==========================================

use crate::domain::import::{FinalMapping, ProcessedImportRow, RawImportRow};
use crate::domain::profile::{FieldKey, ProfileData, RECOMMENDED_FIELDS, REQUIRED_FIELDS};
use crate::domain::types::RowStatus;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::importer_trait::{
    DataCleaner as DataCleanerTrait, RowTransformer as RowTransformerTrait,
};
use tracing::debug;

const SIRET_LEN: usize = 14;
const SIREN_LEN: usize = 9;

pub struct RowTransformer {
    cleaner: DataCleaner,
}

impl Default for RowTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl RowTransformer {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }

    /// 写入单个字段
    ///
    /// # 返回
    /// - Some(String): 转换警告
    fn apply_value(&self, profile: &mut ProfileData, field: FieldKey, raw: &str) -> Option<String> {
        let value = self.cleaner.normalize_null(Some(raw.to_string()))?;

        if field == FieldKey::CreationYear {
            return match self.cleaner.parse_year(&value) {
                Some(year) => {
                    profile.set_int(field, year);
                    None
                }
                None => Some(format!("{} is not a valid year: '{}'", field, value)),
            };
        }

        if field.is_numeric() {
            return match self.cleaner.parse_integer(&value) {
                Some(v) => {
                    profile.set_int(field, v);
                    None
                }
                None => Some(format!("{} is not an integer: '{}'", field, value)),
            };
        }

        let cleaned = if field.is_identifier() {
            self.cleaner.clean_identifier(&value)
        } else if field == FieldKey::Email {
            self.cleaner.clean_email(&value)
        } else {
            value
        };
        if !cleaned.is_empty() {
            profile.set_text(field, cleaned);
        }
        None
    }

    /// 由 14 位 SIRET 派生 SIREN（前 9 位）
    fn derive_siren(profile: &mut ProfileData) {
        if !profile.is_blank(FieldKey::Siren) {
            return;
        }
        if let Some(siret) = profile.siret.as_deref() {
            if siret.len() == SIRET_LEN && siret.chars().all(|c| c.is_ascii_digit()) {
                profile.siren = Some(siret[..SIREN_LEN].to_string());
            }
        }
    }
}

impl RowTransformerTrait for RowTransformer {
    fn transform(&self, row: &RawImportRow, mapping: &FinalMapping) -> ProcessedImportRow {
        let mut profile_data = ProfileData::default();
        let mut validation_errors = Vec::new();
        let mut validation_warnings = Vec::new();

        for (column, field) in &mapping.columns {
            if let Some(raw) = row.get(column) {
                if let Some(warning) = self.apply_value(&mut profile_data, *field, raw) {
                    validation_warnings.push(warning);
                }
            }
        }

        Self::derive_siren(&mut profile_data);

        if let Some(siret) = profile_data.siret.as_deref() {
            if siret.len() != SIRET_LEN || !siret.chars().all(|c| c.is_ascii_digit()) {
                validation_warnings.push(format!("siret should have {} digits", SIRET_LEN));
            }
        }

        for field in REQUIRED_FIELDS {
            if profile_data.is_blank(*field) {
                validation_errors.push(format!("{} required", field));
            }
        }

        let missing_recommended: Vec<String> = RECOMMENDED_FIELDS
            .iter()
            .filter(|f| profile_data.is_blank(**f))
            .map(|f| format!("{} missing", f))
            .collect();

        let status = if !validation_errors.is_empty() {
            RowStatus::Invalid
        } else if !missing_recommended.is_empty() {
            RowStatus::Pending
        } else {
            RowStatus::Valid
        };
        validation_warnings.extend(missing_recommended);

        debug!(
            row_number = row.row_number,
            status = %status,
            errors = validation_errors.len(),
            warnings = validation_warnings.len(),
            "行转换完成"
        );

        ProcessedImportRow {
            row_number: row.row_number,
            profile_data,
            status,
            validation_errors,
            validation_warnings,
        }
    }
}
