// ==========================================
// 企业档案导入 - 映射调和器实现
// ==========================================
// 职责: 合并表头映射与内容分析，定稿映射，应用用户覆盖
// 优先级（逐列）:
//   1. 表头置信度 high → 保留表头映射
//   2. 内容检测到类型，且内容置信度严格高于表头置信度 → 采用内容类型
//   3. 其他 → 保留表头映射（同置信度时表头优先）
// ==========================================

use crate::config::ImportConfig;
use crate::domain::import::{ColumnMappingItem, ContentAnalysis, FinalMapping, MappingTarget};
use crate::domain::profile::{FieldKey, REQUIRED_FIELDS};
use crate::domain::types::Confidence;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::MappingReconciler as MappingReconcilerTrait;
use std::collections::HashMap;
use tracing::{debug, warn};

pub struct MappingReconciler {
    high_threshold: f64,
    medium_threshold: f64,
}

impl Default for MappingReconciler {
    fn default() -> Self {
        Self::from_config(&ImportConfig::default())
    }
}

impl MappingReconciler {
    pub fn new(high_threshold: f64, medium_threshold: f64) -> Self {
        Self {
            high_threshold,
            medium_threshold,
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(config.min_detect_ratio, config.medium_detect_ratio)
    }
}

fn is_required(target: MappingTarget) -> bool {
    target
        .field()
        .map_or(false, |f| REQUIRED_FIELDS.contains(&f))
}

impl MappingReconcilerTrait for MappingReconciler {
    fn reconcile(
        &self,
        header_mappings: &[ColumnMappingItem],
        content_analyses: &[ContentAnalysis],
    ) -> Vec<ColumnMappingItem> {
        header_mappings
            .iter()
            .map(|item| {
                if item.confidence == Confidence::High {
                    return item.clone();
                }

                let analysis = content_analyses
                    .iter()
                    .find(|a| a.source_column == item.source_column);
                let detected = match analysis.and_then(|a| a.detected_type.map(|t| (t, a))) {
                    Some(found) => found,
                    None => return item.clone(),
                };
                let (detected_type, analysis) = detected;

                let content_confidence = Confidence::from_match_ratio(
                    analysis.match_ratio,
                    self.high_threshold,
                    self.medium_threshold,
                );
                if content_confidence <= item.confidence {
                    return item.clone();
                }

                debug!(
                    column = %item.source_column,
                    header_target = %item.target_field,
                    content_target = %detected_type,
                    confidence = %content_confidence,
                    "采用内容分析结果"
                );
                let target_field = MappingTarget::Field(detected_type);
                ColumnMappingItem {
                    source_column: item.source_column.clone(),
                    target_field,
                    confidence: content_confidence,
                    sample_values: item.sample_values.clone(),
                    is_required: is_required(target_field),
                }
            })
            .collect()
    }
}

/// 定稿映射
///
/// # 规则
/// - "_skip" 列不进入映射
/// - 同一字段有多个 high 列 → MappingConflict
/// - 否则按列顺序保留第一个，其余记入 dropped
pub fn finalize_mapping(items: &[ColumnMappingItem]) -> ImportResult<FinalMapping> {
    let mut by_field: Vec<(FieldKey, Vec<&ColumnMappingItem>)> = Vec::new();
    for item in items {
        let field = match item.target_field.field() {
            Some(f) => f,
            None => continue,
        };
        match by_field.iter_mut().find(|(f, _)| *f == field) {
            Some((_, group)) => group.push(item),
            None => by_field.push((field, vec![item])),
        }
    }

    for (field, group) in &by_field {
        let high_columns: Vec<String> = group
            .iter()
            .filter(|i| i.confidence == Confidence::High)
            .map(|i| i.source_column.clone())
            .collect();
        if high_columns.len() > 1 {
            return Err(ImportError::MappingConflict {
                field: field.to_string(),
                columns: high_columns,
            });
        }
    }

    let mut mapping = FinalMapping::default();
    for item in items {
        let field = match item.target_field.field() {
            Some(f) => f,
            None => continue,
        };
        if mapping.maps_field(field) {
            warn!(column = %item.source_column, field = %field, "同字段重复映射，舍弃该列");
            mapping.dropped.push((item.source_column.clone(), field));
        } else {
            mapping.columns.push((item.source_column.clone(), field));
        }
    }

    Ok(mapping)
}

/// 应用用户覆盖（源列 → 目标字段名或 "_skip"），被覆盖列置信度为 high
///
/// # 返回
/// - Err(UnknownField): 目标字段名无法识别
pub fn apply_overrides(
    items: &[ColumnMappingItem],
    overrides: &HashMap<String, String>,
) -> ImportResult<Vec<ColumnMappingItem>> {
    for column in overrides.keys() {
        if !items.iter().any(|i| &i.source_column == column) {
            warn!(column = %column, "覆盖项引用了不存在的列，已忽略");
        }
    }

    items
        .iter()
        .map(|item| {
            let value = match overrides.get(&item.source_column) {
                Some(v) => v,
                None => return Ok(item.clone()),
            };
            let target_field =
                MappingTarget::try_from(value.clone()).map_err(|_| ImportError::UnknownField {
                    column: item.source_column.clone(),
                    value: value.clone(),
                })?;
            Ok(ColumnMappingItem {
                source_column: item.source_column.clone(),
                target_field,
                confidence: Confidence::High,
                sample_values: item.sample_values.clone(),
                is_required: is_required(target_field),
            })
        })
        .collect()
}
