// ==========================================
// 企业档案导入 - 表头映射器实现
// ==========================================
// 职责: 源列表头 → 标准字段（别名表 + 模糊匹配）
// 置信度: 精确别名 → high；包含关系 → medium；未匹配 → _skip / low
// ==========================================

use crate::domain::import::{ColumnMappingItem, MappingTarget, RawImportRow};
use crate::domain::profile::{FieldKey, REQUIRED_FIELDS};
use crate::domain::types::Confidence;
use crate::importer::data_cleaner::fold_text;
use crate::importer::importer_trait::HeaderMapper as HeaderMapperTrait;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// 每列保留的样例值数量
pub const MAX_SAMPLE_VALUES: usize = 3;

/// 反向包含（表头 ⊂ 别名）时表头的最小长度
const MIN_REVERSE_MATCH_LEN: usize = 3;

// ==========================================
// 别名表（已规范化：小写、去重音、标点转空格）
// ==========================================
// 不同字段之间别名不重叠；若出现重叠，先注册者生效
static FIELD_ALIASES: &[(FieldKey, &[&str])] = &[
    (
        FieldKey::CompanyName,
        &[
            "company name",
            "company",
            "raison sociale",
            "nom entreprise",
            "nom de l entreprise",
            "nom de la structure",
            "entreprise",
            "societe",
            "nom societe",
            "denomination",
            "denomination sociale",
            "business name",
            "organisation",
            "organization",
        ],
    ),
    (
        FieldKey::Siret,
        &["siret", "numero siret", "n siret", "no siret", "code siret", "siret number"],
    ),
    (
        FieldKey::Siren,
        &["siren", "numero siren", "n siren", "no siren", "siren number"],
    ),
    (
        FieldKey::LegalForm,
        &["legal form", "forme juridique", "statut juridique"],
    ),
    (
        FieldKey::NafCode,
        &["naf code", "naf", "code naf", "ape", "code ape", "activite principale"],
    ),
    (
        FieldKey::Sector,
        &["sector", "secteur", "secteur d activite", "industry", "industrie", "domaine"],
    ),
    (
        FieldKey::Description,
        &["description", "activite", "presentation", "objet social"],
    ),
    (
        FieldKey::EmployeeCount,
        &[
            "employee count",
            "employees",
            "headcount",
            "effectif",
            "effectifs",
            "salaries",
            "nombre de salaries",
            "nb salaries",
            "nombre d employes",
        ],
    ),
    (
        FieldKey::AnnualRevenue,
        &[
            "annual revenue",
            "revenue",
            "turnover",
            "chiffre d affaires",
            "ca",
            "ca annuel",
        ],
    ),
    (
        FieldKey::CreationYear,
        &[
            "creation year",
            "year founded",
            "founded",
            "creation",
            "annee de creation",
            "annee creation",
            "date de creation",
        ],
    ),
    (
        FieldKey::Address,
        &["address", "adresse", "adresse postale", "rue", "street"],
    ),
    (
        FieldKey::PostalCode,
        &["postal code", "code postal", "cp", "zip", "zip code", "postcode"],
    ),
    (FieldKey::City, &["city", "ville", "commune", "localite"]),
    (FieldKey::Region, &["region", "state", "province"]),
    (
        FieldKey::Email,
        &[
            "email",
            "e mail",
            "mail",
            "courriel",
            "email address",
            "adresse email",
            "adresse e mail",
        ],
    ),
    (
        FieldKey::Phone,
        &[
            "phone",
            "phone number",
            "telephone",
            "tel",
            "numero de telephone",
            "portable",
            "mobile",
        ],
    ),
    (
        FieldKey::Website,
        &["website", "site", "site web", "site internet", "url", "web"],
    ),
    (
        FieldKey::ContactName,
        &[
            "contact name",
            "contact",
            "nom du contact",
            "dirigeant",
            "responsable",
            "interlocuteur",
        ],
    ),
];

/// 精确匹配索引（别名 → 字段），先注册者生效
static EXACT_INDEX: Lazy<HashMap<&'static str, FieldKey>> = Lazy::new(|| {
    let mut index = HashMap::new();
    for (field, aliases) in FIELD_ALIASES {
        for alias in *aliases {
            index.entry(*alias).or_insert(*field);
        }
    }
    index
});

/// 表头规范化：小写、去重音、非字母数字转空格、压缩空白
pub fn normalize_header(header: &str) -> String {
    fold_text(header)
}

pub struct HeaderMapper;

impl HeaderMapper {
    /// 匹配单个表头
    ///
    /// # 返回
    /// - (字段, High): 精确别名
    /// - (字段, Medium): 按词边界的包含关系；别名 ⊂ 表头时取最长别名，
    ///   否则表头 ⊂ 别名时取最短别名
    /// - None: 未匹配
    pub fn match_header(&self, header: &str) -> Option<(FieldKey, Confidence)> {
        let normalized = normalize_header(header);
        if normalized.is_empty() {
            return None;
        }

        if let Some(field) = EXACT_INDEX.get(normalized.as_str()) {
            return Some((*field, Confidence::High));
        }

        let padded_header = format!(" {} ", normalized);

        // 正向（别名 ⊂ 表头）：取最长别名
        let mut forward: Option<(FieldKey, usize)> = None;
        // 反向（表头 ⊂ 别名）：取最短别名
        let mut reverse: Option<(FieldKey, usize)> = None;
        for (field, aliases) in FIELD_ALIASES {
            for alias in *aliases {
                let padded_alias = format!(" {} ", alias);
                // 等长时保留先注册者
                if padded_header.contains(&padded_alias) {
                    if forward.map_or(true, |(_, len)| alias.len() > len) {
                        forward = Some((*field, alias.len()));
                    }
                } else if normalized.len() >= MIN_REVERSE_MATCH_LEN
                    && padded_alias.contains(&padded_header)
                    && reverse.map_or(true, |(_, len)| alias.len() < len)
                {
                    reverse = Some((*field, alias.len()));
                }
            }
        }

        let best = forward.or(reverse);
        best.map(|(field, _)| (field, Confidence::Medium))
    }

    /// 为映射项补充样例值（每列最多 3 个不重复的非空值）
    pub fn attach_samples(
        &self,
        items: Vec<ColumnMappingItem>,
        rows: &[RawImportRow],
    ) -> Vec<ColumnMappingItem> {
        items
            .into_iter()
            .map(|mut item| {
                let mut samples: Vec<String> = Vec::new();
                for row in rows {
                    if samples.len() >= MAX_SAMPLE_VALUES {
                        break;
                    }
                    if let Some(value) = row.get(&item.source_column) {
                        let value = value.trim();
                        if !value.is_empty() && !samples.iter().any(|s| s == value) {
                            samples.push(value.to_string());
                        }
                    }
                }
                item.sample_values = samples;
                item
            })
            .collect()
    }
}

impl HeaderMapperTrait for HeaderMapper {
    fn detect_from_headers(&self, headers: &[String]) -> Vec<ColumnMappingItem> {
        headers
            .iter()
            .map(|header| {
                let (target_field, confidence) = match self.match_header(header) {
                    Some((field, confidence)) => (MappingTarget::Field(field), confidence),
                    None => (MappingTarget::Skip, Confidence::Low),
                };
                ColumnMappingItem {
                    source_column: header.clone(),
                    target_field,
                    confidence,
                    sample_values: Vec::new(),
                    is_required: target_field
                        .field()
                        .map_or(false, |f| REQUIRED_FIELDS.contains(&f)),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Raison Sociale "), "raison sociale");
        assert_eq!(normalize_header("Téléphone"), "telephone");
        assert_eq!(normalize_header("Chiffre d'affaires (€)"), "chiffre d affaires");
        assert_eq!(normalize_header("N° SIRET"), "n siret");
    }

    #[test]
    fn test_alias_table_has_no_overlap() {
        let mut seen: HashMap<&str, FieldKey> = HashMap::new();
        for (field, aliases) in FIELD_ALIASES {
            for alias in *aliases {
                assert_eq!(normalize_header(alias), *alias, "alias not normalized: {}", alias);
                if let Some(previous) = seen.insert(*alias, *field) {
                    panic!("alias {} registered for {} and {}", alias, previous, field);
                }
            }
        }
    }

    #[test]
    fn test_exact_match_high() {
        let mapper = HeaderMapper;
        let items = mapper.detect_from_headers(&headers(&["Raison sociale", "SIRET", "Region"]));

        assert_eq!(items[0].target_field, MappingTarget::Field(FieldKey::CompanyName));
        assert_eq!(items[1].target_field, MappingTarget::Field(FieldKey::Siret));
        assert_eq!(items[2].target_field, MappingTarget::Field(FieldKey::Region));
        assert!(items.iter().all(|i| i.confidence == Confidence::High));
        assert!(items[0].is_required);
        assert!(!items[1].is_required);
    }

    #[test]
    fn test_partial_match_medium() {
        let mapper = HeaderMapper;
        assert_eq!(
            mapper.match_header("Numéro de SIRET de l'établissement"),
            Some((FieldKey::Siret, Confidence::Medium))
        );
        // 反向包含: 表头是别名的一部分
        assert_eq!(
            mapper.match_header("Raison"),
            Some((FieldKey::CompanyName, Confidence::Medium))
        );
        // 取最长别名
        assert_eq!(
            mapper.match_header("Adresse e-mail du contact"),
            Some((FieldKey::Email, Confidence::Medium))
        );
    }

    #[test]
    fn test_no_match_is_skip_low() {
        let mapper = HeaderMapper;
        let items = mapper.detect_from_headers(&headers(&["Colonne inconnue", ""]));

        for item in items {
            assert_eq!(item.target_field, MappingTarget::Skip);
            assert_eq!(item.confidence, Confidence::Low);
            assert!(!item.is_required);
        }
    }

    #[test]
    fn test_reverse_match_prefers_shortest_alias() {
        let mapper = HeaderMapper;
        // "code" 出现在 "code naf" / "code ape" / "code siret" / "code postal" 中
        assert_eq!(
            mapper.match_header("Code"),
            Some((FieldKey::NafCode, Confidence::Medium))
        );
        assert_eq!(
            mapper.match_header("Numero"),
            Some((FieldKey::Siret, Confidence::Medium))
        );
        // 正向命中优先于反向
        assert_eq!(
            mapper.match_header("Code postal livraison"),
            Some((FieldKey::PostalCode, Confidence::Medium))
        );
    }

    #[test]
    fn test_short_alias_needs_word_boundary() {
        let mapper = HeaderMapper;
        // "ca" 不应命中 "location"
        assert_eq!(mapper.match_header("Location"), None);
        assert_eq!(
            mapper.match_header("CA 2023"),
            Some((FieldKey::AnnualRevenue, Confidence::Medium))
        );
    }

    #[test]
    fn test_attach_samples_distinct_non_empty() {
        let mapper = HeaderMapper;
        let rows: Vec<RawImportRow> = ["Rennes", "", "Rennes", "Brest", "Nantes", "Lyon"]
            .iter()
            .enumerate()
            .map(|(i, v)| RawImportRow::new(i + 1, vec![("Ville".to_string(), v.to_string())]))
            .collect();

        let items = mapper.attach_samples(mapper.detect_from_headers(&headers(&["Ville"])), &rows);
        assert_eq!(items[0].sample_values, vec!["Rennes", "Brest", "Nantes"]);
    }
}
