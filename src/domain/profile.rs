// ==========================================
// 企业档案导入 - 企业档案领域模型
// ==========================================
// 职责: 标准字段 (FieldKey) + 部分档案 (ProfileData) + 去重键 (MatchKey)
// 用途: 行转换层写入，批量导入层读取/补全
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// FieldKey - 标准档案字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    // ===== 身份 =====
    CompanyName,
    Siret,
    Siren,
    LegalForm,
    NafCode,

    // ===== 业务 =====
    Sector,
    Description,
    EmployeeCount,
    AnnualRevenue,
    CreationYear,

    // ===== 地址 =====
    Address,
    PostalCode,
    City,
    Region,

    // ===== 联系方式 =====
    Email,
    Phone,
    Website,
    ContactName,
}

impl FieldKey {
    pub const ALL: [FieldKey; 18] = [
        FieldKey::CompanyName,
        FieldKey::Siret,
        FieldKey::Siren,
        FieldKey::LegalForm,
        FieldKey::NafCode,
        FieldKey::Sector,
        FieldKey::Description,
        FieldKey::EmployeeCount,
        FieldKey::AnnualRevenue,
        FieldKey::CreationYear,
        FieldKey::Address,
        FieldKey::PostalCode,
        FieldKey::City,
        FieldKey::Region,
        FieldKey::Email,
        FieldKey::Phone,
        FieldKey::Website,
        FieldKey::ContactName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::CompanyName => "company_name",
            FieldKey::Siret => "siret",
            FieldKey::Siren => "siren",
            FieldKey::LegalForm => "legal_form",
            FieldKey::NafCode => "naf_code",
            FieldKey::Sector => "sector",
            FieldKey::Description => "description",
            FieldKey::EmployeeCount => "employee_count",
            FieldKey::AnnualRevenue => "annual_revenue",
            FieldKey::CreationYear => "creation_year",
            FieldKey::Address => "address",
            FieldKey::PostalCode => "postal_code",
            FieldKey::City => "city",
            FieldKey::Region => "region",
            FieldKey::Email => "email",
            FieldKey::Phone => "phone",
            FieldKey::Website => "website",
            FieldKey::ContactName => "contact_name",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let key = s.trim();
        Self::ALL.iter().copied().find(|f| f.as_str() == key)
    }

    /// 数值字段（导入时解析为整数）
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKey::EmployeeCount | FieldKey::AnnualRevenue | FieldKey::CreationYear
        )
    }

    /// 标识类字段（导入时去除空格/点/横线）
    pub fn is_identifier(&self) -> bool {
        matches!(self, FieldKey::Siret | FieldKey::Siren | FieldKey::PostalCode)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 必填字段集合
pub const REQUIRED_FIELDS: &[FieldKey] = &[FieldKey::CompanyName];

/// 推荐字段集合（缺失时行状态为 pending）
pub const RECOMMENDED_FIELDS: &[FieldKey] = &[FieldKey::Siret];

// ==========================================
// ProfileData - 部分企业档案
// ==========================================
// 所有字段可空：导入文件通常只覆盖其中一部分
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub siret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub siren: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_form: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub naf_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_revenue: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
}

impl ProfileData {
    fn text_slot(&mut self, field: FieldKey) -> Option<&mut Option<String>> {
        match field {
            FieldKey::CompanyName => Some(&mut self.company_name),
            FieldKey::Siret => Some(&mut self.siret),
            FieldKey::Siren => Some(&mut self.siren),
            FieldKey::LegalForm => Some(&mut self.legal_form),
            FieldKey::NafCode => Some(&mut self.naf_code),
            FieldKey::Sector => Some(&mut self.sector),
            FieldKey::Description => Some(&mut self.description),
            FieldKey::Address => Some(&mut self.address),
            FieldKey::PostalCode => Some(&mut self.postal_code),
            FieldKey::City => Some(&mut self.city),
            FieldKey::Region => Some(&mut self.region),
            FieldKey::Email => Some(&mut self.email),
            FieldKey::Phone => Some(&mut self.phone),
            FieldKey::Website => Some(&mut self.website),
            FieldKey::ContactName => Some(&mut self.contact_name),
            FieldKey::EmployeeCount | FieldKey::AnnualRevenue | FieldKey::CreationYear => None,
        }
    }

    fn int_slot(&mut self, field: FieldKey) -> Option<&mut Option<i64>> {
        match field {
            FieldKey::EmployeeCount => Some(&mut self.employee_count),
            FieldKey::AnnualRevenue => Some(&mut self.annual_revenue),
            FieldKey::CreationYear => Some(&mut self.creation_year),
            _ => None,
        }
    }

    /// 读取字段（数值字段以十进制字符串返回）
    pub fn get(&self, field: FieldKey) -> Option<String> {
        match field {
            FieldKey::CompanyName => self.company_name.clone(),
            FieldKey::Siret => self.siret.clone(),
            FieldKey::Siren => self.siren.clone(),
            FieldKey::LegalForm => self.legal_form.clone(),
            FieldKey::NafCode => self.naf_code.clone(),
            FieldKey::Sector => self.sector.clone(),
            FieldKey::Description => self.description.clone(),
            FieldKey::EmployeeCount => self.employee_count.map(|v| v.to_string()),
            FieldKey::AnnualRevenue => self.annual_revenue.map(|v| v.to_string()),
            FieldKey::CreationYear => self.creation_year.map(|v| v.to_string()),
            FieldKey::Address => self.address.clone(),
            FieldKey::PostalCode => self.postal_code.clone(),
            FieldKey::City => self.city.clone(),
            FieldKey::Region => self.region.clone(),
            FieldKey::Email => self.email.clone(),
            FieldKey::Phone => self.phone.clone(),
            FieldKey::Website => self.website.clone(),
            FieldKey::ContactName => self.contact_name.clone(),
        }
    }

    /// 写入文本字段；对数值字段调用时返回 false
    pub fn set_text(&mut self, field: FieldKey, value: String) -> bool {
        match self.text_slot(field) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    /// 写入数值字段；对文本字段调用时返回 false
    pub fn set_int(&mut self, field: FieldKey, value: i64) -> bool {
        match self.int_slot(field) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    /// 字段为空或仅含空白
    pub fn is_blank(&self, field: FieldKey) -> bool {
        self.get(field).map_or(true, |v| v.trim().is_empty())
    }

    /// 用另一份档案补全本档案的空字段（已有值不覆盖）
    ///
    /// # 返回
    /// - 被补全的字段列表
    pub fn fill_blanks_from(&mut self, other: &ProfileData) -> Vec<FieldKey> {
        let mut filled = Vec::new();
        for field in FieldKey::ALL {
            if !self.is_blank(field) || other.is_blank(field) {
                continue;
            }
            let applied = if field.is_numeric() {
                let value = match field {
                    FieldKey::EmployeeCount => other.employee_count,
                    FieldKey::AnnualRevenue => other.annual_revenue,
                    _ => other.creation_year,
                };
                value.map_or(false, |v| self.set_int(field, v))
            } else {
                other
                    .get(field)
                    .map_or(false, |v| self.set_text(field, v))
            };
            if applied {
                filled.push(field);
            }
        }
        filled
    }
}

// ==========================================
// MatchKey - 去重匹配键
// ==========================================
// 优先 SIRET；缺失时退化为规范化企业名称
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MatchKey {
    Siret(String),
    CompanyName(String),
}

impl MatchKey {
    pub fn value(&self) -> &str {
        match self {
            MatchKey::Siret(v) | MatchKey::CompanyName(v) => v,
        }
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKey::Siret(v) => write!(f, "siret:{}", v),
            MatchKey::CompanyName(v) => write!(f, "name:{}", v),
        }
    }
}
