// ==========================================
// 企业档案导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 文件级错误同步向上抛出并终止管线；行级错误见 RowError
// ==========================================

use thiserror::Error;

pub use crate::domain::import::RowError;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件无法读取: {0}")]
    UnreadableFile(String),

    #[error("文件无数据行: {0}")]
    EmptyFile(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("工作表不存在: {0}")]
    SheetNotFound(String),

    // ===== 列映射错误 =====
    #[error("字段 {field} 被多个高置信度列映射: {columns:?}")]
    MappingConflict { field: String, columns: Vec<String> },

    #[error("未知目标字段 (列 {column}): {value}")]
    UnknownField { column: String, value: String },

    // ===== 配置错误 =====
    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::UnreadableFile(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::UnreadableFile(format!("CSV 解析失败: {}", err))
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::UnreadableFile(format!("Excel 解析失败: {}", err))
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
