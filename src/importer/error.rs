// ==========================================
// 班次产量对账系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 数值转换不产生错误（无效值按 0 处理并记录 INFO 诊断）
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 行来源错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .json/.jsonl/.ndjson）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("行数据格式错误 (行 {row}): {message}")]
    RowFormatError { row: usize, message: String },

    // ===== 行级错误 =====
    #[error("产品编码缺失 (行 {0})")]
    ProductCodeMissing(usize),

    #[error("合并冲突 (编码 {code}): 重试 {attempts} 次后仍冲突")]
    MergeConflict { code: String, attempts: u32 },

    // ===== 存储错误 =====
    #[error(transparent)]
    Store(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
