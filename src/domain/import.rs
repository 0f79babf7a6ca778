// ==========================================
// 班次产量对账系统 - 导入领域模型
// ==========================================
// 职责: 原始行 / 行诊断 / 偏差发现 / 导入汇总 / 导入批次
// 生命周期: 原始行仅在导入流程内，批次与汇总可落库
// ==========================================

use crate::domain::types::{DivergenceLevel, Shift};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// CellValue - 原始单元格值
// ==========================================
// 来源: 外部表格导入方（列名 → 单元格值）
// JSON 映射: null → Empty, 字符串 → Text, 数字 → Number, 布尔 → Bool
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// 是否为"有效值"
    ///
    /// 规则: 空 / 空字符串 / 0 / 非有限数 / false 视为无效，别名匹配时继续尝试下一个列名；
    /// 仅含空白的文本视为有效（数值转换后为 0）
    pub fn is_truthy(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Bool(b) => *b,
            CellValue::Number(n) => n.is_finite() && *n != 0.0,
            CellValue::Text(s) => !s.is_empty(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// 原始行（列名 → 单元格值）
pub type RawRow = HashMap<String, CellValue>;

// ==========================================
// ImportedRow - 带班次标记的导入行
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportedRow {
    pub shift: Shift,
    pub row_number: usize, // 源数据行号（从 1 开始）
    pub cells: RawRow,
}

// ==========================================
// DqLevel - 行数据质量级别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DqLevel {
    Error,   // 错误（跳过该行）
    Warning, // 警告（仍然写入）
    Info,    // 提示（仅记录）
}

// ==========================================
// RowDiagnostic - 行诊断
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowDiagnostic {
    pub row_number: usize,
    pub code: Option<String>,
    pub level: DqLevel,
    pub field: String,
    pub message: String,
}

// ==========================================
// DivergenceFinding - 班次偏差发现（仅报告，不落库）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceFinding {
    pub code: String,
    pub shift1_actual_kg: f64,
    pub shift2_actual_kg: f64,
    pub divergence_pct: f64,
    pub level: DivergenceLevel,
}

// ==========================================
// MergeNotice - 合并提示
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeNotice {
    /// 导入 2 班时没有可用的 1 班数据
    MissingFirstShift { code: String },
    /// 偏差超出正常区间
    Divergence(DivergenceFinding),
}

// ==========================================
// UpsertAction - 落库动作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpsertAction {
    Created,
    Updated,
}

// ==========================================
// RowOutcome - 单行处理结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowOutcome {
    pub row_number: usize,
    pub code: String,
    pub record_id: String,
    pub action: UpsertAction,
    pub attempts: u32,
    pub notices: Vec<MergeNotice>,
}

// ==========================================
// ImportSummary - 批次导入汇总
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub batch_id: String,
    pub shift: Shift,
    pub total_rows: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize, // 主键缺失等被跳过的行
    pub failed: usize,  // 存储失败 / 合并冲突的行
    pub diagnostics: Vec<RowDiagnostic>,
    pub notices: Vec<MergeNotice>,
    pub elapsed_ms: u128,
}

impl ImportSummary {
    /// 成功写入的行数
    pub fn persisted(&self) -> usize {
        self.created + self.updated
    }

    /// 偏差发现（不含正常区间）
    pub fn divergences(&self) -> Vec<&DivergenceFinding> {
        self.notices
            .iter()
            .filter_map(|n| match n {
                MergeNotice::Divergence(f) => Some(f),
                _ => None,
            })
            .collect()
    }
}

// ==========================================
// ImportBatch - 导入批次记录
// ==========================================
// 对齐: import_batch 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub shift: Shift,
    pub source: Option<String>, // 来源描述（文件名等）
    pub total_rows: i64,
    pub created_rows: i64,
    pub updated_rows: i64,
    pub skipped_rows: i64,
    pub failed_rows: i64,
    pub diagnostics_json: String,
    pub notices_json: String,
    pub imported_at: DateTime<Utc>,
    pub elapsed_ms: i64,
}

impl ImportBatch {
    /// 由导入汇总生成批次记录（诊断与提示序列化为 JSON）
    pub fn from_summary(
        summary: &ImportSummary,
        source: Option<String>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            batch_id: summary.batch_id.clone(),
            shift: summary.shift,
            source,
            total_rows: summary.total_rows as i64,
            created_rows: summary.created as i64,
            updated_rows: summary.updated as i64,
            skipped_rows: summary.skipped as i64,
            failed_rows: summary.failed as i64,
            diagnostics_json: serde_json::to_string(&summary.diagnostics)?,
            notices_json: serde_json::to_string(&summary.notices)?,
            imported_at: Utc::now(),
            elapsed_ms: i64::try_from(summary.elapsed_ms).unwrap_or(i64::MAX),
        })
    }
}
