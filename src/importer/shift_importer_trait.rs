// ==========================================
// 班次产量对账系统 - 班次导入 Trait
// ==========================================
// 职责: 定义班次导入接口（不包含实现）
// 流程: 读取行 → 字段映射 → DQ 校验 → 主数据补全 → 合并 → 落库
// ==========================================

use crate::domain::import::{CellValue, ImportSummary, ImportedRow, RawRow, RowDiagnostic};
use crate::domain::production::ProductionInput;
use crate::domain::types::Shift;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// ShiftImporter Trait
// ==========================================
// 用途: 班次导入主接口
// 实现者: ShiftImporterImpl
#[async_trait]
pub trait ShiftImporter: Send + Sync {
    /// 导入一批已解析的行
    ///
    /// # 参数
    /// - shift: 班次
    /// - rows: 原始行（列名 → 单元格值）
    /// - source: 来源描述（写入批次记录）
    ///
    /// # 返回
    /// - Ok(ImportSummary): 导入汇总（单行失败不影响其他行）
    /// - Err: 仅在批次无法开始时返回
    async fn import_rows(
        &self,
        shift: Shift,
        rows: Vec<RawRow>,
        source: Option<String>,
    ) -> ImportResult<ImportSummary>;

    /// 从文件读取行并导入
    ///
    /// 格式错误的行记为跳过并写入 ERROR 诊断，其余行照常导入
    ///
    /// # 错误
    /// - FileNotFound / UnsupportedFormat / FileReadError: 文件无法读取
    async fn import_file(&self, shift: Shift, path: &Path) -> ImportResult<ImportSummary>;
}

// ==========================================
// RowSource Trait
// ==========================================
// 用途: 外部行来源（表格解析由外部完成，这里只接收列名 → 单元格值）
// 实现者: JsonRowSource
pub trait RowSource: Send + Sync {
    /// 读取文件中的全部行
    ///
    /// # 返回
    /// - Ok(Vec<SourceRow>): 按源顺序逐行的解析结果（单行失败不影响其他行）
    /// - Err: 文件不存在 / 格式不支持 / 整体无法解析
    fn read_rows(&self, path: &Path) -> ImportResult<Vec<SourceRow>>;
}

/// 行来源的单行解析结果
pub type SourceRow = ImportResult<RawRow>;

// ==========================================
// MappedRow - 字段映射产出
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow {
    pub row_number: usize,
    pub input: ProductionInput,
    /// 数值无法解析、已按 0 处理的字段（字段名, 原始文本）
    pub coerced_fields: Vec<(&'static str, String)>,
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 列名别名表 → 输入字段
// 实现者: field_mapper::FieldMapper
pub trait FieldMapper: Send + Sync {
    /// 将导入行映射为输入字段（只填写本班次的三项字段）
    ///
    /// # 错误
    /// - ProductCodeMissing: 产品编码为空
    fn map_row(&self, row: &ImportedRow) -> ImportResult<MappedRow>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 实现者: data_cleaner::DataCleaner
pub trait DataCleaner: Send + Sync {
    /// 单元格 → 文本（去首尾空白；数字按最短形式输出）
    fn coerce_text(&self, value: &CellValue) -> String;

    /// 单元格 → 数值
    ///
    /// # 返回
    /// - Some(f64): 有限数值（空单元格为 0）
    /// - None: 无法解析或非有限数
    fn coerce_number(&self, value: &CellValue) -> Option<f64>;
}

// ==========================================
// DqValidator Trait
// ==========================================
// 实现者: dq_validator::DqValidator
pub trait DqValidator: Send + Sync {
    /// 校验单行（负数 WARNING、数值转换 INFO）
    fn validate_row(&self, shift: Shift, row: &MappedRow) -> Vec<RowDiagnostic>;

    /// 检测同批次内重复编码（不包括第一次出现）
    fn detect_duplicates(&self, rows: &[MappedRow]) -> Vec<RowDiagnostic>;
}
