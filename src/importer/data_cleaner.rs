// ==========================================
// 班次产量对账系统 - 单元格值清洗
// ==========================================
// 职责: 单元格值 → 文本 / 数值
// 红线: 不返回错误；无法解析的数值按 0 处理，由调用方记录诊断
// ==========================================

use crate::domain::import::CellValue;
use crate::importer::shift_importer_trait::DataCleaner as DataCleanerTrait;

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn coerce_text(&self, value: &CellValue) -> String {
        match value {
            CellValue::Empty => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) if n.is_finite() => n.to_string(),
            CellValue::Number(_) => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
        }
    }

    fn coerce_number(&self, value: &CellValue) -> Option<f64> {
        let parsed = match value {
            CellValue::Empty => Some(0.0),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
        };
        parsed.filter(|n| n.is_finite())
    }
}
