// ==========================================
// 班次产量对账系统 - 数据质量校验器实现
// ==========================================
// 职责: 行级 DQ 校验
// 级别: ERROR 跳过该行 / WARNING 仍写入 / INFO 仅记录
// ==========================================

use crate::domain::import::{DqLevel, RowDiagnostic};
use crate::domain::types::Shift;
use crate::importer::shift_importer_trait::{DqValidator as DqValidatorTrait, MappedRow};
use std::collections::HashMap;

pub struct DqValidator;

impl DqValidator {
    /// 产品编码缺失（ERROR）
    pub fn missing_code(row_number: usize) -> RowDiagnostic {
        RowDiagnostic {
            row_number,
            code: None,
            level: DqLevel::Error,
            field: "code".to_string(),
            message: "产品编码缺失，跳过该行".to_string(),
        }
    }
}

impl DqValidatorTrait for DqValidator {
    fn validate_row(&self, shift: Shift, row: &MappedRow) -> Vec<RowDiagnostic> {
        let mut diagnostics = Vec::new();
        let input = &row.input;
        let q = input.shift_quantities(shift);
        let n = shift.number();

        let checks = [
            (format!("shift{}_target", n), q.target_kg),
            (format!("shift{}_actual_kg", n), q.actual_kg),
            (format!("shift{}_actual_boxes", n), q.actual_boxes),
            ("units_per_box".to_string(), input.units_per_box),
            (
                "net_weight_per_unit_kg".to_string(),
                input.net_weight_per_unit_kg,
            ),
            ("batch_recipe_kg".to_string(), input.batch_recipe_kg),
        ];

        // WARNING: 负数（仍写入）
        for (field, value) in checks {
            if value < 0.0 {
                diagnostics.push(RowDiagnostic {
                    row_number: row.row_number,
                    code: Some(input.code.clone()),
                    level: DqLevel::Warning,
                    message: format!("{} 为负数: {}", field, value),
                    field,
                });
            }
        }

        // INFO: 无法解析的数值按 0 处理
        for (field, raw) in &row.coerced_fields {
            diagnostics.push(RowDiagnostic {
                row_number: row.row_number,
                code: Some(input.code.clone()),
                level: DqLevel::Info,
                field: field.to_string(),
                message: format!("无法解析为数值，按 0 处理: {:?}", raw),
            });
        }

        diagnostics
    }

    fn detect_duplicates(&self, rows: &[MappedRow]) -> Vec<RowDiagnostic> {
        let mut first_occurrence: HashMap<&str, usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for row in rows {
            let code = row.input.code.as_str();
            if let Some(first_row) = first_occurrence.get(code) {
                duplicates.push(RowDiagnostic {
                    row_number: row.row_number,
                    code: Some(code.to_string()),
                    level: DqLevel::Info,
                    field: "code".to_string(),
                    message: format!("同批次重复编码（首次出现于第 {} 行），以后出现的行为准", first_row),
                });
            } else {
                first_occurrence.insert(code, row.row_number);
            }
        }

        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::production::ProductionInput;

    fn mapped(row_number: usize, code: &str) -> MappedRow {
        MappedRow {
            row_number,
            input: ProductionInput {
                code: code.to_string(),
                ..Default::default()
            },
            coerced_fields: Vec::new(),
        }
    }

    #[test]
    fn test_negative_values_are_warnings() {
        let mut row = mapped(3, "P1");
        row.input.shift2_actual_kg = -5.0;
        row.input.units_per_box = -1.0;
        // 另一班次字段不校验
        row.input.shift1_actual_kg = -9.0;

        let diagnostics = DqValidator.validate_row(Shift::Second, &row);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.level == DqLevel::Warning));
        assert_eq!(diagnostics[0].field, "shift2_actual_kg");
        assert_eq!(diagnostics[1].field, "units_per_box");
    }

    #[test]
    fn test_coerced_fields_are_info() {
        let mut row = mapped(1, "P1");
        row.coerced_fields.push(("shift1_actual_kg", "abc".to_string()));

        let diagnostics = DqValidator.validate_row(Shift::First, &row);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].level, DqLevel::Info);
        assert_eq!(diagnostics[0].field, "shift1_actual_kg");
    }

    #[test]
    fn test_detect_duplicates() {
        let rows = vec![mapped(1, "A"), mapped(2, "B"), mapped(3, "A"), mapped(4, "A")];
        let duplicates = DqValidator.detect_duplicates(&rows);

        let rows: Vec<usize> = duplicates.iter().map(|d| d.row_number).collect();
        assert_eq!(rows, vec![3, 4]);
        assert!(duplicates.iter().all(|d| d.level == DqLevel::Info));
    }

    #[test]
    fn test_missing_code_is_error() {
        let d = DqValidator::missing_code(7);
        assert_eq!(d.level, DqLevel::Error);
        assert_eq!(d.row_number, 7);
    }
}
