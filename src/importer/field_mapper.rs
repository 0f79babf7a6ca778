// ==========================================
// 班次产量对账系统 - 字段映射器实现
// ==========================================
// 职责: 源列名（含别名）→ 输入字段 + 类型转换
// 规则: 按别名顺序取第一个"有效值"单元格；都无效时文本为空、数值为 0
// 规则: 未识别的列原样进入 extra
// ==========================================

use crate::domain::import::{CellValue, ImportedRow, RawRow};
use crate::domain::production::{ProductionInput, ShiftQuantities};
use crate::domain::types::Shift;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::shift_importer_trait::{
    DataCleaner as DataCleanerTrait, FieldMapper as FieldMapperTrait, MappedRow,
};
use std::collections::BTreeMap;

// ==========================================
// 列名别名表
// ==========================================
pub mod columns {
    pub const CODE: &[&str] = &["CÓDIGO", "CODIGO"];
    pub const DESCRIPTION: &[&str] = &["DESCRIÇÃO PRODUTO", "DESCRICAO PRODUTO"];
    pub const MACHINE: &[&str] = &["MÁQUINA", "MAQUINA"];
    pub const PACKAGING: &[&str] = &["EMBALAGEM"];
    pub const UNITS_PER_BOX: &[&str] = &["UN/CX", "UN_CX"];
    pub const SHIFT1_TARGET: &[&str] = &["1 TURNO", "TURNO1"];
    pub const SHIFT2_TARGET: &[&str] = &["2 TURNO", "TURNO2"];
    pub const NET_WEIGHT_PER_UNIT_KG: &[&str] = &["PESO LIQ UNIT KG", "PESO_LIQ_UNIT_KG"];
    pub const BATCH_RECIPE_KG: &[&str] = &["BATCH RECEITA KG", "BATCH_RECEITA_KG"];
    pub const CLASSIFICATION: &[&str] = &["CLASSIFICAÇÃO", "CLASSIFICACAO"];
    pub const SHIFT1_ACTUAL_KG: &[&str] = &["KG"];
    pub const SHIFT1_ACTUAL_BOXES: &[&str] = &["CXS"];
    pub const SHIFT2_ACTUAL_KG: &[&str] = &["KG2", "KG"];
    pub const SHIFT2_ACTUAL_BOXES: &[&str] = &["CX2", "CXS"];

    /// 全部已识别列名
    pub fn is_known(column: &str) -> bool {
        [
            CODE,
            DESCRIPTION,
            MACHINE,
            PACKAGING,
            UNITS_PER_BOX,
            SHIFT1_TARGET,
            SHIFT2_TARGET,
            NET_WEIGHT_PER_UNIT_KG,
            BATCH_RECIPE_KG,
            CLASSIFICATION,
            SHIFT1_ACTUAL_KG,
            SHIFT1_ACTUAL_BOXES,
            SHIFT2_ACTUAL_KG,
            SHIFT2_ACTUAL_BOXES,
        ]
        .iter()
        .any(|aliases| aliases.contains(&column))
    }
}

pub struct FieldMapper {
    cleaner: DataCleaner,
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }
}

impl FieldMapperTrait for FieldMapper {
    fn map_row(&self, row: &ImportedRow) -> ImportResult<MappedRow> {
        let cells = &row.cells;

        let code = self.get_text(cells, columns::CODE);
        if code.is_empty() {
            return Err(ImportError::ProductCodeMissing(row.row_number));
        }

        let mut coerced_fields = Vec::new();
        let mut number = |field: &'static str, aliases: &[&str]| -> f64 {
            self.get_number(cells, field, aliases, &mut coerced_fields)
        };

        let units_per_box = number("units_per_box", columns::UNITS_PER_BOX);
        let net_weight_per_unit_kg =
            number("net_weight_per_unit_kg", columns::NET_WEIGHT_PER_UNIT_KG);
        let batch_recipe_kg = number("batch_recipe_kg", columns::BATCH_RECIPE_KG);
        let quantities = match row.shift {
            Shift::First => ShiftQuantities {
                target_kg: number("shift1_target", columns::SHIFT1_TARGET),
                actual_kg: number("shift1_actual_kg", columns::SHIFT1_ACTUAL_KG),
                actual_boxes: number("shift1_actual_boxes", columns::SHIFT1_ACTUAL_BOXES),
            },
            Shift::Second => ShiftQuantities {
                target_kg: number("shift2_target", columns::SHIFT2_TARGET),
                actual_kg: number("shift2_actual_kg", columns::SHIFT2_ACTUAL_KG),
                actual_boxes: number("shift2_actual_boxes", columns::SHIFT2_ACTUAL_BOXES),
            },
        };

        let mut input = ProductionInput {
            code,
            description: self.get_text(cells, columns::DESCRIPTION),
            machine: self.get_text(cells, columns::MACHINE),
            packaging: self.get_text(cells, columns::PACKAGING),
            classification: self.get_text(cells, columns::CLASSIFICATION),
            units_per_box,
            net_weight_per_unit_kg,
            batch_recipe_kg,
            extra: extra_columns(cells),
            ..Default::default()
        };
        input.set_shift_quantities(row.shift, quantities);

        Ok(MappedRow {
            row_number: row.row_number,
            input,
            coerced_fields,
        })
    }
}

impl FieldMapper {
    /// 按别名顺序取第一个有效值单元格
    fn pick<'a>(&self, cells: &'a RawRow, aliases: &[&str]) -> Option<&'a CellValue> {
        aliases
            .iter()
            .filter_map(|alias| cells.get(*alias))
            .find(|cell| cell.is_truthy())
    }

    fn get_text(&self, cells: &RawRow, aliases: &[&str]) -> String {
        self.pick(cells, aliases)
            .map(|cell| self.cleaner.coerce_text(cell))
            .unwrap_or_default()
    }

    fn get_number(
        &self,
        cells: &RawRow,
        field: &'static str,
        aliases: &[&str],
        coerced_fields: &mut Vec<(&'static str, String)>,
    ) -> f64 {
        let cell = match self.pick(cells, aliases) {
            Some(cell) => cell,
            None => return 0.0,
        };
        match self.cleaner.coerce_number(cell) {
            Some(value) => value,
            None => {
                coerced_fields.push((field, self.cleaner.coerce_text(cell)));
                0.0
            }
        }
    }
}

/// 未识别列 → extra（空单元格与非有限数不保留）
fn extra_columns(cells: &RawRow) -> BTreeMap<String, serde_json::Value> {
    cells
        .iter()
        .filter(|(column, _)| !columns::is_known(column))
        .filter_map(|(column, cell)| {
            let value = match cell {
                CellValue::Empty => return None,
                CellValue::Bool(b) => serde_json::Value::Bool(*b),
                CellValue::Number(n) => serde_json::Number::from_f64(*n)?.into(),
                CellValue::Text(s) => serde_json::Value::String(s.clone()),
            };
            Some((column.clone(), value))
        })
        .collect()
}
