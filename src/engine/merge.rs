// ==========================================
// 班次产量对账系统 - 班次合并策略
// ==========================================
// 职责: 将单个班次的导入结果与已有记录合并，产出完整记录与落库指令
// 红线: 本班次三项字段只取自导入行；另一班次三项字段只取自已有记录
// 红线: 纯函数，不访问存储（查询与写入由导入器完成）
// ==========================================

use crate::domain::import::MergeNotice;
use crate::domain::product::ProductMaster;
use crate::domain::production::{
    DerivedProduction, ProductionInput, ProductionRecord, ShiftQuantities,
};
use crate::domain::types::{DivergenceLevel, Shift};
use crate::engine::derivation::RecordDerivation;
use crate::engine::divergence::DivergenceThresholds;

// ==========================================
// UpsertInstruction - 落库指令
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertInstruction {
    /// 该编码尚无记录
    Create,
    /// 更新已有记录（条件更新时校验 expected_revision）
    Update { id: String, expected_revision: i64 },
}

// ==========================================
// MergeOutcome - 合并结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub derived: DerivedProduction,
    pub instruction: UpsertInstruction,
    pub notices: Vec<MergeNotice>,
}

pub struct ShiftMergePolicy {
    derivation: RecordDerivation,
    thresholds: DivergenceThresholds,
}

impl Default for ShiftMergePolicy {
    fn default() -> Self {
        Self::new(DivergenceThresholds::default())
    }
}

impl ShiftMergePolicy {
    pub fn new(thresholds: DivergenceThresholds) -> Self {
        Self {
            derivation: RecordDerivation,
            thresholds,
        }
    }

    /// 合并单行导入结果
    ///
    /// # 参数
    /// - shift: 本次导入的班次
    /// - parsed: 字段映射产出（只有本班次三项字段有效）
    /// - existing: 该编码的已有记录
    /// - catalog: 在用产品主数据（补全缺失的主数据字段）
    ///
    /// # 字段优先级
    /// - 描述/主数据字段: 导入行 → 已有记录 → 产品主数据
    /// - extra: 保留已有条目，导入行条目覆盖同名键
    pub fn merge(
        &self,
        shift: Shift,
        parsed: ProductionInput,
        existing: Option<&ProductionRecord>,
        catalog: Option<&ProductMaster>,
    ) -> MergeOutcome {
        let this_shift = parsed.shift_quantities(shift);
        let other_shift = existing
            .map(|r| r.input.shift_quantities(shift.other()))
            .unwrap_or_default();

        let mut merged = parsed;
        if let Some(record) = existing {
            fill_descriptive(&mut merged, &record.input);
            let mut extra = record.input.extra.clone();
            extra.append(&mut merged.extra);
            merged.extra = extra;
        }
        if let Some(master) = catalog.filter(|m| m.active) {
            enrich_from_catalog(&mut merged, master);
        }

        merged.set_shift_quantities(shift, this_shift);
        merged.set_shift_quantities(shift.other(), other_shift);

        let notices = self.notices_for(shift, &merged, existing, this_shift);
        let derived = self.derivation.derive(merged);

        let instruction = match existing {
            Some(record) => UpsertInstruction::Update {
                id: record.id.clone(),
                expected_revision: record.revision,
            },
            None => UpsertInstruction::Create,
        };

        MergeOutcome {
            derived,
            instruction,
            notices,
        }
    }

    fn notices_for(
        &self,
        shift: Shift,
        merged: &ProductionInput,
        existing: Option<&ProductionRecord>,
        this_shift: ShiftQuantities,
    ) -> Vec<MergeNotice> {
        let mut notices = Vec::new();
        if shift != Shift::Second {
            return notices;
        }

        match existing {
            Some(record) if record.input.shift1_target != 0.0 => {}
            _ => notices.push(MergeNotice::MissingFirstShift {
                code: merged.code.clone(),
            }),
        }

        if let Some(record) = existing {
            if record.input.shift1_actual_kg > 0.0 {
                let finding = self.thresholds.evaluate(
                    &merged.code,
                    record.input.shift1_actual_kg,
                    this_shift.actual_kg,
                );
                if finding.level != DivergenceLevel::Normal {
                    notices.push(MergeNotice::Divergence(finding));
                }
            }
        }

        notices
    }
}

/// 用产品主数据补全空白/为 0 的主数据字段
///
/// 只补全，不覆盖已有值；班次字段不受影响
pub fn enrich_from_catalog(input: &mut ProductionInput, master: &ProductMaster) {
    fill_text(&mut input.description, &master.description);
    fill_text(&mut input.machine, &master.machine);
    fill_text(&mut input.packaging, &master.packaging);
    fill_text(&mut input.classification, &master.classification);
    fill_number(&mut input.units_per_box, master.units_per_box);
    fill_number(&mut input.net_weight_per_unit_kg, master.net_weight_per_unit_kg);
    fill_number(&mut input.batch_recipe_kg, master.batch_recipe_kg);
}

fn fill_descriptive(target: &mut ProductionInput, source: &ProductionInput) {
    fill_text(&mut target.description, &source.description);
    fill_text(&mut target.machine, &source.machine);
    fill_text(&mut target.packaging, &source.packaging);
    fill_text(&mut target.classification, &source.classification);
    fill_number(&mut target.units_per_box, source.units_per_box);
    fill_number(&mut target.net_weight_per_unit_kg, source.net_weight_per_unit_kg);
    fill_number(&mut target.batch_recipe_kg, source.batch_recipe_kg);
}

fn fill_text(target: &mut String, fallback: &str) {
    if target.trim().is_empty() && !fallback.trim().is_empty() {
        *target = fallback.to_string();
    }
}

fn fill_number(target: &mut f64, fallback: f64) {
    if (*target == 0.0 || !target.is_finite()) && fallback.is_finite() {
        *target = fallback;
    }
}
