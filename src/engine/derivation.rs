// ==========================================
// 班次产量对账系统 - 记录派生
// ==========================================
// 职责: 由输入字段组装完整生产记录（所有派生指标）
// 红线: 纯函数，不访问存储；数值异常一律按 0 处理
// ==========================================

use crate::domain::production::{DerivedMetrics, DerivedProduction, ProductionInput};
use crate::engine::metrics::{self, finite_or_zero};

pub struct RecordDerivation;

impl RecordDerivation {
    /// 派生完整记录
    ///
    /// # 计算顺序
    /// 1. daily_plan_boxes / recipe_batch_units / CTP1 / CTP2 / KGTD / CXSTD 只依赖输入字段
    /// 2. 实际与计划差、CTPTD 使用**已取整**的 KGTD（与历史存储值口径一致，不得改为原始和）
    ///
    /// # 说明
    /// - extra 透传字段原样保留
    /// - boxes_for_target = daily_plan_boxes
    pub fn derive(&self, input: ProductionInput) -> DerivedProduction {
        let input = sanitize(input);

        let daily_plan_boxes = metrics::daily_plan_boxes(
            input.shift1_target,
            input.shift2_target,
            input.net_weight_per_unit_kg,
            input.units_per_box,
        );
        let recipe_batch_units = metrics::recipe_batch_units(
            input.shift1_target,
            input.shift2_target,
            input.batch_recipe_kg,
        );
        let efficiency_shift1 =
            metrics::efficiency_shift1(input.shift1_actual_kg, input.shift1_target);
        let efficiency_shift2 =
            metrics::efficiency_shift2(input.shift2_actual_kg, input.shift2_target);
        let total_actual_kg =
            metrics::total_actual_kg(input.shift1_actual_kg, input.shift2_actual_kg);
        let total_actual_boxes =
            metrics::total_actual_boxes(input.shift1_actual_boxes, input.shift2_actual_boxes);
        let plan_vs_actual_delta_kg = metrics::plan_vs_actual_delta_kg(
            total_actual_kg,
            input.shift1_target,
            input.shift2_target,
        );
        let total_efficiency =
            metrics::total_efficiency(total_actual_kg, input.shift1_target, input.shift2_target);

        DerivedProduction {
            input,
            metrics: DerivedMetrics {
                daily_plan_boxes,
                boxes_for_target: daily_plan_boxes,
                recipe_batch_units,
                efficiency_shift1,
                efficiency_shift2,
                total_actual_kg,
                total_actual_boxes,
                plan_vs_actual_delta_kg,
                total_efficiency,
            },
        }
    }
}

/// 数值字段归一化（非有限数 → 0）
fn sanitize(mut input: ProductionInput) -> ProductionInput {
    for v in [
        &mut input.units_per_box,
        &mut input.net_weight_per_unit_kg,
        &mut input.batch_recipe_kg,
        &mut input.shift1_target,
        &mut input.shift1_actual_kg,
        &mut input.shift1_actual_boxes,
        &mut input.shift2_target,
        &mut input.shift2_actual_kg,
        &mut input.shift2_actual_boxes,
    ] {
        *v = finite_or_zero(*v);
    }
    input
}
