// ==========================================
// 班次产量对账系统 - 指标函数
// ==========================================
// 职责: 每个派生指标的纯计算函数
// 红线: 不 panic；除数为 0 返回 0；非有限输入按 0 处理
// 口径: 结果保留 2 位小数（value×100 四舍五入，0.5 向正无穷进位）
// ==========================================

/// 非有限数（NaN / ±inf）按 0 处理
#[inline]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// 四舍五入到整数，恰好 .5 时向正无穷进位（-1.5 → -1，2.5 → 3）
#[inline]
fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// 保留 2 位小数
///
/// 百分比指标传入的是已乘 100 的值，即 `(a / b) * 100 * 100` 后取整再除以 100
pub fn round2(value: f64) -> f64 {
    let value = finite_or_zero(value);
    let rounded = round_half_up(value * 100.0) / 100.0;
    // 避免 -0.0 进入存储与比较
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// 百分比：numerator / denominator × 100，分母为 0 返回 0
fn percent(numerator: f64, denominator: f64) -> f64 {
    let numerator = finite_or_zero(numerator);
    let denominator = finite_or_zero(denominator);
    if denominator == 0.0 {
        return 0.0;
    }
    round2((numerator / denominator) * 100.0)
}

/// CTP1：1 班效率（%）
pub fn efficiency_shift1(actual_kg: f64, target_kg1: f64) -> f64 {
    percent(actual_kg, target_kg1)
}

/// CTP2：2 班效率（%）
pub fn efficiency_shift2(actual_kg2: f64, target_kg2: f64) -> f64 {
    percent(actual_kg2, target_kg2)
}

/// 日计划箱数：(计划1 + 计划2) / (单位净重 × 每箱单位数)
pub fn daily_plan_boxes(
    target_kg1: f64,
    target_kg2: f64,
    net_weight_per_unit_kg: f64,
    units_per_box: f64,
) -> f64 {
    let denominator = finite_or_zero(net_weight_per_unit_kg) * finite_or_zero(units_per_box);
    if denominator == 0.0 {
        return 0.0;
    }
    round2((finite_or_zero(target_kg1) + finite_or_zero(target_kg2)) / denominator)
}

/// 配方批次数：(计划1 + 计划2) / 配方批量
pub fn recipe_batch_units(target_kg1: f64, target_kg2: f64, batch_recipe_kg: f64) -> f64 {
    let batch = finite_or_zero(batch_recipe_kg);
    if batch == 0.0 {
        return 0.0;
    }
    round2((finite_or_zero(target_kg1) + finite_or_zero(target_kg2)) / batch)
}

/// KGTD：两班实际产量合计（kg）
pub fn total_actual_kg(actual_kg: f64, actual_kg2: f64) -> f64 {
    round2(finite_or_zero(actual_kg) + finite_or_zero(actual_kg2))
}

/// CXSTD：两班实际箱数合计
pub fn total_actual_boxes(boxes1: f64, boxes2: f64) -> f64 {
    round2(finite_or_zero(boxes1) + finite_or_zero(boxes2))
}

/// 实际与计划差（kg），入参为已取整的 KGTD
pub fn plan_vs_actual_delta_kg(total_actual_kg: f64, target_kg1: f64, target_kg2: f64) -> f64 {
    round2(
        finite_or_zero(total_actual_kg)
            - (finite_or_zero(target_kg1) + finite_or_zero(target_kg2)),
    )
}

/// CTPTD：总效率（%），入参为已取整的 KGTD
pub fn total_efficiency(total_actual_kg: f64, target_kg1: f64, target_kg2: f64) -> f64 {
    percent(
        total_actual_kg,
        finite_or_zero(target_kg1) + finite_or_zero(target_kg2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2_half_up() {
        assert_eq!(round2(2.346), 2.35);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.12);
        assert_eq!(round2(-0.001), 0.0);
        assert_eq!(round2(f64::NAN), 0.0);
        assert_eq!(round2(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_efficiency_shift1_examples() {
        assert_eq!(efficiency_shift1(50.0, 200.0), 25.0);
        assert_eq!(efficiency_shift1(0.0, 200.0), 0.0);
        assert_eq!(efficiency_shift1(120.0, 0.0), 0.0);
        assert_eq!(efficiency_shift1(1.0, 3.0), 33.33);
        assert_eq!(efficiency_shift1(2.0, 3.0), 66.67);
    }

    #[test]
    fn test_efficiency_zero_guard_grid() {
        for v in [0.0, 0.5, 1.0, 99.9, 1234.56] {
            assert_eq!(efficiency_shift1(0.0, v), 0.0);
            assert_eq!(efficiency_shift1(v, 0.0), 0.0);
            assert_eq!(efficiency_shift2(v, 0.0), 0.0);
        }
    }

    #[test]
    fn test_daily_plan_boxes() {
        assert_eq!(daily_plan_boxes(100.0, 100.0, 0.5, 10.0), 40.0);
        assert_eq!(daily_plan_boxes(100.0, 100.0, 0.0, 10.0), 0.0);
        assert_eq!(daily_plan_boxes(100.0, 100.0, 0.5, 0.0), 0.0);
        assert_eq!(daily_plan_boxes(100.0, 0.0, 0.3, 12.0), 27.78);
    }

    #[test]
    fn test_recipe_batch_units() {
        assert_eq!(recipe_batch_units(100.0, 50.0, 25.0), 6.0);
        assert_eq!(recipe_batch_units(100.0, 50.0, 0.0), 0.0);
        assert_eq!(recipe_batch_units(10.0, 0.0, 3.0), 3.33);
    }

    #[test]
    fn test_total_actual_kg_commutative() {
        let samples = [(0.1, 0.2), (90.0, 95.0), (1.005, 2.004), (0.0, 7.777)];
        for (a, b) in samples {
            assert_eq!(total_actual_kg(a, b), total_actual_kg(b, a));
            assert_eq!(total_actual_kg(a, b), round2(a + b));
        }
        assert_eq!(total_actual_kg(0.1, 0.2), 0.3);
    }

    #[test]
    fn test_delta_may_be_negative() {
        assert_eq!(plan_vs_actual_delta_kg(185.0, 100.0, 100.0), -15.0);
        assert_eq!(plan_vs_actual_delta_kg(210.5, 100.0, 100.0), 10.5);
    }

    #[test]
    fn test_total_efficiency() {
        assert_eq!(total_efficiency(185.0, 100.0, 100.0), 92.5);
        assert_eq!(total_efficiency(185.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_non_finite_inputs_are_zero() {
        assert_eq!(total_actual_boxes(f64::NAN, 3.0), 3.0);
        assert_eq!(efficiency_shift2(f64::INFINITY, 10.0), 0.0);
        assert_eq!(daily_plan_boxes(f64::NAN, 100.0, 0.5, 10.0), 20.0);
    }
}
