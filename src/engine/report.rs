// ==========================================
// 班次产量对账系统 - 报表汇总
// ==========================================
// 职责: 基于已存记录的只读汇总（看板 / 合并处理 / 班次 / 分类 / 结果 / 目标达成）
// 红线: 纯函数，不写入记录；求和不取整，百分比与均值保留 2 位小数
// ==========================================

use crate::domain::import::DivergenceFinding;
use crate::domain::production::ProductionRecord;
use crate::domain::targets::TargetsConfig;
use crate::domain::types::{EfficiencyBand, Shift};
use crate::engine::divergence::DivergenceThresholds;
use crate::engine::metrics::round2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 分类为空时的归类名
pub const UNCLASSIFIED: &str = "N/A";

fn ratio_pct(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        round2(numerator / denominator * 100.0)
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        round2(sum / count as f64)
    }
}

fn planned_kg(record: &ProductionRecord) -> f64 {
    record.input.shift1_target + record.input.shift2_target
}

// ==========================================
// 看板汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_actual_kg: f64,
    pub planned_kg: f64,
    pub overall_efficiency: f64, // 总实际 / 总计划 × 100
    pub product_count: usize,
}

pub fn dashboard_summary(records: &[ProductionRecord]) -> DashboardSummary {
    let total_actual_kg: f64 = records.iter().map(|r| r.metrics.total_actual_kg).sum();
    let planned: f64 = records.iter().map(planned_kg).sum();

    DashboardSummary {
        total_actual_kg,
        planned_kg: planned,
        overall_efficiency: ratio_pct(total_actual_kg, planned),
        product_count: records.len(),
    }
}

// ==========================================
// 合并处理汇总（仅含有计划的记录）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedTotals {
    pub item_count: usize,
    pub total_actual_kg: f64,
    pub total_actual_boxes: f64,
    pub planned_kg: f64,
    pub delta_kg: f64,
    pub mean_total_efficiency: f64,
    pub delta_pct_of_plan: f64,
}

pub fn consolidated_totals(records: &[ProductionRecord]) -> ConsolidatedTotals {
    let mut totals = ConsolidatedTotals::default();
    let mut efficiency_sum = 0.0;

    for record in records
        .iter()
        .filter(|r| r.input.shift1_target > 0.0 || r.input.shift2_target > 0.0)
    {
        totals.item_count += 1;
        totals.total_actual_kg += record.metrics.total_actual_kg;
        totals.total_actual_boxes += record.metrics.total_actual_boxes;
        totals.planned_kg += planned_kg(record);
        totals.delta_kg += record.metrics.plan_vs_actual_delta_kg;
        efficiency_sum += record.metrics.total_efficiency;
    }

    totals.mean_total_efficiency = mean(efficiency_sum, totals.item_count);
    totals.delta_pct_of_plan = ratio_pct(totals.delta_kg, totals.planned_kg);
    totals
}

// ==========================================
// 班次汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftSummary {
    pub shift: Shift,
    pub product_count: usize,
    pub total_actual_kg: f64,
    pub mean_efficiency: f64,
    pub met_target_count: usize, // 实际 >= 计划
}

/// 汇总指定班次（只统计该班次计划 > 0 的记录）
pub fn shift_summary(records: &[ProductionRecord], shift: Shift) -> ShiftSummary {
    let mut summary = ShiftSummary {
        shift,
        product_count: 0,
        total_actual_kg: 0.0,
        mean_efficiency: 0.0,
        met_target_count: 0,
    };
    let mut efficiency_sum = 0.0;

    for record in records {
        let q = record.input.shift_quantities(shift);
        if q.target_kg <= 0.0 {
            continue;
        }
        summary.product_count += 1;
        summary.total_actual_kg += q.actual_kg;
        efficiency_sum += match shift {
            Shift::First => record.metrics.efficiency_shift1,
            Shift::Second => record.metrics.efficiency_shift2,
        };
        if q.actual_kg >= q.target_kg {
            summary.met_target_count += 1;
        }
    }

    summary.mean_efficiency = mean(efficiency_sum, summary.product_count);
    summary
}

// ==========================================
// 分类分布
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationShare {
    pub classification: String,
    pub total_actual_kg: f64,
    pub item_count: usize,
    pub share_pct: f64, // 占全部实际产量比例
}

/// 按分类汇总实际产量（分类名排序）
pub fn classification_breakdown(records: &[ProductionRecord]) -> Vec<ClassificationShare> {
    let mut groups: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    let mut overall = 0.0;

    for record in records {
        let name = record.input.classification.trim();
        let key = if name.is_empty() { UNCLASSIFIED } else { name };
        let entry = groups.entry(key.to_string()).or_insert((0.0, 0));
        entry.0 += record.metrics.total_actual_kg;
        entry.1 += 1;
        overall += record.metrics.total_actual_kg;
    }

    groups
        .into_iter()
        .map(|(classification, (kg, count))| ClassificationShare {
            classification,
            total_actual_kg: kg,
            item_count: count,
            share_pct: ratio_pct(kg, overall),
        })
        .collect()
}

// ==========================================
// 结果指标（可按分类过滤）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsMetrics {
    pub total_actual_kg: f64,
    pub total_actual_boxes: f64,
    pub mean_total_efficiency: f64,
    pub met_target_count: usize, // 总效率 >= 100
    pub item_count: usize,
}

pub fn results_metrics(records: &[ProductionRecord], category: Option<&str>) -> ResultsMetrics {
    let mut metrics = ResultsMetrics::default();
    let mut efficiency_sum = 0.0;

    for record in records.iter().filter(|r| match category {
        Some(c) => r.input.classification == c,
        None => true,
    }) {
        metrics.item_count += 1;
        metrics.total_actual_kg += record.metrics.total_actual_kg;
        metrics.total_actual_boxes += record.metrics.total_actual_boxes;
        efficiency_sum += record.metrics.total_efficiency;
        if record.metrics.total_efficiency >= 100.0 {
            metrics.met_target_count += 1;
        }
    }

    metrics.mean_total_efficiency = mean(efficiency_sum, metrics.item_count);
    metrics
}

/// 记录的效率区间（按总效率）
pub fn efficiency_band(record: &ProductionRecord) -> EfficiencyBand {
    EfficiencyBand::classify(record.metrics.total_efficiency)
}

/// 两个班次都有计划的记录的偏差发现（含正常区间）
pub fn divergence_report(
    records: &[ProductionRecord],
    thresholds: &DivergenceThresholds,
) -> Vec<DivergenceFinding> {
    records
        .iter()
        .filter(|r| r.input.shift1_target > 0.0 && r.input.shift2_target > 0.0)
        .map(|r| {
            thresholds.evaluate(r.code(), r.input.shift1_actual_kg, r.input.shift2_actual_kg)
        })
        .collect()
}

// ==========================================
// 目标达成
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetAttainment {
    pub adjusted_output_kg: f64, // 实际产量 × 换算系数
    pub daily_target_kg: f64,
    pub monthly_target_kg: f64,
    pub attainment_pct: f64, // 占日目标比例
    pub within_tolerance: bool,
}

pub fn target_attainment(records: &[ProductionRecord], targets: &TargetsConfig) -> TargetAttainment {
    let total: f64 = records.iter().map(|r| r.metrics.total_actual_kg).sum();
    let adjusted = round2(total * targets.conversion_factor);
    let attainment_pct = ratio_pct(adjusted, targets.daily_target_kg);

    TargetAttainment {
        adjusted_output_kg: adjusted,
        daily_target_kg: targets.daily_target_kg,
        monthly_target_kg: targets.monthly_target_kg,
        attainment_pct,
        within_tolerance: attainment_pct >= 100.0 - targets.efficiency_tolerance_pct,
    }
}
