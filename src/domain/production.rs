// ==========================================
// 班次产量对账系统 - 生产记录领域模型
// ==========================================
// 职责: 生产记录输入字段 / 派生指标 / 落库记录
// 红线: 派生指标只由同一记录的输入字段决定，不允许部分过期
// ==========================================

use crate::domain::types::Shift;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// ProductionInput - 生产记录输入字段（非派生）
// ==========================================
// 用途: 导入映射产出 / 合并输入 / 派生输入
// 约定: 缺失数值字段一律为 0
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionInput {
    // ===== 业务主键 =====
    pub code: String, // 产品编码（两个班次共用）

    // ===== 描述字段（原样携带，不参与计算）=====
    pub description: String,
    pub machine: String,
    pub packaging: String,
    pub classification: String,

    // ===== 产品主数据参数 =====
    pub units_per_box: f64,          // 每箱单位数
    pub net_weight_per_unit_kg: f64, // 单位净重（kg）
    pub batch_recipe_kg: f64,        // 配方批量（kg）

    // ===== 1 班 =====
    pub shift1_target: f64,       // 1 班计划（kg）
    pub shift1_actual_kg: f64,    // 1 班实际（kg）
    pub shift1_actual_boxes: f64, // 1 班实际（箱）

    // ===== 2 班 =====
    pub shift2_target: f64,
    pub shift2_actual_kg: f64,
    pub shift2_actual_boxes: f64,

    // ===== 透传字段 =====
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ProductionInput {
    /// 读取指定班次的 (计划 kg, 实际 kg, 实际箱数)
    pub fn shift_quantities(&self, shift: Shift) -> ShiftQuantities {
        match shift {
            Shift::First => ShiftQuantities {
                target_kg: self.shift1_target,
                actual_kg: self.shift1_actual_kg,
                actual_boxes: self.shift1_actual_boxes,
            },
            Shift::Second => ShiftQuantities {
                target_kg: self.shift2_target,
                actual_kg: self.shift2_actual_kg,
                actual_boxes: self.shift2_actual_boxes,
            },
        }
    }

    /// 覆写指定班次的三项字段
    pub fn set_shift_quantities(&mut self, shift: Shift, q: ShiftQuantities) {
        match shift {
            Shift::First => {
                self.shift1_target = q.target_kg;
                self.shift1_actual_kg = q.actual_kg;
                self.shift1_actual_boxes = q.actual_boxes;
            }
            Shift::Second => {
                self.shift2_target = q.target_kg;
                self.shift2_actual_kg = q.actual_kg;
                self.shift2_actual_boxes = q.actual_boxes;
            }
        }
    }
}

// ==========================================
// ShiftQuantities - 单班次三项字段
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShiftQuantities {
    pub target_kg: f64,
    pub actual_kg: f64,
    pub actual_boxes: f64,
}

// ==========================================
// DerivedMetrics - 派生指标
// ==========================================
// 口径: 所有指标保留 2 位小数
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivedMetrics {
    pub daily_plan_boxes: f64,        // 日计划箱数
    pub boxes_for_target: f64,        // 对应箱数（= daily_plan_boxes，兼容旧调用方）
    pub recipe_batch_units: f64,      // 配方批次数
    pub efficiency_shift1: f64,       // CTP1（%）
    pub efficiency_shift2: f64,       // CTP2（%）
    pub total_actual_kg: f64,         // KGTD
    pub total_actual_boxes: f64,      // CXSTD
    pub plan_vs_actual_delta_kg: f64, // 实际 - 计划（kg，可为负）
    pub total_efficiency: f64,        // CTPTD（%）
}

impl DerivedMetrics {
    /// 逐字段比较八项派生指标，返回不一致的字段名
    ///
    /// boxes_for_target 是 daily_plan_boxes 的别名，不单独比较
    pub fn diff_fields(&self, other: &DerivedMetrics) -> Vec<&'static str> {
        let pairs = [
            ("daily_plan_boxes", self.daily_plan_boxes, other.daily_plan_boxes),
            ("recipe_batch_units", self.recipe_batch_units, other.recipe_batch_units),
            ("efficiency_shift1", self.efficiency_shift1, other.efficiency_shift1),
            ("efficiency_shift2", self.efficiency_shift2, other.efficiency_shift2),
            ("total_actual_kg", self.total_actual_kg, other.total_actual_kg),
            ("total_actual_boxes", self.total_actual_boxes, other.total_actual_boxes),
            (
                "plan_vs_actual_delta_kg",
                self.plan_vs_actual_delta_kg,
                other.plan_vs_actual_delta_kg,
            ),
            ("total_efficiency", self.total_efficiency, other.total_efficiency),
        ];

        pairs
            .iter()
            .filter(|(_, a, b)| a != b)
            .map(|(name, _, _)| *name)
            .collect()
    }
}

// ==========================================
// DerivedProduction - 派生完成的生产记录（未落库）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedProduction {
    #[serde(flatten)]
    pub input: ProductionInput,
    #[serde(flatten)]
    pub metrics: DerivedMetrics,
}

// ==========================================
// ProductionRecord - 落库生产记录
// ==========================================
// 红线: 同一产品编码至多一条在用记录
// 用途: 存储层返回，报表层只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub id: String, // 存储主键（UUID）

    #[serde(flatten)]
    pub input: ProductionInput,
    #[serde(flatten)]
    pub metrics: DerivedMetrics,

    // ===== 并发控制 =====
    pub revision: i64, // 每次更新 +1

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductionRecord {
    pub fn code(&self) -> &str {
        &self.input.code
    }
}
