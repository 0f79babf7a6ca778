// ==========================================
// 班次产量对账系统 - 班次偏差检测
// ==========================================
// 职责: 计算 1 班与 2 班实际产量的相对差异并分级
// 说明: 结果只用于报告，不写入记录
// ==========================================

use crate::domain::import::DivergenceFinding;
use crate::domain::types::DivergenceLevel;
use crate::engine::metrics::finite_or_zero;
use serde::{Deserialize, Serialize};

/// 相对差异（%）：|kg1 - kg2| / ((kg1 + kg2) / 2) × 100
///
/// 平均值为 0 时返回 0；结果不取整
pub fn divergence_pct(shift1_kg: f64, shift2_kg: f64) -> f64 {
    let a = finite_or_zero(shift1_kg);
    let b = finite_or_zero(shift2_kg);
    let average = (a + b) / 2.0;
    if average == 0.0 {
        return 0.0;
    }
    finite_or_zero((a - b).abs() / average * 100.0)
}

// ==========================================
// DivergenceThresholds - 偏差分级阈值
// ==========================================
// 配置键: divergence_caution_pct / divergence_attention_pct
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DivergenceThresholds {
    pub caution_pct: f64,   // 低于此值为正常
    pub attention_pct: f64, // 低于此值为注意，否则关注
}

impl Default for DivergenceThresholds {
    fn default() -> Self {
        Self {
            caution_pct: 10.0,
            attention_pct: 25.0,
        }
    }
}

impl DivergenceThresholds {
    pub fn classify(&self, divergence_pct: f64) -> DivergenceLevel {
        if divergence_pct < self.caution_pct {
            DivergenceLevel::Normal
        } else if divergence_pct < self.attention_pct {
            DivergenceLevel::Caution
        } else {
            DivergenceLevel::Attention
        }
    }

    /// 计算并分级，返回完整发现
    pub fn evaluate(&self, code: &str, shift1_kg: f64, shift2_kg: f64) -> DivergenceFinding {
        let pct = divergence_pct(shift1_kg, shift2_kg);
        DivergenceFinding {
            code: code.to_string(),
            shift1_actual_kg: finite_or_zero(shift1_kg),
            shift2_actual_kg: finite_or_zero(shift2_kg),
            divergence_pct: pct,
            level: self.classify(pct),
        }
    }
}
