// ==========================================
// 班次产量对账系统 - 产量目标配置
// ==========================================
// 用途: 报表层使用，不参与派生计算
// 存储: config_kv 表（global scope）
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetsConfig {
    pub daily_target_kg: f64,          // 日目标（kg）
    pub monthly_target_kg: f64,        // 月目标（kg）
    pub conversion_factor: f64,        // 换算系数
    pub efficiency_tolerance_pct: f64, // 效率容差（%）
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            daily_target_kg: 1000.0,
            monthly_target_kg: 30000.0,
            conversion_factor: 1.0,
            efficiency_tolerance_pct: 5.0,
        }
    }
}

impl TargetsConfig {
    /// 校验目标配置，返回所有不合规项
    ///
    /// # 规则
    /// - daily_target_kg >= 1
    /// - monthly_target_kg >= 1
    /// - conversion_factor >= 0.1
    /// - efficiency_tolerance_pct >= 1
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if !(self.daily_target_kg >= 1.0) {
            problems.push(format!("日目标必须 >= 1: {}", self.daily_target_kg));
        }
        if !(self.monthly_target_kg >= 1.0) {
            problems.push(format!("月目标必须 >= 1: {}", self.monthly_target_kg));
        }
        if !(self.conversion_factor >= 0.1) {
            problems.push(format!("换算系数必须 >= 0.1: {}", self.conversion_factor));
        }
        if !(self.efficiency_tolerance_pct >= 1.0) {
            problems.push(format!(
                "效率容差必须 >= 1%: {}",
                self.efficiency_tolerance_pct
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}
