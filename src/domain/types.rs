// ==========================================
// 班次产量对账系统 - 领域类型定义
// ==========================================
// 职责: 班次 / 偏差等级 / 效率区间 / 合并一致性模式
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 班次 (Shift)
// ==========================================
// 红线: 1 班字段只由 1 班导入写入，2 班字段只由 2 班导入写入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Shift {
    First,  // 1 班
    Second, // 2 班
}

impl Shift {
    /// 班次编号（1 / 2）
    pub fn number(&self) -> u8 {
        match self {
            Shift::First => 1,
            Shift::Second => 2,
        }
    }

    /// 从班次编号解析，仅接受 1 / 2
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Shift::First),
            2 => Some(Shift::Second),
            _ => None,
        }
    }

    /// 另一个班次
    pub fn other(&self) -> Shift {
        match self {
            Shift::First => Shift::Second,
            Shift::Second => Shift::First,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Shift::First => "SHIFT_1",
            Shift::Second => "SHIFT_2",
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 班次偏差等级 (Divergence Level)
// ==========================================
// 口径: 1 班与 2 班实际产量的相对差异（百分比）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DivergenceLevel {
    Normal,    // 正常
    Caution,   // 注意
    Attention, // 关注
}

impl fmt::Display for DivergenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DivergenceLevel::Normal => write!(f, "NORMAL"),
            DivergenceLevel::Caution => write!(f, "CAUTION"),
            DivergenceLevel::Attention => write!(f, "ATTENTION"),
        }
    }
}

// ==========================================
// 效率区间 (Efficiency Band)
// ==========================================
// >=100 达标，>=80 接近，其余低于目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EfficiencyBand {
    Met,
    Near,
    Below,
}

impl EfficiencyBand {
    pub fn classify(efficiency_pct: f64) -> Self {
        if efficiency_pct >= 100.0 {
            EfficiencyBand::Met
        } else if efficiency_pct >= 80.0 {
            EfficiencyBand::Near
        } else {
            EfficiencyBand::Below
        }
    }
}

// ==========================================
// 合并一致性模式 (Merge Consistency)
// ==========================================
// LAST_WRITE_WINS: 读后直接覆盖（默认，兼容历史行为）
// CONDITIONAL: 按 revision 条件更新，冲突时重读重试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeConsistency {
    #[default]
    LastWriteWins,
    Conditional,
}

impl MergeConsistency {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeConsistency::LastWriteWins => "LAST_WRITE_WINS",
            MergeConsistency::Conditional => "CONDITIONAL",
        }
    }

    /// 解析配置值，未知值回退为 LAST_WRITE_WINS
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "CONDITIONAL" => MergeConsistency::Conditional,
            _ => MergeConsistency::LastWriteWins,
        }
    }
}
