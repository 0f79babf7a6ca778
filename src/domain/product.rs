// ==========================================
// 班次产量对账系统 - 产品主数据
// ==========================================
// 用途: 导入合并时补全缺失的主数据参数（只读）
// 对齐: product_master 表
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMaster {
    // ===== 主键 =====
    pub code: String,

    // ===== 描述 =====
    pub description: String,
    pub machine: String,
    pub packaging: String,
    pub classification: String,

    // ===== 参数 =====
    pub units_per_box: f64,
    pub net_weight_per_unit_kg: f64,
    pub batch_recipe_kg: f64,

    // ===== 状态 =====
    pub active: bool, // 停用产品不参与补全

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
