// ==========================================
// 班次产量对账系统 - 配置层
// ==========================================
// 职责: 系统配置管理（产量目标 / 偏差阈值 / 合并模式）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod shift_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use shift_config_trait::{MergeSettings, ShiftConfigReader};
