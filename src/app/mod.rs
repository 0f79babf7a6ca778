// ==========================================
// 班次产量对账系统 - 应用层
// ==========================================
// 职责: 组装仓储、配置、导入器与 API，供命令行使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
