// ==========================================
// 班次产量对账系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod import;
pub mod product;
pub mod production;
pub mod targets;
pub mod types;

// 重导出核心类型
pub use import::{
    CellValue, DivergenceFinding, DqLevel, ImportBatch, ImportSummary, ImportedRow,
    MergeNotice, RawRow, RowDiagnostic, RowOutcome, UpsertAction,
};
pub use product::ProductMaster;
pub use production::{
    DerivedMetrics, DerivedProduction, ProductionInput, ProductionRecord, ShiftQuantities,
};
pub use targets::TargetsConfig;
pub use types::{DivergenceLevel, EfficiencyBand, MergeConsistency, Shift};
