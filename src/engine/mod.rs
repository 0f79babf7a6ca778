// ==========================================
// 班次产量对账系统 - 引擎层
// ==========================================
// 职责: 派生指标计算、班次合并、偏差检测、重算、报表汇总
// 红线: Engine 不拼 SQL，只通过 ProductionStore trait 访问存储
// ==========================================

pub mod derivation;
pub mod divergence;
pub mod merge;
pub mod metrics;
pub mod recompute;
pub mod report;

// 重导出核心引擎
pub use derivation::RecordDerivation;
pub use divergence::{divergence_pct, DivergenceThresholds};
pub use merge::{enrich_from_catalog, MergeOutcome, ShiftMergePolicy, UpsertInstruction};
pub use recompute::{RecomputeFailure, RecomputePass, RecomputeSummary};
pub use report::{
    ClassificationShare, ConsolidatedTotals, DashboardSummary, ResultsMetrics, ShiftSummary,
    TargetAttainment,
};
