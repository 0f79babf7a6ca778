// ==========================================
// 班次产量对账系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 双班次生产数据导入合并，派生产量/效率指标
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 派生计算与合并规则
pub mod engine;

// 导入层 - 外部班次数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DivergenceLevel, EfficiencyBand, MergeConsistency, Shift};

// 领域实体
pub use domain::{
    CellValue, DerivedProduction, ImportSummary, ProductMaster, ProductionInput,
    ProductionRecord, RawRow, TargetsConfig,
};

// 引擎
pub use engine::{RecomputePass, RecordDerivation, ShiftMergePolicy};

// 导入
pub use importer::{ShiftImporter, ShiftImporterImpl};

// API
pub use api::ProductionApi;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "班次产量对账系统";
