// ==========================================
// 班次产量对账系统 - 导入层
// ==========================================
// 职责: 外部班次数据导入，合并为生产记录
// 支持: JSON 数组 / JSON Lines（表格解析由外部完成）
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod dq_validator;
pub mod error;
pub mod field_mapper;
pub mod row_source;
pub mod shift_importer_impl;
pub mod shift_importer_trait;

// 重导出核心类型
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use dq_validator::DqValidator as DqValidatorImpl;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper as FieldMapperImpl;
pub use row_source::JsonRowSource;
pub use shift_importer_impl::ShiftImporterImpl;

// 重导出 Trait 接口
pub use shift_importer_trait::{
    DataCleaner, DqValidator, FieldMapper, MappedRow, RowSource, ShiftImporter, SourceRow,
};
