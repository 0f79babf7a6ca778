// ==========================================
// 班次产量对账系统 - 生产记录 Store Trait
// ==========================================
// 职责: 定义生产记录数据访问接口（不包含业务逻辑）
// 红线: Store 不做派生计算，写入什么就存什么
// ==========================================

use crate::domain::production::{DerivedProduction, ProductionRecord};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// 全量快照流
pub type RecordSnapshotStream = BoxStream<'static, RepositoryResult<Vec<ProductionRecord>>>;

// ==========================================
// ProductionStore Trait
// ==========================================
// 用途: 导入合并 / 重算 / 报表
// 实现者: SqliteProductionStore（使用 rusqlite）
#[async_trait]
pub trait ProductionStore: Send + Sync {
    // ===== 点查 =====

    /// 按产品编码查询在用记录
    async fn find_by_code(&self, code: &str) -> RepositoryResult<Option<ProductionRecord>>;

    /// 按存储主键查询
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<ProductionRecord>>;

    // ===== 写入 =====

    /// 创建记录（revision = 1）
    ///
    /// # 返回
    /// - Ok(id): 新记录主键
    /// - Err(UniqueConstraintViolation): 该编码已存在记录
    async fn create(&self, record: &DerivedProduction) -> RepositoryResult<String>;

    /// 覆盖更新（不校验 revision，revision + 1）
    ///
    /// # 错误
    /// - NotFound: id 不存在
    async fn update(&self, id: &str, record: &DerivedProduction) -> RepositoryResult<()>;

    /// 条件更新（revision 匹配时才写入）
    ///
    /// # 错误
    /// - OptimisticLockFailure: revision 不匹配
    /// - NotFound: id 不存在
    async fn update_if_revision(
        &self,
        id: &str,
        record: &DerivedProduction,
        expected_revision: i64,
    ) -> RepositoryResult<()>;

    // ===== 列表 / 订阅 =====

    /// 全部记录（created_at 倒序）
    async fn list_all(&self) -> RepositoryResult<Vec<ProductionRecord>>;

    /// 订阅全量快照：先推送当前快照，之后每次变更推送一次
    fn watch_all(&self) -> RecordSnapshotStream;
}
