// ==========================================
// 班次产量对账系统 - 产品主数据仓储
// ==========================================
// 职责: 产品目录维护（upsert / 查询）与导入补全只读接口
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::product::ProductMaster;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ProductCatalog Trait - 导入补全只读接口
// ==========================================
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// 按编码查询在用产品（停用产品返回 None）
    async fn find_active_by_code(&self, code: &str) -> RepositoryResult<Option<ProductMaster>>;
}

// ==========================================
// ProductMasterRepository
// ==========================================
pub struct ProductMasterRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductMasterRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增或更新产品（created_at 保留首次写入时间）
    pub fn upsert(&self, product: &ProductMaster) -> RepositoryResult<()> {
        if product.code.trim().is_empty() {
            return Err(RepositoryError::ValidationError(
                "产品编码不能为空".to_string(),
            ));
        }

        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO product_master (
                code, description, machine, packaging, classification,
                units_per_box, net_weight_per_unit_kg, batch_recipe_kg,
                active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(code) DO UPDATE SET
                description = excluded.description,
                machine = excluded.machine,
                packaging = excluded.packaging,
                classification = excluded.classification,
                units_per_box = excluded.units_per_box,
                net_weight_per_unit_kg = excluded.net_weight_per_unit_kg,
                batch_recipe_kg = excluded.batch_recipe_kg,
                active = excluded.active,
                updated_at = excluded.updated_at"#,
            params![
                product.code,
                product.description,
                product.machine,
                product.packaging,
                product.classification,
                product.units_per_box,
                product.net_weight_per_unit_kg,
                product.batch_recipe_kg,
                product.active,
                format_ts(&product.created_at),
                format_ts(&product.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 按编码查询（含停用产品）
    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<ProductMaster>> {
        let conn = self.get_conn()?;
        let product = conn
            .query_row(
                r#"SELECT code, description, machine, packaging, classification,
                          units_per_box, net_weight_per_unit_kg, batch_recipe_kg,
                          active, created_at, updated_at
                   FROM product_master WHERE code = ?1"#,
                params![code],
                map_product,
            )
            .optional()?;
        Ok(product)
    }

    /// 全部产品（按编码排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<ProductMaster>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT code, description, machine, packaging, classification,
                      units_per_box, net_weight_per_unit_kg, batch_recipe_kg,
                      active, created_at, updated_at
               FROM product_master ORDER BY code"#,
        )?;
        let products = stmt
            .query_map([], map_product)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }
}

#[async_trait]
impl ProductCatalog for ProductMasterRepository {
    async fn find_active_by_code(&self, code: &str) -> RepositoryResult<Option<ProductMaster>> {
        Ok(self.find_by_code(code)?.filter(|p| p.active))
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn map_product(row: &Row<'_>) -> rusqlite::Result<ProductMaster> {
    let parse = |idx: usize| -> rusqlite::Result<DateTime<Utc>> {
        let raw: String = row.get(idx)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
    };

    Ok(ProductMaster {
        code: row.get(0)?,
        description: row.get(1)?,
        machine: row.get(2)?,
        packaging: row.get(3)?,
        classification: row.get(4)?,
        units_per_box: row.get(5)?,
        net_weight_per_unit_kg: row.get(6)?,
        batch_recipe_kg: row.get(7)?,
        active: row.get(8)?,
        created_at: parse(9)?,
        updated_at: parse(10)?,
    })
}
