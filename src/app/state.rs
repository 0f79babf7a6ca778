// ==========================================
// 班次产量对账系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{DefaultShiftImporter, ProductionApi};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection, read_schema_version};
use crate::importer::{DqValidatorImpl, FieldMapperImpl, JsonRowSource};
use crate::repository::{
    ImportBatchRepository, ProductCatalog, ProductMasterRepository, SqliteProductionStore,
};

/// 应用状态
///
/// 所有仓储共享同一个数据库连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 生产记录API
    pub production_api: Arc<ProductionApi>,

    /// 生产记录存储（用于订阅快照）
    pub store: Arc<SqliteProductionStore>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并建表（幂等）
    /// 2. 初始化所有Repository
    /// 3. 组装导入器与API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        match read_schema_version(&conn) {
            Ok(version) => tracing::debug!(?version, "schema_version 已就绪"),
            Err(e) => tracing::warn!("schema_version 读取失败(将继续启动): {}", e),
        }
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let store = Arc::new(SqliteProductionStore::new(conn.clone()));
        let product_repo = Arc::new(ProductMasterRepository::new(conn.clone()));
        let batch_repo = Arc::new(ImportBatchRepository::new(conn.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()));

        // ==========================================
        // 组装导入器
        // ==========================================
        let catalog: Arc<dyn ProductCatalog> = product_repo.clone();
        let importer: Arc<DefaultShiftImporter> = Arc::new(
            DefaultShiftImporter::new(
                store.clone(),
                config_manager.clone(),
                Box::new(JsonRowSource),
                Box::new(FieldMapperImpl::default()),
                Box::new(DqValidatorImpl),
            )
            .with_catalog(catalog)
            .with_batch_repo(batch_repo.clone()),
        );

        let production_api = Arc::new(ProductionApi::new(
            store.clone(),
            importer,
            config_manager.clone(),
            product_repo,
            batch_repo,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            production_api,
            store,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// # 优先级
/// 1. 环境变量 SHIFT_RECONCILE_DB_PATH
/// 2. 用户数据目录下的 shift-reconcile/shift_reconcile.db
/// 3. 当前目录 ./shift_reconcile.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("SHIFT_RECONCILE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./shift_reconcile.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("shift-reconcile");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("shift_reconcile.db");
        }
    }

    path.to_string_lossy().to_string()
}
