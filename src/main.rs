// ==========================================
// 班次产量对账系统 - 命令行入口
// ==========================================
// 用法:
//   shift-reconcile import <1|2> <rows.json>
//   shift-reconcile recompute
//   shift-reconcile report
//   shift-reconcile targets [daily monthly factor tolerance]
// 数据库: SHIFT_RECONCILE_DB_PATH 或用户数据目录
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use shift_reconcile::app::{get_default_db_path, AppState};
use shift_reconcile::domain::TargetsConfig;
use shift_reconcile::{logging, APP_NAME, VERSION};

const USAGE: &str = "用法:
  shift-reconcile import <1|2> <rows.json>
  shift-reconcile recompute
  shift-reconcile report
  shift-reconcile targets [daily monthly factor tolerance]";

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match args.first() {
        Some(c) => c.as_str(),
        None => {
            println!("{} v{}", APP_NAME, VERSION);
            println!("{}", USAGE);
            return Ok(());
        }
    };

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;
    let api = &state.production_api;

    match command {
        "import" => {
            let (shift, path) = match (args.get(1), args.get(2)) {
                (Some(s), Some(p)) => (s, p),
                _ => bail!("缺少参数\n{}", USAGE),
            };
            let shift: u8 = shift
                .parse()
                .with_context(|| format!("无效的班次: {}", shift))?;
            let summary = api.import_shift_file(shift, path).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "recompute" => {
            let summary = api.recompute_all().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "report" => {
            let report = serde_json::json!({
                "dashboard": api.get_dashboard_summary().await?,
                "consolidated": api.get_consolidated_totals().await?,
                "shift1": api.get_shift_summary(1).await?,
                "shift2": api.get_shift_summary(2).await?,
                "classifications": api.get_classification_breakdown().await?,
                "results": api.get_results_metrics(None).await?,
                "divergences": api.get_divergence_report().await?,
                "targets": api.get_target_attainment().await?,
                "config": api.get_config_snapshot()?,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "targets" => {
            if args.len() > 1 {
                let values = args[1..]
                    .iter()
                    .map(|v| v.parse::<f64>().with_context(|| format!("无效的数值: {}", v)))
                    .collect::<Result<Vec<_>>>()?;
                let [daily, monthly, factor, tolerance] = values.as_slice() else {
                    bail!("targets 需要 4 个数值\n{}", USAGE);
                };
                api.update_targets(&TargetsConfig {
                    daily_target_kg: *daily,
                    monthly_target_kg: *monthly,
                    conversion_factor: *factor,
                    efficiency_tolerance_pct: *tolerance,
                })?;
            }
            println!("{}", serde_json::to_string_pretty(&api.get_targets().await?)?);
        }
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}
