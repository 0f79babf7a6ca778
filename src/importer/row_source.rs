// ==========================================
// 班次产量对账系统 - 行来源实现
// ==========================================
// 支持: JSON 数组 (.json) / JSON Lines (.jsonl / .ndjson)
// 说明: 表格文件由外部解析为"列名 → 单元格值"的对象后交给本模块
// ==========================================

use crate::domain::import::RawRow;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::shift_importer_trait::{RowSource, SourceRow};
use std::fs;
use std::path::Path;

// ==========================================
// JsonRowSource
// ==========================================
pub struct JsonRowSource;

impl RowSource for JsonRowSource {
    fn read_rows(&self, path: &Path) -> ImportResult<Vec<SourceRow>> {
        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !matches!(ext.as_str(), "json" | "jsonl" | "ndjson") {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let content = fs::read_to_string(path)?;
        JsonRowSource::parse_str(&content)
    }
}

impl JsonRowSource {
    /// 解析文本：以 `[` 开头按 JSON 数组处理，否则按 JSON Lines 处理
    ///
    /// 行号从 1 开始（JSON Lines 不计空行）；单行格式错误只影响该行
    pub fn parse_str(content: &str) -> ImportResult<Vec<SourceRow>> {
        let trimmed = content.trim_start_matches('\u{feff}').trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        if trimmed.starts_with('[') {
            // 数组本身无法解析时整个文件无效
            let values: Vec<serde_json::Value> =
                serde_json::from_str(trimmed).map_err(|e| ImportError::RowFormatError {
                    row: 0,
                    message: e.to_string(),
                })?;
            Ok(values
                .into_iter()
                .enumerate()
                .map(|(idx, value)| to_row(idx + 1, value))
                .collect())
        } else {
            Ok(trimmed
                .lines()
                .filter(|line| !line.trim().is_empty())
                .enumerate()
                .map(|(idx, line)| {
                    let value: serde_json::Value =
                        serde_json::from_str(line).map_err(|e| ImportError::RowFormatError {
                            row: idx + 1,
                            message: e.to_string(),
                        })?;
                    to_row(idx + 1, value)
                })
                .collect())
        }
    }
}

fn to_row(row: usize, value: serde_json::Value) -> SourceRow {
    if !value.is_object() {
        return Err(ImportError::RowFormatError {
            row,
            message: "行必须是 JSON 对象".to_string(),
        });
    }
    serde_json::from_value::<RawRow>(value).map_err(|e| ImportError::RowFormatError {
        row,
        message: format!("单元格必须是字符串、数字、布尔或 null: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::CellValue;
    use std::io::Write;

    fn parse_ok(content: &str) -> Vec<RawRow> {
        JsonRowSource::parse_str(content)
            .unwrap()
            .into_iter()
            .map(|row| row.unwrap())
            .collect()
    }

    #[test]
    fn test_parse_json_array() {
        let rows = parse_ok(r#"[{"CÓDIGO":"P1","KG":90},{"CÓDIGO":"P2"}]"#);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["KG"], CellValue::Number(90.0));
    }

    #[test]
    fn test_parse_json_lines_skips_blank() {
        let rows = parse_ok("{\"CÓDIGO\":\"P1\"}\n\n{\"CÓDIGO\":\"P2\",\"KG\":null}\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["KG"], CellValue::Empty);
    }

    #[test]
    fn test_non_object_row_is_row_error() {
        let rows = JsonRowSource::parse_str(r#"[{"CÓDIGO":"P1"}, 5]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_ok());
        assert!(matches!(rows[1], Err(ImportError::RowFormatError { row: 2, .. })));
    }

    #[test]
    fn test_nested_cell_only_fails_its_row() {
        let rows = JsonRowSource::parse_str(
            r#"[{"CÓDIGO":"P1"},{"CÓDIGO":"P2"},{"CÓDIGO":"P3","OBS":[1,2]},{"CÓDIGO":"P4"},{"CÓDIGO":"P5"}]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows.iter().filter(|r| r.is_ok()).count(), 4);
        assert!(matches!(rows[2], Err(ImportError::RowFormatError { row: 3, .. })));
    }

    #[test]
    fn test_bad_json_line_only_fails_its_row() {
        let rows = JsonRowSource::parse_str("{\"CÓDIGO\":\"P1\"}\n{not json\n{\"CÓDIGO\":\"P3\"}\n").unwrap();
        assert_eq!(rows.len(), 3);
        assert!(matches!(rows[1], Err(ImportError::RowFormatError { row: 2, .. })));
        assert!(rows[2].is_ok());
    }

    #[test]
    fn test_malformed_array_rejects_file() {
        let err = JsonRowSource::parse_str(r#"[{"CÓDIGO":"P1"},"#).unwrap_err();
        assert!(matches!(err, ImportError::RowFormatError { row: 0, .. }));
    }

    #[test]
    fn test_read_rows_checks_file() {
        let err = JsonRowSource
            .read_rows(Path::new("/nonexistent/turno.json"))
            .unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));

        let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        file.write_all(b"ignored").unwrap();
        let err = JsonRowSource.read_rows(file.path()).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_read_rows_from_file() {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(file, r#"{{"CÓDIGO":"P1","KG":"90"}}"#).unwrap();
        let rows = JsonRowSource.read_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row["KG"], CellValue::Text("90".to_string()));
    }
}
