// ==========================================
// 温室气体中心报表 - 排放因子仓储
// ==========================================
// 职责: 管理 emission_factor 表 (模块, 年份, 键 → 因子 kg CO2e/单位)
// 主键使用归一化键，大小写/重音/空白不同的写法视为同一条
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::types::Module;
use crate::engine::factor_resolver::{normalize_key, FactorSource};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::file_parser::{CsvParser, SheetParser};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

/// 一条排放因子
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionFactorEntity {
    pub module: Module,
    pub year: i32,
    pub factor_key: String, // 原始写法（展示用）
    pub factor: f64,        // kg CO2e / 消耗单位
}

pub struct FactorRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FactorRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        init_schema(&*repo.get_conn()?)?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入因子（Upsert）
    pub fn upsert(&self, entity: &EmissionFactorEntity) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        upsert_in(&conn, entity)
    }

    /// 某 (模块, 年份) 的全部因子
    pub fn list(&self, module: Module, year: i32) -> RepositoryResult<Vec<EmissionFactorEntity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT factor_key, factor
            FROM emission_factor
            WHERE module = ?1 AND year = ?2
            ORDER BY normalized_key
            "#,
        )?;
        let rows = stmt.query_map(params![module.to_db_str(), year], |row| {
            Ok(EmissionFactorEntity {
                module,
                year,
                factor_key: row.get(0)?,
                factor: row.get(1)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// 某模块已有因子的年份（降序）
    pub fn available_years(&self, module: Module) -> RepositoryResult<Vec<i32>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT year FROM emission_factor WHERE module = ?1 ORDER BY year DESC",
        )?;
        let rows = stmt.query_map(params![module.to_db_str()], |row| row.get::<_, i32>(0))?;

        let mut years = Vec::new();
        for row in rows {
            years.push(row?);
        }
        Ok(years)
    }

    /// 删除某 (模块, 年份) 的全部因子，返回删除条数
    pub fn delete_year(&self, module: Module, year: i32) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count = conn.execute(
            "DELETE FROM emission_factor WHERE module = ?1 AND year = ?2",
            params![module.to_db_str(), year],
        )?;
        Ok(count)
    }

    /// 从 CSV 导入某 (模块, 年份) 的因子表（单事务；任一行无效则整体回滚）
    ///
    /// 列: 键, 因子；首个非空行为表头；因子支持 "0,259" 等写法
    #[instrument(skip(self, csv_path), fields(path = %csv_path.as_ref().display()))]
    pub fn import_csv<P: AsRef<Path>>(
        &self,
        module: Module,
        year: i32,
        csv_path: P,
    ) -> RepositoryResult<usize> {
        if year <= 0 {
            return Err(RepositoryError::FieldValueError {
                field: "year".to_string(),
                message: format!("{} no es un año válido", year),
            });
        }

        let sheet = CsvParser.parse_sheet(csv_path.as_ref(), None)?;
        let cleaner = DataCleaner;

        let mut entities = Vec::new();
        for (line, row) in sheet.data_rows() {
            let key = cleaner.normalize_null(row.first().cloned());
            let raw_factor = cleaner.normalize_null(row.get(1).cloned());
            match (key, raw_factor) {
                (None, None) => continue,
                (Some(factor_key), Some(raw)) => {
                    let factor = cleaner.parse_quantity(&raw).ok_or_else(|| {
                        RepositoryError::CsvImportError {
                            line,
                            message: format!("factor '{}' no numérico", raw),
                        }
                    })?;
                    entities.push(EmissionFactorEntity {
                        module,
                        year,
                        factor_key,
                        factor,
                    });
                }
                _ => {
                    return Err(RepositoryError::CsvImportError {
                        line,
                        message: "se requieren clave y factor".to_string(),
                    })
                }
            }
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        for entity in &entities {
            upsert_in(&tx, entity)?;
        }
        tx.commit()?;

        info!(%module, year, imported = entities.len(), "排放因子导入完成");
        Ok(entities.len())
    }
}

fn upsert_in(conn: &Connection, entity: &EmissionFactorEntity) -> RepositoryResult<()> {
    let normalized = normalize_key(&entity.factor_key);
    if normalized.is_empty() {
        return Err(RepositoryError::FieldValueError {
            field: "factor_key".to_string(),
            message: "vacío".to_string(),
        });
    }
    if !entity.factor.is_finite() || entity.factor < 0.0 {
        return Err(RepositoryError::FieldValueError {
            field: "factor".to_string(),
            message: format!("{} no es un factor válido", entity.factor),
        });
    }
    conn.execute(
        r#"
        INSERT INTO emission_factor (module, year, factor_key, normalized_key, factor)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(module, year, normalized_key) DO UPDATE SET
            factor_key = excluded.factor_key,
            factor = excluded.factor,
            updated_at = datetime('now')
        "#,
        params![
            entity.module.to_db_str(),
            entity.year,
            entity.factor_key.trim(),
            normalized,
            entity.factor
        ],
    )?;
    Ok(())
}

impl FactorSource for FactorRepository {
    fn factor_entries(&self, module: Module, year: i32) -> RepositoryResult<Vec<(String, f64)>> {
        Ok(self
            .list(module, year)?
            .into_iter()
            .map(|e| (e.factor_key, e.factor))
            .collect())
    }
}
