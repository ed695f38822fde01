// ==========================================
// 温室气体中心报表 - 供应点登记仓储
// ==========================================
// 职责: 管理 connection_point_registry 表 (供应点 → 中心, 售电公司)
// 说明: 导出开始时整表读取一次；引擎只读
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::billing::ConnectionPointRegistration;
use crate::engine::connection_splitter::RegistrationSource;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::file_parser::{CsvParser, SheetParser};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

// CSV 列: 供应点 | 中心 | 售电公司（可选）
const CSV_COL_CONNECTION_POINT: usize = 0;
const CSV_COL_CENTER: usize = 1;
const CSV_COL_MARKETER: usize = 2;

pub struct ConnectionPointRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ConnectionPointRepository {
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

    /// 登记（Upsert）: 同一 (供应点, 中心) 只保留一条，售电公司以后写为准
    pub fn upsert(&self, registration: &ConnectionPointRegistration) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        upsert_in(&conn, registration)?;
        Ok(())
    }

    /// 全部登记（按供应点、登记顺序）
    pub fn list_all(&self) -> RepositoryResult<Vec<ConnectionPointRegistration>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT connection_point, center_name, marketer
            FROM connection_point_registry
            ORDER BY connection_point, rowid
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ConnectionPointRegistration {
                connection_point: row.get(0)?,
                center_name: row.get(1)?,
                marketer: row.get(2)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// 删除一个供应点的全部登记，返回删除条数
    pub fn delete_point(&self, connection_point: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count = conn.execute(
            "DELETE FROM connection_point_registry WHERE connection_point = ?1",
            params![normalize_point(connection_point)],
        )?;
        Ok(count)
    }

    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM connection_point_registry", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// 从 CSV 批量导入（单事务；任一行无效则整体回滚）
    ///
    /// 列: 供应点, 中心, 售电公司（可选）；首个非空行为表头
    #[instrument(skip(self, csv_path), fields(path = %csv_path.as_ref().display()))]
    pub fn import_csv<P: AsRef<Path>>(&self, csv_path: P) -> RepositoryResult<usize> {
        let sheet = CsvParser.parse_sheet(csv_path.as_ref(), None)?;
        let cleaner = DataCleaner;

        let mut registrations = Vec::new();
        for (line, row) in sheet.data_rows() {
            let cell = |idx: usize| cleaner.normalize_null(row.get(idx).cloned());
            let (point, center) = (cell(CSV_COL_CONNECTION_POINT), cell(CSV_COL_CENTER));
            match (point, center) {
                (None, None) => continue,
                (Some(connection_point), Some(center_name)) => {
                    registrations.push(ConnectionPointRegistration {
                        connection_point,
                        center_name,
                        marketer: cell(CSV_COL_MARKETER),
                    })
                }
                _ => {
                    return Err(RepositoryError::CsvImportError {
                        line,
                        message: "se requieren punto de suministro y centro".to_string(),
                    })
                }
            }
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        for registration in &registrations {
            upsert_in(&tx, registration)?;
        }
        tx.commit()?;

        info!(imported = registrations.len(), "供应点登记导入完成");
        Ok(registrations.len())
    }
}

fn normalize_point(connection_point: &str) -> String {
    connection_point.trim().to_uppercase()
}

fn upsert_in(conn: &Connection, registration: &ConnectionPointRegistration) -> RepositoryResult<()> {
    let point = normalize_point(&registration.connection_point);
    let center = registration.center_name.trim();
    if point.is_empty() {
        return Err(RepositoryError::FieldValueError {
            field: "connection_point".to_string(),
            message: "vacío".to_string(),
        });
    }
    if center.is_empty() {
        return Err(RepositoryError::FieldValueError {
            field: "center_name".to_string(),
            message: "vacío".to_string(),
        });
    }
    conn.execute(
        r#"
        INSERT INTO connection_point_registry (connection_point, center_name, marketer)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(connection_point, center_name) DO UPDATE SET
            marketer = excluded.marketer
        "#,
        params![
            point,
            center,
            registration
                .marketer
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
        ],
    )?;
    Ok(())
}

impl RegistrationSource for ConnectionPointRepository {
    fn registrations(&self) -> RepositoryResult<Vec<ConnectionPointRegistration>> {
        self.list_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn repo() -> (NamedTempFile, ConnectionPointRepository) {
        let file = NamedTempFile::new().unwrap();
        let repo = ConnectionPointRepository::new(file.path().to_str().unwrap()).unwrap();
        (file, repo)
    }

    fn reg(point: &str, center: &str, marketer: Option<&str>) -> ConnectionPointRegistration {
        ConnectionPointRegistration {
            connection_point: point.to_string(),
            center_name: center.to_string(),
            marketer: marketer.map(str::to_string),
        }
    }

    #[test]
    fn test_upsert_is_idempotent_per_point_and_center() {
        let (_file, repo) = repo();
        repo.upsert(&reg(" es001 ", "Sede", None)).unwrap();
        repo.upsert(&reg("ES001", "Sede", Some("Iberdrola"))).unwrap();
        repo.upsert(&reg("ES001", "Almacén", None)).unwrap();

        let all = repo.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].connection_point, "ES001");
        assert_eq!(all[0].marketer.as_deref(), Some("Iberdrola"));
        assert_eq!(repo.delete_point("es001").unwrap(), 2);
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_empty_center_rejected() {
        let (_file, repo) = repo();
        let err = repo.upsert(&reg("ES001", "  ", None)).unwrap_err();
        assert!(matches!(err, RepositoryError::FieldValueError { .. }));
    }

    #[test]
    fn test_import_csv_rolls_back_on_invalid_line() {
        let (_file, repo) = repo();
        let mut csv = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(csv, "CUPS;Centro;Comercializadora").unwrap();
        writeln!(csv, "ES001;Sede;Endesa").unwrap();
        writeln!(csv, "ES002;;").unwrap();
        csv.flush().unwrap();

        let err = repo.import_csv(csv.path()).unwrap_err();
        assert!(matches!(err, RepositoryError::CsvImportError { line: 3, .. }));
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_import_csv_feeds_registration_source() {
        let (_file, repo) = repo();
        let mut csv = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(csv, "CUPS,Centro,Comercializadora").unwrap();
        writeln!(csv, "ES001,Sede,Endesa").unwrap();
        writeln!(csv, "ES001,Almacén,").unwrap();
        writeln!(csv, ",,").unwrap();
        csv.flush().unwrap();

        assert_eq!(repo.import_csv(csv.path()).unwrap(), 2);
        let regs = repo.registrations().unwrap();
        assert_eq!(regs.len(), 2);
        assert_eq!(regs[1].center_name, "Almacén");
        assert_eq!(regs[1].marketer, None);
    }
}
