//! PostgreSQL implementation of the joinbench storage boundary.

mod schema;

use async_trait::async_trait;
use joinbench_core::{BenchError, Department, Employee, IndexDef, JoinMethod, JoinStore, Result, Table};
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, Executor, PgConnection};
use std::str::FromStr;
use tracing::{debug, info};

pub use schema::{DEPARTMENT_BATCH, EMPLOYEE_BATCH};

pub struct PgJoinStore {
    /// `None` once the store has been closed.
    conn: Option<PgConnection>,
}

impl PgJoinStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let options = PgConnectOptions::from_str(url).map_err(BenchError::storage)?;
        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(BenchError::storage)?;
        info!("Connected to PostgreSQL at {}:{}", options.get_host(), options.get_port());
        Ok(Self { conn: Some(conn) })
    }

    /// Statements prepared on this session, as `(name, sql)`.
    pub async fn prepared_statements(&mut self) -> Result<Vec<(String, String)>> {
        sqlx::query_as::<_, (String, String)>("SELECT name, statement FROM pg_prepared_statements")
            .fetch_all(self.conn()?)
            .await
            .map_err(BenchError::storage)
    }

    fn conn(&mut self) -> Result<&mut PgConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| BenchError::storage("connection is closed"))
    }

    // Simple query protocol: nothing is prepared, so every call is planned
    // under the session's current enable_* switches.
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let done = self
            .conn()?
            .execute(sql)
            .await
            .map_err(BenchError::storage)?;
        Ok(done.rows_affected())
    }
}

#[async_trait]
impl JoinStore for PgJoinStore {
    async fn load(&mut self, employees: &[Employee], departments: &[Department]) -> Result<()> {
        for ddl in [
            schema::DROP_EMPLOYEES,
            schema::DROP_DEPARTMENTS,
            schema::CREATE_EMPLOYEES,
            schema::CREATE_DEPARTMENTS,
        ] {
            self.execute(ddl).await?;
        }

        for chunk in departments.chunks(DEPARTMENT_BATCH) {
            let mut insert = schema::insert_departments(chunk);
            insert
                .build()
                .execute(self.conn()?)
                .await
                .map_err(BenchError::storage)?;
        }
        for chunk in employees.chunks(EMPLOYEE_BATCH) {
            let mut insert = schema::insert_employees(chunk);
            insert
                .build()
                .execute(self.conn()?)
                .await
                .map_err(BenchError::storage)?;
        }

        // Fresh statistics so the planner costs every strategy on real row counts.
        self.execute("ANALYZE employees").await?;
        self.execute("ANALYZE departments").await?;
        info!("Loaded {} employees and {} departments", employees.len(), departments.len());
        Ok(())
    }

    async fn set_join_method(&mut self, method: JoinMethod, enabled: bool) -> Result<()> {
        let sql = schema::set_join_method_sql(&method.setting(), enabled);
        debug!("{}", sql);
        self.conn()?
            .execute(sql.as_str())
            .await
            .map(|_| ())
            .map_err(|e| match e {
                sqlx::Error::Database(db) => BenchError::PlannerConfig {
                    method,
                    reason: db.message().to_string(),
                },
                other => BenchError::storage(other),
            })
    }

    async fn join_method_enabled(&mut self, method: JoinMethod) -> Result<bool> {
        let value: String = sqlx::query_scalar(&format!("SHOW {}", method.setting()))
            .fetch_one(self.conn()?)
            .await
            .map_err(BenchError::storage)?;
        Ok(value == "on")
    }

    async fn run_query(&mut self, sql: &str) -> Result<u64> {
        self.execute(sql).await
    }

    async fn explain_analyze(&mut self, sql: &str) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(&schema::explain_analyze_sql(sql))
            .fetch_all(self.conn()?)
            .await
            .map_err(BenchError::storage)
    }

    async fn create_index(&mut self, index: &IndexDef) -> Result<()> {
        self.execute(&index.create_sql()).await.map(|_| ())
    }

    async fn drop_index(&mut self, index: &IndexDef) -> Result<()> {
        self.execute(&index.drop_sql()).await.map(|_| ())
    }

    async fn purge_tables(&mut self) -> Result<()> {
        self.execute(schema::DROP_SCHEMA).await?;
        self.execute(schema::CREATE_SCHEMA).await?;
        // Cached statements point at relations that no longer exist.
        self.conn()?
            .clear_cached_statements()
            .await
            .map_err(BenchError::storage)?;
        info!("Purged schema public");
        Ok(())
    }

    async fn row_count(&mut self, table: Table) -> Result<u64> {
        let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
            .bind(format!("public.{}", table.name()))
            .fetch_one(self.conn()?)
            .await
            .map_err(BenchError::storage)?;
        if !exists {
            return Ok(0);
        }

        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table.name()))
            .fetch_one(self.conn()?)
            .await
            .map_err(BenchError::storage)?;
        Ok(count as u64)
    }

    async fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => {
                conn.close().await.map_err(BenchError::storage)?;
                debug!("Closed PostgreSQL connection");
                Ok(())
            }
            None => Ok(()),
        }
    }
}
