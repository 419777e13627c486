//! SQLite implementation of the price-monitoring [`TaskRepository`] port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::domain::error::DatabaseError;
use crate::domain::models::{Lane, Task, TaskStatus};
use crate::domain::ports::TaskRepository;

use super::{parse_datetime, parse_optional_datetime, parse_optional_uuid, parse_uuid};

#[derive(FromRow)]
struct TaskRow {
    id: String,
    product_id: String,
    scheduled_time: String,
    priority: i64,
    status: String,
    retry_count: i64,
    max_retries: i64,
    started_at: Option<String>,
    completed_at: Option<String>,
    error: Option<String>,
    observation_result_id: Option<String>,
}

fn status_to_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Scheduled => "scheduled",
        TaskStatus::Running => "running",
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
        TaskStatus::Cancelled => "cancelled",
    }
}

fn status_from_str(s: &str) -> Result<TaskStatus, DatabaseError> {
    match s {
        "pending" => Ok(TaskStatus::Pending),
        "scheduled" => Ok(TaskStatus::Scheduled),
        "running" => Ok(TaskStatus::Running),
        "completed" => Ok(TaskStatus::Completed),
        "failed" => Ok(TaskStatus::Failed),
        "cancelled" => Ok(TaskStatus::Cancelled),
        other => Err(DatabaseError::SerializationError(format!("unknown task status: {other}"))),
    }
}

impl TryFrom<TaskRow> for Task {
    type Error = DatabaseError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: parse_uuid(&row.id)?,
            product_id: parse_uuid(&row.product_id)?,
            scheduled_time: parse_datetime(&row.scheduled_time)?,
            priority: row.priority as u8,
            status: status_from_str(&row.status)?,
            retry_count: row.retry_count as u32,
            max_retries: row.max_retries as u32,
            started_at: parse_optional_datetime(row.started_at)?,
            completed_at: parse_optional_datetime(row.completed_at)?,
            error: row.error,
            observation_result_id: parse_optional_uuid(row.observation_result_id)?,
        })
    }
}

#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn insert(&self, task: &Task) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"INSERT INTO tasks (id, product_id, scheduled_time, priority, status, retry_count,
               max_retries, started_at, completed_at, error, observation_result_id)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(task.id.to_string())
        .bind(task.product_id.to_string())
        .bind(task.scheduled_time.to_rfc3339())
        .bind(i64::from(task.priority))
        .bind(status_to_str(task.status))
        .bind(i64::from(task.retry_count))
        .bind(i64::from(task.max_retries))
        .bind(task.started_at.map(|t| t.to_rfc3339()))
        .bind(task.completed_at.map(|t| t.to_rfc3339()))
        .bind(&task.error)
        .bind(task.observation_result_id.map(|id| id.to_string()))
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Task>, DatabaseError> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        row.map(Task::try_from).transpose()
    }

    async fn update(&self, task: &Task) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"UPDATE tasks SET scheduled_time = ?, priority = ?, status = ?, retry_count = ?,
               max_retries = ?, started_at = ?, completed_at = ?, error = ?, observation_result_id = ?
               WHERE id = ?"#,
        )
        .bind(task.scheduled_time.to_rfc3339())
        .bind(i64::from(task.priority))
        .bind(status_to_str(task.status))
        .bind(i64::from(task.retry_count))
        .bind(i64::from(task.max_retries))
        .bind(task.started_at.map(|t| t.to_rfc3339()))
        .bind(task.completed_at.map(|t| t.to_rfc3339()))
        .bind(&task.error)
        .bind(task.observation_result_id.map(|id| id.to_string()))
        .bind(task.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::RowNotFound);
        }
        Ok(())
    }

    async fn pending_ordered(&self, limit: u32) -> Result<Vec<Task>, DatabaseError> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            "SELECT * FROM tasks WHERE status = 'pending' ORDER BY priority ASC, scheduled_time ASC, id ASC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn pending_for_retailer(&self, retailer: &str, limit: u32) -> Result<Vec<Task>, DatabaseError> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            r#"SELECT tasks.* FROM tasks JOIN products ON products.id = tasks.product_id
               WHERE tasks.status = 'pending' AND products.retailer = ?
               ORDER BY tasks.priority ASC, tasks.scheduled_time ASC, tasks.id ASC LIMIT ?"#,
        )
        .bind(retailer)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn running_counts_by_retailer(&self) -> Result<Vec<(String, u64)>, DatabaseError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT products.retailer, COUNT(*) FROM tasks JOIN products ON products.id = tasks.product_id
               WHERE tasks.status = 'running' GROUP BY products.retailer"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(rows.into_iter().map(|(retailer, count)| (retailer, count as u64)).collect())
    }

    async fn count_by_status(&self, status: TaskStatus) -> Result<u64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE status = ?")
            .bind(status_to_str(status))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(count as u64)
    }

    async fn count_by_lane_and_status(&self, lane: Lane, status: TaskStatus) -> Result<u64, DatabaseError> {
        let (lo, hi): (i64, i64) = match lane {
            Lane::High => (0, 3),
            Lane::Normal => (4, 7),
            Lane::Low => (8, 10),
        };
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE status = ? AND priority BETWEEN ? AND ?")
                .bind(status_to_str(status))
                .bind(lo)
                .bind(hi)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(count as u64)
    }

    async fn prunable_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>, DatabaseError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"SELECT id FROM tasks WHERE status IN ('completed', 'failed', 'cancelled')
               AND completed_at IS NOT NULL AND completed_at < ?"#,
        )
        .bind(cutoff.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        rows.into_iter().map(|(id,)| parse_uuid(&id)).collect()
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, DatabaseError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut total = 0u64;
        for id in ids {
            let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            total += result.rows_affected();
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::adapters::sqlite::product_repository::SqliteProductRepository;
    use crate::domain::models::Product;
    use crate::domain::ports::ProductRepository;

    async fn seed_product(pool: &SqlitePool) -> Uuid {
        let products = SqliteProductRepository::new(pool.clone());
        let product = Product::new("https://www.amazon.fr/dp/W", "amazon", "EUR");
        products.insert(&product).await.unwrap();
        product.id
    }

    #[tokio::test]
    async fn pending_ordered_respects_priority_then_time() {
        let pool = create_migrated_test_pool().await.unwrap();
        let product_id = seed_product(&pool).await;
        let repo = SqliteTaskRepository::new(pool);

        let now = Utc::now();
        let low = Task::new(product_id, 9, now).unwrap();
        let high = Task::new(product_id, 1, now).unwrap();
        repo.insert(&low).await.unwrap();
        repo.insert(&high).await.unwrap();

        let pulled = repo.pending_ordered(10).await.unwrap();
        assert_eq!(pulled[0].id, high.id);
    }

    #[tokio::test]
    async fn status_transition_round_trips() {
        let pool = create_migrated_test_pool().await.unwrap();
        let product_id = seed_product(&pool).await;
        let repo = SqliteTaskRepository::new(pool);

        let mut task = Task::new(product_id, 5, Utc::now()).unwrap();
        repo.insert(&task).await.unwrap();
        task.admit().unwrap();
        task.claim(Utc::now()).unwrap();
        repo.update(&task).await.unwrap();

        let loaded = repo.get(task.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::Running);
        assert!(loaded.started_at.is_some());
    }

    #[tokio::test]
    async fn running_counts_group_by_retailer() {
        let pool = create_migrated_test_pool().await.unwrap();
        let product_id = seed_product(&pool).await;
        let repo = SqliteTaskRepository::new(pool);

        let mut task = Task::new(product_id, 5, Utc::now()).unwrap();
        repo.insert(&task).await.unwrap();
        task.admit().unwrap();
        task.claim(Utc::now()).unwrap();
        repo.update(&task).await.unwrap();

        let counts = repo.running_counts_by_retailer().await.unwrap();
        assert_eq!(counts, vec![("amazon".to_string(), 1)]);
    }
}
