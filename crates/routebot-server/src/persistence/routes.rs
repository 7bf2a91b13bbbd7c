//! Route persistence operations.

use anyhow::Result;
use routebot_core::{GeoPoint, RouteRecord};
use sqlx::SqlitePool;

/// Insert or replace a route. New routes are appended after the existing
/// ones; replacing a route keeps its position.
pub async fn upsert_route(pool: &SqlitePool, route: &RouteRecord) -> Result<()> {
    let points_json = serde_json::to_string(&route.points)?;

    sqlx::query(
        r#"
        INSERT INTO routes (id, name, color, description, points, position, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, (SELECT COALESCE(MAX(position), -1) + 1 FROM routes), CURRENT_TIMESTAMP)
        ON CONFLICT(id) DO UPDATE SET
            name = ?2, color = ?3, description = ?4, points = ?5,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&route.id)
    .bind(&route.name)
    .bind(&route.color)
    .bind(&route.description)
    .bind(&points_json)
    .execute(pool)
    .await?;

    Ok(())
}

/// Replace the whole stored list, preserving the given order.
pub async fn save_routes(pool: &SqlitePool, routes: &[RouteRecord]) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM routes").execute(&mut *tx).await?;

    for (position, route) in routes.iter().enumerate() {
        let points_json = serde_json::to_string(&route.points)?;
        sqlx::query(
            r#"
            INSERT INTO routes (id, name, color, description, points, position, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(&route.id)
        .bind(&route.name)
        .bind(&route.color)
        .bind(&route.description)
        .bind(&points_json)
        .bind(position as i64)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Load all routes in stored order.
pub async fn load_all_routes(pool: &SqlitePool) -> Result<Vec<RouteRecord>> {
    let rows = sqlx::query_as::<_, RouteRow>(
        "SELECT id, name, color, description, points FROM routes ORDER BY position, rowid",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
}

/// Delete a route by ID.
pub async fn delete_route(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM routes WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct RouteRow {
    id: String,
    name: String,
    color: String,
    description: Option<String>,
    points: String,
}

impl TryFrom<RouteRow> for RouteRecord {
    type Error = anyhow::Error;

    fn try_from(row: RouteRow) -> Result<Self> {
        let points: Vec<GeoPoint> = serde_json::from_str(&row.points)?;
        Ok(RouteRecord {
            id: row.id,
            name: row.name,
            color: row.color,
            description: row.description,
            points,
        })
    }
}
