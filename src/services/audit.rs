use sqlx::PgPool;
use uuid::Uuid;

/// Fire-and-forget audit log entry.
/// Spawns a background task — never blocks the request handler,
/// never propagates errors (logs a warning on failure).
pub fn record(pool: PgPool, actor_id: Uuid, action: &str, details: String) {
    let action = action.to_string();

    tokio::spawn(async move {
        // Resolve the actor's display name best-effort; a failed lookup still
        // produces a log row with the id alone.
        let user_name: Option<String> =
            sqlx::query_scalar("SELECT display_name FROM users WHERE id = $1")
                .bind(actor_id)
                .fetch_optional(&pool)
                .await
                .unwrap_or(None);

        let res = sqlx::query(
            "INSERT INTO audit_log (user_id, user_name, action, details)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(actor_id)
        .bind(user_name)
        .bind(&action)
        .bind(&details)
        .execute(&pool)
        .await;

        if let Err(e) = res {
            tracing::warn!("audit log insert failed for action {action}: {e}");
        }
    });
}
