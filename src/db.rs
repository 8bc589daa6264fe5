use anyhow::Result;
use sqlx::postgres::PgPool;

pub async fn init_db(pool: &PgPool) -> Result<()> {
    // 1. Create table if not exists (Base schema)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_analyses (
            id VARCHAR PRIMARY KEY,
            user_id VARCHAR NOT NULL,
            project_id VARCHAR,
            content TEXT NOT NULL,
            sentiment VARCHAR NOT NULL,
            confidence DOUBLE PRECISION NOT NULL,
            positive_prob DOUBLE PRECISION NOT NULL,
            negative_prob DOUBLE PRECISION NOT NULL,
            dialect VARCHAR NOT NULL,
            dialect_confidence DOUBLE PRECISION NOT NULL,
            model_source VARCHAR NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )
    .execute(pool)
    .await?;

    // 2. Schema Evolution: Add new columns if they don't exist
    // We use a separate query for each column to handle potential partial migrations gracefully

    // Summary (TEXT, filled when summarization is requested)
    sqlx::query("ALTER TABLE content_analyses ADD COLUMN IF NOT EXISTS summary TEXT;")
        .execute(pool)
        .await
        .ok();

    // Category (TEXT, keyword heuristic)
    sqlx::query("ALTER TABLE content_analyses ADD COLUMN IF NOT EXISTS category TEXT;")
        .execute(pool)
        .await
        .ok();

    // Keywords (JSONB, top non-stopword tokens)
    sqlx::query("ALTER TABLE content_analyses ADD COLUMN IF NOT EXISTS keywords JSONB;")
        .execute(pool)
        .await
        .ok();

    Ok(())
}
