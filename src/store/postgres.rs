//! Postgres work store
//!
//! Schema: `work`, `work_title`, `title`, `work_uri`, `uri`, `work_type`,
//! `uri_scheme` and `work_relation`. The edit-distance tier needs the
//! `fuzzystrmatch` extension for `levenshtein`.
//!
//! Filters are bound as `text[]`/`bool[]` parameters; an empty array means
//! "no restriction".

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use super::{StoreError, WorkSelection, WorkStore};
use crate::config::DatabaseConfig;
use crate::filters::Filters;
use crate::model::{CandidateRow, NewIdentifier, NewWork, WorkRow};
use crate::uri::UriParts;

const FIND_BY_URI: &str = r#"
    SELECT work_id, work_type, uri_scheme, uri_value, canonical, 0 AS score
    FROM work_uri INNER JOIN work USING (work_id)
    WHERE work_id IN (SELECT work_id FROM work_uri
                      WHERE uri_scheme = lower($1) AND uri_value = lower($2))
      AND (cardinality($3::text[]) = 0 OR work_type = ANY($3))
      AND (cardinality($4::text[]) = 0 OR uri_scheme = ANY($4))
      AND (cardinality($5::bool[]) = 0 OR canonical = ANY($5))
    ORDER BY canonical DESC
"#;

// $1 title (lowercased), $2..$4 filters, $5/$6 optional owning URI
const FIND_BY_TITLE: &str = r#"
    WITH candidates AS (
        SELECT work_title.work_id, work_type, uri_scheme, uri_value, canonical,
               lower(work_title.title) AS title
        FROM work_title
        INNER JOIN work USING (work_id)
        INNER JOIN work_uri USING (work_id)
        WHERE work_title.title <> ''
          AND (cardinality($2::text[]) = 0 OR work_type = ANY($2))
          AND (cardinality($3::text[]) = 0 OR uri_scheme = ANY($3))
          AND (cardinality($4::bool[]) = 0 OR canonical = ANY($4))
          AND ($5::text IS NULL OR work_title.work_id IN
                (SELECT work_id FROM work_uri WHERE uri_scheme = $5 AND uri_value = $6))
    )
    SELECT * FROM (
        SELECT DISTINCT ON (work_id, uri_scheme, uri_value)
               work_id, work_type, uri_scheme, uri_value, canonical, score
        FROM (
            SELECT work_id, work_type, uri_scheme, uri_value, canonical, 0 AS score
            FROM candidates WHERE title = $1
            UNION
            SELECT work_id, work_type, uri_scheme, uri_value, canonical, 1 AS score
            FROM candidates WHERE substr(title, 1, length($1)) = $1
            UNION
            SELECT work_id, work_type, uri_scheme, uri_value, canonical, 1 AS score
            FROM candidates WHERE substr($1, 1, length(title)) = title
            UNION
            SELECT * FROM (
                SELECT work_id, work_type, uri_scheme, uri_value, canonical,
                       levenshtein(title, $1) AS score
                FROM candidates WHERE octet_length(title) < 255
            ) fuzzy
            WHERE score <= ((length($1) / 3) + 1)
        ) tiers
        ORDER BY work_id, uri_scheme, uri_value, score, canonical DESC
    ) result
    ORDER BY score ASC, canonical DESC, work_id, uri_scheme, uri_value
"#;

const FIND_WORKS: &str = r#"
    SELECT work.work_id, work_type, title, uri_scheme, uri_value, canonical
    FROM work
    LEFT JOIN work_uri USING (work_id)
    LEFT JOIN work_title USING (work_id)
    WHERE ($1::uuid IS NULL OR work.work_id = $1)
      AND (cardinality($2::text[]) = 0 OR work_type = ANY($2))
      AND (cardinality($3::text[]) = 0 OR uri_scheme = ANY($3))
      AND (cardinality($4::bool[]) = 0 OR canonical = ANY($4))
    ORDER BY work.work_id
"#;

#[derive(Debug, FromRow)]
struct PgCandidateRow {
    work_id: Uuid,
    work_type: String,
    uri_scheme: String,
    uri_value: String,
    canonical: bool,
    score: i32,
}

impl From<PgCandidateRow> for CandidateRow {
    fn from(row: PgCandidateRow) -> Self {
        CandidateRow {
            work_id: row.work_id,
            work_type: row.work_type,
            uri_scheme: row.uri_scheme,
            uri_value: row.uri_value,
            canonical: row.canonical,
            score: u32::try_from(row.score).unwrap_or(0),
        }
    }
}

#[derive(Debug, FromRow)]
struct PgWorkRow {
    work_id: Uuid,
    work_type: String,
    title: Option<String>,
    uri_scheme: Option<String>,
    uri_value: Option<String>,
    canonical: Option<bool>,
}

impl From<PgWorkRow> for WorkRow {
    fn from(row: PgWorkRow) -> Self {
        WorkRow {
            work_id: row.work_id,
            work_type: row.work_type,
            title: row.title,
            uri_scheme: row.uri_scheme,
            uri_value: row.uri_value,
            canonical: row.canonical,
        }
    }
}

/// Work store backed by a Postgres pool
#[derive(Debug, Clone)]
pub struct PgWorkStore {
    pool: PgPool,
}

impl PgWorkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool with the given settings
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        info!("Connecting to database: {}", config.masked_url());

        let mut pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout);
        if let Some(idle_timeout) = config.idle_timeout {
            pool_options = pool_options.idle_timeout(idle_timeout);
        }
        if let Some(max_lifetime) = config.max_lifetime {
            pool_options = pool_options.max_lifetime(max_lifetime);
        }

        let pool = pool_options
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                warn!("Failed to connect to database: {}", e);
                e
            })?;

        info!("Database connection pool created successfully");
        Ok(Self::new(pool))
    }

    async fn exists(&self, query: &str, value: &str) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, bool>(query)
            .bind(value)
            .fetch_one(&self.pool)
            .await?;
        Ok(found)
    }
}

#[async_trait]
impl WorkStore for PgWorkStore {
    async fn find_by_uri(
        &self,
        scheme: &str,
        value: &str,
        filters: &Filters,
    ) -> Result<Vec<CandidateRow>, StoreError> {
        let rows = sqlx::query_as::<_, PgCandidateRow>(FIND_BY_URI)
            .bind(scheme)
            .bind(value)
            .bind(&filters.work_types)
            .bind(&filters.uri_schemes)
            .bind(&filters.canonical)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(CandidateRow::from).collect())
    }

    async fn find_by_title(
        &self,
        title: &str,
        filters: &Filters,
        uri: Option<&UriParts>,
    ) -> Result<Vec<CandidateRow>, StoreError> {
        let rows = sqlx::query_as::<_, PgCandidateRow>(FIND_BY_TITLE)
            .bind(title.to_lowercase())
            .bind(&filters.work_types)
            .bind(&filters.uri_schemes)
            .bind(&filters.canonical)
            .bind(uri.map(|u| u.scheme.as_str()))
            .bind(uri.map(|u| u.value.as_str()))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(CandidateRow::from).collect())
    }

    async fn find_works(&self, selection: &WorkSelection) -> Result<Vec<WorkRow>, StoreError> {
        let filters = &selection.filters;
        let rows = sqlx::query_as::<_, PgWorkRow>(FIND_WORKS)
            .bind(selection.work_id)
            .bind(&filters.work_types)
            .bind(&filters.uri_schemes)
            .bind(&filters.canonical)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(WorkRow::from).collect())
    }

    async fn children(&self, work_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT child_work_id FROM work_relation WHERE parent_work_id = $1",
        )
        .bind(work_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn parents(&self, work_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT parent_work_id FROM work_relation WHERE child_work_id = $1",
        )
        .bind(work_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn work_exists(&self, work_id: Uuid) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM work WHERE work_id = $1)",
        )
        .bind(work_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn type_exists(&self, work_type: &str) -> Result<bool, StoreError> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM work_type WHERE work_type = $1)",
            work_type,
        )
        .await
    }

    async fn scheme_exists(&self, scheme: &str) -> Result<bool, StoreError> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM uri_scheme WHERE uri_scheme = $1)",
            scheme,
        )
        .await
    }

    async fn work_types(&self) -> Result<Vec<String>, StoreError> {
        let types = sqlx::query_scalar::<_, String>("SELECT work_type FROM work_type")
            .fetch_all(&self.pool)
            .await?;
        Ok(types)
    }

    async fn insert_work(&self, work: &NewWork) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO work (work_id, work_type) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(work.id)
        .bind(&work.work_type)
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(StoreError::Backend(format!(
                "work {} could not be saved",
                work.id
            )));
        }

        for title in &work.titles {
            insert_title(&mut tx, work.id, title).await?;
        }
        for identifier in &work.identifiers {
            insert_uri(&mut tx, work.id, identifier).await?;
        }
        for &child in &work.children {
            insert_relation(&mut tx, work.id, child).await?;
        }
        for &parent in &work.parents {
            insert_relation(&mut tx, parent, work.id).await?;
        }

        tx.commit().await?;
        info!(work_id = %work.id, "Work saved");
        Ok(())
    }

    async fn add_titles(&self, work_id: Uuid, titles: &[String]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for title in titles {
            insert_title(&mut tx, work_id, title).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn add_uri(&self, work_id: Uuid, identifier: &NewIdentifier) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        insert_uri(&mut tx, work_id, identifier).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn add_relation(&self, parent: Uuid, child: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        insert_relation(&mut tx, parent, child).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_work(&self, work_id: Uuid) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM work_relation WHERE parent_work_id = $1 OR child_work_id = $1")
            .bind(work_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM work_title WHERE work_id = $1")
            .bind(work_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM work_uri WHERE work_id = $1")
            .bind(work_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM work WHERE work_id = $1")
            .bind(work_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(%work_id, "Work deleted");
        Ok(deleted.rows_affected() > 0)
    }
}

async fn insert_title(
    tx: &mut Transaction<'_, Postgres>,
    work_id: Uuid,
    title: &str,
) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO title (title) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(title)
        .execute(&mut **tx)
        .await?;
    sqlx::query("INSERT INTO work_title (work_id, title) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(work_id)
        .bind(title)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn insert_uri(
    tx: &mut Transaction<'_, Postgres>,
    work_id: Uuid,
    identifier: &NewIdentifier,
) -> Result<(), StoreError> {
    let parts = &identifier.parts;
    sqlx::query("INSERT INTO uri (uri_scheme, uri_value) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(&parts.scheme)
        .bind(&parts.value)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO work_uri (work_id, uri_scheme, uri_value, canonical)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(work_id)
    .bind(&parts.scheme)
    .bind(&parts.value)
    .bind(identifier.canonical)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_relation(
    tx: &mut Transaction<'_, Postgres>,
    parent: Uuid,
    child: Uuid,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO work_relation (parent_work_id, child_work_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(parent)
    .bind(child)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_query_skips_empty_titles() {
        assert!(FIND_BY_TITLE.contains("WHERE work_title.title <> ''"));
    }

    #[test]
    fn edit_distance_tier_limits_titles_by_bytes() {
        assert!(FIND_BY_TITLE.contains("octet_length(title) < 255"));
        assert!(!FIND_BY_TITLE.contains(" length(title) < 255"));
    }
}
