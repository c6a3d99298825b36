//! Ayah corpus queries
//!
//! The corpus is seeded out-of-band; this module only reads it, plus the
//! single insert used by the seeding collaborator and test fixtures.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use hifz_common::Result;

use crate::models::Ayah;

pub async fn insert(pool: &SqlitePool, ayah: &Ayah) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO ayahs (
            id, surah_number, ayah_number, juz_number, page_number,
            hizb_quarter, text_uthmani
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(ayah.id)
    .bind(ayah.surah_number)
    .bind(ayah.ayah_number)
    .bind(ayah.juz_number)
    .bind(ayah.page_number)
    .bind(ayah.hizb_quarter)
    .bind(&ayah.text_uthmani)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ayahs")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn by_page(pool: &SqlitePool, page_number: i64) -> Result<Vec<Ayah>> {
    let rows = sqlx::query("SELECT * FROM ayahs WHERE page_number = ? ORDER BY id")
        .bind(page_number)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(map_ayah).collect())
}

/// All distinct seeded pages
pub async fn distinct_pages(pool: &SqlitePool) -> Result<Vec<i64>> {
    let pages: Vec<i64> =
        sqlx::query_scalar("SELECT DISTINCT page_number FROM ayahs ORDER BY page_number")
            .fetch_all(pool)
            .await?;
    Ok(pages)
}

/// Pages on which the user has begun any ayah
pub async fn pages_touched_by_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<i64>> {
    let pages: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT a.page_number
        FROM user_item_state s
        JOIN ayahs a ON a.id = s.ayah_id
        WHERE s.user_id = ?
        ORDER BY a.page_number
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;
    Ok(pages)
}

/// Total ayah count per juz
pub async fn juz_totals(pool: &SqlitePool) -> Result<Vec<(i64, i64)>> {
    let rows = sqlx::query("SELECT juz_number, COUNT(*) AS n FROM ayahs GROUP BY juz_number")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(|row| (row.get("juz_number"), row.get("n")))
        .collect())
}

/// Ayah count per juz restricted to the given ids
pub async fn juz_counts_for_ids(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<(i64, i64)>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT juz_number, COUNT(*) AS n FROM ayahs WHERE id IN ({}) GROUP BY juz_number",
        placeholders
    );

    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query.fetch_all(pool).await?;
    Ok(rows
        .iter()
        .map(|row| (row.get("juz_number"), row.get("n")))
        .collect())
}

fn map_ayah(row: &SqliteRow) -> Ayah {
    Ayah {
        id: row.get("id"),
        surah_number: row.get("surah_number"),
        ayah_number: row.get("ayah_number"),
        juz_number: row.get("juz_number"),
        page_number: row.get("page_number"),
        hizb_quarter: row.get("hizb_quarter"),
        text_uthmani: row.get("text_uthmani"),
    }
}
