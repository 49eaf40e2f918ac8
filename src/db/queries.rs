use sqlx::{MySqlPool, Row};

use crate::models::job::{FaxJob, FaxState};
use crate::models::trunk::TrunkNumber;

/// Jobs in state `created` that belong to the given server.
pub async fn list_created_jobs(
    pool: &MySqlPool,
    server_name: &str,
) -> Result<Vec<FaxJob>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT CAST(faxes_outgoing.id AS SIGNED) AS id,
               faxes_outgoing.fax_data,
               faxes_outgoing.filename,
               CAST(faxes_outgoing.outgoing_number_id AS SIGNED) AS outgoing_number_id,
               faxes_outgoing.`to`
        FROM faxes_outgoing
        INNER JOIN iaxfriends ON iaxfriends.id = faxes_outgoing.iaxfriends_id
        WHERE iaxfriends.name = ?
          AND faxes_outgoing.state = ?
        "#,
    )
    .bind(server_name)
    .bind(FaxState::Created.as_str())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| {
            Ok(FaxJob {
                id: r.try_get("id")?,
                fax_data: r.try_get("fax_data")?,
                filename: r.try_get("filename")?,
                outgoing_number_id: r.try_get("outgoing_number_id")?,
                to: r.try_get("to")?,
            })
        })
        .collect()
}

/// Move a job from `from` to `to` inside a transaction.
///
/// The update only matches while the row is still in `from`, so two writers
/// racing on the same job cannot both succeed. Returns the number of rows changed.
pub async fn update_job_state(
    pool: &MySqlPool,
    job_id: i64,
    from: FaxState,
    to: FaxState,
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE faxes_outgoing
        SET state = ?
        WHERE id = ? AND state = ?
        "#,
    )
    .bind(to.as_str())
    .bind(job_id)
    .bind(from.as_str())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(result.rows_affected())
}

/// Fax-capable trunk numbers with the given id. More than one row means broken configuration.
pub async fn find_fax_trunks(
    pool: &MySqlPool,
    outgoing_number_id: i64,
) -> Result<Vec<TrunkNumber>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT full_number, header_ppid, ps_endpoints_id
        FROM trunk_numbers
        WHERE id = ? AND is_fax = 'yes'
        "#,
    )
    .bind(outgoing_number_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| {
            Ok(TrunkNumber {
                full_number: r.try_get("full_number")?,
                header_ppid: r.try_get("header_ppid")?,
                ps_endpoints_id: r.try_get("ps_endpoints_id")?,
            })
        })
        .collect()
}

/// Connectivity probe.
pub async fn ping(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
