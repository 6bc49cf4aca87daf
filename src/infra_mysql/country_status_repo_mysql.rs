use super::util::{is_dup_key, last_insert_id};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, Row, Transaction};

pub struct MySqlCountryStatusRepo {
    pool: MySqlPool,
}

fn store_err(context: &'static str) -> impl Fn(sqlx::Error) -> CountryStatusError {
    move |e| CountryStatusError::Store(format!("{context}: {e}"))
}

impl MySqlCountryStatusRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlCountryStatusRepo { pool }
    }

    fn row_to_record(row: &MySqlRow) -> Result<CountryStatusRecord, CountryStatusError> {
        let id: CountryStatusId = row.try_get("id").map_err(store_err("decode id"))?;
        let user_id: UserId = row.try_get("user_id").map_err(store_err("decode user_id"))?;
        let iso_code: String = row
            .try_get("iso_code")
            .map_err(store_err("decode iso_code"))?;
        let iso_code = IsoCode::parse(&iso_code)
            .map_err(|e| CountryStatusError::Store(format!("stored iso_code: {e}")))?;
        let name: Option<String> = row.try_get("name").map_err(store_err("decode name"))?;
        let status: VisitStatus = row.try_get("status").map_err(store_err("decode status"))?;

        Ok(CountryStatusRecord {
            id,
            user_id,
            iso_code,
            name,
            status,
        })
    }

    /// Sets the status of a row the caller has already locked, then reads it back.
    async fn set_locked_status(
        tx: &mut Transaction<'_, MySql>,
        id: CountryStatusId,
        status: VisitStatus,
    ) -> Result<CountryStatusRecord, CountryStatusError> {
        sqlx::query("UPDATE country_status SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(store_err("country update"))?;

        let row = sqlx::query(
            r#"
SELECT id, user_id, iso_code, name, status
FROM country_status
WHERE id = ?
"#,
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map_err(store_err("country reload"))?;

        Self::row_to_record(&row)
    }

    async fn finish(
        mut tx: Transaction<'_, MySql>,
        locked: Option<CountryStatusId>,
        status: VisitStatus,
    ) -> Result<Option<CountryStatusRecord>, CountryStatusError> {
        let Some(id) = locked else {
            tx.rollback().await.map_err(store_err("rollback"))?;
            return Ok(None);
        };
        let record = Self::set_locked_status(&mut tx, id, status).await?;
        tx.commit().await.map_err(store_err("commit"))?;
        Ok(Some(record))
    }
}

#[async_trait::async_trait]
impl CountryStatusRepo for MySqlCountryStatusRepo {
    async fn insert_if_absent(
        &self,
        owner: UserId,
        iso_code: &IsoCode,
        name: Option<&str>,
        status: VisitStatus,
    ) -> Result<Option<CountryStatusRecord>, CountryStatusError> {
        let res = sqlx::query(
            r#"
INSERT INTO country_status (user_id, iso_code, name, status)
VALUES (?, ?, ?, ?)
"#,
        )
        .bind(owner)
        .bind(iso_code.as_str())
        .bind(name)
        .bind(status)
        .execute(&self.pool)
        .await;

        match res {
            Ok(done) => {
                let id = last_insert_id(done.last_insert_id()).map_err(CountryStatusError::Store)?;
                Ok(Some(CountryStatusRecord {
                    id: CountryStatusId(id),
                    user_id: owner,
                    iso_code: iso_code.clone(),
                    name: name.map(str::to_string),
                    status,
                }))
            }
            Err(e) if is_dup_key(&e) => Ok(None),
            Err(e) => Err(CountryStatusError::Store(format!("country insert: {e}"))),
        }
    }

    async fn update_status_by_key(
        &self,
        owner: UserId,
        iso_code: &IsoCode,
        status: VisitStatus,
    ) -> Result<Option<CountryStatusRecord>, CountryStatusError> {
        let mut tx = self.pool.begin().await.map_err(store_err("begin"))?;

        let locked: Option<CountryStatusId> = sqlx::query_scalar(
            r#"
SELECT id FROM country_status
WHERE user_id = ? AND iso_code = ?
FOR UPDATE
"#,
        )
        .bind(owner)
        .bind(iso_code.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err("country lock by key"))?;

        Self::finish(tx, locked, status).await
    }

    async fn list_by_user(
        &self,
        owner: UserId,
    ) -> Result<Vec<CountryStatusRecord>, CountryStatusError> {
        let rows = sqlx::query(
            r#"
SELECT id, user_id, iso_code, name, status
FROM country_status
WHERE user_id = ?
ORDER BY id ASC
"#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("country list"))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn update_status_by_id(
        &self,
        owner: UserId,
        id: CountryStatusId,
        status: VisitStatus,
    ) -> Result<Option<CountryStatusRecord>, CountryStatusError> {
        let mut tx = self.pool.begin().await.map_err(store_err("begin"))?;

        let locked: Option<CountryStatusId> = sqlx::query_scalar(
            r#"
SELECT id FROM country_status
WHERE id = ? AND user_id = ?
FOR UPDATE
"#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err("country lock by id"))?;

        Self::finish(tx, locked, status).await
    }

    async fn delete_by_id(
        &self,
        owner: UserId,
        id: CountryStatusId,
    ) -> Result<bool, CountryStatusError> {
        let done = sqlx::query("DELETE FROM country_status WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(store_err("country delete"))?;

        Ok(done.rows_affected() > 0)
    }
}
