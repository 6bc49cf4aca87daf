use sqlx::mysql::MySqlDatabaseError;

pub fn is_dup_key(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return mysql_err.number() == 1062; // ER_DUP_ENTRY
        }
    }

    false
}

pub fn last_insert_id(id: u64) -> Result<i64, String> {
    i64::try_from(id).map_err(|e| format!("insert id out of range: {e}"))
}
