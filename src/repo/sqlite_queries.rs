use crate::models::event::Collection;

pub const SCHEMA: &str = include_str!("../../migrations/0001_webhook_store.sql");

/// Upsert reporting how many times the row was written, 1 meaning inserted
pub fn query_upsert_record(collection: Collection) -> String {
    format!(
        r#"
INSERT INTO {table}(doc_id,payload,received_at,processed)
VALUES($1,$2,$3,$4)
ON CONFLICT(doc_id) DO UPDATE SET
    payload=excluded.payload,
    received_at=excluded.received_at,
    processed=excluded.processed,
    write_count={table}.write_count+1
RETURNING write_count;
"#,
        table = collection.table_name()
    )
}

pub fn query_get_recent_records(collection: Collection) -> String {
    format!(
        r#"
SELECT doc_id,payload,received_at,processed
FROM {table}
ORDER BY received_at DESC, rowid DESC
LIMIT $1;
"#,
        table = collection.table_name()
    )
}

pub const QUERY_UPSERT_USER_MESSAGE: &str = r#"
INSERT INTO user_messages(sender_id,doc_id,payload,received_at,processed)
VALUES($1,$2,$3,$4,$5)
ON CONFLICT(sender_id,doc_id) DO UPDATE SET
    payload=excluded.payload,
    received_at=excluded.received_at,
    processed=excluded.processed;
"#;

pub const QUERY_GET_USER_MESSAGES: &str = r#"
SELECT doc_id,payload,received_at,processed
FROM user_messages
WHERE sender_id=$1
ORDER BY received_at DESC, rowid DESC
LIMIT $2;
"#;

pub const QUERY_UPSERT_USER_PROFILE: &str = r#"
INSERT INTO user_profiles(user_id,name,last_message_at,message_count)
VALUES($1,COALESCE($2,''),$3,1)
ON CONFLICT(user_id) DO UPDATE SET
    name=CASE
        WHEN $2 IS NULL OR $2='' THEN user_profiles.name
        ELSE $2
    END,
    last_message_at=MAX(user_profiles.last_message_at,excluded.last_message_at),
    message_count=user_profiles.message_count+1;
"#;

pub const QUERY_GET_USER_PROFILE: &str = r#"
SELECT user_id,name,last_message_at,message_count
FROM user_profiles
WHERE user_id=$1;
"#;

pub const QUERY_GET_STATS: &str = r#"
SELECT
    (SELECT COUNT(1) FROM whatsapp_messages) AS total_messages,
    (SELECT COUNT(1) FROM user_profiles) AS total_users;
"#;

pub const QUERY_UPSERT_HEALTH_CHECK: &str = r#"
INSERT INTO health_checks(id,status,checked_at)
VALUES($1,'checked',$2)
ON CONFLICT(id) DO UPDATE SET
    status=excluded.status,
    checked_at=excluded.checked_at;
"#;

pub const QUERY_GET_HEALTH_CHECK: &str = r#"
SELECT status FROM health_checks WHERE id=$1;
"#;
