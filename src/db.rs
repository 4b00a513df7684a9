use sqlx::SqlitePool;

/// Applied at startup; every uniqueness invariant lives here as a constraint
/// rather than as a check-then-insert in application code. The partial index
/// on mentoring_requests is what makes "at most one active request per
/// (mentee, mentor) pair" hold under concurrent submissions, and pair_key
/// does the same for DM rooms.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    role        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS follows (
    id           TEXT PRIMARY KEY,
    requester_id TEXT NOT NULL REFERENCES users(id),
    receiver_id  TEXT NOT NULL REFERENCES users(id),
    status       TEXT NOT NULL DEFAULT 'PENDING',
    created_at   TEXT NOT NULL,
    accepted_at  TEXT,
    UNIQUE (requester_id, receiver_id)
);

CREATE TABLE IF NOT EXISTS mentoring_requests (
    id               TEXT PRIMARY KEY,
    mentee_id        TEXT NOT NULL REFERENCES users(id),
    mentor_id        TEXT NOT NULL REFERENCES users(id),
    message          TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'PENDING',
    preferred_date   TEXT,
    preferred_time   TEXT,
    preferred_method TEXT,
    scheduled_at     TEXT,
    meeting_method   TEXT,
    created_at       TEXT NOT NULL,
    responded_at     TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS mentoring_requests_one_active
    ON mentoring_requests (mentee_id, mentor_id)
    WHERE status IN ('PENDING', 'ACCEPTED');

CREATE TABLE IF NOT EXISTS chat_rooms (
    id          TEXT PRIMARY KEY,
    kind        TEXT NOT NULL,
    pair_key    TEXT UNIQUE,
    created_by  TEXT NOT NULL REFERENCES users(id),
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chat_room_members (
    room_id      TEXT NOT NULL REFERENCES chat_rooms(id),
    user_id      TEXT NOT NULL REFERENCES users(id),
    last_read_at TEXT,
    PRIMARY KEY (room_id, user_id)
);

CREATE TABLE IF NOT EXISTS chat_messages (
    id         TEXT PRIMARY KEY,
    room_id    TEXT NOT NULL REFERENCES chat_rooms(id),
    sender_id  TEXT NOT NULL REFERENCES users(id),
    body       TEXT,
    file_refs  TEXT,
    sent_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS chat_messages_room_time
    ON chat_messages (room_id, sent_at);

CREATE TABLE IF NOT EXISTS matching_surveys (
    id                   TEXT PRIMARY KEY,
    user_id              TEXT NOT NULL REFERENCES users(id),
    fields               TEXT NOT NULL,
    frequency            TEXT NOT NULL,
    goal                 TEXT NOT NULL,
    available_days       TEXT NOT NULL,
    time_slots           TEXT NOT NULL,
    methods              TEXT NOT NULL,
    communication_styles TEXT NOT NULL,
    mentoring_focuses    TEXT NOT NULL,
    created_at           TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS matching_surveys_user_time
    ON matching_surveys (user_id, created_at);

CREATE TABLE IF NOT EXISTS mentor_meetings (
    id               TEXT PRIMARY KEY,
    mentor_id        TEXT NOT NULL REFERENCES users(id),
    mentee_id        TEXT NOT NULL REFERENCES users(id),
    scheduled_at     TEXT NOT NULL,
    completed_at     TEXT,
    duration_minutes INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS mentor_meetings_mentor_time
    ON mentor_meetings (mentor_id, scheduled_at);
"#;

pub async fn init(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
