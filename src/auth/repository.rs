//! Auth repository.

use std::str::FromStr;

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, PgPool, Postgres, Row, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::auth::models::{ActiveSession, User, UserRecord, UserRole};

const CREATE_USER_SQL: &str = include_str!("sql/create_user.sql");
const FIND_USER_BY_UUID_SQL: &str = include_str!("sql/find_user_by_uuid.sql");
const FIND_USER_BY_EMAIL_SQL: &str = include_str!("sql/find_user_by_email.sql");
const FIND_USER_BY_PHONE_SQL: &str = include_str!("sql/find_user_by_phone.sql");
const FIND_USER_BY_GOOGLE_ID_SQL: &str = include_str!("sql/find_user_by_google_id.sql");
const LINK_GOOGLE_IDENTITY_SQL: &str = include_str!("sql/link_google_identity.sql");
const PROMOTE_TO_ADMIN_SQL: &str = include_str!("sql/promote_to_admin.sql");
const CREATE_SESSION_SQL: &str = include_str!("sql/create_session.sql");
const FIND_SESSION_SQL: &str = include_str!("sql/find_session.sql");
const REVOKE_SESSION_SQL: &str = include_str!("sql/revoke_session.sql");
const UPSERT_OTP_CHALLENGE_SQL: &str = include_str!("sql/upsert_otp_challenge.sql");
const GET_OTP_CHALLENGE_SQL: &str = include_str!("sql/get_otp_challenge.sql");
const INCREMENT_OTP_ATTEMPTS_SQL: &str = include_str!("sql/increment_otp_attempts.sql");
const DELETE_OTP_CHALLENGE_SQL: &str = include_str!("sql/delete_otp_challenge.sql");

/// User row together with its stored credential, for login paths.
#[derive(Debug, Clone)]
pub(crate) struct StoredUser {
    pub user: User,
    pub password_hash: Option<String>,
}

/// A pending phone verification challenge.
#[derive(Debug, Clone)]
pub(crate) struct OtpChallenge {
    pub code_hash: String,
    pub attempts: i32,
    pub expires_at: Timestamp,
}

#[derive(Debug, Clone)]
pub(crate) struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    #[must_use]
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub(crate) async fn create_user(&self, record: &UserRecord) -> Result<User, sqlx::Error> {
        query_as::<Postgres, StoredUser>(CREATE_USER_SQL)
            .bind(record.uuid)
            .bind(&record.username)
            .bind(&record.email)
            .bind(&record.phone)
            .bind(&record.password_hash)
            .bind(&record.google_id)
            .bind(&record.avatar)
            .bind(record.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map(|stored| stored.user)
    }

    pub(crate) async fn find_user_by_uuid(
        &self,
        user_uuid: Uuid,
    ) -> Result<Option<User>, sqlx::Error> {
        query_as::<Postgres, StoredUser>(FIND_USER_BY_UUID_SQL)
            .bind(user_uuid)
            .fetch_optional(&self.pool)
            .await
            .map(|stored| stored.map(|stored| stored.user))
    }

    pub(crate) async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<StoredUser>, sqlx::Error> {
        query_as::<Postgres, StoredUser>(FIND_USER_BY_EMAIL_SQL)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    pub(crate) async fn find_user_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        query_as::<Postgres, StoredUser>(FIND_USER_BY_PHONE_SQL)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map(|stored| stored.map(|stored| stored.user))
    }

    pub(crate) async fn find_user_by_google_id(
        &self,
        google_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        query_as::<Postgres, StoredUser>(FIND_USER_BY_GOOGLE_ID_SQL)
            .bind(google_id)
            .fetch_optional(&self.pool)
            .await
            .map(|stored| stored.map(|stored| stored.user))
    }

    pub(crate) async fn link_google_identity(
        &self,
        user_uuid: Uuid,
        google_id: &str,
        avatar: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        query_as::<Postgres, StoredUser>(LINK_GOOGLE_IDENTITY_SQL)
            .bind(user_uuid)
            .bind(google_id)
            .bind(avatar)
            .fetch_one(&self.pool)
            .await
            .map(|stored| stored.user)
    }

    pub(crate) async fn promote_to_admin(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        query_as::<Postgres, StoredUser>(PROMOTE_TO_ADMIN_SQL)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map(|stored| stored.map(|stored| stored.user))
    }

    pub(crate) async fn create_session(
        &self,
        session_uuid: Uuid,
        user_uuid: Uuid,
        token_hash: &str,
        expires_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        query(CREATE_SESSION_SQL)
            .bind(session_uuid)
            .bind(user_uuid)
            .bind(token_hash)
            .bind(SqlxTimestamp::from(expires_at))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub(crate) async fn find_session(
        &self,
        session_uuid: Uuid,
    ) -> Result<Option<ActiveSession>, sqlx::Error> {
        query_as::<Postgres, ActiveSession>(FIND_SESSION_SQL)
            .bind(session_uuid)
            .fetch_optional(&self.pool)
            .await
    }

    pub(crate) async fn revoke_session(&self, session_uuid: Uuid) -> Result<u64, sqlx::Error> {
        let rows_affected = query(REVOKE_SESSION_SQL)
            .bind(session_uuid)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn upsert_otp_challenge(
        &self,
        phone: &str,
        code_hash: &str,
        expires_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        query(UPSERT_OTP_CHALLENGE_SQL)
            .bind(phone)
            .bind(code_hash)
            .bind(SqlxTimestamp::from(expires_at))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub(crate) async fn get_otp_challenge(
        &self,
        phone: &str,
    ) -> Result<Option<OtpChallenge>, sqlx::Error> {
        query_as::<Postgres, OtpChallenge>(GET_OTP_CHALLENGE_SQL)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
    }

    pub(crate) async fn increment_otp_attempts(&self, phone: &str) -> Result<i32, sqlx::Error> {
        let row = query(INCREMENT_OTP_ATTEMPTS_SQL)
            .bind(phone)
            .fetch_one(&self.pool)
            .await?;

        row.try_get("attempts")
    }

    pub(crate) async fn delete_otp_challenge(&self, phone: &str) -> Result<(), sqlx::Error> {
        query(DELETE_OTP_CHALLENGE_SQL)
            .bind(phone)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

impl<'r> FromRow<'r, PgRow> for StoredUser {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let role: String = row.try_get("role")?;

        let role = UserRole::from_str(&role).map_err(|_| sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: format!("unrecognized role {role:?}").into(),
        })?;

        Ok(Self {
            user: User {
                uuid: row.try_get("uuid")?,
                username: row.try_get("username")?,
                email: row.try_get("email")?,
                phone: row.try_get("phone")?,
                google_id: row.try_get("google_id")?,
                avatar: row.try_get("avatar")?,
                role,
                created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
                updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
            },
            password_hash: row.try_get("password_hash")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for ActiveSession {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            user_uuid: row.try_get("user_uuid")?,
            token_hash: row.try_get("token_hash")?,
            expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
            revoked_at: row
                .try_get::<Option<SqlxTimestamp>, _>("revoked_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for OtpChallenge {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            code_hash: row.try_get("code_hash")?,
            attempts: row.try_get("attempts")?,
            expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
        })
    }
}
