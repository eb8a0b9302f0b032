//! Auth service.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::{Span, Timestamp};
use mockall::automock;
use sqlx::{PgPool, error::ErrorKind};
use uuid::Uuid;

use crate::auth::{
    AuthServiceError, IssuedSession, NewUser, SessionTokenVersion, User, UserRole,
    google::{GoogleTokenVerifier, GoogleVerifyError},
    models::UserRecord,
    otp::{
        OTP_MAX_ATTEMPTS, OTP_TTL_MINUTES, OtpSender, generate_otp_code, hash_otp_code,
    },
    password::{hash_password, verify_password},
    repository::PgAuthRepository,
    token::{
        format_session_token, generate_session_token_secret, hash_session_token,
        parse_session_token,
    },
};

const SESSION_TTL_HOURS: i64 = 30 * 24;

const USERNAME_MIN_CHARS: usize = 5;
const USERNAME_MAX_CHARS: usize = 20;
const EMAIL_MIN_CHARS: usize = 6;
const EMAIL_MAX_CHARS: usize = 100;
const PASSWORD_MIN_CHARS: usize = 6;
const PASSWORD_MAX_CHARS: usize = 12;

#[derive(Clone)]
pub struct PgAuthService {
    repository: PgAuthRepository,
    google: Arc<dyn GoogleTokenVerifier>,
    otp: Arc<dyn OtpSender>,
}

impl PgAuthService {
    #[must_use]
    pub fn new(
        pool: PgPool,
        google: Arc<dyn GoogleTokenVerifier>,
        otp: Arc<dyn OtpSender>,
    ) -> Self {
        Self {
            repository: PgAuthRepository::new(pool),
            google,
            otp,
        }
    }

    /// Register a new account and sign it in.
    ///
    /// The role is always `user`; privilege escalation goes through
    /// [`Self::promote_to_admin`].
    ///
    /// # Errors
    ///
    /// Returns a validation error for out-of-range fields, `EmailTaken`
    /// or `PhoneTaken` for duplicates, and storage errors otherwise.
    pub async fn register(&self, new_user: NewUser) -> Result<IssuedSession, AuthServiceError> {
        let username = new_user.username.trim().to_string();
        let email = normalize_email(&new_user.email);
        let phone = new_user.phone.trim().to_string();

        validate_username(&username)?;
        validate_email(&email)?;
        validate_password(&new_user.password)?;

        if phone.is_empty() {
            return Err(AuthServiceError::InvalidInput("phone is required"));
        }

        if self.repository.find_user_by_email(&email).await?.is_some() {
            return Err(AuthServiceError::EmailTaken);
        }

        if self.repository.find_user_by_phone(&phone).await?.is_some() {
            return Err(AuthServiceError::PhoneTaken);
        }

        let user = self
            .repository
            .create_user(&UserRecord {
                uuid: Uuid::now_v7(),
                username,
                email: Some(email),
                phone: Some(phone),
                password_hash: Some(hash_password(&new_user.password)),
                google_id: None,
                avatar: None,
                role: UserRole::User,
            })
            .await
            .map_err(map_duplicate_user_error)?;

        self.issue_session(user).await
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` when the email is unknown, the
    /// account has no password, or the password does not match.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IssuedSession, AuthServiceError> {
        let stored = self
            .repository
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthServiceError::InvalidCredentials)?;

        let Some(password_hash) = stored.password_hash.as_deref() else {
            return Err(AuthServiceError::InvalidCredentials);
        };

        if !verify_password(password, password_hash) {
            return Err(AuthServiceError::InvalidCredentials);
        }

        self.issue_session(stored.user).await
    }

    /// Sign in with email and password, requiring the `admin` role.
    ///
    /// # Errors
    ///
    /// Returns `NotAdmin` for valid credentials on a non-admin account.
    pub async fn login_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IssuedSession, AuthServiceError> {
        let session = self.login(email, password).await?;

        if session.user.role != UserRole::Admin {
            return Err(AuthServiceError::NotAdmin);
        }

        Ok(session)
    }

    /// Revoke the session carried by `bearer_token`. Idempotent: a
    /// second call with the same token succeeds without effect.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed tokens or storage failures.
    pub async fn logout(&self, bearer_token: &str) -> Result<(), AuthServiceError> {
        let parsed = parse_session_token(bearer_token)?;

        self.repository.revoke_session(parsed.session_uuid).await?;

        Ok(())
    }

    /// Sign in with a Google ID token, provisioning the account on
    /// first use and linking by email when one already exists.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for rejected tokens and transport
    /// errors otherwise.
    pub async fn google_sign_in(&self, id_token: &str) -> Result<IssuedSession, AuthServiceError> {
        let claims = self.google.verify(id_token).await.map_err(|error| match error {
            GoogleVerifyError::Rejected => AuthServiceError::InvalidCredentials,
            other => AuthServiceError::Google(other),
        })?;

        if let Some(user) = self.repository.find_user_by_google_id(&claims.subject).await? {
            return self.issue_session(user).await;
        }

        let email = normalize_email(&claims.email);

        let user = match self.repository.find_user_by_email(&email).await? {
            Some(stored) => {
                self.repository
                    .link_google_identity(stored.user.uuid, &claims.subject, claims.picture.as_deref())
                    .await?
            }
            None => {
                let username = claims
                    .name
                    .clone()
                    .unwrap_or_else(|| email_local_part(&email).to_string());

                self.repository
                    .create_user(&UserRecord {
                        uuid: Uuid::now_v7(),
                        username,
                        email: Some(email),
                        phone: None,
                        password_hash: None,
                        google_id: Some(claims.subject.clone()),
                        avatar: claims.picture.clone(),
                        role: UserRole::User,
                    })
                    .await
                    .map_err(map_duplicate_user_error)?
            }
        };

        self.issue_session(user).await
    }

    /// Issue a verification code to `phone`, replacing any pending
    /// challenge for it.
    ///
    /// # Errors
    ///
    /// Returns a delivery error if the gateway rejects the message.
    pub async fn send_otp(&self, phone: &str) -> Result<(), AuthServiceError> {
        let phone = phone.trim();

        if phone.is_empty() {
            return Err(AuthServiceError::InvalidInput("phone is required"));
        }

        let code = generate_otp_code();
        let expires_at = expiry(Span::new().minutes(OTP_TTL_MINUTES));

        self.repository
            .upsert_otp_challenge(phone, &hash_otp_code(phone, &code), expires_at)
            .await?;

        self.otp.send_code(phone, &code).await?;

        Ok(())
    }

    /// Verify a code for `phone`. On success the challenge is consumed,
    /// a phone-only account is provisioned if none exists, and a session
    /// is issued.
    ///
    /// # Errors
    ///
    /// Returns `OtpRejected` for missing, expired, or mismatched codes
    /// and `OtpAttemptsExceeded` once the attempt budget is spent.
    pub async fn verify_otp(
        &self,
        phone: &str,
        code: &str,
    ) -> Result<IssuedSession, AuthServiceError> {
        let phone = phone.trim();

        let challenge = self
            .repository
            .get_otp_challenge(phone)
            .await?
            .ok_or(AuthServiceError::OtpRejected)?;

        if challenge.attempts >= OTP_MAX_ATTEMPTS {
            return Err(AuthServiceError::OtpAttemptsExceeded);
        }

        if Timestamp::now() > challenge.expires_at {
            return Err(AuthServiceError::OtpRejected);
        }

        if hash_otp_code(phone, code) != challenge.code_hash {
            let attempts = self.repository.increment_otp_attempts(phone).await?;

            if attempts >= OTP_MAX_ATTEMPTS {
                return Err(AuthServiceError::OtpAttemptsExceeded);
            }

            return Err(AuthServiceError::OtpRejected);
        }

        self.repository.delete_otp_challenge(phone).await?;

        let user = match self.repository.find_user_by_phone(phone).await? {
            Some(user) => user,
            None => {
                self.repository
                    .create_user(&UserRecord {
                        uuid: Uuid::now_v7(),
                        username: phone.to_string(),
                        email: None,
                        phone: Some(phone.to_string()),
                        password_hash: None,
                        google_id: None,
                        avatar: None,
                        role: UserRole::User,
                    })
                    .await
                    .map_err(map_duplicate_user_error)?
            }
        };

        self.issue_session(user).await
    }

    /// Grant the `admin` role to the account registered under `email`.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` when no account carries that email.
    pub async fn promote_to_admin(&self, email: &str) -> Result<User, AuthServiceError> {
        self.repository
            .promote_to_admin(&normalize_email(email))
            .await?
            .ok_or(AuthServiceError::UserNotFound)
    }

    async fn issue_session(&self, user: User) -> Result<IssuedSession, AuthServiceError> {
        let session_uuid = Uuid::now_v7();
        let version = SessionTokenVersion::V1;
        let secret = generate_session_token_secret();
        let token = format_session_token(session_uuid, version, &secret);
        let token_hash = hash_session_token(&session_uuid, version, &secret);
        let expires_at = expiry(Span::new().hours(SESSION_TTL_HOURS));

        self.repository
            .create_session(session_uuid, user.uuid, &token_hash, expires_at)
            .await?;

        Ok(IssuedSession { token, user })
    }
}

#[automock]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Resolve a bearer token to the user holding the session.
    async fn authenticate(&self, bearer_token: &str) -> Result<User, AuthServiceError>;

    /// Fetch a user by UUID.
    async fn profile(&self, user_uuid: Uuid) -> Result<User, AuthServiceError>;
}

#[async_trait]
impl AuthService for PgAuthService {
    async fn authenticate(&self, bearer_token: &str) -> Result<User, AuthServiceError> {
        let parsed =
            parse_session_token(bearer_token).map_err(|_| AuthServiceError::SessionNotFound)?;

        let session = self
            .repository
            .find_session(parsed.session_uuid)
            .await?
            .ok_or(AuthServiceError::SessionNotFound)?;

        if session.revoked_at.is_some() {
            return Err(AuthServiceError::SessionNotFound);
        }

        if Timestamp::now() > session.expires_at {
            return Err(AuthServiceError::SessionExpired);
        }

        let token_hash = hash_session_token(&parsed.session_uuid, parsed.version, &parsed.secret);

        if token_hash != session.token_hash {
            return Err(AuthServiceError::SessionNotFound);
        }

        self.repository
            .find_user_by_uuid(session.user_uuid)
            .await?
            .ok_or(AuthServiceError::UserNotFound)
    }

    async fn profile(&self, user_uuid: Uuid) -> Result<User, AuthServiceError> {
        self.repository
            .find_user_by_uuid(user_uuid)
            .await?
            .ok_or(AuthServiceError::UserNotFound)
    }
}

fn expiry(ttl: Span) -> Timestamp {
    Timestamp::now().checked_add(ttl).unwrap_or(Timestamp::MAX)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_local_part(email: &str) -> &str {
    email.split_once('@').map_or(email, |(local, _)| local)
}

fn validate_username(username: &str) -> Result<(), AuthServiceError> {
    let chars = username.chars().count();

    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&chars) {
        return Err(AuthServiceError::InvalidInput(
            "username must be between 5 and 20 characters",
        ));
    }

    Ok(())
}

fn validate_email(email: &str) -> Result<(), AuthServiceError> {
    let chars = email.chars().count();

    if !(EMAIL_MIN_CHARS..=EMAIL_MAX_CHARS).contains(&chars) {
        return Err(AuthServiceError::InvalidInput(
            "email must be between 6 and 100 characters",
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(AuthServiceError::InvalidInput("email is not valid"));
    };

    let domain_shape_ok = domain
        .split_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty());

    if local.is_empty() || !domain_shape_ok || email.contains(char::is_whitespace) {
        return Err(AuthServiceError::InvalidInput("email is not valid"));
    }

    Ok(())
}

fn validate_password(password: &str) -> Result<(), AuthServiceError> {
    let chars = password.chars().count();

    if !(PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&chars) {
        return Err(AuthServiceError::InvalidInput(
            "password must be between 6 and 12 characters",
        ));
    }

    Ok(())
}

fn map_duplicate_user_error(error: sqlx::Error) -> AuthServiceError {
    if let Some(db_error) = error.as_database_error() {
        if db_error.kind() == ErrorKind::UniqueViolation {
            return match db_error.constraint() {
                Some("users_phone_idx") => AuthServiceError::PhoneTaken,
                _ => AuthServiceError::EmailTaken,
            };
        }
    }

    AuthServiceError::Sql(error)
}
