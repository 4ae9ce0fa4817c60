/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TYPE account_type AS ENUM ('watcher', 'contributor', 'team_leader', 'superuser');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(150) NOT NULL UNIQUE,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     first_name VARCHAR(150) NOT NULL DEFAULT '',
///     last_name VARCHAR(150) NOT NULL DEFAULT '',
///     password_hash VARCHAR(255) NOT NULL,
///     account_type account_type NOT NULL DEFAULT 'watcher',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     -- audit columns, see crate::audit
/// );
///
/// CREATE TABLE user_teams (
///     user_id UUID NOT NULL REFERENCES users(id),
///     team_id UUID NOT NULL REFERENCES teams(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (user_id, team_id)
/// );
/// ```
///
/// Self-registered users have no `created_by`. Disabling an account clears
/// `is_active` and soft-deletes the row in the same statement.
///
/// # Example
///
/// ```no_run
/// use bugimprints_shared::audit::AuditTrail;
/// use bugimprints_shared::models::user::{AccountType, CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(
///     &pool,
///     CreateUser {
///         username: "alice".to_string(),
///         email: "alice@example.com".to_string(),
///         first_name: "Alice".to_string(),
///         last_name: "Doe".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///         account_type: AccountType::Contributor,
///     },
///     &AuditTrail::self_registered(chrono::Utc::now()),
/// )
/// .await?;
///
/// let found = User::find_by_email(&pool, "alice@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::audit::{AuditTrail, Audited, Stamp, Table};

/// Account type of a user
///
/// Only `Superuser` carries global privileges. Team leadership is a property
/// of a team (`teams.leader_id`), not of the account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Watcher,
    Contributor,
    TeamLeader,
    Superuser,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Watcher => "watcher",
            AccountType::Contributor => "contributor",
            AccountType::TeamLeader => "team_leader",
            AccountType::Superuser => "superuser",
        }
    }

    /// Parses either the full name or the single-letter code (W/C/T/S)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "w" | "watcher" => Some(AccountType::Watcher),
            "c" | "contributor" => Some(AccountType::Contributor),
            "t" | "team_leader" => Some(AccountType::TeamLeader),
            "s" | "superuser" => Some(AccountType::Superuser),
            _ => None,
        }
    }

    pub fn is_superuser(&self) -> bool {
        matches!(self, AccountType::Superuser)
    }
}

impl Default for AccountType {
    fn default() -> Self {
        AccountType::Watcher
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,

    /// Argon2id PHC string; never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub account_type: AccountType,
    pub is_active: bool,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditTrail,
}

impl Audited for User {
    const TABLE: Table = Table::Users;
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Input for creating a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub account_type: AccountType,
}

impl User {
    /// Inserts a user with the given audit trail
    ///
    /// # Errors
    ///
    /// Unique violations on `users_email_key` / `users_username_key` surface as
    /// `sqlx::Error::Database`.
    pub async fn create<'e, E>(
        executor: E,
        data: CreateUser,
        audit: &AuditTrail,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, first_name, last_name, password_hash, account_type,
                               created_at, modified_at, created_by, modified_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(data.username)
        .bind(data.email.to_lowercase())
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.password_hash)
        .bind(data.account_type)
        .bind(audit.created_at)
        .bind(audit.modified_at)
        .bind(audit.created_by)
        .bind(audit.modified_by)
        .fetch_one(executor)
        .await
    }

    /// Finds a live (not soft-deleted) user by id
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a live user by email (case-insensitive)
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = LOWER($1) AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(executor)
        .await
    }

    /// Whether any row holds `username`, deleted rows included
    pub async fn username_exists<'e, E>(executor: E, username: &str) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(executor)
            .await
    }

    /// Lists live, active users, oldest first
    pub async fn list<'e, E>(executor: E, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE deleted_at IS NULL AND is_active
            ORDER BY created_at ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    /// Ids of the live teams the user currently belongs to
    pub async fn team_ids<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT ut.team_id
            FROM user_teams ut
            JOIN teams t ON t.id = ut.team_id
            WHERE ut.user_id = $1 AND t.deleted_at IS NULL
            ORDER BY ut.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Links the user to a team
    ///
    /// Returns `false` if the link already existed.
    pub async fn add_team<'e, E>(executor: E, user_id: Uuid, team_id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO user_teams (user_id, team_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, team_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(team_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Unlinks the user from a team
    ///
    /// Returns `false` if the user was not a member.
    pub async fn remove_team<'e, E>(executor: E, user_id: Uuid, team_id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM user_teams WHERE user_id = $1 AND team_id = $2")
            .bind(user_id)
            .bind(team_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Re-stamps the modifier of a live user
    pub async fn touch<'e, E>(executor: E, id: Uuid, stamp: &Stamp) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users SET modified_at = $2, modified_by = $3
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(stamp.at)
        .bind(stamp.actor)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Changes the account type of a live user
    pub async fn set_account_type<'e, E>(
        executor: E,
        id: Uuid,
        account_type: AccountType,
        stamp: &Stamp,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET account_type = $2, modified_at = $3, modified_by = $4
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(account_type)
        .bind(stamp.at)
        .bind(stamp.actor)
        .fetch_optional(executor)
        .await
    }

    /// Disables an account: clears `is_active` and soft-deletes the row
    ///
    /// Returns `false` if the user is absent or already deleted.
    pub async fn disable<'e, E>(executor: E, id: Uuid, stamp: &Stamp) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_active = FALSE,
                deleted_at = $2, deleted_by = $3,
                modified_at = $2, modified_by = $3
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(stamp.at)
        .bind(stamp.actor)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether any live superuser exists
    pub async fn superuser_exists<'e, E>(executor: E) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE account_type = 'superuser' AND deleted_at IS NULL AND is_active
            )
            "#,
        )
        .fetch_one(executor)
        .await
    }
}
