use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracing::info;

use super::{ForumService, ListQuery};
use crate::db::{now_timestamp, parsed_at, timestamp_at};
use crate::error::{ActionError, ActionResult};
use crate::models::{Account, AccountId, Provider, User, UserId, UserPage, has_next};
use crate::utils::slugify;
use crate::validation::{
    CreateAccountParams, CreateUserParams, GetUsersParams, SignInWithOAuthParams,
    UpdateUserParams,
};

const USER_COLUMNS: &str = "id, name, username, email, image, created_at";
const ACCOUNT_COLUMNS: &str = "id, user_id, name, image, provider, provider_account_id";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId::new(row.get(0)?),
        name: row.get(1)?,
        username: row.get(2)?,
        email: row.get(3)?,
        image: row.get(4)?,
        created_at: timestamp_at(row, 5)?,
    })
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: AccountId::new(row.get(0)?),
        user_id: UserId::new(row.get(1)?),
        name: row.get(2)?,
        image: row.get(3)?,
        provider: parsed_at(row, 4)?,
        provider_account_id: row.get(5)?,
    })
}

fn fetch_user(conn: &Connection, id: UserId) -> ActionResult<User> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id.get()],
        user_from_row,
    )
    .optional()?
    .ok_or(ActionError::NotFound("User"))
}

fn find_user_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        [email.trim()],
        user_from_row,
    )
    .optional()
}

/// Whether `username` is taken by anyone other than `except`.
fn username_taken(conn: &Connection, username: &str, except: Option<UserId>) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND id IS NOT ?2)",
        params![username, except.map(UserId::get)],
        |row| row.get(0),
    )
}

fn insert_user(
    conn: &Connection,
    name: &str,
    username: &str,
    email: &str,
    image: Option<&str>,
) -> ActionResult<UserId> {
    if find_user_by_email(conn, email)?.is_some() {
        return Err(ActionError::invalid_field("email", "User already exists"));
    }
    if username_taken(conn, username, None)? {
        return Err(ActionError::invalid_field("username", "Username already exists"));
    }

    conn.execute(
        "INSERT INTO users (name, username, email, image, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![name.trim(), username, email.trim(), image, now_timestamp()],
    )?;
    Ok(UserId::new(conn.last_insert_rowid()))
}

fn find_account(
    conn: &Connection,
    provider: Provider,
    provider_account_id: &str,
) -> rusqlite::Result<Option<Account>> {
    conn.query_row(
        &format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE provider = ?1 AND provider_account_id = ?2"
        ),
        params![provider.as_str(), provider_account_id],
        account_from_row,
    )
    .optional()
}

fn insert_account(
    conn: &Connection,
    user_id: UserId,
    name: &str,
    image: Option<&str>,
    provider: Provider,
    provider_account_id: &str,
) -> ActionResult<AccountId> {
    conn.execute(
        "INSERT INTO accounts (user_id, name, image, provider, provider_account_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user_id.get(),
            name.trim(),
            image,
            provider.as_str(),
            provider_account_id,
            now_timestamp()
        ],
    )?;
    Ok(AccountId::new(conn.last_insert_rowid()))
}

impl ForumService {
    /// Registers a user.
    ///
    /// # Errors
    ///
    /// A validation error on `email` or `username` when either is already
    /// registered (compared ignoring case).
    pub fn create_user(&self, params: CreateUserParams) -> ActionResult<User> {
        params.validate()?;

        let user = self.db.unit_of_work(|conn| {
            let id = insert_user(
                conn,
                &params.name,
                params.username.trim(),
                &params.email,
                params.image.as_deref(),
            )?;
            fetch_user(conn, id)
        })?;

        info!(user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    pub fn get_user(&self, id: UserId) -> ActionResult<User> {
        fetch_user(self.db.connection(), id)
    }

    pub fn get_user_by_email(&self, email: &str) -> ActionResult<User> {
        find_user_by_email(self.db.connection(), email)?.ok_or(ActionError::NotFound("User"))
    }

    /// Lists users, optionally matching `query` against name and username.
    pub fn get_users(&self, params: GetUsersParams) -> ActionResult<UserPage> {
        params.validate()?;
        let conn = self.db.connection();

        let mut query = ListQuery::default();
        query.search(
            "(u.name LIKE ? ESCAPE '\\' OR u.username LIKE ? ESCAPE '\\')",
            params.query.as_deref(),
        );
        let where_clause = query.where_clause();

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM users u{where_clause}"),
            params_from_iter(query.args()),
            |row| row.get(0),
        )?;

        let limit = params.pagination.limit();
        let offset = params.pagination.offset();
        let sql = format!(
            "SELECT {USER_COLUMNS}
             FROM users u{where_clause}
             ORDER BY {}
             LIMIT ? OFFSET ?",
            params.filter.order_by()
        );
        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map(params_from_iter(query.paged_args(limit, offset)), user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let is_next = has_next(total, offset, users.len());
        Ok(UserPage { users, is_next })
    }

    /// Applies a partial update; absent fields keep their values.
    pub fn update_user(&self, id: UserId, params: UpdateUserParams) -> ActionResult<User> {
        params.validate()?;

        self.db.unit_of_work(|conn| {
            let current = fetch_user(conn, id)?;
            if params.is_empty() {
                return Ok(current);
            }

            let username = params.username.as_deref().map(str::trim);
            if let Some(username) = username {
                if username_taken(conn, username, Some(id))? {
                    return Err(ActionError::invalid_field("username", "Username already exists"));
                }
            }

            conn.execute(
                "UPDATE users
                 SET name = COALESCE(?1, name),
                     username = COALESCE(?2, username),
                     image = COALESCE(?3, image)
                 WHERE id = ?4",
                params![
                    params.name.as_deref().map(str::trim),
                    username,
                    params.image,
                    id.get()
                ],
            )?;
            info!(user_id = %id, "user updated");
            fetch_user(conn, id)
        })
    }

    /// Links a user to an identity provider account.
    ///
    /// # Errors
    ///
    /// Forbidden when the provider account is already linked, NotFound when
    /// the user does not exist.
    pub fn create_account(&self, params: CreateAccountParams) -> ActionResult<Account> {
        params.validate()?;

        let account = self.db.unit_of_work(|conn| {
            fetch_user(conn, params.user_id)?;
            if find_account(conn, params.provider, &params.provider_account_id)?.is_some() {
                return Err(ActionError::forbidden(
                    "An account with this provider already exists",
                ));
            }

            insert_account(
                conn,
                params.user_id,
                &params.name,
                params.image.as_deref(),
                params.provider,
                &params.provider_account_id,
            )?;
            find_account(conn, params.provider, &params.provider_account_id)?
                .ok_or(ActionError::NotFound("Account"))
        })?;

        info!(account_id = %account.id, provider = %account.provider, "account linked");
        Ok(account)
    }

    /// Looks up an account by the provider's id for it.
    pub fn get_account_by_provider(&self, provider_account_id: &str) -> ActionResult<Account> {
        self.db
            .connection()
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE provider_account_id = ?1"),
                [provider_account_id],
                account_from_row,
            )
            .optional()?
            .ok_or(ActionError::NotFound("Account"))
    }

    /// Signs a user in through an OAuth provider.
    ///
    /// Finds the user by email or creates one with a slugified username,
    /// refreshes a changed name or image, and links the provider account if
    /// it is not linked yet. Runs as one transaction.
    ///
    /// # Errors
    ///
    /// Forbidden when the provider account already belongs to another user.
    pub fn sign_in_with_oauth(&self, params: SignInWithOAuthParams) -> ActionResult<User> {
        params.validate()?;
        let SignInWithOAuthParams {
            provider,
            provider_account_id,
            user: profile,
        } = params;

        let user = self.db.unit_of_work(|conn| {
            let user_id = match find_user_by_email(conn, &profile.email)? {
                Some(existing) => {
                    if existing.name != profile.name.trim() || existing.image != profile.image {
                        conn.execute(
                            "UPDATE users SET name = ?1, image = ?2 WHERE id = ?3",
                            params![profile.name.trim(), profile.image, existing.id.get()],
                        )?;
                    }
                    existing.id
                }
                None => {
                    let username = slugify(&profile.username);
                    if username.is_empty() {
                        return Err(ActionError::invalid_field(
                            "username",
                            "Username must contain letters or digits.",
                        ));
                    }
                    insert_user(
                        conn,
                        &profile.name,
                        &username,
                        &profile.email,
                        profile.image.as_deref(),
                    )?
                }
            };

            match find_account(conn, provider, &provider_account_id)? {
                Some(account) if account.user_id != user_id => {
                    return Err(ActionError::forbidden(
                        "An account with this provider already exists",
                    ));
                }
                Some(_) => {}
                None => {
                    insert_account(
                        conn,
                        user_id,
                        &profile.name,
                        profile.image.as_deref(),
                        provider,
                        &provider_account_id,
                    )?;
                }
            }

            fetch_user(conn, user_id)
        })?;

        info!(user_id = %user.id, provider = %provider, "oauth sign-in");
        Ok(user)
    }
}
