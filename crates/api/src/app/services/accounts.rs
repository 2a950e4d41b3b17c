use stockyard_auth::permissions::USERS_MANAGE;
use stockyard_auth::user::{normalize_username, validate_password};
use stockyard_auth::{Principal, Role, User, hash_password, verify_login};
use stockyard_core::UserId;

use super::AppServices;
use crate::app::dto::{
    LoginRequest, LoginResponse, RegisterUserRequest, UpdateRoleRequest, UpdateUserRequest,
    UserView,
};
use crate::app::errors::{ApiError, ApiResult};
use crate::authz::require;

const INVALID_CREDENTIALS: &str = "invalid credentials";

impl AppServices {
    /// Exchange a username and password for a signed token.
    ///
    /// Unknown users and wrong passwords fail the same way.
    pub async fn login(&self, req: LoginRequest) -> ApiResult<LoginResponse> {
        let username = req.username.trim().to_string();
        let user = self.store.find_user_by_username(&username).await?;

        let password = req.password;
        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let verified = tokio::task::spawn_blocking(move || {
            verify_login(&password, stored_hash.as_deref())
        })
        .await
        .map_err(|err| ApiError::Internal(format!("password check aborted: {err}")))?;

        let user = match (user, verified) {
            (Some(user), Ok(())) => user,
            (None, _) => {
                tracing::warn!(username = %username, "login failed: unknown user");
                return Err(ApiError::Unauthenticated(INVALID_CREDENTIALS.into()));
            }
            (Some(_), Err(err)) => {
                tracing::warn!(username = %username, "login failed: bad password");
                return Err(err.into());
            }
        };

        let issued = self.jwt.issue(user.id, &user.username, user.role)?;
        tracing::info!(user_id = %user.id, role = %user.role, "login succeeded");
        Ok(LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            user_id: user.id,
            username: user.username,
            role: user.role,
        })
    }

    pub async fn register_user(&self, principal: &Principal, req: RegisterUserRequest) -> ApiResult<UserView> {
        require(principal, &USERS_MANAGE)?;

        let username = normalize_username(&req.username)?;
        validate_password(&req.password)?;
        let hash = hash_blocking(req.password).await?;
        let user = self.store.insert_user(&username, &hash, req.role).await?;

        tracing::info!(user_id = %user.id, role = %user.role, by = %principal.username, "user registered");
        Ok(user.into())
    }

    pub async fn list_users(&self, principal: &Principal) -> ApiResult<Vec<UserView>> {
        require(principal, &USERS_MANAGE)?;
        let users = self.store.list_users().await?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    pub async fn get_user(&self, principal: &Principal, id: &str) -> ApiResult<UserView> {
        require(principal, &USERS_MANAGE)?;
        let id: UserId = id.parse()?;
        Ok(self.load_user(id).await?.into())
    }

    /// Partial update of username, role and password.
    ///
    /// An admin cannot take the admin role away from their own account.
    pub async fn update_user(
        &self,
        principal: &Principal,
        id: &str,
        req: UpdateUserRequest,
    ) -> ApiResult<UserView> {
        require(principal, &USERS_MANAGE)?;
        let id: UserId = id.parse()?;

        let mut user = self.load_user(id).await?;
        if let Some(username) = req.username {
            user.username = normalize_username(&username)?;
        }
        if let Some(role) = req.role {
            ensure_not_self_demotion(principal, id, role)?;
            user.role = role;
        }
        if let Some(password) = req.password {
            validate_password(&password)?;
            user.password_hash = hash_blocking(password).await?;
        }
        self.store.update_user(&user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, by = %principal.username, "user updated");
        Ok(user.into())
    }

    pub async fn update_role(
        &self,
        principal: &Principal,
        id: &str,
        req: UpdateRoleRequest,
    ) -> ApiResult<UserView> {
        require(principal, &USERS_MANAGE)?;
        let id: UserId = id.parse()?;

        ensure_not_self_demotion(principal, id, req.role)?;
        let mut user = self.load_user(id).await?;
        user.role = req.role;
        self.store.update_user(&user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, by = %principal.username, "role changed");
        Ok(user.into())
    }

    pub async fn delete_user(&self, principal: &Principal, id: &str) -> ApiResult<()> {
        require(principal, &USERS_MANAGE)?;
        let id: UserId = id.parse()?;

        if id == principal.user_id {
            return Err(ApiError::InvariantViolation(
                "cannot delete your own account".into(),
            ));
        }
        self.store.delete_user(id).await?;
        tracing::info!(user_id = %id, by = %principal.username, "user deleted");
        Ok(())
    }

    /// Create the first admin account when no users exist yet.
    ///
    /// Returns `None` when accounts already exist.
    pub async fn bootstrap_admin(&self, username: &str, password: &str) -> ApiResult<Option<User>> {
        if self.store.count_users().await? > 0 {
            return Ok(None);
        }

        let username = normalize_username(username)?;
        validate_password(password)?;
        let hash = hash_blocking(password.to_string()).await?;
        let user = self.store.insert_user(&username, &hash, Role::Admin).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "bootstrap admin created");
        Ok(Some(user))
    }

    async fn load_user(&self, id: UserId) -> ApiResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("user {id}")))
    }
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn hash_blocking(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|err| ApiError::Internal(format!("password hashing aborted: {err}")))?
        .map_err(ApiError::from)
}

fn ensure_not_self_demotion(principal: &Principal, target: UserId, role: Role) -> ApiResult<()> {
    if target == principal.user_id && principal.role == Role::Admin && role != Role::Admin {
        return Err(ApiError::InvariantViolation(
            "cannot remove the admin role from your own account".into(),
        ));
    }
    Ok(())
}
