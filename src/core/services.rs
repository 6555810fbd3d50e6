use std::sync::Arc;

use crate::core::context::RequestContext;
use crate::core::credentials::PasswordHasher;
use crate::core::errors::AppError;
use crate::core::models::{Account, AccountDraft, AccountPatch, User, UserDraft, UserPatch};
use crate::core::validation;
use crate::infrastructure::storage::Repository;

const USER: &str = "user";
const ACCOUNT: &str = "account";

/// User lifecycle: validate, stamp, persist. Holds no mutable state of its own.
pub struct UserService<R: Repository<User>> {
    repository: R,
}

impl<R: Repository<User>> UserService<R> {
    pub fn new(repository: R) -> Self {
        UserService { repository }
    }

    /// Any id or timestamps on the draft are discarded; the store assigns the id.
    pub async fn create(&self, ctx: &RequestContext, draft: UserDraft) -> Result<User, AppError> {
        let user = User::new(draft.email, draft.first_name, draft.last_name)?;
        ctx.run(self.repository.insert(user)).await
    }

    pub async fn get(&self, ctx: &RequestContext, id: &str) -> Result<User, AppError> {
        validation::require_id(id)?;
        ctx.run(self.repository.find_by_id(id))
            .await?
            .ok_or_else(|| AppError::not_found(USER, id))
    }

    /// Re-stamps `updated_at`; `created_at` and `id` are carried over from the stored user.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        patch: UserPatch,
    ) -> Result<User, AppError> {
        validation::require_id(id)?;
        validation::check_email_change(patch.email.as_deref())?;
        let current = self.get(ctx, id).await?;
        let updated = current.apply(patch);
        ctx.run(self.repository.update(id, updated))
            .await?
            .ok_or_else(|| AppError::not_found(USER, id))
    }

    pub async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<(), AppError> {
        validation::require_id(id)?;
        if ctx.run(self.repository.delete(id)).await? {
            Ok(())
        } else {
            Err(AppError::not_found(USER, id))
        }
    }
}

/// Credential-bearing variant. Passwords pass through the hasher before they
/// reach the repository, on create and on every change.
pub struct AccountService<R: Repository<Account>> {
    repository: R,
    hasher: Arc<dyn PasswordHasher>,
}

impl<R: Repository<Account>> AccountService<R> {
    pub fn new(repository: R, hasher: Arc<dyn PasswordHasher>) -> Self {
        AccountService { repository, hasher }
    }

    pub async fn register(
        &self,
        ctx: &RequestContext,
        draft: AccountDraft,
    ) -> Result<Account, AppError> {
        validation::require_email(&draft.email)?;
        validation::require_password(&draft.password)?;
        let password_hash = self.hash_password(draft.password).await?;
        let account = Account::new(draft.email, password_hash, draft.first_name, draft.last_name)?;
        ctx.run(self.repository.insert(account)).await
    }

    pub async fn get(&self, ctx: &RequestContext, id: &str) -> Result<Account, AppError> {
        validation::require_id(id)?;
        ctx.run(self.repository.find_by_id(id))
            .await?
            .ok_or_else(|| AppError::not_found(ACCOUNT, id))
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        patch: AccountPatch,
    ) -> Result<Account, AppError> {
        validation::require_id(id)?;
        validation::check_email_change(patch.email.as_deref())?;
        validation::check_password_change(patch.password.as_deref())?;

        let mut account = self.get(ctx, id).await?;
        if let Some(password) = patch.password {
            account.password_hash = self.hash_password(password).await?;
        }
        if let Some(email) = patch.email {
            account.email = email;
        }
        if let Some(first_name) = patch.first_name {
            account.first_name = Some(first_name);
        }
        if let Some(last_name) = patch.last_name {
            account.last_name = Some(last_name);
        }
        account.touch();
        self.save(ctx, id, account).await
    }

    /// Soft delete: the account stays readable with `active == false`.
    pub async fn deactivate(&self, ctx: &RequestContext, id: &str) -> Result<Account, AppError> {
        let account = self.get(ctx, id).await?.deactivate();
        self.save(ctx, id, account).await
    }

    /// Runs the hasher on the blocking pool.
    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("password hashing task failed: {}", e)))?
    }

    async fn save(
        &self,
        ctx: &RequestContext,
        id: &str,
        account: Account,
    ) -> Result<Account, AppError> {
        ctx.run(self.repository.update(id, account))
            .await?
            .ok_or_else(|| AppError::not_found(ACCOUNT, id))
    }
}
