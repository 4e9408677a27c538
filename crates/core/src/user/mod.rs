//! User accounts and credentials.

mod model;
mod password;

pub use model::*;
pub use password::{hash_password, validate_password, verify_password};

use chrono::Utc;
use uuid::Uuid;

use crate::pagination::Page;
use crate::store::Database;
use crate::{Error, Result};

pub(crate) fn normalize_email(email: &str) -> Result<String> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() || !normalized.contains('@') {
        return Err(Error::invalid("Invalid email"));
    }
    Ok(normalized)
}

impl Database {
    /// Create a user, hashing the password. Emails are unique across tenants.
    pub async fn create_user(&self, new: NewUser) -> Result<User> {
        let email = normalize_email(&new.email)?;
        validate_password(&new.password)?;
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::invalid("Name cannot be empty"));
        }
        match (new.role, new.tenant_id) {
            (UserRole::SuperAdmin, Some(_)) => {
                return Err(Error::invalid("Super admins cannot belong to a tenant"));
            }
            (role, None) if role != UserRole::SuperAdmin => {
                return Err(Error::invalid("Tenant is required for this role"));
            }
            _ => {}
        }
        if let Some(tenant_id) = new.tenant_id {
            self.tenants.require(tenant_id).await?;
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            tenant_id: new.tenant_id,
            email,
            name,
            role: new.role,
            password_hash: hash_password(&new.password),
            created_at: now,
            updated_at: now,
        };
        self.users
            .insert_checked(user, |user, existing| {
                if existing.values().any(|other| other.email == user.email) {
                    return Err(Error::Duplicate(format!(
                        "User '{}' already exists",
                        user.email
                    )));
                }
                Ok(())
            })
            .await
    }

    /// Check credentials. Unknown email and wrong password are indistinguishable.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email)?;
        let user = self
            .users
            .find(|user| user.email == email)
            .await
            .ok_or_else(|| Error::Unauthorized("Invalid email or password".to_string()))?;
        if !verify_password(&user.password_hash, password) {
            return Err(Error::Unauthorized("Invalid email or password".to_string()));
        }
        Ok(user)
    }

    pub async fn list_users(&self, query: &UserQuery) -> Page<User> {
        let users = self
            .users
            .filter(|user| {
                query.tenant_id.is_none_or(|id| user.tenant_id == Some(id))
                    && query.role.is_none_or(|role| user.role == role)
            })
            .await;
        query.page_request().apply(users)
    }

    /// Create the bootstrap super admin if no user with that email exists.
    pub async fn ensure_super_admin(&self, email: &str, password: &str) -> Result<User> {
        let normalized = normalize_email(email)?;
        if let Some(user) = self.users.find(|user| user.email == normalized).await {
            return Ok(user);
        }
        self.create_user(NewUser {
            tenant_id: None,
            email: normalized,
            name: "Administrator".to_string(),
            password: password.to_string(),
            role: UserRole::SuperAdmin,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::tenant::NewTenant;

    async fn build_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path()).await.unwrap();
        (db, temp_dir)
    }

    #[tokio::test]
    async fn create_and_authenticate() {
        let (db, _temp) = build_db().await;
        let tenant = db
            .create_tenant(NewTenant {
                name: "Azure Seas".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let user = db
            .create_user(NewUser::customer(tenant.id, "Guest@Example.com", "Guest", "verysecurepw"))
            .await
            .unwrap();
        assert_eq!(user.email, "guest@example.com");

        let authed = db.authenticate("guest@example.com", "verysecurepw").await.unwrap();
        assert_eq!(authed.id, user.id);

        let wrong = db.authenticate("guest@example.com", "wrong-password").await;
        assert!(matches!(wrong, Err(Error::Unauthorized(_))));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (db, _temp) = build_db().await;
        db.ensure_super_admin("root@example.com", "verysecurepw")
            .await
            .unwrap();

        let again = db
            .create_user(NewUser {
                tenant_id: None,
                email: "ROOT@example.com".to_string(),
                name: "Other".to_string(),
                password: "verysecurepw".to_string(),
                role: UserRole::SuperAdmin,
            })
            .await;
        assert!(matches!(again, Err(Error::Duplicate(_))));
    }

    #[tokio::test]
    async fn ensure_super_admin_is_idempotent() {
        let (db, _temp) = build_db().await;
        let first = db
            .ensure_super_admin("root@example.com", "verysecurepw")
            .await
            .unwrap();
        let second = db
            .ensure_super_admin("root@example.com", "different-pw")
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn tenant_roles_require_a_tenant() {
        let (db, _temp) = build_db().await;
        let result = db
            .create_user(NewUser {
                tenant_id: None,
                email: "agent@example.com".to_string(),
                name: "Agent".to_string(),
                password: "verysecurepw".to_string(),
                role: UserRole::Agent,
            })
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
