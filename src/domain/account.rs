//! Account roles and credential rules

use super::DomainError;

pub const MIN_PASSWORD_LEN: usize = 8;

string_enum! {
    pub enum UserType {
        Client => "client",
        Provider => "provider",
        Admin => "admin",
    }
}

impl UserType {
    /// Roles that can be chosen at registration.
    pub fn is_self_service(self) -> bool {
        !matches!(self, UserType::Admin)
    }
}

/// Authenticated user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: UserType,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: UserType) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserType::Admin
    }

    /// Admins act on behalf of anyone.
    pub fn is_or_admin(&self, user_id: &str) -> bool {
        self.is_admin() || self.user_id == user_id
    }

    pub fn require_admin(&self) -> Result<(), DomainError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(DomainError::forbidden("administrator role required"))
        }
    }
}

pub fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::invalid(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Trimmed, lowercased email with a minimal shape check.
pub fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(DomainError::invalid(format!("invalid email '{}'", email))),
    }
}

pub fn full_name(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name.trim(), last_name.trim())
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_length() {
        assert!(validate_password("12345678").is_ok());
        assert!(matches!(validate_password("short"), Err(DomainError::Validation(_))));
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email(" Jane@Example.COM ").unwrap(), "jane@example.com");
        assert!(normalize_email("nobody").is_err());
        assert!(normalize_email("@example.com").is_err());
    }

    #[test]
    fn admins_cannot_self_register() {
        assert!(UserType::Client.is_self_service());
        assert!(!UserType::Admin.is_self_service());
        assert_eq!(full_name("Jane", ""), "Jane");
    }

    #[test]
    fn admin_actor_bypasses_ownership() {
        let admin = Actor::new("a", UserType::Admin);
        let client = Actor::new("c", UserType::Client);
        assert!(admin.is_or_admin("c"));
        assert!(client.is_or_admin("c"));
        assert!(!client.is_or_admin("p"));
        assert!(client.require_admin().is_err());
    }
}
