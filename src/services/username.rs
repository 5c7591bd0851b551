use crate::db::repo::ProfileRepo;
use crate::services::{ServiceError, ServiceResult};
use linkbio_core::{Username, UsernameRules, ValidationResult, describe_transformation, suggest_username};
use serde::Serialize;
use std::sync::Arc;

/// What the username field shows while the user types.
#[derive(Debug, Clone, Serialize)]
pub struct UsernameCheck {
    #[serde(flatten)]
    pub validation: ValidationResult,
    /// First error, the one shown next to the field
    pub message: Option<String>,
    /// e.g. "Automatically converted to lowercase, spaces replaced with dashes"
    pub transformation: Option<String>,
    /// Only looked up for valid tokens
    pub available: Option<bool>,
}

pub struct UsernameService {
    rules: Arc<UsernameRules>,
    profiles: Arc<dyn ProfileRepo>,
}

impl UsernameService {
    pub fn new(rules: Arc<UsernameRules>, profiles: Arc<dyn ProfileRepo>) -> Self {
        Self { rules, profiles }
    }

    pub fn validate(&self, raw: &str) -> ValidationResult {
        self.rules.validate(raw)
    }

    pub async fn check(&self, raw: &str) -> ServiceResult<UsernameCheck> {
        let validation = self.rules.validate(raw);
        let transformation = describe_transformation(raw, &validation.sanitized);
        let available = if validation.is_valid {
            Some(!self.profiles.username_exists(&validation.sanitized).await?)
        } else {
            None
        };

        Ok(UsernameCheck {
            message: validation.first_error().map(ToString::to_string),
            validation,
            transformation,
            available,
        })
    }

    /// Prefill for the setup form, derived from the display name or else the email.
    pub async fn suggest(&self, display_name: &str, email: &str) -> ServiceResult<UsernameCheck> {
        self.check(&suggest_username(display_name, email)).await
    }

    /// Sanitizes `raw` and makes sure nobody holds the result yet.
    pub async fn claimable(&self, raw: &str) -> ServiceResult<Username> {
        let validation = self.rules.validate(raw);
        if let Some(issue) = validation.first_error() {
            return Err(issue.clone().into());
        }

        let username = self.rules.parse(&validation.sanitized)?;
        if self.profiles.username_exists(username.as_str()).await? {
            return Err(ServiceError::UsernameTaken(username.into_inner()));
        }
        Ok(username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::{AccountRepo, MemoryRepository};
    use crate::models::account::Account;
    use crate::models::profile::Profile;

    async fn service_with_taken(name: &str) -> UsernameService {
        let repo = Arc::new(MemoryRepository::new());
        let account = repo
            .insert_account(Account::new("taken@example.com".into(), "hash".into()))
            .await
            .unwrap();
        repo.insert_profile(Profile::new(account.id, name.into(), None))
            .await
            .unwrap();
        UsernameService::new(Arc::new(UsernameRules::default()), repo)
    }

    #[tokio::test]
    async fn check_reports_transformation_and_availability() {
        let svc = service_with_taken("john-doe").await;

        let check = svc.check("John Doe").await.unwrap();
        assert_eq!(check.validation.sanitized, "john-doe");
        assert!(check.validation.is_valid);
        assert_eq!(check.available, Some(false));
        assert_eq!(
            check.transformation.as_deref(),
            Some("Automatically converted to lowercase, spaces replaced with dashes")
        );

        let free = svc.check("jane").await.unwrap();
        assert_eq!(free.available, Some(true));
        assert!(free.transformation.is_none());
    }

    #[tokio::test]
    async fn invalid_tokens_skip_the_lookup() {
        let svc = service_with_taken("john-doe").await;
        let check = svc.check("ab").await.unwrap();
        assert!(!check.validation.is_valid);
        assert_eq!(check.available, None);
        assert_eq!(
            check.message.as_deref(),
            Some("Username must be at least 3 characters long")
        );
    }

    #[tokio::test]
    async fn suggestion_falls_back_to_email_and_checks_availability() {
        let svc = service_with_taken("john-doe").await;

        let s = svc.suggest("John Doe", "jd@example.com").await.unwrap();
        assert_eq!(s.validation.sanitized, "john-doe");
        assert_eq!(s.available, Some(false));

        let s = svc.suggest("  ", "Grace_H@example.com").await.unwrap();
        assert_eq!(s.validation.sanitized, "grace-h");
        assert_eq!(s.available, Some(true));

        let s = svc.suggest("", "admin@example.com").await.unwrap();
        assert!(!s.validation.is_valid);
        assert_eq!(s.available, None);
    }

    #[tokio::test]
    async fn claimable_rejects_reserved_and_taken() {
        let svc = service_with_taken("john-doe").await;

        assert_eq!(svc.claimable("  Jane_Doe ").await.unwrap().as_str(), "jane-doe");
        assert!(matches!(
            svc.claimable("Admin").await,
            Err(ServiceError::Validation { field: "username", .. })
        ));
        assert!(matches!(
            svc.claimable("John Doe").await,
            Err(ServiceError::UsernameTaken(name)) if name == "john-doe"
        ));
    }
}
