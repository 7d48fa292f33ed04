use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use crate::database::errors::StoreError;
use crate::models::device_token::DeviceToken;
use crate::models::roles::Role;
use crate::models::ticket::Ticket;
use crate::repositories::device_repository::DeviceRepository;
use crate::repositories::role_repository::RoleRepository;

/// Category fragments that mark a supply or tool request. Those only concern admins.
pub const SUPPLY_KEYWORDS: [&str; 2] = ["tarvik", "töövahend"];

pub fn is_supply_category(category_name: &str) -> bool {
    let category = category_name.to_lowercase();
    SUPPLY_KEYWORDS.iter().any(|keyword| category.contains(keyword))
}

/// Roles that should hear about `ticket`. The supply override beats the safety rule.
pub fn audience_roles(ticket: &Ticket) -> HashSet<Role> {
    if is_supply_category(&ticket.category_name) {
        return HashSet::from([Role::Admin]);
    }

    let mut roles = HashSet::from([Role::Admin, Role::Maintenance]);
    if ticket.is_safety_related {
        roles.insert(Role::SafetyOfficer);
    }
    roles
}

pub struct TargetResolver {
    roles: Arc<dyn RoleRepository>,
    devices: Arc<dyn DeviceRepository>,
}

impl TargetResolver {
    pub fn new(roles: Arc<dyn RoleRepository>, devices: Arc<dyn DeviceRepository>) -> Self {
        Self { roles, devices }
    }

    /// Device registrations that should receive a notification for `ticket`,
    /// one entry per distinct token value.
    pub async fn resolve(&self, ticket: &Ticket) -> Result<Vec<DeviceToken>, StoreError> {
        let audience = audience_roles(ticket);
        let users = self.roles.users_with_roles(&audience).await?;

        if users.is_empty() {
            info!(ticket_id = %ticket.id, "No users hold the audience roles");
            return Ok(Vec::new());
        }

        let registrations = self.devices.tokens_for_users(&users).await?;

        let mut seen = HashSet::new();
        let tokens: Vec<DeviceToken> = registrations
            .into_iter()
            .filter(|device| seen.insert(device.token.clone()))
            .collect();

        debug!(
            ticket_id = %ticket.id,
            roles = ?audience,
            users = users.len(),
            tokens = tokens.len(),
            "Resolved notification audience"
        );
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device_token::Platform;
    use crate::repositories::memory::{InMemoryDeviceRepository, InMemoryRoleRepository};

    fn ticket(category: &str, safety: bool) -> Ticket {
        Ticket {
            id: "1".into(),
            category_name: category.into(),
            problem_type_name: "Muu".into(),
            location: "Aula".into(),
            is_safety_related: safety,
            status: "open".into(),
        }
    }

    #[test]
    fn test_base_audience() {
        assert_eq!(
            audience_roles(&ticket("Tehnika ja seadmed", false)),
            HashSet::from([Role::Admin, Role::Maintenance])
        );
    }

    #[test]
    fn test_safety_adds_safety_officer() {
        for category in ["Tehnika ja seadmed", "Küte ja ventilatsioon", "Elekter"] {
            let roles = audience_roles(&ticket(category, true));
            assert!(roles.contains(&Role::SafetyOfficer), "{}", category);
            assert!(roles.contains(&Role::Admin));
            assert!(roles.contains(&Role::Maintenance));
        }
    }

    #[test]
    fn test_supply_keyword_overrides_everything() {
        for category in ["Kontoritarvikud", "TÖÖVAHENDID", "Puhastustarvik", "Töövahendid ja tarvikud"] {
            for safety in [false, true] {
                assert_eq!(
                    audience_roles(&ticket(category, safety)),
                    HashSet::from([Role::Admin]),
                    "{} safety={}",
                    category,
                    safety
                );
            }
        }
    }

    #[tokio::test]
    async fn test_resolve_dedupes_users_and_tokens() {
        let roles = Arc::new(InMemoryRoleRepository::new());
        roles.grant("admin-1", Role::Admin).await;
        roles.grant("admin-1", Role::Maintenance).await;
        roles.grant("fixer-1", Role::Maintenance).await;
        roles.grant("officer-1", Role::SafetyOfficer).await;

        let devices = Arc::new(InMemoryDeviceRepository::new());
        devices.register(DeviceToken::new("tok-a", Platform::Android, "admin-1")).await;
        devices.register(DeviceToken::new("tok-b", Platform::Ios, "fixer-1")).await;
        // Same physical device re-registered under another account.
        devices.register(DeviceToken::new("tok-b", Platform::Ios, "admin-1")).await;
        devices.register(DeviceToken::new("tok-c", Platform::Web, "officer-1")).await;

        let resolver = TargetResolver::new(roles, devices);
        let mut tokens: Vec<String> = resolver
            .resolve(&ticket("Tehnika ja seadmed", false))
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.token)
            .collect();
        tokens.sort();

        assert_eq!(tokens, vec!["tok-a", "tok-b"]);
    }

    #[tokio::test]
    async fn test_resolve_without_matching_users_is_empty() {
        let roles = Arc::new(InMemoryRoleRepository::new());
        roles.grant("officer-1", Role::SafetyOfficer).await;
        let devices = Arc::new(InMemoryDeviceRepository::new());
        devices.register(DeviceToken::new("tok-c", Platform::Web, "officer-1")).await;

        let resolver = TargetResolver::new(roles, devices);
        let tokens = resolver.resolve(&ticket("Kontoritarvikud", true)).await.unwrap();
        assert!(tokens.is_empty());
    }
}
