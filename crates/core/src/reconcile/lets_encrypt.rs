// Let's Encrypt domains as entries of the single managed auto-cert manager

use super::{Mutation, Plan};
use crate::error::{CoreError, CoreResult};
use crate::lets_encrypt::{validate_domain, LetsEncryptConfig, MASKED_TOKEN};
use crate::naming::AUTO_CERT_MANAGER_NAME;
use crate::objects::{AutoCertManager, ObjectKind, ObjectSet};

const KIND: &str = "Let's Encrypt domain";

fn not_found(domain: &str) -> CoreError {
    CoreError::NotFound {
        kind: KIND,
        name: domain.to_string(),
    }
}

/// Every configured domain, sorted by domain name.
pub fn reconstruct_lets_encrypt(set: &ObjectSet) -> Vec<LetsEncryptConfig> {
    let Some(manager) = set.auto_cert_manager(AUTO_CERT_MANAGER_NAME) else {
        return Vec::new();
    };

    let mut configs: Vec<LetsEncryptConfig> = manager
        .domains
        .iter()
        .map(|domain| LetsEncryptConfig::from_domain(&manager.email, domain))
        .collect();
    configs.sort_by(|a, b| a.domain_name.cmp(&b.domain_name));
    configs
}

pub fn find_lets_encrypt(set: &ObjectSet, domain: &str) -> Option<LetsEncryptConfig> {
    let manager = set.auto_cert_manager(AUTO_CERT_MANAGER_NAME)?;
    manager
        .domain(domain)
        .map(|entry| LetsEncryptConfig::from_domain(&manager.email, entry))
}

pub fn plan_lets_encrypt_create(set: &ObjectSet, config: &LetsEncryptConfig) -> CoreResult<Plan> {
    config.validate()?;

    let mut plan = Plan::new();
    match set.auto_cert_manager(AUTO_CERT_MANAGER_NAME) {
        Some(existing) => {
            if existing.domain(&config.domain_name).is_some() {
                return Err(CoreError::AlreadyExists {
                    kind: KIND,
                    name: config.domain_name.clone(),
                });
            }
            let mut manager = existing.clone();
            manager.email = config.email.clone();
            manager.domains.push(config.to_domain(None));
            plan.push(Mutation::update(manager));
        }
        None => {
            // The admin API accepts a single auto-cert manager per cluster.
            if let Some(foreign) = set.auto_cert_managers().first() {
                return Err(CoreError::Conflict(format!(
                    "auto-cert manager {} is already configured",
                    foreign.name
                )));
            }
            plan.push(Mutation::create(AutoCertManager::managed(
                &config.email,
                vec![config.to_domain(None)],
            )));
        }
    }
    Ok(plan)
}

/// A masked or empty API token keeps the stored one. A stored DNS provider
/// outside the supported set may be kept but not newly chosen.
pub fn plan_lets_encrypt_update(set: &ObjectSet, config: &LetsEncryptConfig) -> CoreResult<Plan> {
    validate_domain(&config.domain_name)?;

    let existing = set
        .auto_cert_manager(AUTO_CERT_MANAGER_NAME)
        .ok_or_else(|| not_found(&config.domain_name))?;
    let index = existing
        .domains
        .iter()
        .position(|domain| domain.name == config.domain_name)
        .ok_or_else(|| not_found(&config.domain_name))?;

    let stored = LetsEncryptConfig::from_domain(&existing.email, &existing.domains[index]);
    let mut config = config.clone();
    if config.dns_provider_api_token.is_empty() || config.dns_provider_api_token == MASKED_TOKEN {
        config.dns_provider_api_token = stored.dns_provider_api_token;
    }
    if config.dns_provider_name == stored.dns_provider_name {
        config.validate_contact()?;
    } else {
        config.validate()?;
    }

    let mut manager = existing.clone();
    manager.email = config.email.clone();
    manager.domains[index] = config.to_domain(Some(&existing.domains[index]));

    let mut plan = Plan::new();
    if &manager != existing {
        plan.push(Mutation::update(manager));
    }
    Ok(plan)
}

pub fn plan_lets_encrypt_delete(set: &ObjectSet, domain: &str) -> CoreResult<Plan> {
    validate_domain(domain)?;

    let existing = set
        .auto_cert_manager(AUTO_CERT_MANAGER_NAME)
        .ok_or_else(|| not_found(domain))?;
    if existing.domain(domain).is_none() {
        return Err(not_found(domain));
    }

    let mut manager = existing.clone();
    manager.domains.retain(|entry| entry.name != domain);

    let mut plan = Plan::new();
    if manager.domains.is_empty() {
        plan.push(Mutation::delete(ObjectKind::AutoCertManager, manager.name));
    } else {
        plan.push(Mutation::update(manager));
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lets_encrypt::DnsProviderName;
    use crate::reconcile::RemoteObject;

    fn config(domain: &str) -> LetsEncryptConfig {
        LetsEncryptConfig {
            email: "ops@example.com".to_string(),
            domain_name: domain.to_string(),
            dns_provider_name: DnsProviderName::Cloudflare,
            dns_provider_zone: "example.com".to_string(),
            dns_provider_api_token: "token".to_string(),
        }
    }

    fn with_manager(manager: AutoCertManager) -> ObjectSet {
        ObjectSet::new(vec![], vec![], vec![manager])
    }

    fn created_manager(plan: &Plan) -> AutoCertManager {
        match &plan.mutations()[0] {
            Mutation::Create(RemoteObject::AutoCertManager(m))
            | Mutation::Update(RemoteObject::AutoCertManager(m)) => m.clone(),
            other => panic!("unexpected mutation {}", other),
        }
    }

    #[test]
    fn test_create_first_domain_creates_manager() {
        let plan = plan_lets_encrypt_create(&ObjectSet::default(), &config("example.com")).unwrap();
        assert_eq!(
            plan.summary(),
            vec!["create AutoCertManager mcp_auto_cert_manager"]
        );

        let manager = created_manager(&plan);
        assert!(manager.enable_dns01 && manager.enable_http01 && manager.enable_tls_alpn01);
        assert_eq!(manager.domains.len(), 1);

        let set = with_manager(manager);
        assert_eq!(reconstruct_lets_encrypt(&set), vec![config("example.com")]);
    }

    #[test]
    fn test_create_appends_domain() {
        let set = with_manager(AutoCertManager::managed(
            "old@example.com",
            vec![config("b.example.com").to_domain(None)],
        ));

        let plan = plan_lets_encrypt_create(&set, &config("a.example.com")).unwrap();
        let set = with_manager(created_manager(&plan));

        let all = reconstruct_lets_encrypt(&set);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].domain_name, "a.example.com");
        assert_eq!(all[1].email, "ops@example.com");
    }

    #[test]
    fn test_create_duplicate_and_foreign_manager() {
        let set = with_manager(AutoCertManager::managed(
            "ops@example.com",
            vec![config("example.com").to_domain(None)],
        ));
        assert!(matches!(
            plan_lets_encrypt_create(&set, &config("example.com")),
            Err(CoreError::AlreadyExists { .. })
        ));

        let mut foreign = AutoCertManager::managed("x@y.z", vec![]);
        foreign.name = "autocert".to_string();
        assert!(matches!(
            plan_lets_encrypt_create(&with_manager(foreign), &config("example.com")),
            Err(CoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_update_replaces_provider() {
        let set = with_manager(AutoCertManager::managed(
            "ops@example.com",
            vec![config("example.com").to_domain(None)],
        ));

        let mut changed = config("example.com");
        changed.dns_provider_name = DnsProviderName::Vultr;
        let plan = plan_lets_encrypt_update(&set, &changed).unwrap();
        assert_eq!(plan.len(), 1);

        let set = with_manager(created_manager(&plan));
        assert_eq!(find_lets_encrypt(&set, "example.com"), Some(changed));

        assert!(plan_lets_encrypt_update(&set, &find_lets_encrypt(&set, "example.com").unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_update_keeps_token_when_masked() {
        let set = with_manager(AutoCertManager::managed(
            "ops@example.com",
            vec![config("example.com").to_domain(None)],
        ));

        let mut changed = config("example.com").masked();
        changed.dns_provider_zone = "zone.example.com".to_string();
        let plan = plan_lets_encrypt_update(&set, &changed).unwrap();

        let stored = find_lets_encrypt(&with_manager(created_manager(&plan)), "example.com").unwrap();
        assert_eq!(stored.dns_provider_api_token, "token");
        assert_eq!(stored.dns_provider_zone, "zone.example.com");
    }

    #[test]
    fn test_create_without_dns_provider() {
        let minimal = LetsEncryptConfig {
            email: "ops@example.com".to_string(),
            domain_name: "example.com".to_string(),
            ..Default::default()
        };

        let plan = plan_lets_encrypt_create(&ObjectSet::default(), &minimal).unwrap();
        let manager = created_manager(&plan);
        assert!(manager.domains[0].dns_provider.is_none());
        assert_eq!(reconstruct_lets_encrypt(&with_manager(manager)), vec![minimal]);
    }

    #[test]
    fn test_update_email_of_domain_without_dns_provider() {
        let mut domain = config("example.com").to_domain(None);
        domain.dns_provider = None;
        let set = with_manager(AutoCertManager::managed("ops@example.com", vec![domain]));

        let mut changed = find_lets_encrypt(&set, "example.com").unwrap().masked();
        changed.email = "new@example.com".to_string();
        let plan = plan_lets_encrypt_update(&set, &changed).unwrap();

        let manager = created_manager(&plan);
        assert_eq!(manager.email, "new@example.com");
        assert!(manager.domains[0].dns_provider.is_none());
    }

    #[test]
    fn test_get_then_update_keeps_unsupported_provider() {
        let mut domain = config("example.com").to_domain(None);
        if let Some(provider) = domain.dns_provider.as_mut() {
            provider.name = "alidns".to_string();
        }
        let set = with_manager(AutoCertManager::managed("ops@example.com", vec![domain]));

        let got = find_lets_encrypt(&set, "example.com").unwrap().masked();
        assert_eq!(got.dns_provider_name.as_str(), "alidns");
        assert!(plan_lets_encrypt_update(&set, &got).unwrap().is_empty());

        let mut changed = got.clone();
        changed.dns_provider_zone = "zone.example.com".to_string();
        let plan = plan_lets_encrypt_update(&set, &changed).unwrap();
        let stored = created_manager(&plan).domains[0].dns_provider.clone().unwrap();
        assert_eq!(stored.name, "alidns");
        assert_eq!(stored.api_token, "token");

        let mut switched = got;
        switched.dns_provider_name = DnsProviderName::from("route53".to_string());
        assert!(matches!(
            plan_lets_encrypt_update(&set, &switched),
            Err(CoreError::Validation { field: "dnsProviderName", .. })
        ));
    }

    #[test]
    fn test_update_missing_domain() {
        assert!(matches!(
            plan_lets_encrypt_update(&ObjectSet::default(), &config("example.com")),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_domains() {
        let set = with_manager(AutoCertManager::managed(
            "ops@example.com",
            vec![
                config("a.example.com").to_domain(None),
                config("b.example.com").to_domain(None),
            ],
        ));

        let plan = plan_lets_encrypt_delete(&set, "a.example.com").unwrap();
        assert_eq!(
            plan.summary(),
            vec!["update AutoCertManager mcp_auto_cert_manager"]
        );

        let set = with_manager(created_manager(&plan));
        let plan = plan_lets_encrypt_delete(&set, "b.example.com").unwrap();
        assert_eq!(
            plan.summary(),
            vec!["delete AutoCertManager mcp_auto_cert_manager"]
        );

        assert!(matches!(
            plan_lets_encrypt_delete(&set, "c.example.com"),
            Err(CoreError::NotFound { .. })
        ));
    }
}
