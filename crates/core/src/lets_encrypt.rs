//! Let's Encrypt certificate settings, one entry per domain of the managed
//! auto-cert manager.

use crate::error::{CoreError, CoreResult};
use crate::objects::{AutoCertDomain, DnsProvider, Extra};
use serde::{Deserialize, Serialize};

/// DNS provider for the DNS-01 challenge.
///
/// New settings must name one of [`DnsProviderName::SUPPORTED`]. Names
/// configured by other means are kept as `Other` so they survive a
/// read-modify-write cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DnsProviderName {
    #[default]
    Cloudflare,
    Digitalocean,
    Dnspod,
    Duckdns,
    Vultr,
    Other(String),
}

impl DnsProviderName {
    pub const SUPPORTED: [&'static str; 5] =
        ["cloudflare", "digitalocean", "dnspod", "duckdns", "vultr"];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Cloudflare => "cloudflare",
            Self::Digitalocean => "digitalocean",
            Self::Dnspod => "dnspod",
            Self::Duckdns => "duckdns",
            Self::Vultr => "vultr",
            Self::Other(name) => name,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for DnsProviderName {
    /// An empty name means the default provider.
    fn from(name: String) -> Self {
        match name.as_str() {
            "" | "cloudflare" => Self::Cloudflare,
            "digitalocean" => Self::Digitalocean,
            "dnspod" => Self::Dnspod,
            "duckdns" => Self::Duckdns,
            "vultr" => Self::Vultr,
            _ => Self::Other(name),
        }
    }
}

impl From<DnsProviderName> for String {
    fn from(name: DnsProviderName) -> Self {
        match name {
            DnsProviderName::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for DnsProviderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placeholder shown instead of an API token.
pub const MASKED_TOKEN: &str = "****";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetsEncryptConfig {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub domain_name: String,
    #[serde(default)]
    pub dns_provider_name: DnsProviderName,
    #[serde(default)]
    pub dns_provider_zone: String,
    #[serde(default, rename = "dnsProviderAPIToken")]
    pub dns_provider_api_token: String,
}

/// Check a certificate domain: non-empty, no whitespace, optional `*.` wildcard.
pub fn validate_domain(domain: &str) -> CoreResult<()> {
    let bare = domain.strip_prefix("*.").unwrap_or(domain);
    if bare.is_empty() {
        return Err(CoreError::validation("domainName", "must not be empty"));
    }
    if bare.contains('*') || bare.chars().any(|c| c.is_whitespace() || c == '/' || c == ':') {
        return Err(CoreError::validation(
            "domainName",
            format!("{:?} is not a valid domain", domain),
        ));
    }
    Ok(())
}

impl LetsEncryptConfig {
    /// Check the email and the domain name.
    pub fn validate_contact(&self) -> CoreResult<()> {
        match self.email.split_once('@') {
            Some((user, host)) if !user.is_empty() && !host.is_empty() => {}
            _ => {
                return Err(CoreError::validation(
                    "email",
                    format!("{:?} is not a valid email address", self.email),
                ))
            }
        }
        validate_domain(&self.domain_name)
    }

    /// Check settings about to be written: contact details plus a supported
    /// DNS provider. Zone and API token are optional; without them only the
    /// HTTP-01 and TLS-ALPN-01 challenges can succeed.
    pub fn validate(&self) -> CoreResult<()> {
        self.validate_contact()?;
        if !self.dns_provider_name.is_supported() {
            return Err(CoreError::validation(
                "dnsProviderName",
                format!(
                    "{:?} is not supported; use one of {}",
                    self.dns_provider_name.as_str(),
                    DnsProviderName::SUPPORTED.join(", ")
                ),
            ));
        }
        Ok(())
    }

    /// Copy with the API token replaced, for output to callers.
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        if !masked.dns_provider_api_token.is_empty() {
            masked.dns_provider_api_token = MASKED_TOKEN.to_string();
        }
        masked
    }

    /// Rebuild the logical view from the manager email and one domain entry.
    pub fn from_domain(email: &str, domain: &AutoCertDomain) -> Self {
        let provider = domain.dns_provider.clone().unwrap_or_default();
        Self {
            email: email.to_string(),
            domain_name: domain.name.clone(),
            dns_provider_name: DnsProviderName::from(provider.name),
            dns_provider_zone: provider.zone,
            dns_provider_api_token: provider.api_token,
        }
    }

    /// The domain entry for the auto-cert manager. Extra settings of
    /// `previous` are carried over.
    ///
    /// A DNS provider is written only if `previous` had one or this config
    /// says anything beyond the default provider.
    pub fn to_domain(&self, previous: Option<&AutoCertDomain>) -> AutoCertDomain {
        let previous_provider = previous.and_then(|d| d.dns_provider.as_ref());
        let has_provider = previous_provider.is_some()
            || !self.dns_provider_zone.is_empty()
            || !self.dns_provider_api_token.is_empty()
            || self.dns_provider_name != DnsProviderName::default();

        AutoCertDomain {
            name: self.domain_name.clone(),
            dns_provider: has_provider.then(|| DnsProvider {
                name: self.dns_provider_name.as_str().to_string(),
                zone: self.dns_provider_zone.clone(),
                api_token: self.dns_provider_api_token.clone(),
                extra: previous_provider.map(|p| p.extra.clone()).unwrap_or_default(),
            }),
            extra: previous.map(|d| d.extra.clone()).unwrap_or_else(Extra::new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LetsEncryptConfig {
        LetsEncryptConfig {
            email: "ops@example.com".to_string(),
            domain_name: "*.example.com".to_string(),
            dns_provider_name: DnsProviderName::Cloudflare,
            dns_provider_zone: "example.com".to_string(),
            dns_provider_api_token: "secret".to_string(),
        }
    }

    #[test]
    fn test_arguments_use_camel_case_field_names() {
        let cfg: LetsEncryptConfig = serde_json::from_value(serde_json::json!({
            "email": "ops@example.com",
            "domainName": "example.com",
            "dnsProviderName": "duckdns",
            "dnsProviderZone": "example.com",
            "dnsProviderAPIToken": "t"
        }))
        .unwrap();

        assert_eq!(cfg.dns_provider_name, DnsProviderName::Duckdns);
        assert_eq!(cfg.dns_provider_api_token, "t");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_unknown_provider_is_kept_but_not_valid() {
        let cfg: LetsEncryptConfig = serde_json::from_value(serde_json::json!({
            "email": "ops@example.com",
            "domainName": "example.com",
            "dnsProviderName": "route53"
        }))
        .unwrap();

        assert_eq!(
            cfg.dns_provider_name,
            DnsProviderName::Other("route53".to_string())
        );
        assert_eq!(
            serde_json::to_value(&cfg).unwrap()["dnsProviderName"],
            "route53"
        );
        assert!(cfg.validate_contact().is_ok());
        assert!(matches!(
            cfg.validate(),
            Err(CoreError::Validation { field: "dnsProviderName", .. })
        ));
    }

    #[test]
    fn test_validation() {
        assert!(config().validate().is_ok());

        let mut bad = config();
        bad.email = "nobody".to_string();
        assert!(matches!(bad.validate(), Err(CoreError::Validation { field: "email", .. })));

        let mut bad = config();
        bad.domain_name = "*.".to_string();
        assert!(matches!(
            bad.validate(),
            Err(CoreError::Validation { field: "domainName", .. })
        ));

        let mut minimal = config();
        minimal.dns_provider_zone.clear();
        minimal.dns_provider_api_token.clear();
        assert!(minimal.validate().is_ok());
    }

    #[test]
    fn test_provider_written_only_when_given() {
        let mut minimal = config();
        minimal.dns_provider_zone.clear();
        minimal.dns_provider_api_token.clear();
        assert!(minimal.to_domain(None).dns_provider.is_none());

        let mut named = minimal.clone();
        named.dns_provider_name = DnsProviderName::Vultr;
        assert_eq!(named.to_domain(None).dns_provider.unwrap().name, "vultr");

        let previous = config().to_domain(None);
        assert!(minimal.to_domain(Some(&previous)).dns_provider.is_some());
    }

    #[test]
    fn test_unknown_stored_provider_round_trips() {
        let domain = AutoCertDomain {
            name: "example.com".to_string(),
            dns_provider: Some(DnsProvider {
                name: "alidns".to_string(),
                zone: "example.com".to_string(),
                api_token: "t".to_string(),
                extra: Extra::new(),
            }),
            extra: Extra::new(),
        };

        let cfg = LetsEncryptConfig::from_domain("ops@example.com", &domain);
        assert_eq!(cfg.dns_provider_name.as_str(), "alidns");
        assert_eq!(cfg.to_domain(Some(&domain)), domain);
    }

    #[test]
    fn test_masked_hides_token() {
        assert_eq!(config().masked().dns_provider_api_token, "****");

        let mut empty = config();
        empty.dns_provider_api_token.clear();
        assert_eq!(empty.masked().dns_provider_api_token, "");
    }

    #[test]
    fn test_domain_conversion_keeps_extras() {
        let mut previous = config().to_domain(None);
        previous
            .extra
            .insert("renewBefore".to_string(), serde_json::json!("720h"));

        let mut changed = config();
        changed.dns_provider_zone = "other.com".to_string();
        let domain = changed.to_domain(Some(&previous));

        assert_eq!(domain.extra.get("renewBefore"), Some(&serde_json::json!("720h")));
        assert_eq!(
            LetsEncryptConfig::from_domain("ops@example.com", &domain),
            changed
        );
    }
}
