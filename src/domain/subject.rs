//! Typed distinguished-name model for issuance requests.
//!
//! A [`Subject`] is an immutable value constructed per issuance request: a
//! common name, an optional organization, and the DNS/IP subject
//! alternative names the certificate must cover.

use std::fmt;
use std::net::IpAddr;

use rcgen::string::Ia5String;
use rcgen::{DistinguishedName, DnType, SanType};
use serde::{Deserialize, Serialize};

use crate::errors::PkiError;

/// Distinguished name plus subject alternative names for one certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    common_name: String,
    organization: Option<String>,
    dns_names: Vec<String>,
    ip_addresses: Vec<IpAddr>,
}

impl Subject {
    /// Create a subject with the given common name (CN).
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            organization: None,
            dns_names: Vec::new(),
            ip_addresses: Vec::new(),
        }
    }

    /// Set the organization (O) component.
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Add a DNS subject alternative name.
    pub fn with_dns_name(mut self, name: impl Into<String>) -> Self {
        self.dns_names.push(name.into());
        self
    }

    /// Add an IP address subject alternative name.
    pub fn with_ip_address(mut self, address: IpAddr) -> Self {
        self.ip_addresses.push(address);
        self
    }

    /// The common name (CN).
    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    /// The organization (O), if set.
    pub fn organization(&self) -> Option<&str> {
        self.organization.as_deref()
    }

    /// DNS subject alternative names.
    pub fn dns_names(&self) -> &[String] {
        &self.dns_names
    }

    /// IP subject alternative names.
    pub fn ip_addresses(&self) -> &[IpAddr] {
        &self.ip_addresses
    }

    /// Render this subject as an X.500 distinguished name.
    pub(crate) fn to_distinguished_name(&self) -> DistinguishedName {
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, self.common_name.as_str());
        if let Some(org) = &self.organization {
            dn.push(DnType::OrganizationName, org.as_str());
        }
        dn
    }

    /// Render the subject alternative names for certificate parameters.
    pub(crate) fn to_subject_alt_names(&self) -> Result<Vec<SanType>, PkiError> {
        let mut sans = Vec::with_capacity(self.dns_names.len() + self.ip_addresses.len());
        for name in &self.dns_names {
            let ia5 = Ia5String::try_from(name.clone()).map_err(|e| {
                PkiError::InvalidSubjectAltName { name: name.clone(), reason: e.to_string() }
            })?;
            sans.push(SanType::DnsName(ia5));
        }
        for address in &self.ip_addresses {
            sans.push(SanType::IpAddress(*address));
        }
        Ok(sans)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CN={}", self.common_name)?;
        if let Some(org) = &self.organization {
            write!(f, ", O={org}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_subject_display() {
        let subject = Subject::new("cluster-ca").with_organization("certplane");
        assert_eq!(subject.to_string(), "CN=cluster-ca, O=certplane");

        let bare = Subject::new("broker-0");
        assert_eq!(bare.to_string(), "CN=broker-0");
    }

    #[test]
    fn test_subject_alt_names() {
        let subject = Subject::new("broker-0")
            .with_dns_name("broker-0.cluster.local")
            .with_ip_address(IpAddr::V4(Ipv4Addr::LOCALHOST));

        let sans = subject.to_subject_alt_names().unwrap();
        assert_eq!(sans.len(), 2);
        assert!(matches!(sans[0], SanType::DnsName(_)));
        assert!(matches!(sans[1], SanType::IpAddress(_)));
    }

    #[test]
    fn test_invalid_dns_name_rejected() {
        let subject = Subject::new("broker-0").with_dns_name("bröker.example");
        let err = subject.to_subject_alt_names().unwrap_err();
        assert!(matches!(err, PkiError::InvalidSubjectAltName { .. }));
    }

    #[test]
    fn test_accessors() {
        let subject = Subject::new("client").with_organization("acme").with_dns_name("client.svc");
        assert_eq!(subject.common_name(), "client");
        assert_eq!(subject.organization(), Some("acme"));
        assert_eq!(subject.dns_names(), ["client.svc".to_string()]);
        assert!(subject.ip_addresses().is_empty());
    }
}
