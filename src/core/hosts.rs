use std::path::Path;
use tracing::info;

use crate::builders::patterns::{DomainPattern, PatternMatcher, Presence};
use crate::builders::storage::ConfigFile;
use crate::builders::system::PrivilegedCopy;
use crate::core::engine::{Outcome, append_lines, require_domain};
use crate::core::error::Result;

/// Maps local development domains in the hosts file.
///
/// Unlike the web server configuration, no restart follows a change here:
/// the resolver picks it up immediately.
pub struct HostnameResolver<'a> {
    hosts_file: &'a Path,
    address: &'a str,
    copier: &'a dyn PrivilegedCopy,
}

impl<'a> HostnameResolver<'a> {
    pub fn new(hosts_file: &'a Path, address: &'a str, copier: &'a dyn PrivilegedCopy) -> Self {
        Self {
            hosts_file,
            address,
            copier,
        }
    }

    /// Adds `<address> <domain>` unless some IPv4 entry for `domain` exists,
    /// in which case that address is reported and nothing is written.
    pub fn ensure_local_host(&self, domain: &str) -> Result<Outcome> {
        let domain = require_domain(domain)?;
        let file = ConfigFile::read(self.hosts_file, true)?;
        let pattern = DomainPattern::host_entry(domain)?;

        if let Presence::Present(found) = pattern.classify(&file.contents) {
            let address = found.value.unwrap_or(found.line);
            info!("{domain} already resolves to {address}");
            return Ok(Outcome::HostMapped {
                domain: domain.to_string(),
                address,
            });
        }

        let contents = append_lines(&file.contents, &format!("{}\t{domain}\n", self.address));
        let backup = file.replace(&contents, self.copier)?;

        Ok(Outcome::HostAdded {
            domain: domain.to_string(),
            address: self.address.to_string(),
            backup,
        })
    }
}
