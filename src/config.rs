//! Stack configuration schema
//!
//! Every field has a default, so an empty (or absent) config file describes
//! the stock notebook environment.

use anyhow::{Context, Result, bail};
use ipnet::Ipv4Net;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::resource::bucket::{self, MAX_BUCKET_NAME_LEN};
use crate::resource::security_group::IngressRule;

/// Length of a hyphenated UUID plus the joining hyphen
const GENERATED_SUFFIX_LEN: usize = 37;

/// Stack names: letter first, then letters, digits, hyphens
static STACK_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z][A-Za-z0-9-]{0,127}$").expect("valid regex")
});

// ============================================================================
// Main Config Schema
// ============================================================================

/// The notebook stack configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    /// Stack name, used in resource name tags and output file names
    pub stack_name: String,

    /// Template description
    pub description: String,

    pub bucket: BucketConfig,
    pub network: NetworkConfig,
    pub security_group: SecurityGroupConfig,
    pub role: RoleConfig,
    pub notebook: NotebookConfig,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stack_name: "SagemakerStack".to_string(),
            description: "Managed notebook environment".to_string(),
            bucket: BucketConfig::default(),
            network: NetworkConfig::default(),
            security_group: SecurityGroupConfig::default(),
            role: RoleConfig::default(),
            notebook: NotebookConfig::default(),
        }
    }
}

impl StackConfig {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid stack config: {}", path.display()))
    }

    /// Load config from an optional file, falling back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Invalid TOML format")?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !STACK_NAME_RE.is_match(&self.stack_name) {
            bail!(
                "Invalid stack name '{}': must start with a letter and contain only letters, digits, and hyphens",
                self.stack_name
            );
        }

        self.bucket.validate().context("Invalid [bucket] section")?;
        self.network.validate().context("Invalid [network] section")?;
        self.security_group
            .validate()
            .context("Invalid [security_group] section")?;
        self.role.validate().context("Invalid [role] section")?;
        self.notebook
            .validate()
            .context("Invalid [notebook] section")?;

        Ok(())
    }
}

// ============================================================================
// Bucket
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BucketConfig {
    /// Name prefix; a unique suffix is appended
    pub prefix: String,

    /// Pinned suffix instead of a fresh UUID per build
    pub name_suffix: Option<String>,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            prefix: "sagemaker-bucket".to_string(),
            name_suffix: None,
        }
    }
}

impl BucketConfig {
    pub fn validate(&self) -> Result<()> {
        match &self.name_suffix {
            Some(suffix) => {
                let name = bucket::unique_name(&self.prefix, suffix);
                if !bucket::is_valid_name(&name) {
                    bail!(
                        "Bucket name '{}' must be 3-{} lowercase letters, digits, or hyphens",
                        name,
                        MAX_BUCKET_NAME_LEN
                    );
                }
            }
            None => {
                // Probe with a same-length stand-in for the generated suffix
                let probe = bucket::unique_name(&self.prefix, &"0".repeat(GENERATED_SUFFIX_LEN - 1));
                if !bucket::is_valid_name(&probe) {
                    bail!(
                        "Bucket prefix '{}' must be lowercase letters, digits, or hyphens and at most {} characters",
                        self.prefix,
                        MAX_BUCKET_NAME_LEN - GENERATED_SUFFIX_LEN
                    );
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Network
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// VPC address block
    pub cidr: Ipv4Net,

    /// Number of availability zones to spread subnets over
    pub max_azs: u8,

    /// Prefix length of every subnet
    pub cidr_mask: u8,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cidr: Ipv4Net::new_assert(Ipv4Addr::new(10, 0, 0, 0), 16),
            max_azs: 2,
            cidr_mask: 24,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        if !(16..=28).contains(&self.cidr.prefix_len()) {
            bail!(
                "VPC CIDR {} must have a prefix length between /16 and /28",
                self.cidr
            );
        }
        if !(1..=6).contains(&self.max_azs) {
            bail!("max_azs must be between 1 and 6, got {}", self.max_azs);
        }
        Ok(())
    }
}

// ============================================================================
// Security Group
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityGroupConfig {
    /// Group name
    pub name: String,

    /// Ingress rules; defaults to tcp/22 and tcp/80 from anywhere
    pub ingress: Vec<IngressRule>,

    /// Set once the ingress rules have been reviewed for this deployment
    pub ingress_reviewed: bool,
}

impl Default for SecurityGroupConfig {
    fn default() -> Self {
        Self {
            name: "SageMakerSecurityGroup".to_string(),
            ingress: IngressRule::defaults(),
            ingress_reviewed: false,
        }
    }
}

impl SecurityGroupConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Security group name cannot be empty");
        }
        if let Some(rule) = self.ingress.iter().find(|r| r.port == 0) {
            bail!("Ingress rule {} has port 0", rule);
        }
        Ok(())
    }

    /// Rules open to every address that nobody has signed off on
    pub fn unreviewed_open_ingress(&self) -> Vec<&IngressRule> {
        if self.ingress_reviewed {
            return Vec::new();
        }
        self.ingress.iter().filter(|r| r.is_any_source()).collect()
    }
}

// ============================================================================
// Role
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoleConfig {
    /// Service allowed to assume the role
    pub service_principal: String,

    /// Provider-managed policies attached by name
    pub managed_policies: Vec<String>,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            service_principal: "sagemaker.amazonaws.com".to_string(),
            managed_policies: vec!["AmazonSageMakerFullAccess".to_string()],
        }
    }
}

impl RoleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.service_principal.trim().is_empty() {
            bail!("Service principal cannot be empty");
        }
        if self.managed_policies.iter().any(|p| p.trim().is_empty()) {
            bail!("Managed policy names cannot be empty");
        }
        Ok(())
    }
}

// ============================================================================
// Notebook
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotebookConfig {
    pub name: String,
    pub instance_type: String,
    pub platform_identifier: String,
    pub lifecycle_config_name: String,

    /// Startup script, relative to the config file's directory
    pub script: PathBuf,

    pub volume_size_gb: Option<u32>,
    pub direct_internet_access: Option<bool>,
    pub root_access: Option<bool>,
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            name: "SageMakerNotebookInstance".to_string(),
            instance_type: "ml.t3.medium".to_string(),
            platform_identifier: "notebook-al2-v2".to_string(),
            lifecycle_config_name: "auto-stop".to_string(),
            script: PathBuf::from("./scripts/auto-stop.sh"),
            volume_size_gb: None,
            direct_internet_access: None,
            root_access: None,
        }
    }
}

impl NotebookConfig {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("instance_type", &self.instance_type),
            ("platform_identifier", &self.platform_identifier),
            ("lifecycle_config_name", &self.lifecycle_config_name),
        ] {
            if value.trim().is_empty() {
                bail!("Notebook {} cannot be empty", field);
            }
        }
        if !self.instance_type.starts_with("ml.") {
            bail!(
                "Instance type '{}' must be a notebook instance type (ml.*)",
                self.instance_type
            );
        }
        if self.script.as_os_str().is_empty() {
            bail!("Notebook script path cannot be empty");
        }
        if let Some(size) = self.volume_size_gb
            && !(5..=16384).contains(&size)
        {
            bail!("volume_size_gb must be between 5 and 16384, got {}", size);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::security_group::Protocol;

    #[test]
    fn test_empty_config_is_default() {
        let config = StackConfig::from_toml("").unwrap();
        assert_eq!(config, StackConfig::default());
        assert_eq!(config.notebook.instance_type, "ml.t3.medium");
        assert_eq!(config.network.cidr.to_string(), "10.0.0.0/16");
        assert_eq!(config.security_group.ingress.len(), 2);
    }

    #[test]
    fn test_parse_example_config() {
        let toml = r#"
stack_name = "ResearchNotebooks"

[bucket]
prefix = "research-data"
name_suffix = "2024-archive"

[network]
cidr = "172.16.0.0/20"
max_azs = 3
cidr_mask = 26

[security_group]
ingress_reviewed = true

[[security_group.ingress]]
protocol = "tcp"
port = 443
source = "203.0.113.0/24"
description = "office"

[notebook]
instance_type = "ml.m5.xlarge"
script = "hooks/on-start.sh"
volume_size_gb = 50
direct_internet_access = false
"#;

        let config = StackConfig::from_toml(toml).expect("Failed to parse config");

        assert_eq!(config.stack_name, "ResearchNotebooks");
        assert_eq!(config.bucket.name_suffix.as_deref(), Some("2024-archive"));
        assert_eq!(config.network.max_azs, 3);
        assert_eq!(config.network.cidr_mask, 26);
        assert_eq!(config.security_group.ingress.len(), 1);
        assert_eq!(config.security_group.ingress[0].protocol, Protocol::Tcp);
        assert!(config.security_group.unreviewed_open_ingress().is_empty());
        assert_eq!(config.notebook.script, PathBuf::from("hooks/on-start.sh"));
        assert_eq!(config.notebook.volume_size_gb, Some(50));
        // Untouched sections keep their defaults
        assert_eq!(config.role, RoleConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(StackConfig::from_toml("[notebook]\ninstance_size = \"big\"\n").is_err());
    }

    #[test]
    fn test_default_ingress_is_flagged_until_reviewed() {
        let mut config = StackConfig::default();
        assert_eq!(config.security_group.unreviewed_open_ingress().len(), 2);

        config.security_group.ingress_reviewed = true;
        assert!(config.security_group.unreviewed_open_ingress().is_empty());
    }

    #[test]
    fn test_validation_failures() {
        let cases = [
            "stack_name = \"1bad\"",
            "[bucket]\nprefix = \"Upper\"",
            "[bucket]\nprefix = \"this-prefix-is-far-too-long-for-s3\"",
            "[network]\ncidr = \"10.0.0.0/8\"",
            "[network]\nmax_azs = 0",
            "[security_group]\nname = \"\"",
            "[notebook]\ninstance_type = \"t3.medium\"",
            "[notebook]\nvolume_size_gb = 1",
            "[role]\nmanaged_policies = [\"\"]",
        ];
        for case in cases {
            assert!(StackConfig::from_toml(case).is_err(), "accepted: {case}");
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.toml");
        std::fs::write(&path, "stack_name = \"FromFile\"\n").unwrap();

        let config = StackConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.stack_name, "FromFile");

        assert!(StackConfig::load(&dir.path().join("missing.toml")).is_err());
        assert_eq!(
            StackConfig::load_or_default(None).unwrap(),
            StackConfig::default()
        );
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let text = StackConfig::default().to_toml().unwrap();
        assert_eq!(StackConfig::from_toml(&text).unwrap(), StackConfig::default());
    }
}
