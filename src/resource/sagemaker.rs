//! Managed notebook resources - lifecycle config and notebook instance

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use declarative::{Expr, Handle, LogicalId, Properties, Resource};

/// Largest encoded script the provider accepts for one hook
pub const MAX_SCRIPT_CONTENT_LEN: usize = 16384;

/// Encode script bytes the way lifecycle hooks expect them
pub fn encode_script(script: &[u8]) -> String {
    STANDARD.encode(script)
}

/// Scripts run when a notebook instance is created or started
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub id: LogicalId,
    pub name: String,
    /// Base64 content of each on-start hook
    pub on_start: Vec<String>,
}

impl LifecycleConfig {
    /// A config with a single on-start script
    pub fn on_start_script(id: LogicalId, name: String, script: &[u8]) -> Self {
        Self {
            id,
            name,
            on_start: vec![encode_script(script)],
        }
    }

    fn hooks(&self) -> Expr {
        Expr::List(
            self.on_start
                .iter()
                .map(|content| Expr::map([("Content", content.as_str())]))
                .collect(),
        )
    }
}

impl Resource for LifecycleConfig {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::SageMaker::NotebookInstanceLifecycleConfig"
    }

    fn description(&self) -> String {
        format!(
            "Lifecycle config {} ({} on-start hooks)",
            self.name,
            self.on_start.len()
        )
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::from([(
            "NotebookInstanceLifecycleConfigName".to_string(),
            Expr::from(self.name.as_str()),
        )]);
        if !self.on_start.is_empty() {
            props.insert("OnStart".to_string(), self.hooks());
        }
        props
    }
}

/// Enabled/Disabled switches used by notebook instances
fn toggle(enabled: bool) -> Expr {
    Expr::from(if enabled { "Enabled" } else { "Disabled" })
}

/// A managed notebook instance
#[derive(Debug, Clone)]
pub struct NotebookInstance {
    pub id: LogicalId,
    pub name: String,
    pub instance_type: String,
    pub platform_identifier: String,
    pub role: Handle,
    pub subnet: Handle,
    pub security_groups: Vec<Handle>,
    pub lifecycle_config: Handle,
    pub default_code_repository: Option<String>,
    pub volume_size_gb: Option<u32>,
    pub direct_internet_access: Option<bool>,
    pub root_access: Option<bool>,
    pub after: Vec<LogicalId>,
}

impl Resource for NotebookInstance {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::SageMaker::NotebookInstance"
    }

    fn description(&self) -> String {
        format!("Notebook {} ({})", self.name, self.instance_type)
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::from([
            (
                "InstanceType".to_string(),
                Expr::from(self.instance_type.as_str()),
            ),
            (
                "LifecycleConfigName".to_string(),
                self.lifecycle_config
                    .attr("NotebookInstanceLifecycleConfigName"),
            ),
            (
                "NotebookInstanceName".to_string(),
                Expr::from(self.name.as_str()),
            ),
            (
                "PlatformIdentifier".to_string(),
                Expr::from(self.platform_identifier.as_str()),
            ),
            ("RoleArn".to_string(), self.role.attr("Arn")),
            (
                "SecurityGroupIds".to_string(),
                Expr::List(
                    self.security_groups
                        .iter()
                        .map(|sg| sg.attr("GroupId"))
                        .collect(),
                ),
            ),
            ("SubnetId".to_string(), self.subnet.reference()),
        ]);

        if let Some(repo) = &self.default_code_repository {
            props.insert(
                "DefaultCodeRepository".to_string(),
                Expr::from(repo.as_str()),
            );
        }
        if let Some(size) = self.volume_size_gb {
            props.insert("VolumeSizeInGB".to_string(), Expr::from(size));
        }
        if let Some(direct) = self.direct_internet_access {
            props.insert("DirectInternetAccess".to_string(), toggle(direct));
        }
        if let Some(root) = self.root_access {
            props.insert("RootAccess".to_string(), toggle(root));
        }

        props
    }

    fn depends_on(&self) -> Vec<LogicalId> {
        self.after.clone()
    }
}
