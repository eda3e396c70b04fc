//! Notebook environment stack builder
//!
//! [`build`] declares the whole environment into a fresh
//! [`ResourceGraph`]: bucket, network, security group, execution role and
//! its default policy, lifecycle config, and the notebook instance itself.
//! Everything it needs arrives as arguments, so building has no side
//! effects beyond reading the startup script through the given
//! [`ScriptSource`].

pub mod network;

use declarative::{
    DeploymentPlan, GraphError, Handle, LogicalId, Output, Resource, ResourceGraph, Template,
};
use ipnet::Ipv4Net;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;
use uuid::Uuid;

use crate::config::StackConfig;
use crate::resource::sagemaker::{self, MAX_SCRIPT_CONTENT_LEN};
use crate::resource::{
    Bucket, LifecycleConfig, NotebookInstance, Policy, PolicyDocument, PolicyStatement, Role,
    SecurityGroup, bucket,
};
use crate::script::{ScriptError, ScriptSource};

use network::{SubnetLayout, declare_network};

/// Longest repository URL the notebook service accepts
pub const MAX_REPOSITORY_LEN: usize = 1024;

/// An https URL or the name of a repository registered with the service
static REPOSITORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^https://([^/]+)/?.*$|^[a-zA-Z0-9](-*[a-zA-Z0-9])*$").expect("valid regex")
});

/// Errors that abort a build
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("startup script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    #[error(transparent)]
    Script(ScriptError),

    #[error(
        "startup script {} encodes to {size} bytes, the limit is {max}",
        .path.display()
    )]
    ScriptTooLarge {
        path: PathBuf,
        size: usize,
        max: usize,
    },

    #[error("generated bucket name '{0}' is not a valid bucket name")]
    InvalidBucketName(String),

    #[error("subnet mask /{mask} does not fit VPC {vpc} (must be longer than the VPC prefix and at most /{max})")]
    InvalidSubnetMask { vpc: Ipv4Net, mask: u8, max: u8 },

    #[error("VPC {vpc} holds {available} /{mask} subnets, {needed} are needed")]
    CidrExhausted {
        vpc: Ipv4Net,
        mask: u8,
        needed: usize,
        available: usize,
    },

    #[error("policy {0} grants access to every resource")]
    UnscopedGrant(String),

    #[error("invalid stack config: {0}")]
    Config(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl From<ScriptError> for BuildError {
    fn from(err: ScriptError) -> Self {
        match err {
            ScriptError::NotFound(path) => Self::ScriptNotFound(path),
            other => Self::Script(other),
        }
    }
}

/// Per-build inputs that do not come from the config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackParams {
    /// Repository linked to the notebook, already validated
    pub repository: Option<String>,
    /// Uniqueness suffix for the bucket name
    pub bucket_suffix: String,
}

impl StackParams {
    /// Params with a fresh bucket suffix
    ///
    /// A repository value that is empty or not a valid repository reference
    /// is dropped with a warning.
    pub fn new(repository: Option<&str>) -> Self {
        Self {
            repository: repository.and_then(normalize_repository),
            bucket_suffix: Uuid::new_v4().to_string(),
        }
    }
}

/// Validate a repository reference, returning `None` when it cannot be used
pub fn normalize_repository(raw: &str) -> Option<String> {
    let repo = raw.trim();
    if repo.is_empty() {
        log::warn!("Repository link is empty, notebook will have no default repository");
        return None;
    }
    if repo.len() > MAX_REPOSITORY_LEN || !REPOSITORY_RE.is_match(repo) {
        log::warn!(
            "Ignoring malformed repository link '{}', expected an https URL or a repository name",
            repo
        );
        return None;
    }
    Some(repo.to_string())
}

/// A built notebook environment
#[derive(Debug)]
pub struct NotebookStack {
    pub name: String,
    pub description: String,
    pub graph: ResourceGraph,
    pub bucket_name: String,
    pub notebook: Handle,
    /// Repository linked to the notebook, if any
    pub repository: Option<String>,
    /// blake3 hex digest of the raw startup script
    pub script_digest: String,
}

impl NotebookStack {
    /// Synthesize the provisioning template
    pub fn template(&self) -> Template {
        Template::synthesize(&self.graph, Some(&self.description))
    }

    /// Creation, teardown, and wave ordering for the graph
    pub fn plan(&self) -> DeploymentPlan {
        DeploymentPlan::for_graph(&self.graph)
    }
}

/// Declare a resource, logging it
pub(crate) fn declare<R: Resource + 'static>(
    graph: &mut ResourceGraph,
    resource: R,
) -> Result<Handle, BuildError> {
    log::debug!(
        "Declaring {} ({})",
        resource.logical_id(),
        resource.resource_type()
    );
    Ok(graph.declare(resource)?)
}

/// Policy document for `name`, refusing any statement not bound to concrete ARNs
fn scoped_document(
    name: &str,
    statements: Vec<PolicyStatement>,
) -> Result<PolicyDocument, BuildError> {
    if !statements.iter().all(PolicyStatement::is_scoped) {
        return Err(BuildError::UnscopedGrant(name.to_string()));
    }
    Ok(PolicyDocument::new(statements))
}

fn id(name: &str) -> Result<LogicalId, BuildError> {
    Ok(LogicalId::new(name)?)
}

/// Build the notebook environment graph
///
/// The startup script is read and every local check runs before the first
/// resource is declared, so a failure never leaves a partial graph behind.
pub fn build(
    config: &StackConfig,
    params: &StackParams,
    scripts: &dyn ScriptSource,
) -> Result<NotebookStack, BuildError> {
    let script_path = &config.notebook.script;
    let script = scripts.read_script(script_path)?;
    let encoded_len = sagemaker::encode_script(&script).len();
    if encoded_len > MAX_SCRIPT_CONTENT_LEN {
        return Err(BuildError::ScriptTooLarge {
            path: script_path.clone(),
            size: encoded_len,
            max: MAX_SCRIPT_CONTENT_LEN,
        });
    }

    let suffix = config
        .bucket
        .name_suffix
        .as_deref()
        .unwrap_or(&params.bucket_suffix);
    let bucket_name = bucket::unique_name(&config.bucket.prefix, suffix);
    if !bucket::is_valid_name(&bucket_name) {
        return Err(BuildError::InvalidBucketName(bucket_name));
    }

    let layout = SubnetLayout::allocate(
        config.network.cidr,
        config.network.cidr_mask,
        usize::from(config.network.max_azs),
    )?;

    for rule in config.security_group.unreviewed_open_ingress() {
        log::warn!(
            "Ingress rule {} admits every address; set security_group.ingress_reviewed once it is intended",
            rule
        );
    }

    let stack = config.stack_name.as_str();
    let mut graph = ResourceGraph::new();

    let bucket = declare(
        &mut graph,
        Bucket::private(id("SageMakerBucket")?, bucket_name.clone()),
    )?;

    let network = declare_network(
        &mut graph,
        stack,
        &id("SageMakerVpc")?,
        &layout,
        &config.network,
    )?;
    let subnet = network
        .isolated_subnets
        .first()
        .cloned()
        .ok_or_else(|| BuildError::Config("network has no isolated subnet".to_string()))?;

    let security_group = declare(
        &mut graph,
        SecurityGroup {
            id: id("SageMakerSecurityGroup")?,
            group_name: config.security_group.name.clone(),
            group_description: format!("{}/SageMakerSecurityGroup", stack),
            vpc: network.vpc.clone(),
            ingress: config.security_group.ingress.clone(),
            allow_all_outbound: true,
        },
    )?;

    let role_id = id("SageMakerRole")?;
    let role = declare(
        &mut graph,
        Role {
            id: role_id.clone(),
            service_principal: config.role.service_principal.clone(),
            managed_policies: config.role.managed_policies.clone(),
        },
    )?;
    let policy_name = format!("{}DefaultPolicy", role_id);
    let document = scoped_document(
        &policy_name,
        vec![PolicyStatement::full_bucket_access(&bucket)],
    )?;
    let policy = declare(
        &mut graph,
        Policy {
            id: role_id.child("DefaultPolicy")?,
            name: policy_name,
            document,
            roles: vec![role.clone()],
        },
    )?;

    let lifecycle = declare(
        &mut graph,
        LifecycleConfig::on_start_script(
            id("NotebookLifecycleConfig")?,
            config.notebook.lifecycle_config_name.clone(),
            &script,
        ),
    )?;

    let notebook = declare(
        &mut graph,
        NotebookInstance {
            id: id("Notebook")?,
            name: config.notebook.name.clone(),
            instance_type: config.notebook.instance_type.clone(),
            platform_identifier: config.notebook.platform_identifier.clone(),
            role: role.clone(),
            subnet,
            security_groups: vec![security_group],
            lifecycle_config: lifecycle,
            default_code_repository: params.repository.clone(),
            volume_size_gb: config.notebook.volume_size_gb,
            direct_internet_access: config.notebook.direct_internet_access,
            root_access: config.notebook.root_access,
            after: vec![policy.id().clone()],
        },
    )?;

    graph.add_output(
        Output::new(id("NotebookInstanceName")?, notebook.reference())
            .with_description("Name of the notebook instance"),
    )?;
    graph.add_output(
        Output::new(id("BucketName")?, bucket.reference())
            .with_description("Bucket holding notebook data"),
    )?;
    graph.add_output(
        Output::new(id("ExecutionRoleArn")?, role.attr("Arn"))
            .with_description("Role assumed by the notebook instance"),
    )?;

    log::info!(
        "Declared {} resources for stack {} ({} public, {} isolated subnets)",
        graph.len(),
        config.stack_name,
        network.public_subnets.len(),
        network.isolated_subnets.len()
    );

    Ok(NotebookStack {
        name: config.stack_name.clone(),
        description: config.description.clone(),
        graph,
        bucket_name,
        notebook,
        repository: params.repository.clone(),
        script_digest: blake3::hash(&script).to_hex().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::security_group::IngressRule;
    use crate::script::InMemoryScriptSource;
    use declarative::{ResourceExt, TemplateResource};
    use serde_json::{Value, json};

    const SCRIPT: &str = "#!/bin/bash\necho idle-check\n";

    fn scripts() -> InMemoryScriptSource {
        InMemoryScriptSource::new().with_script("./scripts/auto-stop.sh", SCRIPT)
    }

    fn build_default(repository: Option<&str>) -> NotebookStack {
        build(
            &StackConfig::default(),
            &StackParams::new(repository),
            &scripts(),
        )
        .unwrap()
    }

    fn notebook_entry(template: &Template) -> &TemplateResource {
        template.resource("Notebook").unwrap()
    }

    #[test]
    fn test_bucket_names_unique_across_builds() {
        let names: std::collections::HashSet<String> =
            (0..20).map(|_| build_default(None).bucket_name).collect();
        assert_eq!(names.len(), 20);
        assert!(names.iter().all(|n| n.starts_with("sagemaker-bucket-")));
    }

    #[test]
    fn test_pinned_bucket_suffix() {
        let mut config = StackConfig::default();
        config.bucket.name_suffix = Some("pinned".to_string());
        let stack = build(&config, &StackParams::new(None), &scripts()).unwrap();
        assert_eq!(stack.bucket_name, "sagemaker-bucket-pinned");

        let params = StackParams {
            bucket_suffix: "fixed".to_string(),
            ..StackParams::new(None)
        };
        let stack = build(&StackConfig::default(), &params, &scripts()).unwrap();
        assert_eq!(stack.bucket_name, "sagemaker-bucket-fixed");
    }

    #[test]
    fn test_bucket_is_private_and_deleted_with_stack() {
        let template = build_default(None).template();
        let bucket = template.resource("SageMakerBucket").unwrap();

        assert_eq!(bucket.resource_type, "AWS::S3::Bucket");
        assert_eq!(
            bucket.properties["PublicAccessBlockConfiguration"],
            json!({
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true
            })
        );
        assert_eq!(
            bucket.properties["OwnershipControls"]["Rules"][0]["ObjectOwnership"],
            json!("BucketOwnerPreferred")
        );
        assert_eq!(bucket.deletion_policy, Some(declarative::DeletionPolicy::Delete));
        assert_eq!(
            bucket.update_replace_policy,
            Some(declarative::DeletionPolicy::Delete)
        );
    }

    #[test]
    fn test_exactly_one_notebook_on_isolated_subnet() {
        let stack = build_default(None);
        let template = stack.template();

        let notebooks: Vec<_> = template
            .resources_of_type("AWS::SageMaker::NotebookInstance")
            .collect();
        assert_eq!(notebooks.len(), 1);

        let props = &notebook_entry(&template).properties;
        assert_eq!(props["SubnetId"], json!({ "Ref": "SageMakerVpcSageMakerPrivateSubnetSubnet1" }));
        assert_eq!(
            props["RoleArn"],
            json!({ "Fn::GetAtt": ["SageMakerRole", "Arn"] })
        );
        assert_eq!(
            props["SecurityGroupIds"],
            json!([{ "Fn::GetAtt": ["SageMakerSecurityGroup", "GroupId"] }])
        );
        assert_eq!(
            props["LifecycleConfigName"],
            json!({ "Fn::GetAtt": ["NotebookLifecycleConfig", "NotebookInstanceLifecycleConfigName"] })
        );
        assert_eq!(props["InstanceType"], json!("ml.t3.medium"));
        assert_eq!(props["PlatformIdentifier"], json!("notebook-al2-v2"));
        assert_eq!(props["NotebookInstanceName"], json!("SageMakerNotebookInstance"));

        let subnet = template
            .resource("SageMakerVpcSageMakerPrivateSubnetSubnet1")
            .unwrap();
        assert_eq!(subnet.properties["MapPublicIpOnLaunch"], json!(false));
    }

    #[test]
    fn test_notebook_waits_for_default_policy() {
        let template = build_default(None).template();
        assert_eq!(
            notebook_entry(&template).depends_on,
            vec!["SageMakerRoleDefaultPolicy".to_string()]
        );
    }

    #[test]
    fn test_default_ingress_unchanged_across_builds() {
        for _ in 0..3 {
            let template = build_default(None).template();
            let sg = template.resource("SageMakerSecurityGroup").unwrap();
            let rules: Vec<(String, u64, String)> = sg.properties["SecurityGroupIngress"]
                .as_array()
                .unwrap()
                .iter()
                .map(|r| {
                    (
                        r["IpProtocol"].as_str().unwrap().to_string(),
                        r["FromPort"].as_u64().unwrap(),
                        r["CidrIp"].as_str().unwrap().to_string(),
                    )
                })
                .collect();
            assert_eq!(
                rules,
                vec![
                    ("tcp".to_string(), 22, "0.0.0.0/0".to_string()),
                    ("tcp".to_string(), 80, "0.0.0.0/0".to_string()),
                ]
            );
            assert_eq!(
                sg.properties["GroupDescription"],
                json!("SagemakerStack/SageMakerSecurityGroup")
            );
        }
    }

    #[test]
    fn test_configured_ingress() {
        let mut config = StackConfig::default();
        config.security_group.ingress = vec![IngressRule {
            source: "198.51.100.0/24".parse().unwrap(),
            ..IngressRule::tcp_from_anywhere(443)
        }];
        config.security_group.ingress_reviewed = true;

        let stack = build(&config, &StackParams::new(None), &scripts()).unwrap();
        let template = stack.template();
        let ingress = &template.resource("SageMakerSecurityGroup").unwrap().properties
            ["SecurityGroupIngress"];
        assert_eq!(ingress.as_array().unwrap().len(), 1);
        assert_eq!(ingress[0]["Description"], json!("from 198.51.100.0/24:443"));
    }

    #[test]
    fn test_missing_script_fails_before_declaring() {
        let err = build(
            &StackConfig::default(),
            &StackParams::new(None),
            &InMemoryScriptSource::new(),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::ScriptNotFound(p) if p.ends_with("auto-stop.sh")));
    }

    #[test]
    fn test_oversized_script_rejected() {
        let big = vec![b'#'; MAX_SCRIPT_CONTENT_LEN];
        let source = InMemoryScriptSource::new().with_script("./scripts/auto-stop.sh", big);
        let err = build(&StackConfig::default(), &StackParams::new(None), &source).unwrap_err();
        assert!(matches!(err, BuildError::ScriptTooLarge { .. }));
    }

    #[test]
    fn test_lifecycle_carries_encoded_script() {
        let template = build_default(None).template();
        let lifecycle = template.resource("NotebookLifecycleConfig").unwrap();
        assert_eq!(
            lifecycle.properties["NotebookInstanceLifecycleConfigName"],
            json!("auto-stop")
        );
        assert_eq!(
            lifecycle.properties["OnStart"],
            json!([{ "Content": sagemaker::encode_script(SCRIPT.as_bytes()) }])
        );
    }

    #[test]
    fn test_bucket_grant_scoped_to_bucket() {
        let stack = build_default(None);
        let template = stack.template();
        let policy = template.resource("SageMakerRoleDefaultPolicy").unwrap();
        let statements = policy.properties["PolicyDocument"]["Statement"]
            .as_array()
            .unwrap();

        let grant = statements
            .iter()
            .find(|s| s["Action"] == json!("s3:*"))
            .unwrap();
        assert_eq!(
            grant["Resource"],
            json!([
                { "Fn::GetAtt": ["SageMakerBucket", "Arn"] },
                { "Fn::Join": ["", [{ "Fn::GetAtt": ["SageMakerBucket", "Arn"] }, "/*"]] }
            ])
        );
        for statement in statements {
            assert_ne!(statement["Resource"], json!("*"));
        }
        assert_eq!(policy.properties["Roles"], json!([{ "Ref": "SageMakerRole" }]));

        let role = template.resource("SageMakerRole").unwrap();
        assert_eq!(
            role.properties["AssumeRolePolicyDocument"]["Statement"][0]["Action"],
            json!("sts:AssumeRole")
        );
    }

    #[test]
    fn test_wildcard_grant_refused() {
        let wildcard = PolicyStatement {
            actions: vec!["s3:*".to_string()],
            resources: vec![declarative::Expr::from("*")],
        };
        let err = scoped_document("SageMakerRoleDefaultPolicy", vec![wildcard]).unwrap_err();
        assert!(matches!(err, BuildError::UnscopedGrant(name) if name == "SageMakerRoleDefaultPolicy"));

        let err = scoped_document(
            "Empty",
            vec![PolicyStatement {
                actions: vec!["s3:GetObject".to_string()],
                resources: vec![],
            }],
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::UnscopedGrant(_)));
    }

    #[test]
    fn test_vpc_block_matches_subnets() {
        let config = StackConfig::from_toml("[network]\ncidr = \"10.0.5.7/16\"\n").unwrap();
        let template = build(&config, &StackParams::new(None), &scripts())
            .unwrap()
            .template();

        let vpc = template.resource("SageMakerVpc").unwrap();
        assert_eq!(vpc.properties["CidrBlock"], json!("10.0.0.0/16"));
        let subnet = template
            .resource("SageMakerVpcSageMakerPublicSubnetSubnet1")
            .unwrap();
        assert_eq!(subnet.properties["CidrBlock"], json!("10.0.0.0/24"));
    }

    #[test]
    fn test_repository_link() {
        let with_repo = build_default(Some("https://github.com/example/notebooks.git")).template();
        assert_eq!(
            notebook_entry(&with_repo).properties["DefaultCodeRepository"],
            json!("https://github.com/example/notebooks.git")
        );

        for repo in [None, Some(""), Some("   "), Some("ftp://host/repo"), Some("-bad-")] {
            let template = build_default(repo).template();
            assert!(
                !notebook_entry(&template)
                    .properties
                    .contains_key("DefaultCodeRepository"),
                "{repo:?} kept"
            );
        }
    }

    #[test]
    fn test_normalize_repository() {
        assert_eq!(
            normalize_repository("  my-notebooks "),
            Some("my-notebooks".to_string())
        );
        assert_eq!(normalize_repository("http://insecure/repo"), None);
        assert_eq!(
            normalize_repository(&format!("https://{}", "a".repeat(MAX_REPOSITORY_LEN))),
            None
        );
    }

    #[test]
    fn test_outputs() {
        let template = build_default(None).template();
        assert_eq!(
            template.outputs.keys().collect::<Vec<_>>(),
            vec!["BucketName", "ExecutionRoleArn", "NotebookInstanceName"]
        );
        assert_eq!(
            template.outputs["ExecutionRoleArn"].value,
            json!({ "Fn::GetAtt": ["SageMakerRole", "Arn"] })
        );
    }

    #[test]
    fn test_network_errors_surface() {
        let mut config = StackConfig::default();
        config.network.cidr = "10.0.0.0/23".parse().unwrap();
        let err = build(&config, &StackParams::new(None), &scripts()).unwrap_err();
        assert!(matches!(err, BuildError::CidrExhausted { .. }));

        config.network.cidr = "10.0.0.0/16".parse().unwrap();
        config.network.cidr_mask = 16;
        let err = build(&config, &StackParams::new(None), &scripts()).unwrap_err();
        assert!(matches!(err, BuildError::InvalidSubnetMask { .. }));
    }

    #[test]
    fn test_plan_orders_dependencies() {
        let stack = build_default(None);
        let plan = stack.plan();

        assert_eq!(plan.creation.len(), stack.graph.len());
        let mut teardown = plan.teardown();
        teardown.reverse();
        assert_eq!(teardown, plan.creation);

        for resource in stack.graph.resources() {
            let wave = plan.wave_of(resource.logical_id()).unwrap();
            for dep in resource.all_dependencies() {
                assert!(plan.wave_of(&dep).unwrap() < wave);
            }
        }
        assert_eq!(plan.creation.last(), Some(stack.notebook.id()));
    }

    #[test]
    fn test_template_is_stable_for_fixed_inputs() {
        let params = StackParams {
            bucket_suffix: "abc".to_string(),
            ..StackParams::new(Some("repo-name"))
        };
        let a = build(&StackConfig::default(), &params, &scripts()).unwrap();
        let b = build(&StackConfig::default(), &params, &scripts()).unwrap();
        assert_eq!(
            a.template().fingerprint().unwrap(),
            b.template().fingerprint().unwrap()
        );
        assert_eq!(a.script_digest, blake3::hash(SCRIPT.as_bytes()).to_hex().to_string());

        let json: Value = serde_json::from_str(&a.template().to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["AWSTemplateFormatVersion"], json!("2010-09-09"));
    }
}
