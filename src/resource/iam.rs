//! Identity resources - execution role, policies, policy statements

use declarative::{Expr, Handle, LogicalId, Properties, PseudoParameter, Resource};

/// Policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

/// A permission grant
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    pub actions: Vec<String>,
    pub resources: Vec<Expr>,
}

impl PolicyStatement {
    /// Every object-store action on one bucket and the objects inside it
    pub fn full_bucket_access(bucket: &Handle) -> Self {
        let arn = bucket.attr("Arn");
        Self {
            actions: vec!["s3:*".to_string()],
            resources: vec![arn.clone(), Expr::join("", [arn, Expr::from("/*")])],
        }
    }

    /// Whether every resource is a concrete ARN rather than `*`
    pub fn is_scoped(&self) -> bool {
        !self.resources.is_empty() && !self.resources.iter().any(Expr::is_wildcard)
    }

    fn to_expr(&self) -> Expr {
        let action = match self.actions.as_slice() {
            [single] => Expr::from(single.as_str()),
            many => Expr::list(many.iter().map(String::as_str)),
        };
        let resource = match self.resources.as_slice() {
            [single] => single.clone(),
            many => Expr::List(many.to_vec()),
        };

        Expr::map([
            ("Action", action),
            ("Effect", Expr::from("Allow")),
            ("Resource", resource),
        ])
    }
}

/// A list of statements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyDocument {
    pub statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        Self { statements }
    }

    fn to_expr(&self) -> Expr {
        Expr::map([
            (
                "Statement",
                Expr::List(self.statements.iter().map(PolicyStatement::to_expr).collect()),
            ),
            ("Version", Expr::from(POLICY_VERSION)),
        ])
    }
}

/// ARN of a provider-managed policy, partition-aware
pub fn managed_policy_arn(name: &str) -> Expr {
    Expr::join(
        "",
        [
            Expr::from("arn:"),
            Expr::from(PseudoParameter::Partition),
            Expr::from(format!(":iam::aws:policy/{}", name)),
        ],
    )
}

/// An IAM role assumed by a service
#[derive(Debug, Clone)]
pub struct Role {
    pub id: LogicalId,
    pub service_principal: String,
    pub managed_policies: Vec<String>,
}

impl Role {
    fn trust_policy(&self) -> Expr {
        Expr::map([
            (
                "Statement",
                Expr::list([Expr::map([
                    ("Action", Expr::from("sts:AssumeRole")),
                    ("Effect", Expr::from("Allow")),
                    (
                        "Principal",
                        Expr::map([("Service", self.service_principal.as_str())]),
                    ),
                ])]),
            ),
            ("Version", Expr::from(POLICY_VERSION)),
        ])
    }
}

impl Resource for Role {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::IAM::Role"
    }

    fn description(&self) -> String {
        format!("Role assumed by {}", self.service_principal)
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::from([(
            "AssumeRolePolicyDocument".to_string(),
            self.trust_policy(),
        )]);

        if !self.managed_policies.is_empty() {
            props.insert(
                "ManagedPolicyArns".to_string(),
                Expr::List(
                    self.managed_policies
                        .iter()
                        .map(|name| managed_policy_arn(name))
                        .collect(),
                ),
            );
        }

        props
    }
}

/// An inline policy attached to one or more roles
#[derive(Debug, Clone)]
pub struct Policy {
    pub id: LogicalId,
    pub name: String,
    pub document: PolicyDocument,
    pub roles: Vec<Handle>,
}

impl Resource for Policy {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::IAM::Policy"
    }

    fn description(&self) -> String {
        format!(
            "Policy {} ({} statements)",
            self.name,
            self.document.statements.len()
        )
    }

    fn properties(&self) -> Properties {
        Properties::from([
            ("PolicyDocument".to_string(), self.document.to_expr()),
            ("PolicyName".to_string(), Expr::from(self.name.as_str())),
            (
                "Roles".to_string(),
                Expr::List(self.roles.iter().map(Handle::reference).collect()),
            ),
        ])
    }
}
