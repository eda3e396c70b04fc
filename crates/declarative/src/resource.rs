//! Resource trait for declarative resource graphs
//!
//! A Resource is a descriptor: it names a provider resource type and the
//! properties the provisioning engine should converge it to. It never talks
//! to the provider itself.

use crate::types::{DeletionPolicy, Expr, LogicalId, Properties};
use std::collections::BTreeSet;
use std::fmt;

/// Core trait for declared resources
///
/// # Example
///
/// ```ignore
/// use declarative::{Expr, LogicalId, Properties, Resource};
///
/// #[derive(Debug)]
/// struct Topic { id: LogicalId, name: String }
///
/// impl Resource for Topic {
///     fn logical_id(&self) -> &LogicalId { &self.id }
///     fn resource_type(&self) -> &'static str { "AWS::SNS::Topic" }
///     fn description(&self) -> String { format!("Topic {}", self.name) }
///     fn properties(&self) -> Properties {
///         Properties::from([("TopicName".to_string(), Expr::from(self.name.as_str()))])
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Template-local name of this resource
    fn logical_id(&self) -> &LogicalId;

    /// Provider type name, e.g. "AWS::S3::Bucket"
    fn resource_type(&self) -> &'static str;

    /// Human-readable description of what this resource is
    fn description(&self) -> String;

    /// Properties the engine converges the resource to
    fn properties(&self) -> Properties;

    /// What happens to the physical resource on removal or replacement
    fn deletion_policy(&self) -> Option<DeletionPolicy> {
        None
    }

    /// Ordering dependencies that are not visible through property references
    fn depends_on(&self) -> Vec<LogicalId> {
        Vec::new()
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Extension trait for dependency introspection
pub trait ResourceExt {
    /// Resources referenced from properties (implicit dependencies)
    fn implicit_dependencies(&self) -> BTreeSet<LogicalId>;

    /// Implicit and explicit dependencies combined
    fn all_dependencies(&self) -> BTreeSet<LogicalId>;

    /// Short type name without the provider prefix, e.g. "Bucket"
    fn short_type(&self) -> &'static str;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn implicit_dependencies(&self) -> BTreeSet<LogicalId> {
        self.properties()
            .values()
            .flat_map(Expr::references)
            .cloned()
            .collect()
    }

    fn all_dependencies(&self) -> BTreeSet<LogicalId> {
        let mut deps = self.implicit_dependencies();
        deps.extend(self.depends_on());
        deps
    }

    fn short_type(&self) -> &'static str {
        let full = self.resource_type();
        full.rsplit("::").next().unwrap_or(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Attachment {
        id: LogicalId,
        role: LogicalId,
        policy: LogicalId,
    }

    impl Resource for Attachment {
        fn logical_id(&self) -> &LogicalId {
            &self.id
        }

        fn resource_type(&self) -> &'static str {
            "AWS::IAM::Policy"
        }

        fn description(&self) -> String {
            "Test attachment".into()
        }

        fn properties(&self) -> Properties {
            Properties::from([(
                "Roles".to_string(),
                Expr::list([Expr::Ref(self.role.clone())]),
            )])
        }

        fn depends_on(&self) -> Vec<LogicalId> {
            vec![self.policy.clone()]
        }
    }

    #[test]
    fn test_dependencies() {
        let res = Attachment {
            id: LogicalId::new("Attachment").unwrap(),
            role: LogicalId::new("Role").unwrap(),
            policy: LogicalId::new("Policy").unwrap(),
        };

        let implicit: Vec<_> = res.implicit_dependencies().into_iter().collect();
        assert_eq!(implicit, vec![LogicalId::new("Role").unwrap()]);

        let all: Vec<String> = res
            .all_dependencies()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(all, vec!["Policy", "Role"]);
        assert_eq!(res.short_type(), "Policy");
    }
}
