//! Resource descriptors for the notebook environment
//!
//! Each type here implements [`declarative::Resource`]: it names a provider
//! resource type and renders the properties the provisioning engine should
//! converge it to. Cross-references are carried as [`declarative::Handle`]s,
//! so a descriptor can only point at something already declared.

use declarative::Expr;

pub mod bucket;
pub mod iam;
pub mod network;
pub mod sagemaker;
pub mod security_group;

pub use bucket::Bucket;
pub use iam::{Policy, PolicyDocument, PolicyStatement, Role};
pub use network::{
    InternetGateway, Route, RouteTable, Subnet, SubnetRouteTableAssociation, SubnetType, Vpc,
    VpcGatewayAttachment,
};
pub use sagemaker::{LifecycleConfig, NotebookInstance};
pub use security_group::SecurityGroup;

/// `Tags` list with a `Name` tag followed by extra key/value pairs
pub fn name_tags(name: &str, extra: &[(&str, &str)]) -> Expr {
    let mut tags: Vec<(&str, &str)> = extra.to_vec();
    tags.push(("Name", name));
    tags.sort_by(|a, b| a.0.cmp(b.0));

    Expr::list(
        tags.into_iter()
            .map(|(key, value)| Expr::map([("Key", key), ("Value", value)])),
    )
}
