//! Object storage bucket resource

use declarative::{DeletionPolicy, Expr, LogicalId, Properties, Resource};

/// Maximum length of a bucket name
pub const MAX_BUCKET_NAME_LEN: usize = 63;

/// Objects uploaded by other accounts belong to the bucket owner
const OBJECT_OWNERSHIP: &str = "BucketOwnerPreferred";

/// Public access block flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicAccessBlock {
    pub block_public_acls: bool,
    pub block_public_policy: bool,
    pub ignore_public_acls: bool,
    pub restrict_public_buckets: bool,
}

impl PublicAccessBlock {
    /// Every flag set
    pub fn block_all() -> Self {
        Self {
            block_public_acls: true,
            block_public_policy: true,
            ignore_public_acls: true,
            restrict_public_buckets: true,
        }
    }

    fn to_expr(self) -> Expr {
        Expr::map([
            ("BlockPublicAcls", self.block_public_acls),
            ("BlockPublicPolicy", self.block_public_policy),
            ("IgnorePublicAcls", self.ignore_public_acls),
            ("RestrictPublicBuckets", self.restrict_public_buckets),
        ])
    }
}

/// An S3 bucket
#[derive(Debug, Clone)]
pub struct Bucket {
    pub id: LogicalId,
    pub name: String,
    pub public_access: PublicAccessBlock,
    pub removal_policy: DeletionPolicy,
}

impl Bucket {
    /// A private bucket that is deleted with the stack
    pub fn private(id: LogicalId, name: String) -> Self {
        Self {
            id,
            name,
            public_access: PublicAccessBlock::block_all(),
            removal_policy: DeletionPolicy::Delete,
        }
    }
}

/// Compose a bucket name from a prefix and a uniqueness suffix
pub fn unique_name(prefix: &str, suffix: &str) -> String {
    format!("{}-{}", prefix, suffix)
}

/// Whether a name satisfies the S3 naming rules this stack relies on
pub fn is_valid_name(name: &str) -> bool {
    (3..=MAX_BUCKET_NAME_LEN).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-')
}

impl Resource for Bucket {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::S3::Bucket"
    }

    fn description(&self) -> String {
        format!("Bucket {}", self.name)
    }

    fn properties(&self) -> Properties {
        Properties::from([
            ("BucketName".to_string(), Expr::from(self.name.as_str())),
            (
                "OwnershipControls".to_string(),
                Expr::map([(
                    "Rules",
                    Expr::list([Expr::map([("ObjectOwnership", OBJECT_OWNERSHIP)])]),
                )]),
            ),
            (
                "PublicAccessBlockConfiguration".to_string(),
                self.public_access.to_expr(),
            ),
        ])
    }

    fn deletion_policy(&self) -> Option<DeletionPolicy> {
        Some(self.removal_policy)
    }
}
