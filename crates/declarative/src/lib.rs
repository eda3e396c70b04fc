//! # Declarative
//!
//! A framework for declarative resource graphs.
//!
//! This crate provides the core abstractions for declaring resources,
//! wiring them together by reference, and synthesizing the graph into a
//! template that an external provisioning engine converges.
//!
//! ## Core Concepts
//!
//! - **Resource**: A descriptor of something the engine should create
//! - **Expr**: A property value, literal or resolved at deploy time (`Ref`, `GetAtt`, ...)
//! - **ResourceGraph**: Declared resources; references must resolve to earlier declarations
//! - **DeploymentPlan**: Creation order, teardown order, and dependency waves
//! - **Template**: The serialized graph, and diffs between two templates
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Expr, LogicalId, Properties, Resource, ResourceGraph, Template};
//!
//! #[derive(Debug)]
//! struct Topic { id: LogicalId }
//!
//! impl Resource for Topic {
//!     fn logical_id(&self) -> &LogicalId { &self.id }
//!     fn resource_type(&self) -> &'static str { "AWS::SNS::Topic" }
//!     fn description(&self) -> String { "Notification topic".into() }
//!     fn properties(&self) -> Properties { Properties::new() }
//! }
//!
//! let mut graph = ResourceGraph::new();
//! let topic = graph.declare(Topic { id: LogicalId::new("Alerts")? })?;
//! let template = Template::synthesize(&graph, Some("Alerts stack"));
//! println!("{}", template.to_json_pretty()?);
//! ```
//!
//! Declaring a resource whose properties mention an undeclared logical id
//! fails with [`GraphError::UnresolvedReference`], which keeps every graph
//! acyclic by construction.

pub mod diff;
pub mod error;
pub mod graph;
pub mod planner;
pub mod resource;
pub mod template;
pub mod types;

// Re-export main types at crate root
pub use diff::{ChangeKind, DiffSummary, ResourceDiff, changed_outputs, compute_diffs, group_by_type};
pub use error::{GraphError, Result};
pub use graph::{Handle, Output, ResourceGraph};
pub use planner::{DeploymentPlan, select};
pub use resource::{BoxedResource, Resource, ResourceExt};
pub use template::{Template, TemplateExport, TemplateOutput, TemplateResource};
pub use types::{DeletionPolicy, Expr, LogicalId, Properties, PseudoParameter};
