//! Resource graph - resources and outputs linked by reference
//!
//! Every reference must resolve to a resource declared earlier, so the
//! declaration order is always a valid creation order and the graph can
//! never contain a cycle.

use crate::error::{GraphError, Result};
use crate::planner::DeploymentPlan;
use crate::resource::{BoxedResource, Resource, ResourceExt};
use crate::types::{Expr, LogicalId};
use std::collections::{BTreeSet, HashMap};

/// Typed handle to a declared resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    id: LogicalId,
    resource_type: &'static str,
}

impl Handle {
    /// Logical id of the referenced resource
    pub fn id(&self) -> &LogicalId {
        &self.id
    }

    /// Provider type of the referenced resource
    pub fn resource_type(&self) -> &'static str {
        self.resource_type
    }

    /// `Ref` to the resource's primary identifier
    pub fn reference(&self) -> Expr {
        Expr::Ref(self.id.clone())
    }

    /// `GetAtt` of a named attribute
    pub fn attr(&self, attribute: &str) -> Expr {
        Expr::GetAtt {
            target: self.id.clone(),
            attribute: attribute.to_string(),
        }
    }
}

/// A named stack output
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: LogicalId,
    pub value: Expr,
    pub description: Option<String>,
    pub export_name: Option<String>,
}

impl Output {
    pub fn new(name: LogicalId, value: Expr) -> Self {
        Self {
            name,
            value,
            description: None,
            export_name: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_export(mut self, export_name: impl Into<String>) -> Self {
        self.export_name = Some(export_name.into());
        self
    }
}

/// An in-memory graph of declared resources
#[derive(Debug, Default)]
pub struct ResourceGraph {
    resources: Vec<BoxedResource>,
    index: HashMap<LogicalId, usize>,
    outputs: Vec<Output>,
}

impl ResourceGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource
    ///
    /// Fails if the logical id is taken or if any property reference or
    /// explicit dependency names a resource that is not declared yet.
    pub fn declare<R: Resource + 'static>(&mut self, resource: R) -> Result<Handle> {
        let id = resource.logical_id().clone();
        if self.index.contains_key(&id) {
            return Err(GraphError::DuplicateLogicalId(id.to_string()));
        }

        for dep in resource.all_dependencies() {
            if !self.index.contains_key(&dep) {
                return Err(GraphError::UnresolvedReference {
                    from: id.to_string(),
                    target: dep.to_string(),
                });
            }
        }

        let handle = Handle {
            id: id.clone(),
            resource_type: resource.resource_type(),
        };
        self.index.insert(id, self.resources.len());
        self.resources.push(Box::new(resource));
        Ok(handle)
    }

    /// Add a stack output
    pub fn add_output(&mut self, output: Output) -> Result<()> {
        if self.outputs.iter().any(|o| o.name == output.name) {
            return Err(GraphError::DuplicateOutput(output.name.to_string()));
        }

        if let Some(missing) = output
            .value
            .references()
            .into_iter()
            .find(|id| !self.index.contains_key(*id))
        {
            return Err(GraphError::UnresolvedReference {
                from: output.name.to_string(),
                target: missing.to_string(),
            });
        }

        self.outputs.push(output);
        Ok(())
    }

    /// Look up a resource by logical id
    pub fn get(&self, id: &LogicalId) -> Option<&dyn Resource> {
        self.index.get(id).map(|&i| self.resources[i].as_ref())
    }

    /// Whether a logical id is declared
    pub fn contains(&self, id: &LogicalId) -> bool {
        self.index.contains_key(id)
    }

    /// All resources in declaration order
    pub fn resources(&self) -> impl Iterator<Item = &dyn Resource> {
        self.resources.iter().map(|r| r.as_ref())
    }

    /// All resources of a given provider type
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a dyn Resource> + 'a {
        self.resources()
            .filter(move |r| r.resource_type() == resource_type)
    }

    /// Declared outputs
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Dependencies of a resource, implicit and explicit
    pub fn dependencies(&self, id: &LogicalId) -> BTreeSet<LogicalId> {
        self.get(id)
            .map(|r| r.all_dependencies())
            .unwrap_or_default()
    }

    /// Position of a resource in declaration order
    pub fn position(&self, id: &LogicalId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Total number of resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Declaration order, which is always a valid creation order
    pub fn creation_order(&self) -> Vec<LogicalId> {
        self.resources
            .iter()
            .map(|r| r.logical_id().clone())
            .collect()
    }

    /// Reverse of creation order
    pub fn teardown_order(&self) -> Vec<LogicalId> {
        DeploymentPlan::for_graph(self).teardown()
    }

    /// Resources grouped so each depends only on earlier groups
    pub fn deployment_waves(&self) -> Vec<Vec<LogicalId>> {
        DeploymentPlan::for_graph(self).waves
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::Properties;

    /// Minimal resource used across the crate's tests
    #[derive(Debug, Clone)]
    pub(crate) struct Node {
        pub id: LogicalId,
        pub kind: &'static str,
        pub refs: Vec<LogicalId>,
        pub after: Vec<LogicalId>,
        pub name: String,
    }

    impl Node {
        pub(crate) fn new(id: &str) -> Self {
            Self {
                id: LogicalId::new(id).unwrap(),
                kind: "Test::Node::Thing",
                refs: Vec::new(),
                after: Vec::new(),
                name: id.to_lowercase(),
            }
        }

        pub(crate) fn refs(mut self, ids: &[&str]) -> Self {
            self.refs = ids.iter().map(|i| LogicalId::new(*i).unwrap()).collect();
            self
        }

        pub(crate) fn after(mut self, ids: &[&str]) -> Self {
            self.after = ids.iter().map(|i| LogicalId::new(*i).unwrap()).collect();
            self
        }

        pub(crate) fn kind(mut self, kind: &'static str) -> Self {
            self.kind = kind;
            self
        }
    }

    impl Resource for Node {
        fn logical_id(&self) -> &LogicalId {
            &self.id
        }

        fn resource_type(&self) -> &'static str {
            self.kind
        }

        fn description(&self) -> String {
            format!("Node {}", self.id)
        }

        fn properties(&self) -> Properties {
            let mut props = Properties::new();
            props.insert("Name".into(), Expr::from(self.name.as_str()));
            if !self.refs.is_empty() {
                props.insert(
                    "Targets".into(),
                    Expr::list(self.refs.iter().cloned().map(Expr::Ref)),
                );
            }
            props
        }

        fn depends_on(&self) -> Vec<LogicalId> {
            self.after.clone()
        }
    }

    #[test]
    fn test_declare_and_lookup() {
        let mut graph = ResourceGraph::new();
        let a = graph.declare(Node::new("A")).unwrap();
        let b = graph.declare(Node::new("B").refs(&["A"])).unwrap();

        assert_eq!(graph.len(), 2);
        assert!(graph.contains(a.id()));
        assert_eq!(graph.position(b.id()), Some(1));
        assert_eq!(
            graph.dependencies(b.id()).into_iter().collect::<Vec<_>>(),
            vec![a.id().clone()]
        );
        assert_eq!(b.attr("Arn").references(), vec![b.id()]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut graph = ResourceGraph::new();
        graph.declare(Node::new("A")).unwrap();
        let err = graph.declare(Node::new("A")).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateLogicalId(id) if id == "A"));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let mut graph = ResourceGraph::new();
        let err = graph.declare(Node::new("B").refs(&["A"])).unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnresolvedReference { ref from, ref target } if from == "B" && target == "A"
        ));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_self_reference_rejected() {
        let mut graph = ResourceGraph::new();
        assert!(graph.declare(Node::new("A").refs(&["A"])).is_err());
    }

    #[test]
    fn test_explicit_dependency_must_resolve() {
        let mut graph = ResourceGraph::new();
        assert!(graph.declare(Node::new("B").after(&["A"])).is_err());
        graph.declare(Node::new("A")).unwrap();
        assert!(graph.declare(Node::new("B").after(&["A"])).is_ok());
    }

    #[test]
    fn test_outputs_validated() {
        let mut graph = ResourceGraph::new();
        let a = graph.declare(Node::new("A")).unwrap();

        let ghost = Output::new(
            LogicalId::new("Ghost").unwrap(),
            Expr::Ref(LogicalId::new("Missing").unwrap()),
        );
        assert!(graph.add_output(ghost).is_err());

        let ok = Output::new(LogicalId::new("AName").unwrap(), a.reference())
            .with_description("Name of A");
        graph.add_output(ok.clone()).unwrap();
        assert!(matches!(
            graph.add_output(ok),
            Err(GraphError::DuplicateOutput(_))
        ));
        assert_eq!(graph.outputs().len(), 1);
    }

    #[test]
    fn test_orders_and_waves() {
        let mut graph = ResourceGraph::new();
        graph.declare(Node::new("A")).unwrap();
        graph.declare(Node::new("B")).unwrap();
        graph.declare(Node::new("C").refs(&["A"]).after(&["B"])).unwrap();

        let ids = |list: Vec<LogicalId>| list.into_iter().map(String::from).collect::<Vec<_>>();
        assert_eq!(ids(graph.creation_order()), vec!["A", "B", "C"]);
        assert_eq!(ids(graph.teardown_order()), vec!["C", "B", "A"]);
        assert_eq!(
            graph
                .deployment_waves()
                .into_iter()
                .map(ids)
                .collect::<Vec<_>>(),
            vec![vec!["A", "B"], vec!["C"]]
        );
    }

    #[test]
    fn test_resources_of_type() {
        let mut graph = ResourceGraph::new();
        graph.declare(Node::new("A").kind("AWS::S3::Bucket")).unwrap();
        graph.declare(Node::new("B")).unwrap();
        assert_eq!(graph.resources_of_type("AWS::S3::Bucket").count(), 1);
    }
}
