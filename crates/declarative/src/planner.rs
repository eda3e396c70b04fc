//! Deployment planner - creation order, teardown order, and waves

use crate::graph::ResourceGraph;
use crate::resource::{Resource, ResourceExt};
use crate::types::LogicalId;
use std::collections::HashMap;

/// The orderings an engine would follow for a graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    /// Resources in creation order
    pub creation: Vec<LogicalId>,
    /// Resources grouped so that each depends only on earlier waves
    pub waves: Vec<Vec<LogicalId>>,
}

impl DeploymentPlan {
    /// Build the plan for a graph
    pub fn for_graph(graph: &ResourceGraph) -> Self {
        let creation = graph.creation_order();

        // Declaration order is topological, so one pass assigns every wave
        let mut wave_of: HashMap<&LogicalId, usize> = HashMap::new();
        let mut waves: Vec<Vec<LogicalId>> = Vec::new();
        for resource in graph.resources() {
            let wave = resource
                .all_dependencies()
                .iter()
                .filter_map(|dep| wave_of.get(dep).map(|w| w + 1))
                .max()
                .unwrap_or(0);
            wave_of.insert(resource.logical_id(), wave);
            if waves.len() <= wave {
                waves.resize_with(wave + 1, Vec::new);
            }
            waves[wave].push(resource.logical_id().clone());
        }

        Self { creation, waves }
    }

    /// Resources in teardown order (reverse of creation)
    pub fn teardown(&self) -> Vec<LogicalId> {
        self.creation.iter().rev().cloned().collect()
    }

    /// Wave index of a resource
    pub fn wave_of(&self, id: &LogicalId) -> Option<usize> {
        self.waves.iter().position(|wave| wave.contains(id))
    }
}

/// Filter graph resources by a target pattern
///
/// Target format: "type" or "type.name". The type part matches the short
/// provider type ("bucket", "subnet"), the service ("s3", "ec2"), or an
/// alias ("network", "iam", "sagemaker"); the name part is a substring of
/// the logical id. Matching is case-insensitive.
pub fn select<'a>(graph: &'a ResourceGraph, target: Option<&str>) -> Vec<&'a dyn Resource> {
    match target {
        None => graph.resources().collect(),
        Some(t) => {
            let (resource_type, name) = parse_target(t);
            graph
                .resources()
                .filter(|r| matches_filter(*r, resource_type.as_deref(), name.as_deref()))
                .collect()
        }
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.len() {
        1 => (Some(parts[0].to_lowercase()), None),
        2 => (Some(parts[0].to_lowercase()), Some(parts[1].to_lowercase())),
        _ => (None, Some(target.to_lowercase())),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(resource: &dyn Resource, resource_type: Option<&str>, name: Option<&str>) -> bool {
    if let Some(rt) = resource_type {
        let full = resource.resource_type().to_lowercase();
        let service = full.split("::").nth(1).unwrap_or_default();
        let short = resource.short_type().to_lowercase();

        // Allow common aliases
        let matches_type = match rt {
            "network" | "vpc" => service == "ec2" && short != "securitygroup",
            "iam" | "role" | "roles" => service == "iam",
            "notebook" | "sagemaker" => service == "sagemaker",
            "storage" => service == "s3",
            _ => short == rt || service == rt || short.starts_with(rt),
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && !resource.logical_id().as_str().to_lowercase().contains(n)
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::Node;

    fn ids(list: &[LogicalId]) -> Vec<&str> {
        list.iter().map(LogicalId::as_str).collect()
    }

    fn sample_graph() -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        graph.declare(Node::new("Bucket").kind("AWS::S3::Bucket")).unwrap();
        graph.declare(Node::new("Vpc").kind("AWS::EC2::VPC")).unwrap();
        graph
            .declare(Node::new("Subnet").kind("AWS::EC2::Subnet").refs(&["Vpc"]))
            .unwrap();
        graph
            .declare(Node::new("Role").kind("AWS::IAM::Role"))
            .unwrap();
        graph
            .declare(
                Node::new("Policy")
                    .kind("AWS::IAM::Policy")
                    .refs(&["Role", "Bucket"]),
            )
            .unwrap();
        graph
            .declare(
                Node::new("Notebook")
                    .kind("AWS::SageMaker::NotebookInstance")
                    .refs(&["Role", "Subnet"])
                    .after(&["Policy"]),
            )
            .unwrap();
        graph
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("subnet"), (Some("subnet".to_string()), None));
        assert_eq!(
            parse_target("IAM.Role"),
            (Some("iam".to_string()), Some("role".to_string()))
        );
        assert_eq!(parse_target("a.b.c"), (None, Some("a.b.c".to_string())));
    }

    #[test]
    fn test_creation_and_teardown_orders() {
        let plan = DeploymentPlan::for_graph(&sample_graph());
        assert_eq!(
            ids(&plan.creation),
            vec!["Bucket", "Vpc", "Subnet", "Role", "Policy", "Notebook"]
        );

        let mut reversed = plan.creation.clone();
        reversed.reverse();
        assert_eq!(plan.teardown(), reversed);
    }

    #[test]
    fn test_waves_respect_dependencies() {
        let graph = sample_graph();
        let plan = DeploymentPlan::for_graph(&graph);

        assert_eq!(ids(&plan.waves[0]), vec!["Bucket", "Vpc", "Role"]);
        assert_eq!(ids(&plan.waves[1]), vec!["Subnet", "Policy"]);
        assert_eq!(ids(&plan.waves[2]), vec!["Notebook"]);

        for resource in graph.resources() {
            let wave = plan.wave_of(resource.logical_id()).unwrap();
            for dep in graph.dependencies(resource.logical_id()) {
                assert!(plan.wave_of(&dep).unwrap() < wave);
            }
        }
    }

    #[test]
    fn test_select_by_type_and_name() {
        let graph = sample_graph();

        let names = |target: &str| -> Vec<String> {
            select(&graph, Some(target))
                .into_iter()
                .map(|r| r.logical_id().to_string())
                .collect()
        };

        assert_eq!(names("s3"), vec!["Bucket"]);
        assert_eq!(names("network"), vec!["Vpc", "Subnet"]);
        assert_eq!(names("iam"), vec!["Role", "Policy"]);
        assert_eq!(names("iam.pol"), vec!["Policy"]);
        assert_eq!(names("sagemaker"), vec!["Notebook"]);
        assert_eq!(names("notebookinstance"), vec!["Notebook"]);
        assert!(names("queue").is_empty());
        assert_eq!(select(&graph, None).len(), 6);
    }
}
