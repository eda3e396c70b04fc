//! Virtual network resources - VPC, subnets, routing, internet gateway

use declarative::{Expr, Handle, LogicalId, Properties, Resource};
use ipnet::Ipv4Net;

use super::name_tags;

/// Subnet tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubnetType {
    /// Routed to the internet gateway, public IPs on launch
    Public,
    /// No route in or out of the network
    Isolated,
}

impl SubnetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Isolated => "Isolated",
        }
    }
}

/// A VPC
#[derive(Debug, Clone)]
pub struct Vpc {
    pub id: LogicalId,
    pub cidr: Ipv4Net,
    pub name: String,
}

impl Resource for Vpc {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::EC2::VPC"
    }

    fn description(&self) -> String {
        format!("VPC {}", self.cidr)
    }

    fn properties(&self) -> Properties {
        Properties::from([
            ("CidrBlock".to_string(), Expr::from(self.cidr.to_string())),
            ("EnableDnsHostnames".to_string(), Expr::from(true)),
            ("EnableDnsSupport".to_string(), Expr::from(true)),
            ("InstanceTenancy".to_string(), Expr::from("default")),
            ("Tags".to_string(), name_tags(&self.name, &[])),
        ])
    }
}

/// A subnet in one availability zone
#[derive(Debug, Clone)]
pub struct Subnet {
    pub id: LogicalId,
    pub vpc: Handle,
    pub cidr: Ipv4Net,
    pub az_index: usize,
    pub subnet_type: SubnetType,
    pub group_name: String,
    pub name: String,
}

impl Resource for Subnet {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::EC2::Subnet"
    }

    fn description(&self) -> String {
        format!(
            "{} subnet {} (AZ #{})",
            self.subnet_type.as_str(),
            self.cidr,
            self.az_index + 1
        )
    }

    fn properties(&self) -> Properties {
        Properties::from([
            (
                "AvailabilityZone".to_string(),
                Expr::availability_zone(self.az_index),
            ),
            ("CidrBlock".to_string(), Expr::from(self.cidr.to_string())),
            (
                "MapPublicIpOnLaunch".to_string(),
                Expr::from(self.subnet_type == SubnetType::Public),
            ),
            (
                "Tags".to_string(),
                name_tags(
                    &self.name,
                    &[
                        ("SubnetGroup", self.group_name.as_str()),
                        ("SubnetType", self.subnet_type.as_str()),
                    ],
                ),
            ),
            ("VpcId".to_string(), self.vpc.reference()),
        ])
    }
}

/// A route table owned by one subnet
#[derive(Debug, Clone)]
pub struct RouteTable {
    pub id: LogicalId,
    pub vpc: Handle,
    pub name: String,
}

impl Resource for RouteTable {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::EC2::RouteTable"
    }

    fn description(&self) -> String {
        format!("Route table {}", self.name)
    }

    fn properties(&self) -> Properties {
        Properties::from([
            ("Tags".to_string(), name_tags(&self.name, &[])),
            ("VpcId".to_string(), self.vpc.reference()),
        ])
    }
}

/// Binds a route table to a subnet
#[derive(Debug, Clone)]
pub struct SubnetRouteTableAssociation {
    pub id: LogicalId,
    pub route_table: Handle,
    pub subnet: Handle,
}

impl Resource for SubnetRouteTableAssociation {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::EC2::SubnetRouteTableAssociation"
    }

    fn description(&self) -> String {
        format!(
            "Associate {} with {}",
            self.route_table.id(),
            self.subnet.id()
        )
    }

    fn properties(&self) -> Properties {
        Properties::from([
            ("RouteTableId".to_string(), self.route_table.reference()),
            ("SubnetId".to_string(), self.subnet.reference()),
        ])
    }
}

/// An internet gateway
#[derive(Debug, Clone)]
pub struct InternetGateway {
    pub id: LogicalId,
    pub name: String,
}

impl Resource for InternetGateway {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::EC2::InternetGateway"
    }

    fn description(&self) -> String {
        format!("Internet gateway {}", self.name)
    }

    fn properties(&self) -> Properties {
        Properties::from([("Tags".to_string(), name_tags(&self.name, &[]))])
    }
}

/// Attaches an internet gateway to a VPC
#[derive(Debug, Clone)]
pub struct VpcGatewayAttachment {
    pub id: LogicalId,
    pub vpc: Handle,
    pub gateway: Handle,
}

impl Resource for VpcGatewayAttachment {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::EC2::VPCGatewayAttachment"
    }

    fn description(&self) -> String {
        format!("Attach {} to {}", self.gateway.id(), self.vpc.id())
    }

    fn properties(&self) -> Properties {
        Properties::from([
            ("InternetGatewayId".to_string(), self.gateway.reference()),
            ("VpcId".to_string(), self.vpc.reference()),
        ])
    }
}

/// A route through the internet gateway
///
/// Depends on the gateway attachment: a route to an unattached gateway
/// is rejected by the provider.
#[derive(Debug, Clone)]
pub struct Route {
    pub id: LogicalId,
    pub route_table: Handle,
    pub gateway: Handle,
    pub attachment: Handle,
    pub destination: Ipv4Net,
}

impl Resource for Route {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::EC2::Route"
    }

    fn description(&self) -> String {
        format!("Route {} via {}", self.destination, self.gateway.id())
    }

    fn properties(&self) -> Properties {
        Properties::from([
            (
                "DestinationCidrBlock".to_string(),
                Expr::from(self.destination.to_string()),
            ),
            ("GatewayId".to_string(), self.gateway.reference()),
            ("RouteTableId".to_string(), self.route_table.reference()),
        ])
    }

    fn depends_on(&self) -> Vec<LogicalId> {
        vec![self.attachment.id().clone()]
    }
}
