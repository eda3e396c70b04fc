//! Network layout - subnet allocation and the VPC resource set

use declarative::{Handle, LogicalId, ResourceGraph};
use ipnet::Ipv4Net;

use super::{BuildError, declare};
use crate::config::NetworkConfig;
use crate::resource::security_group::any_ipv4;
use crate::resource::{
    InternetGateway, Route, RouteTable, Subnet, SubnetRouteTableAssociation, SubnetType, Vpc,
    VpcGatewayAttachment,
};

/// Longest subnet prefix the provider accepts
pub const MAX_SUBNET_PREFIX: u8 = 28;

const PUBLIC_GROUP: &str = "SageMakerPublicSubnet";
const ISOLATED_GROUP: &str = "SageMakerPrivateSubnet";

/// Address blocks for each subnet tier, one per availability zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetLayout {
    pub public: Vec<Ipv4Net>,
    pub isolated: Vec<Ipv4Net>,
}

impl SubnetLayout {
    /// Carve `zones` public and `zones` isolated blocks of size `/mask`
    /// out of `vpc`, public blocks first.
    pub fn allocate(vpc: Ipv4Net, mask: u8, zones: usize) -> Result<Self, BuildError> {
        if mask <= vpc.prefix_len() || mask > MAX_SUBNET_PREFIX {
            return Err(BuildError::InvalidSubnetMask {
                vpc,
                mask,
                max: MAX_SUBNET_PREFIX,
            });
        }

        let needed = zones * 2;
        let blocks: Vec<Ipv4Net> = vpc
            .trunc()
            .subnets(mask)
            .map_err(|_| BuildError::InvalidSubnetMask {
                vpc,
                mask,
                max: MAX_SUBNET_PREFIX,
            })?
            .take(needed)
            .collect();

        if blocks.len() < needed {
            return Err(BuildError::CidrExhausted {
                vpc,
                mask,
                needed,
                available: blocks.len(),
            });
        }

        let (public, isolated) = blocks.split_at(zones);
        Ok(Self {
            public: public.to_vec(),
            isolated: isolated.to_vec(),
        })
    }
}

/// Handles to the declared network
#[derive(Debug, Clone)]
pub struct NetworkHandles {
    pub vpc: Handle,
    pub public_subnets: Vec<Handle>,
    pub isolated_subnets: Vec<Handle>,
}

/// Declare the VPC, its gateway, and both subnet tiers
pub fn declare_network(
    graph: &mut ResourceGraph,
    stack_name: &str,
    id: &LogicalId,
    layout: &SubnetLayout,
    config: &NetworkConfig,
) -> Result<NetworkHandles, BuildError> {
    let vpc_name = format!("{}/{}", stack_name, id);
    let vpc = declare(
        graph,
        Vpc {
            id: id.clone(),
            cidr: config.cidr.trunc(),
            name: vpc_name.clone(),
        },
    )?;

    let gateway = declare(
        graph,
        InternetGateway {
            id: id.child("IGW")?,
            name: vpc_name.clone(),
        },
    )?;
    let attachment = declare(
        graph,
        VpcGatewayAttachment {
            id: id.child("VPCGW")?,
            vpc: vpc.clone(),
            gateway: gateway.clone(),
        },
    )?;

    let mut public_subnets = Vec::with_capacity(layout.public.len());
    for (az, cidr) in layout.public.iter().enumerate() {
        let tier = SubnetTier {
            group: PUBLIC_GROUP,
            subnet_type: SubnetType::Public,
        };
        let (subnet, route_table) = tier.declare(graph, &vpc_name, id, &vpc, az, *cidr)?;

        declare(
            graph,
            Route {
                id: subnet.id().child("DefaultRoute")?,
                route_table,
                gateway: gateway.clone(),
                attachment: attachment.clone(),
                destination: any_ipv4(),
            },
        )?;
        public_subnets.push(subnet);
    }

    let mut isolated_subnets = Vec::with_capacity(layout.isolated.len());
    for (az, cidr) in layout.isolated.iter().enumerate() {
        let tier = SubnetTier {
            group: ISOLATED_GROUP,
            subnet_type: SubnetType::Isolated,
        };
        let (subnet, _) = tier.declare(graph, &vpc_name, id, &vpc, az, *cidr)?;
        isolated_subnets.push(subnet);
    }

    Ok(NetworkHandles {
        vpc,
        public_subnets,
        isolated_subnets,
    })
}

struct SubnetTier {
    group: &'static str,
    subnet_type: SubnetType,
}

impl SubnetTier {
    /// Declare subnet number `az + 1` of this tier with its own route table
    fn declare(
        &self,
        graph: &mut ResourceGraph,
        vpc_name: &str,
        vpc_id: &LogicalId,
        vpc: &Handle,
        az: usize,
        cidr: Ipv4Net,
    ) -> Result<(Handle, Handle), BuildError> {
        let id = vpc_id.child(&format!("{}Subnet{}", self.group, az + 1))?;
        let name = format!("{}/{}Subnet{}", vpc_name, self.group, az + 1);

        let subnet = declare(
            graph,
            Subnet {
                id: id.clone(),
                vpc: vpc.clone(),
                cidr,
                az_index: az,
                subnet_type: self.subnet_type,
                group_name: self.group.to_string(),
                name: name.clone(),
            },
        )?;
        let route_table = declare(
            graph,
            RouteTable {
                id: id.child("RouteTable")?,
                vpc: vpc.clone(),
                name,
            },
        )?;
        declare(
            graph,
            SubnetRouteTableAssociation {
                id: id.child("RouteTableAssociation")?,
                route_table: route_table.clone(),
                subnet: subnet.clone(),
            },
        )?;

        Ok((subnet, route_table))
    }
}
