//! Security group resource and its ingress rules

use declarative::{Expr, Handle, LogicalId, Properties, Resource};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Transport protocol of an ingress rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// One (protocol, port, source) ingress rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngressRule {
    pub protocol: Protocol,
    pub port: u16,
    pub source: Ipv4Net,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl IngressRule {
    /// TCP from any IPv4 address
    pub fn tcp_from_anywhere(port: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            port,
            source: any_ipv4(),
            description: None,
        }
    }

    /// Whether the rule admits every IPv4 address
    pub fn is_any_source(&self) -> bool {
        self.source.prefix_len() == 0
    }

    /// Rule description, defaulting to `from <cidr>:<port>`
    pub fn describe(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("from {}:{}", self.source, self.port))
    }

    /// The two rules the notebook environment has always opened: SSH and HTTP
    pub fn defaults() -> Vec<Self> {
        vec![Self::tcp_from_anywhere(22), Self::tcp_from_anywhere(80)]
    }

    fn to_expr(&self) -> Expr {
        Expr::map([
            ("CidrIp", Expr::from(self.source.to_string())),
            ("Description", Expr::from(self.describe())),
            ("FromPort", Expr::from(self.port)),
            ("IpProtocol", Expr::from(self.protocol.as_str())),
            ("ToPort", Expr::from(self.port)),
        ])
    }
}

impl fmt::Display for IngressRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} from {}", self.protocol.as_str(), self.port, self.source)
    }
}

/// 0.0.0.0/0
pub fn any_ipv4() -> Ipv4Net {
    Ipv4Net::new_assert(Ipv4Addr::UNSPECIFIED, 0)
}

/// A security group attached to a VPC
#[derive(Debug, Clone)]
pub struct SecurityGroup {
    pub id: LogicalId,
    pub group_name: String,
    pub group_description: String,
    pub vpc: Handle,
    pub ingress: Vec<IngressRule>,
    pub allow_all_outbound: bool,
}

impl Resource for SecurityGroup {
    fn logical_id(&self) -> &LogicalId {
        &self.id
    }

    fn resource_type(&self) -> &'static str {
        "AWS::EC2::SecurityGroup"
    }

    fn description(&self) -> String {
        format!(
            "Security group {} ({} ingress rules)",
            self.group_name,
            self.ingress.len()
        )
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::from([
            (
                "GroupDescription".to_string(),
                Expr::from(self.group_description.as_str()),
            ),
            ("GroupName".to_string(), Expr::from(self.group_name.as_str())),
            (
                "SecurityGroupIngress".to_string(),
                Expr::List(self.ingress.iter().map(IngressRule::to_expr).collect()),
            ),
            ("VpcId".to_string(), self.vpc.reference()),
        ]);

        if self.allow_all_outbound {
            props.insert(
                "SecurityGroupEgress".to_string(),
                Expr::list([Expr::map([
                    ("CidrIp", "0.0.0.0/0"),
                    ("Description", "Allow all outbound traffic by default"),
                    ("IpProtocol", "-1"),
                ])]),
            );
        }

        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_rules() {
        let rules = IngressRule::defaults();
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().all(IngressRule::is_any_source));
        assert_eq!(rules[0].to_string(), "tcp/22 from 0.0.0.0/0");
        assert_eq!(rules[1].describe(), "from 0.0.0.0/0:80");
    }

    #[test]
    fn test_rule_json() {
        let rule = IngressRule {
            protocol: Protocol::Tcp,
            port: 443,
            source: "10.1.0.0/16".parse().unwrap(),
            description: Some("office".into()),
        };
        assert!(!rule.is_any_source());
        assert_eq!(
            rule.to_expr().to_json(),
            json!({
                "CidrIp": "10.1.0.0/16",
                "Description": "office",
                "FromPort": 443,
                "IpProtocol": "tcp",
                "ToPort": 443
            })
        );
    }

    #[test]
    fn test_rule_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            rule: IngressRule,
        }

        let parsed: Wrapper =
            toml::from_str("[rule]\nprotocol = \"udp\"\nport = 53\nsource = \"0.0.0.0/0\"\n")
                .unwrap();
        assert_eq!(parsed.rule.protocol, Protocol::Udp);
        assert!(parsed.rule.is_any_source());
    }
}
