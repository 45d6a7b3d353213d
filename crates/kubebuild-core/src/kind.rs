use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Kinds of objects kubebuild reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    App,
    Deployment,
    Service,
    Ingress,
    Pod,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::App => "App",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Service => "Service",
            ResourceKind::Ingress => "Ingress",
            ResourceKind::Pod => "Pod",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "App" => Ok(ResourceKind::App),
            "Deployment" => Ok(ResourceKind::Deployment),
            "Service" => Ok(ResourceKind::Service),
            "Ingress" => Ok(ResourceKind::Ingress),
            "Pod" => Ok(ResourceKind::Pod),
            _ => Err(CoreError::invalid_kind(s)),
        }
    }
}
