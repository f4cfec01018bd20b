use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Cloud platforms an inventory can be synchronized from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aliyun,
    Aws,
    Huawei,
    Tencent,
    Volcano,
}

impl Provider {
    /// All supported providers, in a stable order.
    pub const ALL: [Provider; 5] = [
        Provider::Aliyun,
        Provider::Aws,
        Provider::Huawei,
        Provider::Tencent,
        Provider::Volcano,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aliyun => "aliyun",
            Provider::Aws => "aws",
            Provider::Huawei => "huawei",
            Provider::Tencent => "tencent",
            Provider::Volcano => "volcano",
        }
    }

    /// Human readable name for logs and UI
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Aliyun => "Alibaba Cloud",
            Provider::Aws => "Amazon Web Services",
            Provider::Huawei => "Huawei Cloud",
            Provider::Tencent => "Tencent Cloud",
            Provider::Volcano => "Volcano Engine",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aliyun" | "alibaba" | "alicloud" => Ok(Provider::Aliyun),
            "aws" => Ok(Provider::Aws),
            "huawei" | "huaweicloud" => Ok(Provider::Huawei),
            "tencent" | "tencentcloud" | "qcloud" => Ok(Provider::Tencent),
            "volcano" | "volcengine" => Ok(Provider::Volcano),
            _ => Err(CoreError::unknown_provider(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_round_trip_through_display() {
        for provider in Provider::ALL {
            let parsed: Provider = provider.to_string().parse().unwrap();
            assert_eq!(parsed, provider);
        }
    }

    #[test]
    fn test_provider_aliases() {
        assert_eq!("AliCloud".parse::<Provider>().unwrap(), Provider::Aliyun);
        assert_eq!(" volcengine ".parse::<Provider>().unwrap(), Provider::Volcano);
        assert!("gcp".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_serialization() {
        let json = serde_json::to_string(&Provider::Huawei).unwrap();
        assert_eq!(json, "\"huawei\"");
    }
}
