//! Per-provider throttling signatures.
//!
//! Adapters surface provider errors as [`CloudError::Api`] with the provider's
//! own error code. These tables decide which codes mean "rate limited, try again".

use cloudsync_core::Provider;

use crate::error::CloudError;

const ALIYUN_PREFIXES: &[&str] = &["Throttling", "ServiceUnavailable"];
const AWS_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestLimitExceeded",
    "RequestThrottled",
    "TooManyRequestsException",
    "SlowDown",
];
const HUAWEI_CODES: &[&str] = &["APIGW.0308", "IAM.0104"];
const TENCENT_PREFIXES: &[&str] = &["RequestLimitExceeded"];
const VOLCANO_CODES: &[&str] = &["AccountFlowLimitExceeded", "FlowLimitExceeded"];

/// Whether `code` is a rate-limit signature for `provider`.
pub fn is_throttling_code(provider: Provider, code: &str) -> bool {
    match provider {
        Provider::Aliyun => ALIYUN_PREFIXES.iter().any(|p| code.starts_with(p)),
        Provider::Aws => AWS_CODES.contains(&code),
        Provider::Huawei => HUAWEI_CODES.contains(&code),
        Provider::Tencent => TENCENT_PREFIXES.iter().any(|p| code.starts_with(p)),
        Provider::Volcano => VOLCANO_CODES.contains(&code),
    }
}

/// Default retry classifier: explicit throttling, or an API error whose code
/// matches the provider's throttling table.
pub fn is_retryable(provider: Provider, err: &CloudError) -> bool {
    match err {
        CloudError::Throttled { .. } => true,
        CloudError::Api { code, .. } => is_throttling_code(provider, code),
        _ => false,
    }
}
