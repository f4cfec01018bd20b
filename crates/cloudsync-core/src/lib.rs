pub mod account;
pub mod error;
pub mod provider;
pub mod resource;
pub mod time;

pub use account::{AccountStatus, CloudAccount, Credentials};
pub use error::{CoreError, ErrorCategory, Result};
pub use provider::Provider;
pub use resource::ResourceKind;
pub use self::time::{format_rfc3339, now_utc, parse_rfc3339};
