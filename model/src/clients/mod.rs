mod error;
mod http_status_code;
mod installer_client;

pub use error::{Error, Result};
pub use http_status_code::{HttpStatusCode, StatusCode};
pub use installer_client::{InstallerApi, InstallerClient};
