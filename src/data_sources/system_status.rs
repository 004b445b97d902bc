//! `whisparr_system_status`

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::DataSource;
use crate::client::models::SystemStatus;
use crate::client::WhisparrClient;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

/// Facts about the Whisparr instance the provider talks to.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemStatusState {
    pub app_name: Option<String>,
    pub instance_name: Option<String>,
    pub version: Option<String>,
    pub build_time: Option<String>,
    pub start_time: Option<String>,
    pub is_debug: bool,
    pub is_production: bool,
    pub is_admin: bool,
    pub is_user_interactive: bool,
    pub is_docker: bool,
    pub is_linux: bool,
    pub is_osx: bool,
    pub is_windows: bool,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub runtime_name: Option<String>,
    pub runtime_version: Option<String>,
    pub startup_path: Option<String>,
    pub app_data: Option<String>,
    pub url_base: Option<String>,
    pub authentication: Option<String>,
    pub branch: Option<String>,
    pub database_type: Option<String>,
    pub database_version: Option<String>,
    pub migration_version: Option<i64>,
    pub mode: Option<String>,
    pub package_version: Option<String>,
    pub package_author: Option<String>,
    pub package_update_mechanism: Option<String>,
}

impl From<SystemStatus> for SystemStatusState {
    fn from(status: SystemStatus) -> Self {
        Self {
            app_name: status.app_name,
            instance_name: status.instance_name,
            version: status.version,
            build_time: status.build_time,
            start_time: status.start_time,
            is_debug: status.is_debug,
            is_production: status.is_production,
            is_admin: status.is_admin,
            is_user_interactive: status.is_user_interactive,
            is_docker: status.is_docker,
            is_linux: status.is_linux,
            is_osx: status.is_osx,
            is_windows: status.is_windows,
            os_name: status.os_name,
            os_version: status.os_version,
            runtime_name: status.runtime_name,
            runtime_version: status.runtime_version,
            startup_path: status.startup_path,
            app_data: status.app_data,
            url_base: status.url_base,
            authentication: status.authentication,
            branch: status.branch,
            database_type: status.database_type,
            database_version: status.database_version,
            migration_version: status.migration_version,
            mode: status.mode,
            package_version: status.package_version,
            package_author: status.package_author,
            package_update_mechanism: status.package_update_mechanism,
        }
    }
}

const STRINGS: &[&str] = &[
    "app_name",
    "instance_name",
    "version",
    "build_time",
    "start_time",
    "os_name",
    "os_version",
    "runtime_name",
    "runtime_version",
    "startup_path",
    "app_data",
    "url_base",
    "authentication",
    "branch",
    "database_type",
    "database_version",
    "mode",
    "package_version",
    "package_author",
    "package_update_mechanism",
];

const FLAGS: &[&str] = &[
    "is_debug",
    "is_production",
    "is_admin",
    "is_user_interactive",
    "is_docker",
    "is_linux",
    "is_osx",
    "is_windows",
];

/// The `whisparr_system_status` data source.
pub struct SystemStatusSource;

#[async_trait]
impl DataSource for SystemStatusSource {
    fn type_name(&self) -> String {
        "whisparr_system_status".to_string()
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0()
            .with_description("Status of the Whisparr instance.")
            .with_attribute("migration_version", Attribute::computed_int64());
        let schema = STRINGS.iter().fold(schema, |schema, name| {
            schema.with_attribute(*name, Attribute::computed_string())
        });
        FLAGS.iter().fold(schema, |schema, name| {
            schema.with_attribute(*name, Attribute::computed_bool())
        })
    }

    async fn read(&self, client: &WhisparrClient, _config: Value) -> Result<Value, ProviderError> {
        let status = client.system_status().await?;
        Ok(serde_json::to_value(SystemStatusState::from(status))?)
    }
}
