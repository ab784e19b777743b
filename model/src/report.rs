use crate::{Cluster, Host};
use serde::Serialize;
use tabled::{Alignment, Full, MaxWidth, MinWidth, Modify, Style, Table, Tabled};

/// `ClusterReport` is a point-in-time view of a cluster and its hosts.
/// `ClusterReport::to_string()` renders it as a table, and it can be serialized with `serde_json`
/// for a json representation.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
    cluster: Cluster,
    hosts: Vec<Host>,
}

impl ClusterReport {
    pub fn new(cluster: Cluster, hosts: Vec<Host>) -> Self {
        Self { cluster, hosts }
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// Create a table containing the cluster followed by its hosts.
    pub fn to_string(&self, width: usize) -> String {
        let table: Table = self.into();
        table
            .with(MaxWidth::truncating(width))
            .with(MinWidth::new(width))
            .to_string()
    }

    fn rows(&self) -> Vec<ReportRow> {
        let mut rows = vec![ReportRow {
            name: self.cluster.name.clone(),
            object_type: "Cluster".to_string(),
            role: String::new(),
            status: self.cluster.status.to_string(),
            stage: String::new(),
            info: self.cluster.status_info.clone().unwrap_or_default(),
        }];
        let mut hosts: Vec<ReportRow> = self
            .hosts
            .iter()
            .map(|host| ReportRow {
                name: host.name().to_string(),
                object_type: "Host".to_string(),
                role: host.role.to_string(),
                status: host.status.to_string(),
                stage: host.current_stage().unwrap_or_default().to_string(),
                info: host.status_info.clone().unwrap_or_default(),
            })
            .collect();
        hosts.sort_by(|a, b| a.name.cmp(&b.name));
        rows.extend(hosts);
        rows
    }
}

impl From<&ClusterReport> for Table {
    fn from(report: &ClusterReport) -> Self {
        Table::new(report.rows())
            .with(Style::blank())
            .with(Modify::new(Full).with(Alignment::left()))
    }
}

#[derive(Tabled, Default, Clone, Serialize)]
struct ReportRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "TYPE")]
    object_type: String,
    #[tabled(rename = "ROLE")]
    role: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "STAGE")]
    stage: String,
    #[tabled(rename = "INFO")]
    info: String,
}
