use crate::command;
use crate::error::{self, Result};
use assisted_test_model::constants::{
    TFSTATE_NAME, TFVARS_JSON_NAME, TF_TEMPLATE_BARE_METAL_FLOW, TF_TEMPLATE_NONE_PLATFORM_FLOW,
    TF_TEMPLATE_VSPHERE_FLOW,
};
use assisted_test_model::Platform;
use log::info;
use serde::Deserialize;
use serde_json::{Map, Value};
use snafu::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};

/// Runs `terraform` in one working directory holding a copy of a platform template.
#[derive(Debug, Clone)]
pub struct Terraform {
    working_dir: PathBuf,
}

/// The parts of `terraform.tfstate` the controllers read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TfState {
    #[serde(default)]
    pub resources: Vec<TfResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TfResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub instances: Vec<TfInstance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TfInstance {
    #[serde(default)]
    pub attributes: Value,
}

impl TfInstance {
    pub fn str_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn u64_attribute(&self, key: &str) -> Option<u64> {
        self.attributes.get(key).and_then(Value::as_u64)
    }

    /// A count such as the number of CPUs of `node_name`, which must be present and fit a `u32`.
    pub fn u32_attribute(&self, node_name: &str, key: &str) -> Result<u32> {
        let value = self
            .u64_attribute(key)
            .context(error::MissingAttributeSnafu {
                name: node_name,
                attribute: key,
            })?;
        u32::try_from(value).context(error::AttributeOutOfRangeSnafu {
            name: node_name,
            attribute: key,
        })
    }
}

impl Terraform {
    pub fn new<P: Into<PathBuf>>(working_dir: P) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    /// Recreate `<root>/<cluster_name>` as a fresh copy of the template of `platform`.
    pub async fn create_folder(root: &Path, cluster_name: &str, platform: Platform) -> Result<Self> {
        let working_dir = root.join(cluster_name);
        if tokio::fs::metadata(&working_dir).await.is_ok() {
            tokio::fs::remove_dir_all(&working_dir)
                .await
                .context(error::IoSnafu { path: &working_dir })?;
        }
        tokio::fs::create_dir_all(&working_dir)
            .await
            .context(error::IoSnafu { path: &working_dir })?;

        let template = Path::new(template_dir(platform));
        let mut entries = tokio::fs::read_dir(template)
            .await
            .context(error::IoSnafu { path: template })?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .context(error::IoSnafu { path: template })?
        {
            let path = entry.path();
            if path.is_file() {
                let destination = working_dir.join(entry.file_name());
                tokio::fs::copy(&path, &destination)
                    .await
                    .context(error::IoSnafu { path: &path })?;
            }
        }
        info!(
            "Created terraform folder '{}' from '{}'",
            working_dir.display(),
            template.display()
        );
        Ok(Self { working_dir })
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn tfstate_path(&self) -> PathBuf {
        self.working_dir.join(TFSTATE_NAME)
    }

    /// Write `vars` to `terraform.tfvars.json`.
    pub async fn set_vars(&self, vars: &Map<String, Value>) -> Result<()> {
        let path = self.working_dir.join(TFVARS_JSON_NAME);
        let contents = serde_json::to_string_pretty(vars).context(error::SerializeJsonSnafu {
            what: "terraform variables",
        })?;
        tokio::fs::write(&path, contents)
            .await
            .context(error::IoSnafu { path })
    }

    pub async fn init(&self) -> Result<()> {
        self.terraform(&["init", "-input=false", "-no-color"])
            .await
    }

    pub async fn apply(&self) -> Result<()> {
        self.terraform(&["apply", "-auto-approve", "-input=false", "-no-color"])
            .await
    }

    pub async fn set_and_apply(&self, vars: &Map<String, Value>) -> Result<()> {
        self.set_vars(vars).await?;
        self.init().await?;
        self.apply().await
    }

    pub async fn destroy(&self) -> Result<()> {
        self.terraform(&["destroy", "-auto-approve", "-input=false", "-no-color"])
            .await
    }

    /// The state file, or an empty state when nothing has been applied yet.
    pub async fn state(&self) -> Result<TfState> {
        let path = self.tfstate_path();
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(TfState::default()),
            Err(e) => return Err(e).context(error::IoSnafu { path }),
        };
        serde_json::from_str(&contents).context(error::DeserializeJsonSnafu {
            what: TFSTATE_NAME,
        })
    }

    /// The instances of every resource of `resource_type` in the state.
    pub async fn get_resources(&self, resource_type: &str) -> Result<Vec<TfInstance>> {
        Ok(self
            .state()
            .await?
            .resources
            .into_iter()
            .filter(|resource| resource.resource_type == resource_type)
            .flat_map(|resource| resource.instances)
            .collect())
    }

    async fn terraform(&self, args: &[&str]) -> Result<()> {
        info!(
            "Running 'terraform {}' in '{}'",
            args.join(" "),
            self.working_dir.display()
        );
        command::run_in(&self.working_dir, "terraform", args).await?;
        Ok(())
    }
}

fn template_dir(platform: Platform) -> &'static str {
    match platform {
        Platform::Baremetal => TF_TEMPLATE_BARE_METAL_FLOW,
        Platform::None => TF_TEMPLATE_NONE_PLATFORM_FLOW,
        Platform::Vsphere => TF_TEMPLATE_VSPHERE_FLOW,
    }
}

/// Merge configuration maps into one set of Terraform variables. Later maps win.
pub fn merge_vars<I>(maps: I) -> Map<String, Value>
where
    I: IntoIterator<Item = Map<String, Value>>,
{
    maps.into_iter().fold(Map::new(), |mut merged, map| {
        merged.extend(map);
        merged
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    const STATE: &str = r#"{
        "version": 4,
        "resources": [
            {
                "mode": "managed",
                "type": "vsphere_virtual_machine",
                "name": "master",
                "instances": [
                    {"attributes": {"name": "test-infra-cluster-master-0", "num_cpus": 4, "memory": 16984}},
                    {"attributes": {"name": "test-infra-cluster-master-1", "num_cpus": 4, "memory": 16984}}
                ]
            },
            {
                "mode": "managed",
                "type": "vsphere_folder",
                "name": "folder",
                "instances": [{"attributes": {"path": "test-infra-cluster"}}]
            }
        ]
    }"#;

    #[tokio::test]
    async fn resources_by_type() {
        let dir = tempfile::tempdir().unwrap();
        let tf = Terraform::new(dir.path());
        assert!(tf
            .get_resources("vsphere_virtual_machine")
            .await
            .unwrap()
            .is_empty());

        tokio::fs::write(tf.tfstate_path(), STATE).await.unwrap();
        let vms = tf.get_resources("vsphere_virtual_machine").await.unwrap();
        assert_eq!(vms.len(), 2);
        assert_eq!(
            vms[1].str_attribute("name"),
            Some("test-infra-cluster-master-1")
        );
        assert_eq!(vms[0].u64_attribute("num_cpus"), Some(4));
        assert_eq!(vms[0].u32_attribute("master-0", "num_cpus").unwrap(), 4);
        assert!(tf.get_resources("libvirt_domain").await.unwrap().is_empty());
    }

    #[test]
    fn counts_must_fit() {
        let domain = TfInstance {
            attributes: json!({"vcpu": 5_000_000_000u64, "memory": 16384}),
        };
        let err = domain.u32_attribute("master-0", "vcpu").unwrap_err();
        assert!(err.to_string().contains("out of range"), "{}", err);
        assert_eq!(domain.u32_attribute("master-0", "memory").unwrap(), 16384);
        assert!(domain.u32_attribute("master-0", "num_cpus").is_err());
    }

    #[tokio::test]
    async fn vars_file() {
        let dir = tempfile::tempdir().unwrap();
        let tf = Terraform::new(dir.path());
        let vars = merge_vars(vec![
            json!({"cluster_name": "a", "masters_count": 3})
                .as_object()
                .unwrap()
                .clone(),
            json!({"cluster_name": "b"}).as_object().unwrap().clone(),
        ]);
        tf.set_vars(&vars).await.unwrap();
        let written: Value = serde_json::from_str(
            &tokio::fs::read_to_string(dir.path().join(TFVARS_JSON_NAME))
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(written, json!({"cluster_name": "b", "masters_count": 3}));
    }
}
