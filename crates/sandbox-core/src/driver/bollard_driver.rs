//! Production [`ContainerDriver`] backed by the local Docker engine, via
//! `bollard`, the same crate `crates/hillclimber` pulls in for container
//! orchestration.

use super::{ContainerDriver, ContainerSpec, ExecOutput};
use crate::error::DriverError;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, RemoveContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::Docker;
use futures_util::StreamExt;
use std::collections::HashMap;

pub struct BollardDriver {
    docker: Docker,
}

impl BollardDriver {
    pub fn connect() -> Result<Self, DriverError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| DriverError::Unavailable(e.to_string()))?;
        Ok(Self { docker })
    }
}

fn map_err(err: BollardError) -> DriverError {
    match &err {
        BollardError::DockerResponseServerError { status_code, .. } if *status_code == 404 => {
            DriverError::NotFound(err.to_string())
        }
        BollardError::DockerResponseServerError { .. } => DriverError::ApiError(err.to_string()),
        BollardError::HyperResponseError { .. } | BollardError::IOError { .. } => {
            DriverError::Unavailable(err.to_string())
        }
        _ => DriverError::ApiError(err.to_string()),
    }
}

#[async_trait]
impl ContainerDriver for BollardDriver {
    type Handle = String;

    async fn create(&self, spec: ContainerSpec) -> Result<Self::Handle, DriverError> {
        let host_config = bollard::models::HostConfig {
            network_mode: Some("none".to_string()),
            cap_drop: Some(vec!["ALL".to_string()]),
            security_opt: Some(vec!["no-new-privileges".to_string()]),
            readonly_rootfs: Some(true),
            memory: parse_memory_limit(&spec.memory_limit),
            nano_cpus: Some((spec.cpu_limit * 1e9) as i64),
            tmpfs: Some(HashMap::from([(
                "/tmp".to_string(),
                format!("size={}", spec.tmp_size_bytes),
            )])),
            binds: Some(vec![format!("{}-data:/mnt/data", spec.name)]),
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image.clone()),
            cmd: Some(vec!["sleep".to_string(), "infinity".to_string()]),
            labels: Some(spec.labels.clone()),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(map_err)?;

        self.docker
            .start_container::<String>(&created.id, None)
            .await
            .map_err(map_err)?;

        Ok(created.id)
    }

    async fn exec(
        &self,
        handle: &Self::Handle,
        argv: &[String],
        working_dir: &str,
    ) -> Result<ExecOutput, DriverError> {
        let exec = self
            .docker
            .create_exec(
                handle,
                CreateExecOptions {
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    working_dir: Some(working_dir.to_string()),
                    cmd: Some(argv.to_vec()),
                    ..Default::default()
                },
            )
            .await
            .map_err(map_err)?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        if let StartExecResults::Attached { mut output, .. } = self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(map_err)?
        {
            while let Some(chunk) = output.next().await {
                match chunk.map_err(map_err)? {
                    bollard::container::LogOutput::StdOut { message } => {
                        stdout.extend_from_slice(&message)
                    }
                    bollard::container::LogOutput::StdErr { message } => {
                        stderr.extend_from_slice(&message)
                    }
                    _ => {}
                }
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await.map_err(map_err)?;
        let exit_code = inspect.exit_code.unwrap_or(-1);

        Ok(ExecOutput {
            exit_code,
            stdout,
            stderr,
        })
    }

    async fn put_archive(
        &self,
        handle: &Self::Handle,
        dest_dir: &str,
        tar_bytes: Vec<u8>,
    ) -> Result<(), DriverError> {
        let options = bollard::container::UploadToContainerOptions {
            path: dest_dir.to_string(),
            ..Default::default()
        };
        self.docker
            .upload_to_container(handle, Some(options), tar_bytes.into())
            .await
            .map_err(map_err)
    }

    async fn get_archive(
        &self,
        handle: &Self::Handle,
        src_path: &str,
    ) -> Result<Vec<u8>, DriverError> {
        let options = bollard::container::DownloadFromContainerOptions {
            path: src_path.to_string(),
        };
        let mut stream = self.docker.download_from_container(handle, Some(options));
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk.map_err(map_err)?);
        }
        Ok(bytes)
    }

    async fn list_by_label(&self, label: &str) -> Result<Vec<Self::Handle>, DriverError> {
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), vec![label.to_string()]);
        let options = ListContainersOptions {
            all: true,
            filters,
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(map_err)?;
        Ok(containers.into_iter().filter_map(|c| c.id).collect())
    }

    async fn remove(&self, handle: &Self::Handle) -> Result<(), DriverError> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };
        self.docker
            .remove_container(handle, Some(options))
            .await
            .map_err(map_err)
    }
}

/// Parse a Docker-style memory limit string (`"512m"`, `"1g"`) into bytes.
fn parse_memory_limit(spec: &str) -> Option<i64> {
    let spec = spec.trim();
    let (digits, mult): (&str, i64) = if let Some(d) = spec.strip_suffix(['g', 'G']) {
        (d, 1024 * 1024 * 1024)
    } else if let Some(d) = spec.strip_suffix(['m', 'M']) {
        (d, 1024 * 1024)
    } else if let Some(d) = spec.strip_suffix(['k', 'K']) {
        (d, 1024)
    } else {
        (spec, 1)
    };
    digits.parse::<i64>().ok().map(|n| n * mult)
}

#[cfg(test)]
mod tests {
    use super::parse_memory_limit;

    #[test]
    fn parses_docker_memory_strings() {
        assert_eq!(parse_memory_limit("512m"), Some(512 * 1024 * 1024));
        assert_eq!(parse_memory_limit("1g"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_memory_limit("2048k"), Some(2048 * 1024));
        assert_eq!(parse_memory_limit("100"), Some(100));
    }
}
