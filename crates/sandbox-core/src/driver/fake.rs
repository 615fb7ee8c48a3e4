//! In-memory fake [`ContainerDriver`], used by the manager's own test suite
//! and exported behind `test-support` for downstream crates (`sandbox-http`,
//! `sandbox-daemon`) the way the `oj-core`/`oj-adapters` export
//! fakes behind their own `test-support` feature.

use super::{ContainerDriver, ContainerSpec, ExecOutput};
use crate::error::DriverError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// A fake container: a flat file table standing in for `/mnt/data/`, plus
/// whatever exec behavior the test installed.
#[derive(Default)]
struct FakeContainer {
    labels: HashMap<String, String>,
    files: HashMap<String, (Vec<u8>, f64)>,
}

type ExecFn = Box<dyn Fn(&[String]) -> ExecOutput + Send + Sync>;

/// A fake driver whose `exec` behavior is programmable per test, and whose
/// filesystem is a plain in-memory map rather than a real container mount.
pub struct FakeDriver {
    containers: Mutex<HashMap<String, FakeContainer>>,
    next_clock: Mutex<f64>,
    exec_fn: Mutex<Option<ExecFn>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            containers: Mutex::new(HashMap::new()),
            next_clock: Mutex::new(1.0),
            exec_fn: Mutex::new(None),
        }
    }

    /// Install a custom exec handler for tests that need to simulate a
    /// particular interpreter run (non-zero exit, timeout, writes, etc).
    pub fn set_exec(&self, f: impl Fn(&[String]) -> ExecOutput + Send + Sync + 'static) {
        *self.exec_fn.lock().unwrap() = Some(Box::new(f));
    }

    /// Directly seed a file in a container's data directory, bumping its
    /// fake mtime clock — used to set up "before" state in diff tests.
    pub fn seed_file(&self, handle: &str, name: &str, contents: &[u8]) {
        let mut clock = self.next_clock.lock().unwrap();
        let mtime = *clock;
        *clock += 1.0;
        let mut containers = self.containers.lock().unwrap();
        if let Some(c) = containers.get_mut(handle) {
            c.files
                .insert(name.to_string(), (contents.to_vec(), mtime));
        }
    }

    pub fn file_count(&self, handle: &str) -> usize {
        self.containers
            .lock()
            .unwrap()
            .get(handle)
            .map(|c| c.files.len())
            .unwrap_or(0)
    }

    pub fn is_removed(&self, handle: &str) -> bool {
        !self.containers.lock().unwrap().contains_key(handle)
    }

    fn snapshot_listing(containers: &HashMap<String, FakeContainer>, handle: &str) -> String {
        let Some(c) = containers.get(handle) else {
            return String::new();
        };
        c.files
            .iter()
            .map(|(name, (bytes, mtime))| format!("{}\t{}\t{}\n", name, bytes.len(), mtime))
            .collect()
    }
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerDriver for FakeDriver {
    type Handle = String;

    async fn create(&self, spec: ContainerSpec) -> Result<Self::Handle, DriverError> {
        let mut containers = self.containers.lock().unwrap();
        containers.insert(
            spec.name.clone(),
            FakeContainer {
                labels: spec.labels,
                files: HashMap::new(),
            },
        );
        Ok(spec.name)
    }

    async fn exec(
        &self,
        handle: &Self::Handle,
        argv: &[String],
        _working_dir: &str,
    ) -> Result<ExecOutput, DriverError> {
        // The snapshot listing command is the fixed shell one-liner the
        // scanner always issues; everything else goes through the
        // test-installed exec handler, defaulting to a clean no-op success.
        if argv.len() == 3 && argv[0] == "sh" && argv[1] == "-c" && argv[2] == crate::scanner::SNAPSHOT_CMD {
            let containers = self.containers.lock().unwrap();
            if !containers.contains_key(handle) {
                return Err(DriverError::NotFound(handle.clone()));
            }
            let listing = Self::snapshot_listing(&containers, handle);
            return Ok(ExecOutput {
                exit_code: 0,
                stdout: listing.into_bytes(),
                stderr: Vec::new(),
            });
        }

        {
            let containers = self.containers.lock().unwrap();
            if !containers.contains_key(handle) {
                return Err(DriverError::NotFound(handle.clone()));
            }
        }

        // `upload`'s existence probe: `sh -c "test -e '/mnt/data/<name>'"`.
        if argv.len() == 3 && argv[0] == "sh" && argv[1] == "-c" {
            if let Some(name) = argv[2]
                .strip_prefix("test -e '/mnt/data/")
                .and_then(|rest| rest.strip_suffix('\''))
            {
                let containers = self.containers.lock().unwrap();
                let exists = containers
                    .get(handle)
                    .map(|c| c.files.contains_key(name))
                    .unwrap_or(false);
                return Ok(ExecOutput {
                    exit_code: if exists { 0 } else { 1 },
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                });
            }
        }

        let exec_fn = self.exec_fn.lock().unwrap();
        let output = match exec_fn.as_ref() {
            Some(f) => f(argv),
            None => ExecOutput {
                exit_code: 0,
                stdout: Vec::new(),
                stderr: Vec::new(),
            },
        };
        Ok(output)
    }

    async fn put_archive(
        &self,
        handle: &Self::Handle,
        _dest_dir: &str,
        tar_bytes: Vec<u8>,
    ) -> Result<(), DriverError> {
        let mut archive = tar::Archive::new(std::io::Cursor::new(tar_bytes));
        let mut entries = archive
            .entries()
            .map_err(|e| DriverError::ApiError(e.to_string()))?;

        let mut to_insert = Vec::new();
        while let Some(entry) = entries.next() {
            let mut entry = entry.map_err(|e| DriverError::ApiError(e.to_string()))?;
            let path = entry
                .path()
                .map_err(|e| DriverError::ApiError(e.to_string()))?
                .to_string_lossy()
                .to_string();
            let mut contents = Vec::new();
            std::io::Read::read_to_end(&mut entry, &mut contents)
                .map_err(|e| DriverError::ApiError(e.to_string()))?;
            to_insert.push((path, contents));
        }

        let mut clock = self.next_clock.lock().unwrap();
        let mut containers = self.containers.lock().unwrap();
        let container = containers
            .get_mut(handle)
            .ok_or_else(|| DriverError::NotFound(handle.clone()))?;
        for (name, contents) in to_insert {
            let mtime = *clock;
            *clock += 1.0;
            container.files.insert(name, (contents, mtime));
        }
        Ok(())
    }

    async fn get_archive(
        &self,
        handle: &Self::Handle,
        src_path: &str,
    ) -> Result<Vec<u8>, DriverError> {
        let name = src_path.rsplit('/').next().unwrap_or(src_path);
        let containers = self.containers.lock().unwrap();
        let container = containers
            .get(handle)
            .ok_or_else(|| DriverError::NotFound(handle.clone()))?;
        let (contents, _) = container
            .files
            .get(name)
            .ok_or(DriverError::NotFound(name.to_string()))?;

        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents.as_slice())
            .map_err(|e| DriverError::ApiError(e.to_string()))?;
        builder
            .into_inner()
            .map_err(|e| DriverError::ApiError(e.to_string()))
    }

    async fn list_by_label(&self, label: &str) -> Result<Vec<Self::Handle>, DriverError> {
        let (key, value) = label.split_once('=').unwrap_or((label, ""));
        let containers = self.containers.lock().unwrap();
        Ok(containers
            .iter()
            .filter(|(_, c)| c.labels.get(key).map(String::as_str) == Some(value))
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn remove(&self, handle: &Self::Handle) -> Result<(), DriverError> {
        let mut containers = self.containers.lock().unwrap();
        if containers.remove(handle).is_none() {
            return Err(DriverError::NotFound(handle.clone()));
        }
        Ok(())
    }
}
