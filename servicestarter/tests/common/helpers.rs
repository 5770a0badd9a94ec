//! Builders and helpers for integration tests

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use servicestarter::services::LocalRepositoryLocator;
use servicestarter::{IntegrationTestEnvironment, Microservice, MicroserviceConfig, StarterConfig};
use tempfile::TempDir;

use super::TestFixtures;

/// A temporary artifact repository plus a fake runtime and an output directory
pub struct TestWorkspace {
    dir: TempDir,
    pub environment: Arc<IntegrationTestEnvironment>,
}

impl TestWorkspace {
    /// Workspace whose runtime is a shell script with the given body
    pub fn with_runtime(script: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let runtime = dir.path().join("runtime.sh");
        fs::write(&runtime, script).unwrap();
        fs::set_permissions(&runtime, fs::Permissions::from_mode(0o755)).unwrap();
        fs::create_dir_all(dir.path().join("output")).unwrap();

        let config = StarterConfig {
            runtime,
            artifact_root: dir.path().join("repository"),
            port_base: TestFixtures::PORT_BASE,
            debug_port_base: TestFixtures::DEBUG_PORT_BASE,
            kill_grace: Duration::from_secs(5),
            ..StarterConfig::default()
        };

        let workspace = Self {
            dir,
            environment: IntegrationTestEnvironment::shared(config),
        };
        workspace.install_artifact();
        workspace
    }

    pub fn locator(&self) -> LocalRepositoryLocator {
        LocalRepositoryLocator::new(self.environment.config().artifact_root.clone())
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    /// Ledger instance configuration, pointed at this workspace's output directory
    pub fn ledger_config(&self) -> MicroserviceConfig {
        self.environment
            .microservice_config(TestFixtures::LEDGER, TestFixtures::ledger())
            .add_properties([(
                TestFixtures::OUTPUT_DIR_PROPERTY,
                self.output_dir().to_string_lossy().into_owned(),
            )])
    }

    pub fn microservice<T>(&self, config: MicroserviceConfig) -> Microservice<T> {
        Microservice::new(config, self.environment.clone(), Arc::new(self.locator())).unwrap()
    }

    /// Lines written by the recording runtime into `file`
    pub fn recorded(&self, file: &str) -> Vec<String> {
        read_lines(&self.output_dir().join(file))
    }

    fn install_artifact(&self) {
        let path = self.locator().artifact_path(&TestFixtures::ledger());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not really a jar").unwrap();
    }
}

pub struct TestHelpers;

impl TestHelpers {
    /// Poll until the process has exited on its own
    pub async fn wait_for_exit<T>(service: &mut Microservice<T>) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while service.is_running() {
            assert!(Instant::now() < deadline, "{} did not exit in time", service.name());
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Poll until the recording runtime has written `file`
    ///
    /// Does not touch the process handle, so its exit is not observed here.
    pub async fn wait_for_recording(workspace: &TestWorkspace, file: &str) {
        let path = workspace.output_dir().join(file);
        let deadline = Instant::now() + Duration::from_secs(10);
        while !path.exists() {
            assert!(Instant::now() < deadline, "{} was never written", path.display());
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
