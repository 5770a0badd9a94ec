//! Process lifecycle tests against real child processes
//!
//! The runtime is a shell script standing in for the JVM; it is launched with
//! the same command line and environment a real service would get.

#![cfg(unix)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use servicestarter::traits::{MockDiscoveryClient, MockTenantInitializer};
use servicestarter::{InitializedMicroservice, Microservice, ResourcePool, StarterError};
use shared::ServiceInstanceRecord;

mod common;
use common::{TestFixtures, TestHelpers, TestWorkspace};

#[tokio::test]
async fn test_launch_without_debug_agent() {
    // Arrange
    let workspace = TestWorkspace::with_runtime(TestFixtures::recording_runtime());
    let mut ledger: Microservice<()> = workspace.microservice(workspace.ledger_config());

    // Act
    ledger.start().await.unwrap();
    TestHelpers::wait_for_exit(&mut ledger).await;

    // Assert
    let args = workspace.recorded("args");
    assert_eq!(args.len(), 2, "unexpected arguments: {args:?}");
    assert_eq!(args[0], "-jar");
    assert!(args[1].ends_with("ledger-v1.2.0-service-boot.jar"));
    assert_eq!(ledger.kill().await.unwrap(), 7);
}

#[tokio::test]
async fn test_kill_after_natural_exit_reports_exit_code() {
    // Arrange
    let workspace = TestWorkspace::with_runtime(TestFixtures::recording_runtime());
    let mut ledger: Microservice<()> = workspace.microservice(workspace.ledger_config());
    ledger.start().await.unwrap();
    TestHelpers::wait_for_recording(&workspace, "env").await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Act
    let code = ledger.kill().await.unwrap();

    // Assert
    assert_eq!(code, 7);
    assert_eq!(ledger.kill().await.unwrap(), 7);
}

#[tokio::test]
async fn test_launch_with_suspended_debug_agent() {
    // Arrange
    let workspace = TestWorkspace::with_runtime(TestFixtures::recording_runtime());
    let config = workspace.ledger_config().debug(true, 5005);
    let mut ledger: Microservice<()> = workspace.microservice(config);

    // Act
    ledger.start().await.unwrap();
    TestHelpers::wait_for_exit(&mut ledger).await;

    // Assert
    let args = workspace.recorded("args");
    assert_eq!(args.len(), 3, "unexpected arguments: {args:?}");
    assert!(args[0].starts_with("-agentlib:jdwp="));
    assert!(args[0].contains("suspend=y"));
    assert!(args[0].contains("address=5005"));
    assert_eq!(args[1], "-jar");
    assert_eq!(ledger.debugging_port(), Some(5005));
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_environment_is_injected_over_inherited_variables() {
    // Arrange
    let workspace = TestWorkspace::with_runtime(TestFixtures::recording_runtime());
    let config = workspace
        .ledger_config()
        .add_properties([("ledger.currency", "EUR")]);
    let mut ledger: Microservice<()> = workspace.microservice(config);
    let port = ledger.environment().server_port().unwrap();

    // Act
    ledger.start().await.unwrap();
    TestHelpers::wait_for_exit(&mut ledger).await;

    // Assert
    let env = workspace.recorded("env");
    assert!(env.contains(&format!("server.port={port}")));
    assert!(env.contains(&"spring.application.name=ledger".to_string()));
    assert!(env.contains(&"ledger.currency=EUR".to_string()));
    assert!(env.iter().any(|line| line.starts_with("PATH=")));
}

#[tokio::test]
async fn test_kill_terminates_running_service() {
    // Arrange
    let workspace = TestWorkspace::with_runtime(TestFixtures::long_running_runtime());
    let mut ledger: Microservice<()> = workspace.microservice(workspace.ledger_config());
    ledger.start().await.unwrap();
    assert!(ledger.is_running());
    assert!(ledger.process_id().is_some());

    // Act
    let code = ledger.kill().await.unwrap();

    // Assert
    assert_eq!(code, 128 + 15);
    assert!(!ledger.is_running());
    assert_eq!(ledger.kill().await.unwrap(), code);
}

#[tokio::test]
async fn test_kill_forces_service_ignoring_termination() {
    // Arrange
    let workspace = TestWorkspace::with_runtime(TestFixtures::stubborn_runtime());
    let config = workspace.ledger_config().with_kill_grace(Duration::from_millis(500));
    let mut ledger: Microservice<()> = workspace.microservice(config);
    ledger.start().await.unwrap();
    // Give the shell time to install its trap
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Act
    let code = ledger.kill().await.unwrap();

    // Assert
    assert_eq!(code, 128 + 9);
}

#[tokio::test]
async fn test_instances_are_single_use() {
    // Arrange
    let workspace = TestWorkspace::with_runtime(TestFixtures::long_running_runtime());
    let mut ledger: Microservice<()> = workspace.microservice(workspace.ledger_config());
    ledger.start().await.unwrap();

    // Act
    let second = ledger.start().await;

    // Assert
    assert!(matches!(second, Err(StarterError::AlreadyStarted { .. })));
    assert_eq!(ledger.shutdown().await, Some(128 + 15));
}

#[tokio::test]
async fn test_shutdown_of_unstarted_service() {
    let workspace = TestWorkspace::with_runtime(TestFixtures::long_running_runtime());
    let mut ledger: Microservice<()> = workspace.microservice(workspace.ledger_config());

    assert!(matches!(ledger.kill().await, Err(StarterError::NotStarted { .. })));
    assert_eq!(ledger.shutdown().await, None);
}

#[tokio::test]
async fn test_instances_get_distinct_ports() {
    // Arrange
    let workspace = TestWorkspace::with_runtime(TestFixtures::long_running_runtime());

    // Act
    let services: Vec<Microservice<()>> = (0..6)
        .map(|_| workspace.microservice(workspace.ledger_config().run_in_debug()))
        .collect();

    // Assert
    let ports: HashSet<u16> = services
        .iter()
        .map(|s| s.environment().server_port().unwrap())
        .collect();
    let debug_ports: HashSet<u16> = services.iter().map(|s| s.debugging_port().unwrap()).collect();
    assert_eq!(ports.len(), services.len());
    assert_eq!(debug_ports.len(), services.len());
    assert!(ports.iter().all(|p| *p >= TestFixtures::PORT_BASE));
    assert!(debug_ports.iter().all(|p| *p >= TestFixtures::DEBUG_PORT_BASE));
}

#[tokio::test]
async fn test_registration_wait_after_start() {
    // Arrange
    let workspace = TestWorkspace::with_runtime(TestFixtures::long_running_runtime());
    let mut ledger: Microservice<()> = workspace.microservice(workspace.ledger_config());
    let mut discovery = MockDiscoveryClient::new();
    discovery
        .expect_get_instances()
        .withf(|app| app == TestFixtures::LEDGER)
        .times(1)
        .returning(|app| {
            Ok(vec![ServiceInstanceRecord {
                application: app.to_uppercase(),
                instance_id: format!("localhost:{app}:2020"),
                host_name: "localhost".to_string(),
                port: 2020,
                status: "UP".to_string(),
            }])
        });

    // Act
    ledger.start().await.unwrap();
    let registered = ledger.wait_until_registered(Some(&discovery)).await;

    // Assert
    assert!(registered);
    ledger.shutdown().await;
}

#[tokio::test]
async fn test_tenant_initialized_after_start() {
    // Arrange
    let workspace = TestWorkspace::with_runtime(TestFixtures::long_running_runtime());
    let expected_uri = format!("http://localhost:{}", TestFixtures::PORT_BASE);
    let mut tenant = MockTenantInitializer::new();
    tenant
        .expect_initialize_tenant()
        .withf(move |app, uri| app == TestFixtures::LEDGER && uri == expected_uri)
        .times(1)
        .returning(|_, _| Ok(()));

    let mut ledger: InitializedMicroservice<()> = InitializedMicroservice::new(
        workspace.ledger_config(),
        workspace.environment.clone(),
        Arc::new(workspace.locator()),
        Arc::new(tenant),
    )
    .unwrap();

    // Act
    ledger.start().await.unwrap();

    // Assert
    assert!(ledger.is_running());
    assert_eq!(workspace.environment.applications(), vec![TestFixtures::LEDGER.to_string()]);
    assert_eq!(ledger.shutdown().await, Some(128 + 15));
}

#[tokio::test]
async fn test_key_pair_shared_by_all_instances() {
    let workspace = TestWorkspace::with_runtime(TestFixtures::long_running_runtime());
    let first: Microservice<()> = workspace.microservice(workspace.ledger_config());
    let second: Microservice<()> = workspace.microservice(workspace.ledger_config());

    let expected = workspace.environment.key_pair();
    assert_eq!(first.environment().key_pair(), Some(expected.clone()));
    assert_eq!(second.environment().key_pair(), Some(expected));
}
