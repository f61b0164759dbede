//! All-or-nothing provisioning tests
//!
//! A failure injected at any single create must leave zero live resources
//! once the automatic rollback has run.

use pretty_assertions::assert_eq;
use vlanlab_test::{fixtures, fixtures::topology_fixtures, KernelVerifier, MockKernel};
use vlanlabd::{plan, ProvisionStep, Provisioner, Topology};

async fn assert_rollback_at_every_step(topology: &Topology) {
    let planned = plan(topology);

    for (index, expected) in planned.iter().enumerate() {
        let provisioner = Provisioner::new(MockKernel::new().fail_create_at(index));

        let err = provisioner
            .provision(topology)
            .await
            .expect_err("injected failure must abort provisioning");

        assert_eq!(err.step, expected.step, "failure at index {index}");
        assert_eq!(err.resource, expected.resource.to_string());
        assert!(
            err.rollback.is_clean(),
            "rollback at index {index} failed: {:?}",
            err.rollback.failures
        );
        assert_eq!(err.rollback.destroyed, index);

        let kernel = provisioner.backend();
        assert_eq!(kernel.create_calls(), index + 1);
        KernelVerifier::new(kernel)
            .assert_clean()
            .unwrap_or_else(|e| panic!("failure at index {index}: {e}"));
    }
}

#[tokio::test]
async fn test_reference_rollback_at_every_create() {
    assert_rollback_at_every_step(&fixtures::reference()).await;
}

#[tokio::test]
async fn test_routed_star_rollback_at_every_create() {
    let topology = topology_fixtures::routed_star(&[10, 20]).build().unwrap();
    assert_rollback_at_every_step(&topology).await;
}

#[tokio::test]
async fn test_first_create_failure_has_nothing_to_roll_back() {
    let topology = fixtures::reference();
    let provisioner = Provisioner::new(MockKernel::new().fail_create_at(0));

    let err = provisioner.provision(&topology).await.unwrap_err();
    assert_eq!(err.step, ProvisionStep::Nodes);
    assert_eq!(err.resource, "switch s1");
    assert_eq!(err.rollback.destroyed, 0);
    assert!(err.to_string().contains("switch s1"));
}
