mod support;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use port_policy_core::{ConfigureError, PolicyMap, PortRange, Protocol};
use pretty_assertions::assert_eq;
use selinux_ports::semanage::Semanage;
use selinux_ports::{PortPolicyContext, PortPolicyError};
use support::FakeSemanage;

const DEFAULT_LISTING: &str = "\
http_cache_port_t              tcp      8080, 8118, 8123, 10001-10010
http_port_t                    tcp      8008, 8009, 80, 81, 443, 488, 8443, 9000
ssh_port_t                     tcp      22
gdomap_port_t                  tcp      538
hi_reserved_port_t             tcp      512-1023
hi_reserved_port_t             udp      512-1023
reserved_port_t                tcp      1-511
reserved_port_t                udp      1-511
unreserved_port_t              tcp      61000-65535, 1024-32767
unreserved_port_t              udp      61000-65535, 1024-32767
ephemeral_port_t               tcp      32768-60999
ephemeral_port_t               udp      32768-60999
";

fn context(local: &[(&str, &str)]) -> PortPolicyContext<FakeSemanage> {
    PortPolicyContext::new(Semanage::new(
        "/usr/sbin/semanage",
        FakeSemanage::new(DEFAULT_LISTING, local),
    ))
}

fn fake(context: &PortPolicyContext<FakeSemanage>) -> &FakeSemanage {
    context.semanage().runner()
}

fn range(text: &str) -> PortRange {
    text.parse().expect("valid range")
}

fn ranges(texts: &[&str]) -> BTreeSet<PortRange> {
    texts.iter().map(|text| range(text)).collect()
}

fn args(words: &[&str]) -> Vec<String> {
    words.iter().map(|word| word.to_string()).collect()
}

#[test]
fn local_entry_wins_in_effective_policy() {
    let context = context(&[("8991/tcp", "ssh_port_t"), ("8008/tcp", "ssh_port_t")]);
    let effective = context.get_effective_policy().expect("effective policy");

    assert_eq!(effective.label_for_port(Protocol::Tcp, 8008), Some("ssh_port_t"));
    assert_eq!(effective.label_for_port(Protocol::Tcp, 8009), Some("http_port_t"));
    assert_eq!(effective.label_for_port(Protocol::Tcp, 8991), Some("ssh_port_t"));
    assert_eq!(effective.get(&range("512-537/tcp")), Some("hi_reserved_port_t"));
    assert_eq!(effective.get(&range("538/tcp")), Some("gdomap_port_t"));
    assert_eq!(effective.label_for_port(Protocol::Sctp, 80), Some("reserved_port_t"));
}

#[test]
fn overlapping_local_entries_still_reconcile() {
    let context = context(&[("8000-8100/tcp", "http_port_t"), ("8050/tcp", "ssh_port_t")]);
    let effective = context.get_effective_policy().expect("effective policy");

    assert_eq!(effective.get(&range("8000-8049/tcp")), Some("http_port_t"));
    assert_eq!(effective.get(&range("8050/tcp")), Some("ssh_port_t"));
    assert_eq!(effective.get(&range("8051-8100/tcp")), Some("http_port_t"));

    let err = context
        .check(&ranges(&["8050/tcp"]), "other_port_t")
        .expect_err("both local entries conflict");
    match err {
        PortPolicyError::Configure(ConfigureError::Conflict { conflicts, .. }) => {
            assert_eq!(conflicts.len(), 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn default_policy_excludes_exact_local_entries() {
    let context = context(&[("8991/tcp", "ssh_port_t")]);
    let default = context.default_policy().expect("default policy");
    assert!(!default.contains(&range("8991/tcp")));
    assert_eq!(default.get(&range("22/tcp")), Some("ssh_port_t"));

    let local = context.local_policy().expect("local policy");
    let expected: PolicyMap = [(range("8991/tcp"), "ssh_port_t")].into_iter().collect();
    assert_eq!(local, expected);
}

#[test]
fn configure_adds_then_becomes_a_no_op() {
    let context = context(&[]);
    let desired = ranges(&["8080-8081/tcp"]);

    // 8080 is defined by default policy but not as an exact 8080-8081 entry.
    assert!(context.configure(&desired, "my_http_port_t").expect("configure"));
    assert_eq!(
        fake(&context).mutations(),
        vec![args(&["port", "-a", "-t", "my_http_port_t", "-p", "tcp", "8080-8081"])]
    );

    assert!(!context.configure(&desired, "my_http_port_t").expect("second configure"));
    assert_eq!(fake(&context).mutations().len(), 1);
}

#[test]
fn adjacent_ports_are_added_as_one_range() {
    let context = context(&[]);
    let desired = ranges(&["9100/tcp", "9101/tcp", "9102/tcp"]);
    let operations = context
        .apply_configuration(&desired, "metrics_port_t")
        .expect("configure");
    assert_eq!(operations.len(), 1);
    assert_eq!(operations[0].range, range("9100-9102/tcp"));
}

#[test]
fn conflict_with_other_local_type_changes_nothing() {
    let context = context(&[("80/tcp", "ssh_port_t")]);

    let err = context
        .configure(&ranges(&["80/tcp"]), "http_port_t")
        .expect_err("should conflict");
    match &err {
        PortPolicyError::Configure(ConfigureError::Conflict { label, conflicts }) => {
            assert_eq!(label, "http_port_t");
            assert_eq!(conflicts, &vec![(range("80/tcp"), "ssh_port_t".to_string())]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(fake(&context).mutations().is_empty());

    assert!(context
        .configure(&ranges(&["90/tcp"]), "http_port_t")
        .expect("non-overlapping request succeeds"));
}

#[test]
fn overlapping_request_is_rejected_before_listing() {
    let context = context(&[]);
    let err = context
        .configure(&ranges(&["80-90/tcp", "85-95/tcp"]), "http_port_t")
        .expect_err("should reject overlap");
    assert!(matches!(
        err,
        PortPolicyError::Configure(ConfigureError::Overlap { .. })
    ));
    assert!(fake(&context).calls().is_empty());
}

#[test]
fn exact_default_range_of_other_type_is_modified() {
    let context = context(&[]);
    let desired = ranges(&["8008/tcp"]);

    assert!(context.configure(&desired, "ssh_port_t").expect("configure"));
    assert_eq!(
        fake(&context).mutations(),
        vec![args(&["port", "-m", "-t", "ssh_port_t", "-p", "tcp", "8008"])]
    );

    let effective = context.get_effective_policy().expect("effective policy");
    assert_eq!(effective.label_for_port(Protocol::Tcp, 8008), Some("ssh_port_t"));
    assert!(!context.configure(&desired, "ssh_port_t").expect("second configure"));
}

#[test]
fn default_with_same_type_needs_nothing() {
    let context = context(&[]);
    assert!(!context
        .configure(&ranges(&["22/tcp"]), "ssh_port_t")
        .expect("configure"));
    assert!(fake(&context).mutations().is_empty());
}

#[test]
fn empty_request_deletes_without_reading_default_policy() {
    let context = context(&[("7000/tcp", "http_port_t"), ("8991/tcp", "ssh_port_t")]);

    assert!(context
        .configure(&BTreeSet::new(), "http_port_t")
        .expect("configure"));
    assert_eq!(
        fake(&context).mutations(),
        vec![args(&["port", "-d", "-t", "http_port_t", "-p", "tcp", "7000"])]
    );
    assert!(!fake(&context).listed_full_policy());

    let local = fake(&context).local();
    assert_eq!(local.get(&range("8991/tcp")), Some("ssh_port_t"));
    assert_eq!(local.len(), 1);
}

#[test]
fn dry_run_plans_without_issuing() {
    let context = context(&[("7000/tcp", "http_port_t")]);
    let operations = context
        .plan_configure(&ranges(&["7100/tcp"]), "http_port_t")
        .expect("plan");
    let rendered: Vec<String> = operations.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec![
            "Adding SELinux port: 7100/tcp=http_port_t".to_string(),
            "Deleting SELinux port: 7000/tcp=http_port_t".to_string(),
        ]
    );
    assert!(fake(&context).mutations().is_empty());
}

#[test]
fn failed_operation_reports_what_was_already_applied() {
    let context = context(&[("8080/tcp", "http_port_t")]);
    fake(&context).fail_on("-a");

    let err = context
        .configure(&ranges(&["8080-8090/tcp"]), "http_port_t")
        .expect_err("add should fail");
    match &err {
        PortPolicyError::Apply {
            operation,
            applied,
            source,
        } => {
            assert_eq!(operation.range, range("8080-8090/tcp"));
            assert_eq!(*applied, 1);
            assert!(source.to_string().contains("injected failure"));
        }
        other => panic!("unexpected error: {other}"),
    }
    // The delete issued before the failure is not rolled back.
    assert!(fake(&context).local().is_empty());
}

#[test]
fn listing_failure_surfaces_tool_error() {
    let context = context(&[]);
    fake(&context).fail_on("--locallist");
    let err = context.local_policy().expect_err("listing should fail");
    assert!(matches!(err, PortPolicyError::Tool(_)));
    assert!(err.to_string().contains("exit code 1"));
}

#[test]
fn check_reports_conflicts_without_changes() {
    let context = context(&[("80/tcp", "ssh_port_t")]);
    assert!(context.check(&ranges(&["81/tcp"]), "http_port_t").is_ok());
    assert!(context.check(&ranges(&["79-80/tcp"]), "http_port_t").is_err());
    assert!(fake(&context).mutations().is_empty());
}

#[test]
fn concurrent_configures_do_not_interleave() {
    let context = Arc::new(context(&[]));
    let requests = [
        ("alpha_port_t", ranges(&["20000-20009/tcp"])),
        ("beta_port_t", ranges(&["20010-20019/tcp"])),
        ("gamma_port_t", ranges(&["20020/udp", "20021/udp"])),
        ("delta_port_t", ranges(&["20030/sctp"])),
    ];

    thread::scope(|scope| {
        for (label, desired) in &requests {
            let context = Arc::clone(&context);
            scope.spawn(move || {
                assert!(context.configure(desired, label).expect("configure"));
            });
        }
    });

    let local = fake(&context).local();
    assert_eq!(local.len(), 4);
    assert_eq!(local.get(&range("20020-20021/udp")), Some("gamma_port_t"));
    for (label, desired) in &requests {
        assert!(!context.configure(desired, label).expect("repeat configure"));
    }
}
