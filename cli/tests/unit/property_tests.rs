//! Property-based tests for the engine's policy semantics and the
//! generation and validation helpers.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used)]

use std::collections::HashSet;

use proptest::prelude::*;

use hostprov_cli::application::services::provisioner::Provisioner;
use hostprov_cli::domain::template::{self, TemplateVars};
use hostprov_cli::domain::{
    FailurePolicy, Outcome, ProvisionConfig, ProvisionError, SecretSpec, SiteParams, Step,
    generate_secret,
};

use crate::mocks::{RecordingReporter, RecordingRunner};

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
        .block_on(f)
}

/// `n` steps where step `k` (1-based) runs program `fail`.
fn steps_failing_at(n: usize, k: usize) -> Vec<Step> {
    (1..=n)
        .map(|i| {
            let program = if i == k { "fail" } else { "pass" };
            Step::exec(format!("step {i}"), program, Vec::<String>::new())
        })
        .collect()
}

// ============================================================================
// Failure policy properties
// ============================================================================

proptest! {
    /// Under `Abort`, a failure at step k leaves exactly k entries.
    #[test]
    fn prop_abort_report_ends_at_failing_step((n, k) in (1usize..30).prop_flat_map(|n| (Just(n), 1..=n)), code in 1i32..256) {
        let runner = RecordingRunner::failing_program("fail", code);
        let reporter = RecordingReporter::new();
        let report = block_on(
            Provisioner::new(&runner, &reporter, FailurePolicy::Abort).run(&steps_failing_at(n, k)),
        );
        prop_assert_eq!(report.len(), k);
        prop_assert_eq!(report.exit_code(), code);
        prop_assert_eq!(runner.calls().len(), k);
        let expected_abort = ProvisionError::StepFailed { step: format!("step {k}"), exit_code: code };
        prop_assert_eq!(report.aborted(), Some(&expected_abort));
    }

    /// Under `Continue`, every step runs and only the failing one is marked.
    #[test]
    fn prop_continue_report_has_every_step((n, k) in (1usize..30).prop_flat_map(|n| (Just(n), 1..=n))) {
        let runner = RecordingRunner::failing_program("fail", 1);
        let reporter = RecordingReporter::new();
        let report = block_on(
            Provisioner::new(&runner, &reporter, FailurePolicy::Continue).run(&steps_failing_at(n, k)),
        );
        prop_assert_eq!(report.len(), n);
        prop_assert_eq!(report.exit_code(), 0);
        let failed: Vec<usize> = report.failures().map(|e| e.index).collect();
        prop_assert_eq!(failed, vec![k]);
        prop_assert!(report.outcomes().iter().all(|o| *o != Outcome::Skipped));
    }

    /// A step failure never maps to exit code 0 or outside the process range.
    #[test]
    fn prop_step_failed_exit_code_in_range(code in any::<i32>()) {
        let err = ProvisionError::StepFailed { step: "s".into(), exit_code: code };
        prop_assert!((1..=255).contains(&err.exit_code()));
    }
}

// ============================================================================
// Secret generation properties
// ============================================================================

proptest! {
    /// Secrets have the requested length and draw only from the alphabet.
    #[test]
    fn prop_secret_matches_spec(length in 8usize..=128, alphabet in "[A-Za-z0-9!#%+=@^_~-]{10,40}") {
        let mut unique: Vec<char> = alphabet.chars().collect();
        unique.sort_unstable();
        unique.dedup();
        let alphabet: String = unique.into_iter().collect();
        let spec = SecretSpec::new(length, &alphabet);
        let secret = generate_secret(&spec).expect("secret");
        prop_assert_eq!(secret.chars().count(), length);
        prop_assert!(secret.chars().all(|c| alphabet.contains(c)), "foreign char in {}", secret);
    }
}

#[test]
fn test_secrets_are_unique_across_batch() {
    let spec = SecretSpec::default();
    let secrets: HashSet<String> = (0..200)
        .map(|_| generate_secret(&spec).expect("secret"))
        .collect();
    assert_eq!(secrets.len(), 200, "duplicate secrets generated");
}

// ============================================================================
// Parameter and template properties
// ============================================================================

proptest! {
    /// Well-formed site parameters are accepted and the domain is lowercased.
    #[test]
    fn prop_valid_params_accepted(
        label in "[a-z][a-z0-9-]{0,20}[a-z0-9]",
        tld in "[a-z]{2,6}",
        port in 1u32..=65535,
    ) {
        let domain = format!("{}.{tld}", label.to_uppercase());
        let upstream = format!("127.0.0.1:{port}");
        let email = format!("admin@{label}.{tld}");
        let params = SiteParams::new(&domain, &upstream, &email).expect("valid params");
        prop_assert_eq!(params.domain, domain.to_lowercase());
        prop_assert_eq!(params.upstream, upstream);
    }

    /// Ports outside 1..=65535 are rejected.
    #[test]
    fn prop_out_of_range_port_rejected(port in prop_oneof![Just(0u32), 65536u32..1_000_000]) {
        let upstream = format!("127.0.0.1:{port}");
        prop_assert!(SiteParams::new("a.com", &upstream, "x@a.com").is_err());
    }

    /// Rendering with site variables leaves no placeholder behind.
    #[test]
    fn prop_rendered_templates_are_fully_resolved(
        label in "[a-z][a-z0-9]{0,15}",
        port in 1u32..=65535,
    ) {
        let params = SiteParams::new(&format!("{label}.com"), &format!("10.0.0.1:{port}"), "x@a.com")
            .expect("valid params");
        let vars = TemplateVars::for_site(&params, &ProvisionConfig::default());
        for t in [
            &template::NGINX_SITE,
            &template::TLS_HARDENING,
            &template::SSHD_CONFIG,
            &template::VSFTPD_CONFIG,
            &template::LOGROTATE_NGINX,
        ] {
            let out = template::render(t, &vars).expect("render");
            prop_assert!(!out.contains("{{"), "unresolved placeholder in {}", t.name);
        }
    }
}
