//! Helpers for the `dossier` operator binary.

use anyhow::Context;
use dossier_services::HealthReport;
use serde::Serialize;

pub fn to_pretty_json(value: &impl Serialize) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("Serialize output")
}

/// Exit status for `dossier health`.
pub fn health_exit_code(report: &HealthReport) -> i32 {
    if report.is_healthy() {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn report(active: &str, s3: bool, gcs: bool, store: bool) -> HealthReport {
        HealthReport {
            providers: BTreeMap::from([
                ("s3".to_string(), s3),
                ("gcs".to_string(), gcs),
            ]),
            metadata_store: store,
            active_backend: active.to_string(),
        }
    }

    #[test]
    fn only_active_backend_and_store_decide() {
        assert_eq!(health_exit_code(&report("s3", true, false, true)), 0);
        assert_eq!(health_exit_code(&report("s3", false, true, true)), 1);
        assert_eq!(health_exit_code(&report("s3", true, true, false)), 1);
        assert_eq!(health_exit_code(&report("nas", true, true, true)), 1);
    }

    #[test]
    fn renders_report_as_json() {
        let json = to_pretty_json(&report("s3", true, false, true)).unwrap();
        assert!(json.contains("\"metadata_store\": true"));
        assert!(json.contains("\"s3\": true"));
        assert!(json.contains("\"active_backend\": \"s3\""));
    }
}
