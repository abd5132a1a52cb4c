// check mapping records against the fields that actually exist
use std::collections::HashSet;

use tracing::warn;

use crate::mapping::MappingRecord;

/// A source label one of the records needs but nothing provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedSource {
    pub target: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoverageReport {
    /// Records whose sources all resolve and whose target is in the template.
    pub covered: usize,
    pub unresolved_sources: Vec<UnresolvedSource>,
    /// Target labels absent from the template, first-seen order, no repeats.
    pub missing_targets: Vec<String>,
}

impl CoverageReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved_sources.is_empty() && self.missing_targets.is_empty()
    }
}

/// A source resolves when it is an available source field, or when some record
/// defines it as a target (a chained calculation). Targets are only checked
/// when `template_targets` is given.
pub fn coverage(
    records: &[MappingRecord],
    available_sources: &[String],
    template_targets: Option<&[String]>,
) -> CoverageReport {
    let available: HashSet<&str> = available_sources.iter().map(String::as_str).collect();
    let defined: HashSet<&str> = records.iter().map(|r| r.target.as_str()).collect();
    let template: Option<HashSet<&str>> = template_targets.map(|t| t.iter().map(String::as_str).collect());

    let mut report = CoverageReport::default();
    for record in records {
        let mut ok = true;

        for source in &record.source_fields {
            if available.contains(source.as_str()) || defined.contains(source.as_str()) {
                continue;
            }
            ok = false;
            report.unresolved_sources.push(UnresolvedSource {
                target: record.target.clone(),
                source: source.clone(),
            });
        }

        if let Some(template) = &template {
            if !template.contains(record.target.as_str()) {
                ok = false;
                if !report.missing_targets.contains(&record.target) {
                    report.missing_targets.push(record.target.clone());
                }
            }
        }

        report.covered += usize::from(ok);
    }

    if !report.is_clean() {
        warn!(
            unresolved = report.unresolved_sources.len(),
            missing_targets = report.missing_targets.len(),
            "mapping coverage has gaps"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(target: &str, sources: &[&str]) -> MappingRecord {
        MappingRecord {
            target: target.to_string(),
            source_fields: sources.iter().map(|s| s.to_string()).collect(),
            calculation: String::new(),
        }
    }

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn all_sources_available_is_clean() {
        let records = vec![rec("Gross", &["Base", "Bonus"])];
        let report = coverage(&records, &labels(&["Base", "Bonus", "Tax"]), None);

        assert!(report.is_clean());
        assert_eq!(report.covered, 1);
    }

    #[test]
    fn chained_targets_count_as_sources() {
        let records = vec![rec("Gross", &["Base", "Bonus"]), rec("Net", &["Gross", "Tax"])];
        let report = coverage(&records, &labels(&["Base", "Bonus"]), None);

        assert_eq!(
            report.unresolved_sources,
            vec![UnresolvedSource {
                target: "Net".to_string(),
                source: "Tax".to_string(),
            }]
        );
        assert_eq!(report.covered, 1);
    }

    #[test]
    fn missing_targets_only_checked_against_a_template() {
        let records = vec![rec("Gross", &[]), rec("Extra", &[]), rec("Extra", &[])];

        let without = coverage(&records, &[], None);
        assert!(without.missing_targets.is_empty());

        let with = coverage(&records, &[], Some(labels(&["Gross", "Net"]).as_slice()));
        assert_eq!(with.missing_targets, vec!["Extra"]);
        assert_eq!(with.covered, 1);
        assert!(!with.is_clean());
    }

    #[test]
    fn empty_template_flags_every_target() {
        let records = vec![rec("Gross", &[])];
        let report = coverage(&records, &[], Some(&[][..]));

        assert_eq!(report.missing_targets, vec!["Gross"]);
    }
}
