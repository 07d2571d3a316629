//! Final-report and region-list rendering.

use regping_model::Target;

/// Marker emitted when a target has no successful samples.
pub const UNAVAILABLE: &str = "n/a";

/// One presenter row: a target and its reduced statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetReport {
    pub id: String,
    pub name: String,
    pub avg_ms: Option<f64>,
    pub ok: usize,
    pub total: usize,
}

/// Sort ascending by statistic; targets without one go last. Ties keep
/// their existing order.
pub fn sort_reports(reports: &mut [TargetReport]) {
    reports.sort_by(|a, b| match (a.avg_ms, b.avg_ms) {
        (Some(a_ms), Some(b_ms)) => a_ms.total_cmp(&b_ms),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Fixed-width table, one row per target.
pub fn render_text(reports: &[TargetReport]) -> String {
    let id_width = reports
        .iter()
        .map(|report| report.id.len())
        .chain(std::iter::once("Region".len()))
        .max()
        .unwrap_or(0);

    let mut lines = Vec::with_capacity(reports.len() + 1);
    lines.push(format!(
        "{:<id_width$}{:>12}{:>8}{:>8}",
        "Region", "Avg. ms", "OK", "Count"
    ));
    for report in reports {
        lines.push(format!(
            "{:<id_width$}{:>12}{:>8}{:>8}",
            report.id,
            format_avg(report.avg_ms),
            report.ok,
            report.total
        ));
    }
    lines.join("\n")
}

/// Same rows as comma-separated fields under a header.
pub fn render_csv(reports: &[TargetReport]) -> String {
    let mut lines = Vec::with_capacity(reports.len() + 1);
    lines.push("region,avg_ms,ok,count".to_string());
    for report in reports {
        lines.push(format!(
            "{},{},{},{}",
            report.id,
            format_avg(report.avg_ms),
            report.ok,
            report.total
        ));
    }
    lines.join("\n")
}

/// List-only output: region ids one per line, or full rows in CSV mode.
pub fn render_region_list(targets: &[Target], csv: bool) -> String {
    if csv {
        let mut lines = Vec::with_capacity(targets.len() + 1);
        lines.push("region,name,url".to_string());
        for target in targets {
            lines.push(format!("{},{},{}", target.id, target.name, target.url));
        }
        lines.join("\n")
    } else {
        targets
            .iter()
            .map(|target| target.id.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn format_avg(avg_ms: Option<f64>) -> String {
    match avg_ms {
        Some(ms) => format!("{ms:.1}"),
        None => UNAVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(id: &str, avg_ms: Option<f64>) -> TargetReport {
        TargetReport {
            id: id.to_string(),
            name: id.to_uppercase(),
            avg_ms,
            ok: if avg_ms.is_some() { 3 } else { 0 },
            total: 3,
        }
    }

    #[test]
    fn text_report_lists_every_target() {
        let reports = vec![report("us-east1", Some(24.26)), report("europe-west1", None)];
        let text = render_text(&reports);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Region"));
        assert!(lines[1].starts_with("us-east1"));
        assert!(lines[1].contains("24.3"));
        assert!(lines[2].contains(UNAVAILABLE));
    }

    #[test]
    fn csv_report_has_header_and_unavailable_marker() {
        let reports = vec![report("us-east1", Some(24.26)), report("europe-west1", None)];
        let csv = render_csv(&reports);

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "region,avg_ms,ok,count");
        assert_eq!(lines[1], "us-east1,24.3,3,3");
        assert_eq!(lines[2], "europe-west1,n/a,0,3");
    }

    #[test]
    fn sort_puts_unavailable_last() {
        let mut reports = vec![
            report("dead1", None),
            report("slow", Some(200.0)),
            report("dead2", None),
            report("fast", Some(20.0)),
        ];
        sort_reports(&mut reports);

        let ids: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["fast", "slow", "dead1", "dead2"]);
    }

    #[test]
    fn region_list_is_ids_or_csv_rows() {
        let targets = vec![
            Target {
                id: "us-east1".to_string(),
                name: "South Carolina".to_string(),
                url: "https://us-east1.example.test".to_string(),
            },
            Target {
                id: "asia-east1".to_string(),
                name: "Taiwan".to_string(),
                url: "https://asia-east1.example.test".to_string(),
            },
        ];

        assert_eq!(render_region_list(&targets, false), "us-east1\nasia-east1");

        let csv = render_region_list(&targets, true);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "region,name,url");
        assert_eq!(
            lines[1],
            "us-east1,South Carolina,https://us-east1.example.test"
        );
    }
}
