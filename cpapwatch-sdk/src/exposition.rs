//! Prometheus text exposition format.

use std::fmt::Write;

use crate::Registry;

/// Format every gauge in a registry as Prometheus exposition format (0.0.4).
///
/// Each family gets `# HELP` and `# TYPE` headers even when it currently has
/// no samples.
pub fn format_prometheus(registry: &Registry) -> String {
    let mut output = String::new();
    let prefix = registry
        .namespace()
        .map(|n| format!("{}_", n))
        .unwrap_or_default();

    for gauge in registry.gauges() {
        let family = gauge.family();
        let name = format!("{}{}", prefix, family.name);

        // Writing to a String cannot fail
        let _ = writeln!(output, "# HELP {} {}", name, escape_help(&family.help));
        let _ = writeln!(output, "# TYPE {} gauge", name);

        for (label_values, value) in family.values.read().iter() {
            let value = format_value(*value);
            if family.label_names.is_empty() {
                let _ = writeln!(output, "{} {}", name, value);
                continue;
            }

            let labels = family
                .label_names
                .iter()
                .zip(label_values)
                .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
                .collect::<Vec<_>>()
                .join(",");
            let _ = writeln!(output, "{}{{{}}} {}", name, labels, value);
        }
    }

    output
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else {
        format!("{}", value)
    }
}

/// Escape a label value for Prometheus format.
/// Backslash, double-quote, and newline must be escaped.
fn escape_label_value(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// HELP text escapes only backslash and newline.
fn escape_help(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_registry() -> Registry {
        let registry = Registry::with_namespace("myair");
        let score = registry
            .gauge("score", "Nightly score", &["patient", "date"])
            .unwrap();
        score.set(&["P1", "2025-08-01"], 85.0).unwrap();
        score.set(&["P1", "2025-08-02"], 72.0).unwrap();

        let ahi = registry.gauge("ahi", "Events per hour", &["patient"]).unwrap();
        ahi.set(&["P1"], 1.25).unwrap();
        registry
    }

    #[test]
    fn test_format_prometheus_basic() {
        let output = format_prometheus(&create_test_registry());

        assert!(output.contains("myair_score{patient=\"P1\",date=\"2025-08-01\"} 85\n"));
        assert!(output.contains("myair_score{patient=\"P1\",date=\"2025-08-02\"} 72\n"));
        assert!(output.contains("myair_ahi{patient=\"P1\"} 1.25\n"));
    }

    #[test]
    fn test_format_includes_help_and_type() {
        let output = format_prometheus(&create_test_registry());

        assert!(output.contains("# HELP myair_score Nightly score\n"));
        assert!(output.contains("# TYPE myair_score gauge\n"));
        assert!(output.contains("# TYPE myair_ahi gauge\n"));
    }

    #[test]
    fn test_without_namespace() {
        let registry = Registry::new();
        registry.gauge("up", "Liveness", &[]).unwrap().set(&[], 1.0).unwrap();

        let output = format_prometheus(&registry);
        assert!(output.contains("# TYPE up gauge\n"));
        assert!(output.contains("\nup 1\n"));
    }

    #[test]
    fn test_empty_family_still_has_headers() {
        let registry = Registry::with_namespace("myair");
        registry.gauge("total_days_count", "Days", &["patient"]).unwrap();

        let output = format_prometheus(&registry);
        assert!(output.contains("# HELP myair_total_days_count Days"));
        assert!(!output.contains("myair_total_days_count{"));
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("simple"), "simple");
        assert_eq!(escape_label_value("with\"quote"), "with\\\"quote");
        assert_eq!(escape_label_value("with\\backslash"), "with\\\\backslash");
        assert_eq!(escape_label_value("with\nnewline"), "with\\nnewline");
    }

    #[test]
    fn test_label_values_are_escaped_in_output() {
        let registry = Registry::new();
        let mask = registry.gauge("mask", "Masks", &["name"]).unwrap();
        mask.set(&["AirFit \"F20\""], 1.0).unwrap();

        let output = format_prometheus(&registry);
        assert!(output.contains("mask{name=\"AirFit \\\"F20\\\"\"} 1"));
    }

    #[test]
    fn test_format_value_special_cases() {
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(27120.0), "27120");
    }
}
