//! Rendering of instruments into the Prometheus text exposition format.
//!
//! Only the subset of the format the tracker needs: `gauge` and `counter`
//! metric families with optional label pairs.
use std::fmt::Write as _;

/// A `name="value"` label pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: &'static str,
    pub value: String,
}

impl Label {
    #[must_use]
    pub fn new(name: &'static str, value: &str) -> Self {
        Self {
            name,
            value: value.to_owned(),
        }
    }
}

/// One sample of a metric family: label set plus current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: Vec<Label>,
    pub value: u64,
}

impl Sample {
    #[must_use]
    pub fn new(labels: Vec<Label>, value: u64) -> Self {
        Self { labels, value }
    }

    #[must_use]
    pub fn unlabeled(value: u64) -> Self {
        Self { labels: vec![], value }
    }
}

/// Appends a `gauge` family to the exposition output.
pub fn encode_gauge(out: &mut String, name: &str, help: &str, samples: &[Sample]) {
    encode_family(out, name, help, "gauge", samples);
}

/// Appends a `counter` family to the exposition output.
pub fn encode_counter(out: &mut String, name: &str, help: &str, samples: &[Sample]) {
    encode_family(out, name, help, "counter", samples);
}

fn encode_family(out: &mut String, name: &str, help: &str, kind: &str, samples: &[Sample]) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} {kind}");

    for sample in samples {
        if sample.labels.is_empty() {
            let _ = writeln!(out, "{name} {}", sample.value);
        } else {
            let labels = sample
                .labels
                .iter()
                .map(|label| format!("{}=\"{}\"", label.name, escape_label_value(&label.value)))
                .collect::<Vec<_>>()
                .join(",");
            let _ = writeln!(out, "{name}{{{labels}}} {}", sample.value);
        }
    }
}

fn escape_label_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {

    mod text_exposition {
        use crate::prometheus::{encode_counter, encode_gauge, Label, Sample};

        #[test]
        fn an_unlabeled_gauge_should_render_help_type_and_value_lines() {
            let mut out = String::new();

            encode_gauge(&mut out, "chihaya_seeders", "Number of seeders.", &[Sample::unlabeled(3)]);

            assert_eq!(
                out,
                "# HELP chihaya_seeders Number of seeders.\n# TYPE chihaya_seeders gauge\nchihaya_seeders 3\n"
            );
        }

        #[test]
        fn a_labeled_counter_should_render_the_label_pairs() {
            let mut out = String::new();

            encode_counter(
                &mut out,
                "chihaya_announces_total",
                "Number of announces.",
                &[Sample::new(vec![Label::new("af", "ipv4"), Label::new("frontend", "udp")], 7)],
            );

            assert!(out.ends_with("chihaya_announces_total{af=\"ipv4\",frontend=\"udp\"} 7\n"));
        }

        #[test]
        fn label_values_should_be_escaped() {
            let mut out = String::new();

            encode_gauge(
                &mut out,
                "chihaya_test",
                "Escaping.",
                &[Sample::new(vec![Label::new("reason", "a \"quoted\" value")], 1)],
            );

            assert!(out.contains(r#"reason="a \"quoted\" value""#));
        }
    }
}
