use std::fmt;

use serde::{Deserialize, Serialize};

/// How loudly an advisory should be shown, least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => f.write_str("OK"),
            Level::Warning => f.write_str("CAUTION"),
            Level::Critical => f.write_str("ALERT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub level: Level,
    pub message: String,
}

impl Advisory {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// One labelled number in a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub label: String,
    /// `None` when the quantity is undefined (e.g. a zero denominator).
    pub value: Option<f64>,
    pub unit: String,
    /// Decimal places used when rendering.
    pub precision: usize,
}

impl Measurement {
    pub fn new(label: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: Some(value),
            unit: unit.into(),
            precision: 2,
        }
    }

    pub fn undefined(label: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
            unit: unit.into(),
            precision: 2,
        }
    }

    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => {
                write!(f, "{}: {:.*}", self.label, self.precision, value)?;
                if !self.unit.is_empty() {
                    write!(f, " {}", self.unit)?;
                }
                Ok(())
            }
            None => write!(f, "{}: undefined", self.label),
        }
    }
}

/// Structured result of one calculation: headline value, classification,
/// advisories and the formula that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub headline: Measurement,
    pub details: Vec<Measurement>,
    pub classification: Option<String>,
    pub findings: Vec<String>,
    pub advisories: Vec<Advisory>,
    pub formula: Option<String>,
}

impl Report {
    pub fn new(title: impl Into<String>, headline: Measurement) -> Self {
        Self {
            title: title.into(),
            headline,
            details: Vec::new(),
            classification: None,
            findings: Vec::new(),
            advisories: Vec::new(),
            formula: None,
        }
    }

    pub fn detail(mut self, measurement: Measurement) -> Self {
        self.details.push(measurement);
        self
    }

    pub fn classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    pub fn finding(mut self, finding: impl Into<String>) -> Self {
        self.findings.push(finding.into());
        self
    }

    pub fn advisory(mut self, level: Level, message: impl Into<String>) -> Self {
        self.advisories.push(Advisory::new(level, message));
        self
    }

    pub fn formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    /// Highest advisory level in the report, if any.
    pub fn worst_level(&self) -> Option<Level> {
        self.advisories.iter().map(|a| a.level).max()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.title)?;
        writeln!(f, "{}", self.headline)?;
        for detail in &self.details {
            writeln!(f, "  {}", detail)?;
        }
        if let Some(classification) = &self.classification {
            writeln!(f, "Classification: {}", classification)?;
        }
        for finding in &self.findings {
            writeln!(f, "  - {}", finding)?;
        }
        for advisory in &self.advisories {
            writeln!(f, "[{}] {}", advisory.level, advisory.message)?;
        }
        if let Some(formula) = &self.formula {
            writeln!(f, "Formula: {}", formula)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headline_with_precision() {
        let report = Report::new("CCr", Measurement::new("Creatinine clearance", 66.666, "mL/min").precision(1))
            .classification("normal");
        let text = report.to_string();
        assert!(text.contains("Creatinine clearance: 66.7 mL/min"));
        assert!(text.contains("Classification: normal"));
    }

    #[test]
    fn undefined_values_render_as_such() {
        assert_eq!(Measurement::undefined("FeNa", "%").to_string(), "FeNa: undefined");
    }

    #[test]
    fn worst_level_picks_the_most_severe() {
        let report = Report::new("x", Measurement::new("x", 1.0, ""))
            .advisory(Level::Info, "fine")
            .advisory(Level::Critical, "bad")
            .advisory(Level::Warning, "meh");
        assert_eq!(report.worst_level(), Some(Level::Critical));
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(Level::Info < Level::Warning && Level::Warning < Level::Critical);
        let report = Report::new("x", Measurement::new("x", 1.0, ""));
        assert_eq!(report.worst_level(), None);
    }
}
