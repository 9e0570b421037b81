//! The per-run experiment document consumed by the downstream analysis and
//! plotting collaborators: a nested mapping of stimulus parameters plus a
//! `recording` section carrying the time base and every recorded trace.

use std::io::Write;
use serde_json::{Map, Number, Value};
use crate::simulation::RunResult;


/// A JSON experiment document for one completed run
///
/// Trace labels may carry `/` separators to build nested groups, so a
/// recorder labelled `basal_34/voltage_0.5` lands at
/// `recording.basal_34.voltage_0.5`.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    root: Map<String, Value>,
}

fn number(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

fn float_array(values: &[f64]) -> Value {
    Value::Array(values.iter().map(|v| number(*v)).collect())
}

impl RunReport {
    pub fn new() -> Self {
        RunReport::default()
    }

    /// Sets a scalar stimulus parameter under a group, e.g.
    /// `("NMDA", "Beta", 0.03)`
    pub fn set_param(&mut self, group: &str, key: &str, value: f64) {
        self.group(group).insert(key.to_string(), number(value));
    }

    /// Sets an integer stimulus parameter under a group, e.g.
    /// `("AMPA", "num", 30)`
    pub fn set_count(&mut self, group: &str, key: &str, value: usize) {
        self.group(group).insert(key.to_string(), Value::Number(Number::from(value)));
    }

    /// Sets a list stimulus parameter under a group, e.g. the synapse
    /// locations of a pool
    pub fn set_values(&mut self, group: &str, key: &str, values: &[f64]) {
        self.group(group).insert(key.to_string(), float_array(values));
    }

    /// Fills the `recording` section from a run: the ordered time base and
    /// one entry per trace, every trace the same length as `time`
    pub fn set_recording(&mut self, result: &RunResult) {
        let mut recording = Map::new();
        recording.insert("time".to_string(), float_array(&result.time));

        for (label, samples) in &result.traces {
            let mut parts = label.split('/').peekable();
            let mut cursor = &mut recording;
            while let Some(part) = parts.next() {
                if parts.peek().is_none() {
                    cursor.insert(part.to_string(), float_array(samples));
                } else {
                    cursor = match cursor
                        .entry(part.to_string())
                        .or_insert_with(|| Value::Object(Map::new()))
                    {
                        Value::Object(map) => map,
                        _ => break,
                    };
                }
            }
        }

        self.root.insert("recording".to_string(), Value::Object(recording));
    }

    fn group(&mut self, name: &str) -> &mut Map<String, Value> {
        match self.root
            .entry(name.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
        {
            Value::Object(map) => map,
            other => {
                *other = Value::Object(Map::new());
                match other {
                    Value::Object(map) => map,
                    _ => unreachable!(),
                }
            }
        }
    }

    /// The document as a JSON value
    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Serializes the document to a JSON string
    pub fn to_json_string(&self) -> String {
        Value::Object(self.root.clone()).to_string()
    }

    /// Writes the document to any writer
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer(writer, &Value::Object(self.root.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_matches_the_experiment_schema() {
        let result = RunResult {
            time: vec![0., 0.025, 0.05],
            traces: vec![
                ("soma/voltage".to_string(), vec![-67.3, -67.2, -67.1]),
                ("basal_34/voltage_0.5".to_string(), vec![-67.3, -66.9, -66.5]),
            ],
            steps: 2,
        };

        let mut report = RunReport::new();
        report.set_count("AMPA", "num", 30);
        report.set_param("AMPA", "weight", 0.01);
        report.set_values("AMPA", "locs", &[0.4, 0.55, 0.7]);
        report.set_count("NMDA", "num", 2);
        report.set_param("NMDA", "Beta", 0.067);
        report.set_param("NMDA", "Cdur", 1.);
        report.set_recording(&result);

        let value = report.to_value();

        assert_eq!(value["AMPA"]["num"], 30);
        assert_eq!(value["NMDA"]["Beta"], 0.067);
        assert_eq!(value["recording"]["time"].as_array().unwrap().len(), 3);
        assert_eq!(
            value["recording"]["soma"]["voltage"].as_array().unwrap().len(),
            3
        );
        assert_eq!(
            value["recording"]["basal_34"]["voltage_0.5"].as_array().unwrap().len(),
            3
        );
    }

    #[test]
    fn every_trace_matches_the_time_length() {
        let result = RunResult {
            time: vec![0., 1.],
            traces: vec![("soma/voltage".to_string(), vec![-67., -66.])],
            steps: 1,
        };

        let mut report = RunReport::new();
        report.set_recording(&result);
        let value = report.to_value();

        let time_len = value["recording"]["time"].as_array().unwrap().len();
        let trace_len = value["recording"]["soma"]["voltage"].as_array().unwrap().len();

        assert_eq!(time_len, trace_len);
    }
}
