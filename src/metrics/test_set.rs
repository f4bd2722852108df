use std::fs;
use std::path::Path;

use ndarray::Array2;

use crate::error::{QgridError, Result};
use crate::normalizer::Normalizer;
use crate::value_function::QFunction;

/// Fixed state-action rows used to watch the average Q estimate drift during
/// training. Never used for learning.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSet {
    pub labels: Vec<String>,
    /// Normalized state-action rows
    pub state_actions: Array2<f32>,
}

impl TestSet {
    /// Parses comma separated text: a header line, then one row per line whose
    /// first field is a label and whose remaining fields are numbers.
    pub fn parse(text: &str, normalizer: &Normalizer) -> Result<Self> {
        let mut labels = Vec::new();
        let mut values = Vec::new();
        let mut width = None;

        for (line_no, line) in text.lines().enumerate().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split(',');
            let label = fields.next().unwrap_or_default().trim().to_string();
            let row = fields
                .map(|field| {
                    field.trim().parse::<f32>().map_err(|e| {
                        QgridError::Serialization(format!(
                            "line {}: '{}' is not a number ({})",
                            line_no + 1,
                            field.trim(),
                            e
                        ))
                    })
                })
                .collect::<Result<Vec<f32>>>()?;

            match width {
                None => width = Some(row.len()),
                Some(w) if w != row.len() => {
                    return Err(QgridError::data_shape(
                        format!("{} values per row", w),
                        format!("{} on line {}", row.len(), line_no + 1),
                    ));
                }
                Some(_) => {}
            }
            labels.push(label);
            values.extend(row);
        }

        let width = width.unwrap_or(0);
        let raw = Array2::from_shape_vec((labels.len(), width), values)
            .map_err(|e| QgridError::data_shape(format!("{} columns", width), e.to_string()))?;
        let state_actions = normalizer.normalize(raw.view())?;
        Ok(TestSet {
            labels,
            state_actions,
        })
    }

    pub fn from_csv<P: AsRef<Path>>(path: P, normalizer: &Normalizer) -> Result<Self> {
        Self::parse(&fs::read_to_string(path)?, normalizer)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Average prediction of `q` over every row.
    pub fn mean_value<Q: QFunction>(&self, q: &mut Q) -> Result<f32> {
        if self.is_empty() {
            return Ok(0.0);
        }
        let predictions = q.predict(self.state_actions.view())?;
        Ok(predictions.mean().unwrap_or(0.0))
    }
}
