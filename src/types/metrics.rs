//! Engine histogram samples

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One engine histogram and the samples collected since the last reset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSampleInfo {
    pub name: String,
    pub min: i32,
    pub max: i32,
    pub bucket_count: i32,
    /// Sample value to number of occurrences
    pub samples: BTreeMap<i32, i32>,
}

impl MetricsSampleInfo {
    pub fn new(name: impl Into<String>, min: i32, max: i32, bucket_count: i32) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            bucket_count,
            samples: BTreeMap::new(),
        }
    }

    pub fn add_sample(&mut self, value: i32) {
        *self.samples.entry(value).or_insert(0) += 1;
    }

    pub fn sample_count(&self) -> i32 {
        self.samples.values().sum()
    }
}
