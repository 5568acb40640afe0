use std::ops::Range;
use std::sync::Arc;

use itertools::{Itertools, MultiProduct};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::stop::StopSignal;

// placeholder names are shared across a run, values are owned
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Combination {
    placeholders: Arc<[String]>,
    values: Vec<String>,
}

impl Combination {
    pub fn new(placeholders: Arc<[String]>, values: Vec<String>) -> Self {
        debug_assert_eq!(placeholders.len(), values.len());
        Self {
            placeholders,
            values,
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (placeholders, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(placeholders.into(), values)
    }

    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.placeholders
            .iter()
            .position(|p| p == placeholder)
            .map(|i| self.values[i].as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.placeholders
            .iter()
            .zip(self.values.iter())
            .map(|(p, v)| (p.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // "FUZZ1: admin | FUZZ2: 1"
    pub fn describe(&self) -> String {
        self.iter()
            .map(|(p, v)| format!("{p}: {v}"))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl Serialize for Combination {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (p, v) in self.iter() {
            map.serialize_entry(p, v)?;
        }
        map.end()
    }
}

// First placeholder varies slowest. One-shot, and empty once stop is observed.
pub struct CombinationGenerator {
    placeholders: Arc<[String]>,
    values: Vec<Vec<String>>,
    product: MultiProduct<Range<usize>>,
    stop: StopSignal,
    finished: bool,
}

impl CombinationGenerator {
    pub fn new(sources: Vec<(String, Vec<String>)>, stop: StopSignal) -> Self {
        let (placeholders, values): (Vec<String>, Vec<Vec<String>>) = sources.into_iter().unzip();
        let product = values
            .iter()
            .map(|v| 0..v.len())
            .collect::<Vec<_>>()
            .into_iter()
            .multi_cartesian_product();
        let finished = placeholders.is_empty();
        Self {
            placeholders: placeholders.into(),
            values,
            product,
            stop,
            finished,
        }
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    pub fn total(&self) -> u64 {
        total_combinations(self.values.iter().map(|v| v.len()))
    }
}

pub fn total_combinations<I: IntoIterator<Item = usize>>(counts: I) -> u64 {
    let mut total: u64 = 1;
    let mut any = false;
    for count in counts {
        any = true;
        total = total.saturating_mul(count as u64);
    }
    if any {
        total
    } else {
        0
    }
}

impl Iterator for CombinationGenerator {
    type Item = Combination;

    fn next(&mut self) -> Option<Combination> {
        if self.finished {
            return None;
        }
        if self.stop.is_requested() {
            self.finished = true;
            return None;
        }
        let indices = match self.product.next() {
            Some(indices) => indices,
            None => {
                self.finished = true;
                return None;
            }
        };
        let values = indices
            .iter()
            .zip(self.values.iter())
            .map(|(&i, list)| list[i].clone())
            .collect();
        Some(Combination::new(self.placeholders.clone(), values))
    }
}
