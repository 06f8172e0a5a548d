/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::sync::Arc;

use gnode_types::metrics::{MetricsName, ParseError};

pub const LOG_SIZE: &str = "logsize";
pub const CACHE_STATUS: &str = "redis-status";
pub const DATABASE_STATUS: &str = "spanner-status";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasureUnit {
    Byte,
    Count,
}

impl MeasureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureUnit::Byte => "byte",
            MeasureUnit::Count => "count",
        }
    }
}

/// A named int64 quantity that can be recorded.
#[derive(Debug, PartialEq, Eq)]
pub struct Measure {
    name: MetricsName,
    description: String,
    unit: MeasureUnit,
}

impl Measure {
    pub fn new(name: &str, description: &str, unit: MeasureUnit) -> Result<Arc<Self>, ParseError> {
        let name = MetricsName::from_str(name)?;
        Ok(Arc::new(Measure {
            name,
            description: description.to_string(),
            unit,
        }))
    }

    #[inline]
    pub fn name(&self) -> &MetricsName {
        &self.name
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn unit(&self) -> MeasureUnit {
        self.unit
    }

    /// Make a measurement of this measure.
    pub fn m(self: &Arc<Self>, value: i64) -> Measurement {
        Measurement {
            measure: self.clone(),
            value,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Measurement {
    measure: Arc<Measure>,
    value: i64,
}

impl Measurement {
    #[inline]
    pub fn measure(&self) -> &Arc<Measure> {
        &self.measure
    }

    #[inline]
    pub fn value(&self) -> i64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_measure() {
        let m = Measure::new(LOG_SIZE, "logSize", MeasureUnit::Byte).unwrap();
        assert_eq!(m.name().as_str(), "logsize");
        assert_eq!(m.description(), "logSize");
        assert_eq!(m.unit().as_str(), "byte");

        assert!(Measure::new("", "empty", MeasureUnit::Count).is_err());
        assert!(Measure::new("redis status", "", MeasureUnit::Count).is_err());
    }

    #[test]
    fn measurement() {
        let m = Measure::new(CACHE_STATUS, "redis status", MeasureUnit::Count).unwrap();
        let v = m.m(1);
        assert!(Arc::ptr_eq(v.measure(), &m));
        assert_eq!(v.value(), 1);
    }
}
