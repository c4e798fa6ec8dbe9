#![allow(dead_code)]

use crimeboard::query::{
    QueryResult, QueryTemplate, CATEGORY_MONTH_COUNTS, CATEGORY_MONTH_SERIES,
    DISTRICT_YEAR_COUNTS, DISTRICT_YEAR_SERIES, INCIDENT_LOCATIONS,
};
use crimeboard::{WarehouseClient, WarehouseError};
use polars::prelude::*;
use std::cell::RefCell;
use std::collections::HashMap;

/// In-memory warehouse answering fixed SQL strings, with an optional
/// connectivity failure and a log of every query it received.
#[derive(Default)]
pub struct FakeWarehouse {
    responses: HashMap<String, DataFrame>,
    unreachable: Option<String>,
    calls: RefCell<Vec<String>>,
    invalidations: RefCell<usize>,
}

impl FakeWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, template: &QueryTemplate, frame: DataFrame) -> Self {
        self.responses.insert(template.sql.to_string(), frame);
        self
    }

    /// Fail every query with a connectivity error carrying `reason`
    pub fn unreachable(mut self, reason: &str) -> Self {
        self.unreachable = Some(reason.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn invalidations(&self) -> usize {
        *self.invalidations.borrow()
    }
}

impl WarehouseClient for FakeWarehouse {
    fn query(&self, sql: &str) -> Result<QueryResult, WarehouseError> {
        self.calls.borrow_mut().push(sql.to_string());
        if let Some(reason) = &self.unreachable {
            return Err(WarehouseError::connectivity(reason.clone()));
        }
        self.responses
            .get(sql)
            .cloned()
            .map(QueryResult::new)
            .ok_or_else(|| WarehouseError::Service {
                status: 404,
                message: format!("no such table for: {}", sql),
            })
    }

    fn invalidate(&self) {
        *self.invalidations.borrow_mut() += 1;
    }
}

/// Long-form district counts. PARK has no 2009 row; BAYVIEW has a duplicate
/// 2007 row; MISSION only has a year outside the whitelist.
pub fn district_counts() -> DataFrame {
    df!(
        "pddistrict" => &["PARK", "BAYVIEW", "PARK", "BAYVIEW", "BAYVIEW", "TENDERLOIN", "BAYVIEW", "MISSION"],
        "year" => &[2007i64, 2007, 2008, 2008, 2007, 2007, 2009, 2018],
        "crime_count" => &[410i64, 1200, 420, 1300, 1250, 2100, 1400, 99]
    )
    .unwrap()
}

pub fn district_series() -> DataFrame {
    df!(
        "pddistrict" => &["PARK", "BAYVIEW", "TENDERLOIN", "PARK", "BAYVIEW", "TENDERLOIN"],
        "year" => &[2007i64, 2007, 2007, 2008, 2008, 2008],
        "crime_count" => &[410i64, 1250, 2100, 420, 1300, 2200]
    )
    .unwrap()
}

pub fn month_counts() -> DataFrame {
    df!(
        "category" => &["ASSAULT", "ASSAULT", "ASSAULT", "ARSON", "ROBBERY"],
        "month" => &["January", "February", "March", "January", "December"],
        "crime_count" => &[900i64, 850, 910, 30, 300]
    )
    .unwrap()
}

pub fn month_series() -> DataFrame {
    df!(
        "category" => &["ASSAULT", "ARSON", "ASSAULT", "ASSAULT", "ROBBERY"],
        "month" => &["March", "January", "January", "February", "December"],
        "crime_count" => &[910i64, 30, 900, 850, 300]
    )
    .unwrap()
}

pub fn locations() -> DataFrame {
    df!(
        "category" => &["ROBBERY", "SEX OFFENSES, FORCIBLE", "ROBBERY", "ASSAULT", "ROBBERY", "ASSAULT"],
        "long" => &[Some(-122.4), Some(-122.41), Some(-122.4), Some(-122.42), None, Some(-122.39)],
        "lat" => &[Some(37.76), Some(37.77), Some(37.76), Some(37.78), Some(37.75), Some(37.74)]
    )
    .unwrap()
}

/// A warehouse with every dashboard table.
pub fn full_warehouse() -> FakeWarehouse {
    FakeWarehouse::new()
        .with(&DISTRICT_YEAR_COUNTS, district_counts())
        .with(&DISTRICT_YEAR_SERIES, district_series())
        .with(&CATEGORY_MONTH_COUNTS, month_counts())
        .with(&CATEGORY_MONTH_SERIES, month_series())
        .with(&INCIDENT_LOCATIONS, locations())
}

pub fn keys(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Shares one `FakeWarehouse` between a test and the `App` that owns its client.
pub struct SharedWarehouse(pub std::rc::Rc<FakeWarehouse>);

impl WarehouseClient for SharedWarehouse {
    fn query(&self, sql: &str) -> Result<QueryResult, WarehouseError> {
        self.0.query(sql)
    }

    fn invalidate(&self) {
        self.0.invalidate()
    }
}
