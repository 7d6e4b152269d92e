use std::fmt;

use time::{format_description::BorrowedFormatItem, macros::format_description, PrimitiveDateTime};

const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// One meter observation. Readings are created once per ingested row and
/// never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub ts: PrimitiveDateTime,
    pub kwh: f64,
}

impl Reading {
    pub fn new(ts: PrimitiveDateTime, kwh: f64) -> Self {
        Self { ts, kwh }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ts = self.ts.format(DISPLAY_FORMAT).map_err(|_| fmt::Error)?;
        write!(f, "[{ts} -> {:?} kWh]", self.kwh)
    }
}
