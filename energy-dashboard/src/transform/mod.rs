use campus_core::Reading;

use crate::{
    pipeline::{Envelope, PipelineError, Transform},
    sources::RawMeterRow,
};

/// A row that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterRow {
    pub reading: Reading,
    pub extra: Vec<(String, String)>,
}

/// Pure validation of a parsed CSV row.
///
/// Rules:
/// - Date and kWh must both be present and parseable.
/// - kWh must be finite.
/// - kWh must be non-negative when `reject_negative` is set.
pub fn validate_row(
    env: Envelope<RawMeterRow>,
    reject_negative: bool,
) -> Result<Envelope<MeterRow>, PipelineError> {
    let Envelope { payload, line } = env;

    let ts = payload
        .ts
        .ok_or_else(|| PipelineError::Transform("missing or unparseable Date".to_string()))?;
    let kwh = payload
        .kwh
        .ok_or_else(|| PipelineError::Transform("missing or unparseable kWh".to_string()))?;

    if !kwh.is_finite() {
        return Err(PipelineError::Transform(format!("kWh must be finite, got {kwh}")));
    }
    if reject_negative && kwh < 0.0 {
        return Err(PipelineError::Transform(format!("kWh must be non-negative, got {kwh}")));
    }

    Ok(Envelope {
        payload: MeterRow {
            reading: Reading::new(ts, kwh),
            extra: payload.extra,
        },
        line,
    })
}

#[derive(Clone, Debug)]
pub struct RowValidation {
    reject_negative: bool,
}

impl RowValidation {
    pub fn new(reject_negative: bool) -> Self {
        Self { reject_negative }
    }
}

impl Default for RowValidation {
    fn default() -> Self {
        Self::new(false)
    }
}

#[async_trait::async_trait]
impl Transform<RawMeterRow, MeterRow> for RowValidation {
    async fn apply(
        &self,
        input: Envelope<RawMeterRow>,
    ) -> Result<Envelope<MeterRow>, PipelineError> {
        match validate_row(input, self.reject_negative) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("dashboard_rows_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}
