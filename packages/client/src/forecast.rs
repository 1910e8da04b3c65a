//! Forecast windows and the forecast wire payload.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, NaiveTime};
use parkendd_models::{ForecastSeries, timestamp};
use serde::Deserialize;

use crate::ClientError;
use crate::config::{FORECAST_DAY, FORECAST_WEEK};

/// `[from, from + 7 days)`.
#[must_use]
pub fn week_window(from: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    (from, from + FORECAST_WEEK)
}

/// The calendar day containing `reference`: midnight to the next midnight.
#[must_use]
pub fn day_window(reference: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let start = reference.date().and_time(NaiveTime::MIN);
    (start, start + FORECAST_DAY)
}

/// `{"data": {"<timestamp>": <count>, ...}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ForecastPayload {
    data: BTreeMap<String, Occupancy>,
}

/// Some deployments send counts as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Occupancy {
    Count(u32),
    Text(String),
}

impl ForecastPayload {
    /// Converts the payload into a series for `lot_id`.
    ///
    /// Unparseable timestamps or counts are a [`ClientError::Server`]; an
    /// empty `data` object is [`ClientError::NoData`].
    pub(crate) fn into_series(self, lot_id: &str) -> Result<ForecastSeries, ClientError> {
        if self.data.is_empty() {
            return Err(ClientError::NoData {
                lot_id: lot_id.to_string(),
            });
        }

        let data = self
            .data
            .into_iter()
            .map(|(at, value)| {
                let at = timestamp::parse_naive(&at).ok_or_else(|| ClientError::Server {
                    message: format!("Invalid forecast timestamp '{at}'"),
                })?;
                let value = match value {
                    Occupancy::Count(count) => count,
                    Occupancy::Text(text) => {
                        text.trim().parse().map_err(|_| ClientError::Server {
                            message: format!("Invalid forecast value '{text}'"),
                        })?
                    }
                };
                Ok((at, value))
            })
            .collect::<Result<BTreeMap<_, _>, ClientError>>()?;

        Ok(ForecastSeries {
            lot_id: lot_id.to_string(),
            data,
        })
    }
}
