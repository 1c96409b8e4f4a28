use chrono::NaiveDate;
use tracing::info;

use common::{Error, Result, SignalCondition, SignalStateRecord, SignalType, DATE_FORMAT};

/// Days a weakening signal may keep failing before it is switched off.
/// Deactivation happens once the streak is strictly longer than this.
pub const WEAKENING_GRACE_DAYS: i64 = 30;

/// Lifecycle of the BTC cycle signal.
///
/// `Inactive` has never fired (or was reset). `RecentlyOff` ran its course
/// and keeps its dates for display until a new signal fires.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SignalPhase {
    #[default]
    Inactive,
    ActiveHealthy {
        signal_type: SignalType,
        start_date: NaiveDate,
    },
    ActiveWeakening {
        signal_type: SignalType,
        start_date: NaiveDate,
        failing_since: NaiveDate,
    },
    RecentlyOff {
        signal_type: SignalType,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
}

/// Signal phase plus the date of the last analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignalState {
    pub phase: SignalPhase,
    pub last_updated: Option<NaiveDate>,
}

impl SignalState {
    pub fn is_active(&self) -> bool {
        matches!(
            self.phase,
            SignalPhase::ActiveHealthy { .. } | SignalPhase::ActiveWeakening { .. }
        )
    }

    pub fn signal_type(&self) -> Option<SignalType> {
        match &self.phase {
            SignalPhase::Inactive => None,
            SignalPhase::ActiveHealthy { signal_type, .. }
            | SignalPhase::ActiveWeakening { signal_type, .. }
            | SignalPhase::RecentlyOff { signal_type, .. } => Some(*signal_type),
        }
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        match &self.phase {
            SignalPhase::Inactive => None,
            SignalPhase::ActiveHealthy { start_date, .. }
            | SignalPhase::ActiveWeakening { start_date, .. }
            | SignalPhase::RecentlyOff { start_date, .. } => Some(*start_date),
        }
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        match &self.phase {
            SignalPhase::RecentlyOff { end_date, .. } => Some(*end_date),
            _ => None,
        }
    }

    /// Whole days the signal has been (or was) active, counted up to
    /// `end_date` or, while still active, up to `today`.
    pub fn days_active(&self, today: NaiveDate) -> i64 {
        match &self.phase {
            SignalPhase::Inactive => 0,
            SignalPhase::ActiveHealthy { start_date, .. }
            | SignalPhase::ActiveWeakening { start_date, .. } => (today - *start_date).num_days(),
            SignalPhase::RecentlyOff {
                start_date,
                end_date,
                ..
            } => (*end_date - *start_date).num_days(),
        }
    }

    /// Advance the state machine by one analysis run.
    ///
    /// `last_updated` is set to `today` on every call.
    pub fn advance(self, condition: &SignalCondition, today: NaiveDate) -> SignalState {
        let met = condition.both_conditions_met;

        let phase = match self.phase {
            SignalPhase::Inactive | SignalPhase::RecentlyOff { .. } if met => {
                info!(signal = %condition.signal_type, date = %today, "🚨 Signal activated");
                SignalPhase::ActiveHealthy {
                    signal_type: condition.signal_type,
                    start_date: today,
                }
            }
            phase @ (SignalPhase::Inactive | SignalPhase::RecentlyOff { .. }) => phase,

            phase @ SignalPhase::ActiveHealthy { .. } if met => phase,
            SignalPhase::ActiveHealthy {
                signal_type,
                start_date,
            } => {
                info!(signal = %signal_type, since = %today, "⚠️ Signal weakening, conditions failing");
                SignalPhase::ActiveWeakening {
                    signal_type,
                    start_date,
                    failing_since: today,
                }
            }

            SignalPhase::ActiveWeakening {
                signal_type,
                start_date,
                ..
            } if met => {
                info!(signal = %signal_type, "✅ Signal conditions restored");
                SignalPhase::ActiveHealthy {
                    signal_type,
                    start_date,
                }
            }
            SignalPhase::ActiveWeakening {
                signal_type,
                start_date,
                failing_since,
            } => {
                let days_failing = (today - failing_since).num_days();
                if days_failing > WEAKENING_GRACE_DAYS {
                    info!(
                        signal = %signal_type,
                        days_failing,
                        "🔴 Signal deactivated after prolonged failing conditions"
                    );
                    SignalPhase::RecentlyOff {
                        signal_type,
                        start_date,
                        end_date: today,
                    }
                } else {
                    SignalPhase::ActiveWeakening {
                        signal_type,
                        start_date,
                        failing_since,
                    }
                }
            }
        };

        SignalState {
            phase,
            last_updated: Some(today),
        }
    }

    /// Interpret a persisted flat record.
    ///
    /// Records whose fields contradict each other or hold unparseable dates
    /// are rejected; the caller decides what to fall back to.
    pub fn from_record(record: &SignalStateRecord) -> Result<Self> {
        let last_updated = parse_date(&record.last_updated).ok().flatten();
        let start_date = parse_date(&record.start_date)?;
        let end_date = parse_date(&record.end_date)?;
        let failing_since = parse_date(&record.conditions_failing_since)?;

        let phase = if record.active {
            let signal_type = parse_signal_type(&record.signal_type)?;
            let start_date = start_date.ok_or_else(|| {
                Error::InvalidInput("active signal record has no start_date".into())
            })?;
            match failing_since {
                None => SignalPhase::ActiveHealthy {
                    signal_type,
                    start_date,
                },
                Some(failing_since) => SignalPhase::ActiveWeakening {
                    signal_type,
                    start_date,
                    failing_since,
                },
            }
        } else {
            match (start_date, end_date) {
                (Some(start_date), Some(end_date)) => SignalPhase::RecentlyOff {
                    signal_type: parse_signal_type(&record.signal_type)?,
                    start_date,
                    end_date,
                },
                (None, Some(_)) => {
                    return Err(Error::InvalidInput(
                        "inactive signal record has end_date without start_date".into(),
                    ))
                }
                // A start without an end only comes from a manual edit; there is
                // nothing to display for it.
                (_, None) => SignalPhase::Inactive,
            }
        };

        Ok(SignalState {
            phase,
            last_updated,
        })
    }

    /// Flat record for the storage boundary, with `days_active` derived
    /// against `today`.
    pub fn to_record(&self, today: NaiveDate) -> SignalStateRecord {
        let failing_since = match &self.phase {
            SignalPhase::ActiveWeakening { failing_since, .. } => Some(*failing_since),
            _ => None,
        };

        SignalStateRecord {
            active: self.is_active(),
            signal_type: self
                .signal_type()
                .map(|t| t.to_string())
                .unwrap_or_default(),
            start_date: format_date(self.start_date()),
            end_date: format_date(self.end_date()),
            conditions_failing_since: format_date(failing_since),
            last_updated: format_date(self.last_updated),
            days_active: self.days_active(today),
        }
    }
}

fn parse_date(s: &str) -> Result<Option<NaiveDate>> {
    if s.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("bad date '{s}': {e}")))
}

fn parse_signal_type(s: &str) -> Result<SignalType> {
    SignalType::parse(s).ok_or_else(|| Error::InvalidInput(format!("unknown signal type '{s}'")))
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}
