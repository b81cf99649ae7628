//! Exhaustive discovery of the variable and setting IDs a device implements.
//!
//! One driver handles both halves of the ID space; the RAM-variable and
//! setting sweeps differ only in which read command they issue, which name
//! table they consult, and whether metadata is fetched afterwards.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::thread;
use std::time::Duration;

use log::info;

use crate::command::Command;
use crate::error::Error;
use crate::multi::Multi;
use crate::registers;

/// Protocol-level marker meaning "ID not implemented by this device".
pub const UNSUPPORTED_SENTINEL: u16 = 0xFFFF;

/// Which half of the ID space a sweep walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepKind {
    /// Live/runtime telemetry values, via `ReadRamVar`.
    RamVars,
    /// Persisted configuration values, via `ReadSetting`; supported IDs also
    /// get a `GetSettingInfo` metadata fetch.
    Settings,
}

impl SweepKind {
    fn read_command(self, id: u8) -> Command {
        match self {
            SweepKind::RamVars => Command::ReadRamVar { var_id: id },
            SweepKind::Settings => Command::ReadSetting { setting_id: id },
        }
    }

    fn name(self, id: u8) -> Option<&'static str> {
        match self {
            SweepKind::RamVars => registers::ram_var_name(id),
            SweepKind::Settings => registers::setting_name(id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// IDs to visit, in ascending order.
    pub ids: RangeInclusive<u8>,
    /// Reads per ID. More than one catches live-changing telemetry.
    pub reads_per_id: usize,
    /// Delay between repeated reads of the same ID.
    pub read_spacing: Duration,
    /// Fetch `GetSettingInfo` for supported setting IDs. Ignored for RAM
    /// variable sweeps, which have no metadata command.
    pub fetch_info: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            ids: 0..=255,
            reads_per_id: 1,
            read_spacing: Duration::from_millis(200),
            fetch_info: true,
        }
    }
}

/// Outcome of sweeping one ID. Built once, never revised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// At least one read returned something other than the sentinel.
    Supported {
        /// Every successful read in order. Transient `0xFFFF` readings are
        /// kept so callers can see the variance.
        values: Vec<u16>,
        /// Reverse-engineered name, when the ID is a known one.
        name: Option<&'static str>,
        /// Raw `GetSettingInfo` payload. The layout is unresolved upstream,
        /// so it stays an opaque byte blob.
        info: Option<Vec<u8>>,
    },
    /// Every successful read was `0xFFFF`: the device answers, but does not
    /// implement this ID.
    Unsupported,
    /// No read produced a matching response frame.
    NoResponse,
}

/// Result of a full sweep, keyed by ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub outcomes: BTreeMap<u8, SweepOutcome>,
}

impl SweepReport {
    pub fn supported_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, SweepOutcome::Supported { .. }))
            .count()
    }

    pub fn unsupported_ids(&self) -> Vec<u8> {
        self.ids_where(|o| matches!(o, SweepOutcome::Unsupported))
    }

    pub fn no_response_ids(&self) -> Vec<u8> {
        self.ids_where(|o| matches!(o, SweepOutcome::NoResponse))
    }

    fn ids_where(&self, pred: impl Fn(&SweepOutcome) -> bool) -> Vec<u8> {
        self.outcomes
            .iter()
            .filter(|(_, o)| pred(o))
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Classify the successful reads for one ID.
///
/// Empty means the device never answered; all-sentinel means it answered
/// "not implemented" every time; anything else is a live ID. An ID that only
/// *sometimes* reads as the sentinel stays supported, with the outliers kept
/// in the value list.
fn classify(values: Vec<u16>) -> SweepOutcome {
    if values.is_empty() {
        SweepOutcome::NoResponse
    } else if values.iter().all(|v| *v == UNSUPPORTED_SENTINEL) {
        SweepOutcome::Unsupported
    } else {
        SweepOutcome::Supported {
            values,
            name: None,
            info: None,
        }
    }
}

/// Walk the configured ID range in ascending order and classify every ID.
///
/// A single unresponsive ID never aborts the sweep; only a hard transport
/// fault does. Metadata fetch failures are recorded as a missing `info`, not
/// as errors.
pub fn sweep<S, const L: usize>(
    multi: &mut Multi<S, L>,
    kind: SweepKind,
    options: &SweepOptions,
) -> crate::error::Result<SweepReport, S::Error>
where
    S: embedded_io::Read + embedded_io::Write,
{
    let mut report = SweepReport::default();

    for id in options.ids.clone() {
        let mut values = Vec::with_capacity(options.reads_per_id);
        for n in 0..options.reads_per_id {
            if n > 0 {
                thread::sleep(options.read_spacing);
            }
            match multi.execute(&kind.read_command(id)) {
                Ok(value) => values.push(value),
                Err(Error::NoResponse) => {}
                Err(e) => return Err(e),
            }
        }

        let mut outcome = classify(values);
        if let SweepOutcome::Supported { name, info, .. } = &mut outcome {
            *name = kind.name(id);
            if kind == SweepKind::Settings && options.fetch_info {
                *info = match multi.setting_info(id) {
                    Ok(raw) => Some(raw),
                    Err(Error::NoResponse) => None,
                    Err(e) => return Err(e),
                };
            }
        }
        report.outcomes.insert(id, outcome);

        if id % 32 == 31 {
            info!(
                "scanned through ID {id}, {} supported so far",
                report.supported_count()
            );
        }
    }

    Ok(report)
}
