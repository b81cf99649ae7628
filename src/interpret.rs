//! Best-effort guesses at what a raw 16-bit value measures.
//!
//! Nothing here touches the protocol. It is a stateless annotator for sweep
//! reports: given a raw value it offers zero or more plausible readings based
//! on the ranges Victron firmware tends to use. Rendering and joining the
//! candidates is the reporting layer's job.

use core::fmt;

/// Physical quantity a raw value plausibly encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    /// 48 V-class battery bus voltage, raw in 0.01 V.
    BatteryVoltage,
    /// DC current, raw in 0.1 A. Negative while discharging.
    Current,
    /// Plain percentage.
    Percentage,
    /// Temperature encoded as Kelvin x 100.
    Temperature,
    /// AC line frequency, raw in 0.01 Hz.
    AcFrequency,
    /// AC line voltage; both 0.1 V and 0.01 V scales occur in the wild.
    AcVoltage,
    /// Unscaled wattage; the fallback when nothing else fits.
    Power,
}

/// One candidate reading of a raw value, scaled into display units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpretation {
    pub quantity: Quantity,
    pub scaled: f32,
}

impl Interpretation {
    fn new(quantity: Quantity, scaled: f32) -> Self {
        Self { quantity, scaled }
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quantity {
            Quantity::BatteryVoltage => write!(f, "{:.2}V?", self.scaled),
            Quantity::Current => write!(f, "{:.1}A?", self.scaled),
            Quantity::Percentage => write!(f, "{:.0}%?", self.scaled),
            Quantity::Temperature => write!(f, "{:.1}°C?", self.scaled),
            Quantity::AcFrequency => write!(f, "{:.2}Hz?", self.scaled),
            Quantity::AcVoltage => write!(f, "{:.1}Vac?", self.scaled),
            Quantity::Power => write!(f, "{:.0}W?", self.scaled),
        }
    }
}

/// Offer unit guesses for a raw value.
///
/// The ranges overlap on purpose; a battery voltage reading will usually
/// also land in the AC frequency window, and only a human (or a changing
/// multi-read sweep) can tell them apart.
pub fn guess(value: u16) -> Vec<Interpretation> {
    let signed = value as i16;
    let mut guesses = Vec::new();

    // 48 V battery bus: 40.00 V - 65.00 V at value/100.
    if (4000..=6500).contains(&value) {
        guesses.push(Interpretation::new(
            Quantity::BatteryVoltage,
            f32::from(value) / 100.0,
        ));
    }

    // Current in 0.1 A steps; tiny values 1-5 are more likely enum states.
    if value > 0 && value <= 5000 && !(1..=5).contains(&value) {
        guesses.push(Interpretation::new(
            Quantity::Current,
            f32::from(value) / 10.0,
        ));
    }

    // Signed current: charging positive, discharging negative.
    if (-5000..0).contains(&signed) {
        guesses.push(Interpretation::new(
            Quantity::Current,
            f32::from(signed) / 10.0,
        ));
    }

    if value <= 100 {
        guesses.push(Interpretation::new(Quantity::Percentage, f32::from(value)));
    }

    // Kelvin x 100, i.e. roughly -3 °C to 47 °C.
    if (27000..=32000).contains(&value) {
        guesses.push(Interpretation::new(
            Quantity::Temperature,
            f32::from(value) / 100.0 - 273.15,
        ));
    }

    // 49.00 Hz - 61.00 Hz.
    if (4900..=6100).contains(&value) {
        guesses.push(Interpretation::new(
            Quantity::AcFrequency,
            f32::from(value) / 100.0,
        ));
    }

    // Mains voltage at either scale: 210.0-250.0 V.
    if (2100..=2500).contains(&value) {
        guesses.push(Interpretation::new(
            Quantity::AcVoltage,
            f32::from(value) / 10.0,
        ));
    }
    if (21000..=25000).contains(&value) {
        guesses.push(Interpretation::new(
            Quantity::AcVoltage,
            f32::from(value) / 100.0,
        ));
    }

    if value > 100 && guesses.is_empty() {
        guesses.push(Interpretation::new(Quantity::Power, f32::from(value)));
    }

    guesses
}
