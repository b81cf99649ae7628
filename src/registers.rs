//! Known RAM variable and setting IDs on the Multi/Quattro.
//!
//! Everything here comes from VEConfigure captures against a MultiPlus
//! 48/3000; other models may assign the IDs differently. IDs not listed are
//! simply ones nobody has identified yet, which is what the sweep tools are
//! for.

use strum_macros::EnumIter;

/// Settings identified so far.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter)]
#[repr(u8)]
pub enum Setting {
    /// Charger behaviour flags, including adaptive charge mode.
    ChargeFlags = 0,
    /// Absorption voltage setpoint.
    ///
    /// Value is u16 in units of 0.01 V. E.g. 56.0 V => `5600`.
    UBatAbsorption = 2,
    /// Float voltage setpoint.
    ///
    /// Value is u16 in units of 0.01 V. E.g. 54.0 V => `5400`.
    UBatFloat = 3,
    /// Absorption time / charge parameter.
    AbsorptionTime = 9,
    /// Charge characteristic selector.
    ChargeCharacteristic = 10,
}

impl From<Setting> for u8 {
    fn from(value: Setting) -> Self {
        value as u8
    }
}

/// RAM variable IDs VEConfigure polls continuously while connected.
///
/// What each one measures has not been pinned down; the multi-read sweep
/// (`ram_sweep -n 5`) is the tool for narrowing that down.
pub const POLLED_RAM_VARS: [u8; 12] = [0, 1, 2, 4, 5, 6, 7, 8, 9, 11, 12, 13];

/// Human name for a setting ID, when one is known.
pub fn setting_name(id: u8) -> Option<&'static str> {
    match id {
        0 => Some("Flags/AdaptiveCharge"),
        2 => Some("UBatAbsorption"),
        3 => Some("UBatFloat"),
        9 => Some("AbsorpTime/ChargeParam"),
        10 => Some("ChargeCharacteristic"),
        60 => Some("Unknown60"),
        65 => Some("Unknown65"),
        72 => Some("Unknown72"),
        _ => None,
    }
}

/// Human name for a RAM variable ID, when one is known.
pub fn ram_var_name(id: u8) -> Option<&'static str> {
    match id {
        0 => Some("Unknown0 (polled)"),
        1 => Some("Unknown1 (polled)"),
        2 => Some("Unknown2 (polled)"),
        4 => Some("Unknown4 (polled)"),
        5 => Some("Unknown5 (polled)"),
        6 => Some("Unknown6 (polled)"),
        7 => Some("Unknown7 (polled)"),
        8 => Some("Unknown8 (polled)"),
        9 => Some("Unknown9 (polled)"),
        11 => Some("Unknown11 (polled)"),
        12 => Some("Unknown12 (polled)"),
        13 => Some("Unknown13 (polled)"),
        _ => None,
    }
}
