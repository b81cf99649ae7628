//! The Winmon commands a Multi/Quattro understands, and their wire encoding.

use modular_bitfield::prelude::*;

use crate::frame;

/// CommandReadRamVar.
pub const SUBCMD_READ_RAM_VAR: u8 = 0x30;
/// CommandReadSetting.
pub const SUBCMD_READ_SETTING: u8 = 0x31;
/// CommandWriteViaID.
pub const SUBCMD_WRITE_VIA_ID: u8 = 0x37;
/// CommandGetSettingInfo.
pub const SUBCMD_GET_SETTING_INFO: u8 = 0x3C;

/// Reply subcmd for [`SUBCMD_READ_RAM_VAR`].
pub const REPLY_RAM_VAR: u8 = 0x85;
/// Reply subcmd for [`SUBCMD_READ_SETTING`].
pub const REPLY_SETTING: u8 = 0x86;
/// Reply subcmd for [`SUBCMD_GET_SETTING_INFO`].
pub const REPLY_SETTING_INFO: u8 = 0x89;

/// Addressing frame sent once per session before any other command.
///
/// Selects the default device address; its checksum is fixed because every
/// byte is. The device's reply, if any, is discarded.
pub const SET_ADDRESS_FRAME: [u8; 6] = [0x04, 0xFF, 0x41, 0x01, 0x00, 0xBB];

/// Flags byte of a write command, selecting which copies of the setting the
/// device updates.
///
/// VEConfigure captures show `0x01` for a change that survives power cycles
/// (EEPROM as well as the live RAM copy). An all-zero flags byte touches only
/// the live copy. No other bit has been observed set.
#[bitfield]
#[derive(Debug, Clone, Copy)]
pub struct WriteTarget {
    /// Commit to EEPROM as well as the live RAM copy.
    pub persist: bool,
    #[skip]
    __: B7,
}

/// One logical Winmon command.
///
/// IDs are `u8`, so the whole addressable space is 0-255 for both RAM
/// variables and settings.
#[derive(Debug, Clone, Copy)]
pub enum Command {
    /// Read a live/runtime telemetry value.
    ReadRamVar { var_id: u8 },
    /// Read a persisted configuration value.
    ReadSetting { setting_id: u8 },
    /// Fetch setting metadata. The reply payload layout is unresolved and is
    /// passed through opaquely.
    GetSettingInfo { setting_id: u8 },
    /// Write a setting by ID.
    WriteSetting {
        setting_id: u8,
        target: WriteTarget,
        value: u16,
    },
}

impl Command {
    /// Sub-command byte this command is sent with.
    pub fn subcmd(&self) -> u8 {
        match self {
            Command::ReadRamVar { .. } => SUBCMD_READ_RAM_VAR,
            Command::ReadSetting { .. } => SUBCMD_READ_SETTING,
            Command::GetSettingInfo { .. } => SUBCMD_GET_SETTING_INFO,
            Command::WriteSetting { .. } => SUBCMD_WRITE_VIA_ID,
        }
    }

    /// Sub-command byte expected on the reply, or `None` when any framed
    /// reply counts (writes).
    pub fn reply_subcmd(&self) -> Option<u8> {
        match self {
            Command::ReadRamVar { .. } => Some(REPLY_RAM_VAR),
            Command::ReadSetting { .. } => Some(REPLY_SETTING),
            Command::GetSettingInfo { .. } => Some(REPLY_SETTING_INFO),
            Command::WriteSetting { .. } => None,
        }
    }

    /// Encode the complete request frame for this command.
    pub fn request(&self, slot: u8) -> Vec<u8> {
        match self {
            Command::ReadRamVar { var_id } => frame::encode_frame(slot, self.subcmd(), &[*var_id]),
            Command::ReadSetting { setting_id } | Command::GetSettingInfo { setting_id } => {
                frame::encode_frame(slot, self.subcmd(), &[*setting_id])
            }
            Command::WriteSetting {
                setting_id,
                target,
                value,
            } => {
                let [lo, hi] = value.to_le_bytes();
                frame::encode_frame(
                    slot,
                    self.subcmd(),
                    &[target.into_bytes()[0], *setting_id, lo, hi],
                )
            }
        }
    }
}
