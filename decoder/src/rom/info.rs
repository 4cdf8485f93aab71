use serde::Serialize;

use crate::error::Result;
use crate::rom::RomImage;

const GAME_TITLE_OFFSET: usize = 0xA0;
const GAME_TITLE_LEN: usize = 12;
const GAME_CODE_LEN: usize = 4;
const MAKER_CODE_LEN: usize = 2;
const SOFTWARE_VERSION_OFFSET: usize = 0xBC;

/// Identification fields of the cartridge header.
///
/// Only read for display: the logo, fixed value and complement check are not
/// verified.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RomInfo {
    pub game_title: String,
    pub game_code: String,
    pub maker_code: String,
    pub software_version: u8,
}

impl RomInfo {
    pub fn read(rom: &RomImage) -> Result<Self> {
        let mut cursor = rom.cursor();
        cursor.seek(GAME_TITLE_OFFSET)?;
        let game_title = cursor.read_ascii(GAME_TITLE_LEN)?;
        let game_code = cursor.read_ascii(GAME_CODE_LEN)?;
        let maker_code = cursor.read_ascii(MAKER_CODE_LEN)?;
        cursor.seek(SOFTWARE_VERSION_OFFSET)?;
        let software_version = cursor.read_u8()?;

        Ok(Self {
            game_title,
            game_code,
            maker_code,
            software_version,
        })
    }

    /// Publisher name for the 2-character maker code.
    #[must_use]
    pub fn maker_name(&self) -> &'static str {
        match self.maker_code.as_str() {
            "01" => "Nintendo",
            "08" => "Capcom",
            "13" | "69" => "Electronic Arts",
            "18" => "Hudson Soft",
            "41" => "Ubisoft",
            "52" => "Activision",
            "78" => "THQ",
            "8P" => "Sega",
            "A4" | "EM" => "Konami",
            "AF" => "Namco",
            "B2" => "Bandai",
            _ => "Unknown",
        }
    }
}
