//! Instruction codes and request encoding

use std::fmt;

use tracing::trace;

use crate::{
    constants::{packet_id, NOTEPAD_PAGES, NOTEPAD_PAGE_SIZE},
    error::{Error, Result},
    frame::Frame,
};

/// Instruction codes
///
/// Every instruction the driver issues, from the R30x user manual.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Instruction {
    // Fingerprint processing
    GenerateImage = 0x01,
    ImageToCharacter = 0x02,
    Match = 0x03,
    Search = 0x04,
    RegisterModel = 0x05,

    // Library
    Store = 0x06,
    LoadCharacter = 0x07,
    UploadCharacter = 0x08,
    DownloadCharacter = 0x09,
    UploadImage = 0x0A,
    DownloadImage = 0x0B,
    DeleteCharacter = 0x0C,
    Empty = 0x0D,

    // System
    SetSystemParameter = 0x0E,
    ReadSystemParameters = 0x0F,
    SetPassword = 0x12,
    VerifyPassword = 0x13,
    GetRandomCode = 0x14,
    SetAddress = 0x15,
    Reset = 0x16,
    PortControl = 0x17,
    WriteNotepad = 0x18,
    ReadNotepad = 0x19,
    HighSpeedSearch = 0x1B,
    TemplateCount = 0x1D,
}

impl Instruction {
    /// Size of the complete command frame for this instruction
    ///
    /// Commands carry no variable section, so every frame size is fixed.
    pub fn frame_len(self) -> usize {
        match self {
            Self::GenerateImage
            | Self::Match
            | Self::RegisterModel
            | Self::UploadImage
            | Self::DownloadImage
            | Self::Empty
            | Self::ReadSystemParameters
            | Self::GetRandomCode
            | Self::Reset
            | Self::TemplateCount => 12,
            Self::ImageToCharacter
            | Self::UploadCharacter
            | Self::DownloadCharacter
            | Self::PortControl
            | Self::ReadNotepad => 13,
            Self::SetSystemParameter => 14,
            Self::Store | Self::LoadCharacter => 15,
            Self::DeleteCharacter
            | Self::SetPassword
            | Self::VerifyPassword
            | Self::SetAddress => 16,
            Self::Search | Self::HighSpeedSearch => 17,
            Self::WriteNotepad => 12 + 1 + NOTEPAD_PAGE_SIZE,
        }
    }

    /// Get instruction name
    pub fn name(self) -> &'static str {
        match self {
            Self::GenerateImage => "GenImg",
            Self::ImageToCharacter => "Img2Tz",
            Self::Match => "Match",
            Self::Search => "Search",
            Self::RegisterModel => "RegModel",
            Self::Store => "Store",
            Self::LoadCharacter => "LoadChar",
            Self::UploadCharacter => "UpChar",
            Self::DownloadCharacter => "DownChar",
            Self::UploadImage => "UpImage",
            Self::DownloadImage => "DownImage",
            Self::DeleteCharacter => "DeletChar",
            Self::Empty => "Empty",
            Self::SetSystemParameter => "SetSysPara",
            Self::ReadSystemParameters => "ReadSysPara",
            Self::SetPassword => "SetPwd",
            Self::VerifyPassword => "VfyPwd",
            Self::GetRandomCode => "GetRandomCode",
            Self::SetAddress => "SetAdder",
            Self::Reset => "Reset",
            Self::PortControl => "Control",
            Self::WriteNotepad => "WriteNotepad",
            Self::ReadNotepad => "ReadNotepad",
            Self::HighSpeedSearch => "HighSpeedSearch",
            Self::TemplateCount => "TempleteNum",
        }
    }
}

impl From<Instruction> for u8 {
    fn from(instruction: Instruction) -> u8 {
        instruction as u8
    }
}

impl TryFrom<u8> for Instruction {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::GenerateImage),
            0x02 => Ok(Self::ImageToCharacter),
            0x03 => Ok(Self::Match),
            0x04 => Ok(Self::Search),
            0x05 => Ok(Self::RegisterModel),
            0x06 => Ok(Self::Store),
            0x07 => Ok(Self::LoadCharacter),
            0x08 => Ok(Self::UploadCharacter),
            0x09 => Ok(Self::DownloadCharacter),
            0x0A => Ok(Self::UploadImage),
            0x0B => Ok(Self::DownloadImage),
            0x0C => Ok(Self::DeleteCharacter),
            0x0D => Ok(Self::Empty),
            0x0E => Ok(Self::SetSystemParameter),
            0x0F => Ok(Self::ReadSystemParameters),
            0x12 => Ok(Self::SetPassword),
            0x13 => Ok(Self::VerifyPassword),
            0x14 => Ok(Self::GetRandomCode),
            0x15 => Ok(Self::SetAddress),
            0x16 => Ok(Self::Reset),
            0x17 => Ok(Self::PortControl),
            0x18 => Ok(Self::WriteNotepad),
            0x19 => Ok(Self::ReadNotepad),
            0x1B => Ok(Self::HighSpeedSearch),
            0x1D => Ok(Self::TemplateCount),
            _ => Err(Error::InvalidArgument(format!(
                "unknown instruction code 0x{:02X}",
                value
            ))),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

/// Character buffer on the module
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BufferId {
    /// CharBuffer1
    One = 0x01,
    /// CharBuffer2
    Two = 0x02,
}

impl From<BufferId> for u8 {
    fn from(buffer: BufferId) -> u8 {
        buffer as u8
    }
}

impl TryFrom<u8> for BufferId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::One),
            0x02 => Ok(Self::Two),
            _ => Err(Error::InvalidArgument(format!(
                "character buffer must be 1 or 2, got {}",
                value
            ))),
        }
    }
}

/// One request per instruction, with its operands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    VerifyPassword { password: [u8; 4] },
    SetPassword { password: [u8; 4] },
    SetAddress { address: [u8; 4] },
    SetSystemParameter { number: u8, content: u8 },
    PortControl { code: u8 },
    ReadSystemParameters,
    TemplateCount,
    GenerateImage,
    UploadImage,
    DownloadImage,
    ImageToCharacter { buffer: BufferId },
    RegisterModel,
    UploadCharacter { buffer: BufferId },
    DownloadCharacter { buffer: BufferId },
    Store { buffer: BufferId, page: u16 },
    LoadCharacter { buffer: BufferId, page: u16 },
    Delete { start: u16, count: u16 },
    Empty,
    Reset,
    Match,
    Search { buffer: BufferId, start: u16, count: u16 },
    HighSpeedSearch { buffer: BufferId, start: u16, count: u16 },
    GetRandomCode,
    WriteNotepad { page: u8, content: [u8; NOTEPAD_PAGE_SIZE] },
    ReadNotepad { page: u8 },
}

impl Request {
    /// Instruction code this request is sent with
    pub fn instruction(&self) -> Instruction {
        match self {
            Self::VerifyPassword { .. } => Instruction::VerifyPassword,
            Self::SetPassword { .. } => Instruction::SetPassword,
            Self::SetAddress { .. } => Instruction::SetAddress,
            Self::SetSystemParameter { .. } => Instruction::SetSystemParameter,
            Self::PortControl { .. } => Instruction::PortControl,
            Self::ReadSystemParameters => Instruction::ReadSystemParameters,
            Self::TemplateCount => Instruction::TemplateCount,
            Self::GenerateImage => Instruction::GenerateImage,
            Self::UploadImage => Instruction::UploadImage,
            Self::DownloadImage => Instruction::DownloadImage,
            Self::ImageToCharacter { .. } => Instruction::ImageToCharacter,
            Self::RegisterModel => Instruction::RegisterModel,
            Self::UploadCharacter { .. } => Instruction::UploadCharacter,
            Self::DownloadCharacter { .. } => Instruction::DownloadCharacter,
            Self::Store { .. } => Instruction::Store,
            Self::LoadCharacter { .. } => Instruction::LoadCharacter,
            Self::Delete { .. } => Instruction::DeleteCharacter,
            Self::Empty => Instruction::Empty,
            Self::Reset => Instruction::Reset,
            Self::Match => Instruction::Match,
            Self::Search { .. } => Instruction::Search,
            Self::HighSpeedSearch { .. } => Instruction::HighSpeedSearch,
            Self::GetRandomCode => Instruction::GetRandomCode,
            Self::WriteNotepad { .. } => Instruction::WriteNotepad,
            Self::ReadNotepad { .. } => Instruction::ReadNotepad,
        }
    }

    /// Encode the command frame for this request
    ///
    /// # Errors
    ///
    /// Returns an error if a notepad page is out of range. A
    /// [`Error::BufferOverrun`] here means the operands do not match the
    /// instruction's fixed frame size.
    ///
    /// # Examples
    ///
    /// ```
    /// use fingerlink_core::{Request, constants::DEFAULT_ADDRESS};
    ///
    /// let frame = Request::TemplateCount.encode(DEFAULT_ADDRESS).unwrap();
    /// assert_eq!(
    ///     frame.as_bytes(),
    ///     &[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x03, 0x1D, 0x00, 0x21]
    /// );
    /// ```
    pub fn encode(&self, address: [u8; 4]) -> Result<Frame> {
        let instruction = self.instruction();
        let capacity = instruction.frame_len();
        let length = (capacity - Frame::HEADER_LEN) as u16;

        let mut frame = Frame::build(address, capacity)?;
        frame.write_byte(packet_id::COMMAND)?;
        frame.write_u16(length)?;
        frame.write_byte(instruction.into())?;
        self.write_operands(&mut frame)?;
        frame.finish()?;

        trace!(
            instruction = %instruction,
            bytes = %hex::encode_upper(frame.as_bytes()),
            "Encoded request"
        );

        Ok(frame)
    }

    fn write_operands(&self, frame: &mut Frame) -> Result<()> {
        match self {
            Self::VerifyPassword { password } | Self::SetPassword { password } => {
                frame.write_bytes(password)
            }
            Self::SetAddress { address } => frame.write_bytes(address),
            Self::SetSystemParameter { number, content } => {
                frame.write_byte(*number)?;
                frame.write_byte(*content)
            }
            Self::PortControl { code } => frame.write_byte(*code),
            Self::ImageToCharacter { buffer }
            | Self::UploadCharacter { buffer }
            | Self::DownloadCharacter { buffer } => frame.write_byte((*buffer).into()),
            Self::Store { buffer, page } | Self::LoadCharacter { buffer, page } => {
                frame.write_byte((*buffer).into())?;
                frame.write_u16(*page)
            }
            Self::Delete { start, count } => {
                frame.write_u16(*start)?;
                frame.write_u16(*count)
            }
            Self::Search { buffer, start, count }
            | Self::HighSpeedSearch { buffer, start, count } => {
                frame.write_byte((*buffer).into())?;
                frame.write_u16(*start)?;
                frame.write_u16(*count)
            }
            Self::WriteNotepad { page, content } => {
                frame.write_byte(check_notepad_page(*page)?)?;
                frame.write_bytes(content)
            }
            Self::ReadNotepad { page } => frame.write_byte(check_notepad_page(*page)?),
            Self::ReadSystemParameters
            | Self::TemplateCount
            | Self::GenerateImage
            | Self::UploadImage
            | Self::DownloadImage
            | Self::RegisterModel
            | Self::Empty
            | Self::Reset
            | Self::Match
            | Self::GetRandomCode => Ok(()),
        }
    }
}

fn check_notepad_page(page: u8) -> Result<u8> {
    if page >= NOTEPAD_PAGES {
        return Err(Error::InvalidArgument(format!(
            "notepad page must be below {}, got {}",
            NOTEPAD_PAGES, page
        )));
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_ADDRESS;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_instruction_conversion() {
        assert_eq!(u8::from(Instruction::VerifyPassword), 0x13);
        assert_eq!(Instruction::try_from(0x1D).unwrap(), Instruction::TemplateCount);
        assert!(Instruction::try_from(0xFE).is_err());
    }

    #[test]
    fn test_buffer_id_conversion() {
        assert_eq!(BufferId::try_from(2).unwrap(), BufferId::Two);
        assert!(BufferId::try_from(3).is_err());
    }

    #[test]
    fn test_encode_verify_password() {
        let frame = Request::VerifyPassword { password: [0, 0, 0, 0] }
            .encode(DEFAULT_ADDRESS)
            .unwrap();

        assert_eq!(
            frame.as_bytes(),
            &[
                0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x07, 0x13, 0x00, 0x00, 0x00,
                0x00, 0x00, 0x1B
            ]
        );
    }

    #[test]
    fn test_encode_store() {
        let frame = Request::Store { buffer: BufferId::One, page: 0x000A }
            .encode(DEFAULT_ADDRESS)
            .unwrap();

        // 01 + 00 06 + 06 + 01 + 00 0A = 0x18
        assert_eq!(
            &frame.as_bytes()[6..],
            &[0x01, 0x00, 0x06, 0x06, 0x01, 0x00, 0x0A, 0x00, 0x18]
        );
    }

    #[test]
    fn test_encode_search() {
        let frame = Request::Search { buffer: BufferId::One, start: 0, count: 0x00A3 }
            .encode([0x00, 0x00, 0x00, 0x01])
            .unwrap();

        assert_eq!(frame.len(), 17);
        assert_eq!(&frame.as_bytes()[2..6], &[0x00, 0x00, 0x00, 0x01]);
        assert_eq!(
            &frame.as_bytes()[6..],
            &[0x01, 0x00, 0x08, 0x04, 0x01, 0x00, 0x00, 0x00, 0xA3, 0x00, 0xB1]
        );
    }

    #[test]
    fn test_encode_delete_counts_are_two_bytes() {
        let frame = Request::Delete { start: 5, count: 1 }
            .encode(DEFAULT_ADDRESS)
            .unwrap();
        assert_eq!(&frame.as_bytes()[9..14], &[0x0C, 0x00, 0x05, 0x00, 0x01]);
    }

    #[test]
    fn test_every_request_fills_its_frame() {
        let requests = [
            Request::VerifyPassword { password: [1, 2, 3, 4] },
            Request::SetPassword { password: [1, 2, 3, 4] },
            Request::SetAddress { address: [1, 2, 3, 4] },
            Request::SetSystemParameter { number: 4, content: 6 },
            Request::PortControl { code: 1 },
            Request::ReadSystemParameters,
            Request::TemplateCount,
            Request::GenerateImage,
            Request::UploadImage,
            Request::DownloadImage,
            Request::ImageToCharacter { buffer: BufferId::Two },
            Request::RegisterModel,
            Request::UploadCharacter { buffer: BufferId::One },
            Request::DownloadCharacter { buffer: BufferId::One },
            Request::Store { buffer: BufferId::One, page: 1 },
            Request::LoadCharacter { buffer: BufferId::Two, page: 1 },
            Request::Delete { start: 1, count: 1 },
            Request::Empty,
            Request::Reset,
            Request::Match,
            Request::Search { buffer: BufferId::One, start: 0, count: 10 },
            Request::HighSpeedSearch { buffer: BufferId::One, start: 0, count: 10 },
            Request::GetRandomCode,
            Request::WriteNotepad { page: 15, content: [0xAB; NOTEPAD_PAGE_SIZE] },
            Request::ReadNotepad { page: 0 },
        ];

        for request in requests {
            let frame = request.encode(DEFAULT_ADDRESS).unwrap();
            assert_eq!(frame.len(), request.instruction().frame_len());
            assert_eq!(frame.status_byte().unwrap(), u8::from(request.instruction()));

            let bytes = frame.as_bytes();
            let (covered, trailer) = bytes[6..].split_at(bytes.len() - 8);
            let sum = covered.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte));
            assert_eq!(trailer, &[0x00, sum]);
        }
    }

    #[test]
    fn test_encode_keeps_checksum_high_byte_zero() {
        let frame = Request::SetAddress { address: [0xFF; 4] }
            .encode(DEFAULT_ADDRESS)
            .unwrap();

        // 01 + 00 07 + 15 + 4 * FF = 0x0419, only the low byte is sent
        assert_eq!(&frame.as_bytes()[14..], &[0x00, 0x19]);
    }

    #[test]
    fn test_notepad_page_out_of_range() {
        let result = Request::ReadNotepad { page: 16 }.encode(DEFAULT_ADDRESS);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
