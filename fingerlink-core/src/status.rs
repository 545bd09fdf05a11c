//! Confirmation codes returned by the module at offset 9 of a reply

use std::fmt;

/// Device status codes
///
/// All confirmation codes from the R30x user manual. Codes the manual does
/// not define are kept as [`Status::Unknown`] so the raw byte is never lost.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    /// Command execution complete
    Ok,
    /// Error when receiving the data package
    CommunicationError,
    /// No finger on the sensor
    NoFinger,
    /// Failed to enroll the finger
    ImageCaptureError,
    /// Image too dry or too pale
    TooDry,
    /// Image too wet or too smeared
    TooWet,
    /// Image too disorderly to generate a character file
    DisorderlyPrint,
    /// Too few character points or image too small
    InsufficientFeatures,
    /// Finger does not match
    NoMatch,
    /// Searched the library without finding a match
    NotFound,
    /// Character files do not belong to one finger
    MergeError,
    /// Page id is beyond the finger library
    AddressOutOfRange,
    /// Error reading the template, or the template is invalid
    ReadError,
    /// Error when uploading a template
    UploadTemplateError,
    /// Module cannot receive the following data packages
    ReceiveError,
    /// Error when uploading an image
    UploadImageError,
    /// Failed to delete the template
    DeleteError,
    /// Failed to clear the finger library
    ClearError,
    /// Wrong password
    InvalidPassword,
    /// No valid primary image to generate from
    InvalidImage,
    /// Error when writing flash
    FlashWriteError,
    /// Wrong register number
    WrongRegisterNumber,
    /// Failed to operate the communication port
    PortOpenFailed,
    /// Code not listed in the manual
    Unknown(u8),
}

impl Status {
    /// Raw confirmation code
    pub fn code(self) -> u8 {
        match self {
            Self::Ok => 0x00,
            Self::CommunicationError => 0x01,
            Self::NoFinger => 0x02,
            Self::ImageCaptureError => 0x03,
            Self::TooDry => 0x04,
            Self::TooWet => 0x05,
            Self::DisorderlyPrint => 0x06,
            Self::InsufficientFeatures => 0x07,
            Self::NoMatch => 0x08,
            Self::NotFound => 0x09,
            Self::MergeError => 0x0A,
            Self::AddressOutOfRange => 0x0B,
            Self::ReadError => 0x0C,
            Self::UploadTemplateError => 0x0D,
            Self::ReceiveError => 0x0E,
            Self::UploadImageError => 0x0F,
            Self::DeleteError => 0x10,
            Self::ClearError => 0x11,
            Self::InvalidPassword => 0x13,
            Self::InvalidImage => 0x15,
            Self::FlashWriteError => 0x18,
            Self::WrongRegisterNumber => 0x1A,
            Self::PortOpenFailed => 0x1D,
            Self::Unknown(code) => code,
        }
    }

    /// Check if this is the success code
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Check if this is an image-quality outcome of a capture, worth asking
    /// the user to place the finger again
    pub fn is_capture_quality(self) -> bool {
        matches!(
            self,
            Self::NoFinger
                | Self::ImageCaptureError
                | Self::TooDry
                | Self::TooWet
                | Self::DisorderlyPrint
                | Self::InsufficientFeatures
                | Self::InvalidImage
        )
    }

    /// Short label for logs and diagnostics
    pub fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::CommunicationError => "communication error",
            Self::NoFinger => "no finger",
            Self::ImageCaptureError => "image capture error",
            Self::TooDry => "too dry",
            Self::TooWet => "too wet",
            Self::DisorderlyPrint => "disorderly print",
            Self::InsufficientFeatures => "insufficient features",
            Self::NoMatch => "no match",
            Self::NotFound => "no match",
            Self::MergeError => "merge error",
            Self::AddressOutOfRange => "address out of range",
            Self::ReadError => "read error",
            Self::UploadTemplateError => "upload error",
            Self::ReceiveError => "receive error",
            Self::UploadImageError => "upload error",
            Self::DeleteError => "delete error",
            Self::ClearError => "clear error",
            Self::InvalidPassword => "invalid password",
            Self::InvalidImage => "invalid image",
            Self::FlashWriteError => "flash write error",
            Self::WrongRegisterNumber => "wrong register number",
            Self::PortOpenFailed => "port open failed",
            Self::Unknown(_) => "unknown status",
        }
    }
}

impl From<u8> for Status {
    fn from(code: u8) -> Self {
        match code {
            0x00 => Self::Ok,
            0x01 => Self::CommunicationError,
            0x02 => Self::NoFinger,
            0x03 => Self::ImageCaptureError,
            0x04 => Self::TooDry,
            0x05 => Self::TooWet,
            0x06 => Self::DisorderlyPrint,
            0x07 => Self::InsufficientFeatures,
            0x08 => Self::NoMatch,
            0x09 => Self::NotFound,
            0x0A => Self::MergeError,
            0x0B => Self::AddressOutOfRange,
            0x0C => Self::ReadError,
            0x0D => Self::UploadTemplateError,
            0x0E => Self::ReceiveError,
            0x0F => Self::UploadImageError,
            0x10 => Self::DeleteError,
            0x11 => Self::ClearError,
            0x13 => Self::InvalidPassword,
            0x15 => Self::InvalidImage,
            0x18 => Self::FlashWriteError,
            0x1A => Self::WrongRegisterNumber,
            0x1D => Self::PortOpenFailed,
            other => Self::Unknown(other),
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> u8 {
        status.code()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.label(), self.code())
    }
}
