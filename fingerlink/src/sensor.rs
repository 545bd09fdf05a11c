//! High-level sensor interface

use std::future::Future;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use fingerlink_core::{
    constants::{offsets, DEFAULT_ADDRESS, DEFAULT_DATA_CHUNK, DEFAULT_TIMEOUT, NOTEPAD_PAGE_SIZE},
    frame, BufferId, Frame, Instruction, Request, Session, Status,
};
use fingerlink_transport::Transport;
use fingerlink_types::{BasicParameters, MatchResult, SearchResult};

use crate::error::{Error, InsertPhase, Result};

/// How replies are checked before their fields are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyPolicy {
    /// Check the start code, declared length and checksum of every reply
    #[default]
    Verify,
    /// Read fields at their offsets without checking the frame
    Trust,
}

/// R30x-family fingerprint module
///
/// Every operation encodes one request, exchanges it over the transport and
/// maps the status byte of the reply to a typed result. The transport sits
/// behind an async mutex, so a `Sensor` can be shared and concurrent callers
/// are served one exchange at a time.
///
/// # Examples
///
/// ```no_run
/// use fingerlink::{Sensor, SerialTransport};
/// use fingerlink::constants::DEFAULT_PASSWORD;
///
/// #[tokio::main]
/// async fn main() -> fingerlink::Result<()> {
///     let sensor = Sensor::new(SerialTransport::new("/dev/ttyUSB0"));
///     sensor.open().await?;
///
///     if sensor.verify_password(DEFAULT_PASSWORD).await? {
///         println!("{} templates stored", sensor.get_template_count().await?);
///     }
///
///     sensor.close().await?;
///     Ok(())
/// }
/// ```
pub struct Sensor {
    transport: Mutex<Box<dyn Transport>>,
    session: Session,
    timeout: Duration,
    policy: ReplyPolicy,
    data_chunk: usize,
}

impl Sensor {
    /// Create a sensor talking over `transport` to the default address
    ///
    /// The transport's read deadline is set to the exchange deadline.
    pub fn new(mut transport: impl Transport + 'static) -> Self {
        let timeout = Duration::from_secs(DEFAULT_TIMEOUT);
        transport.set_read_timeout(timeout);

        Self {
            transport: Mutex::new(Box::new(transport)),
            session: Session::new(DEFAULT_ADDRESS),
            timeout,
            policy: ReplyPolicy::default(),
            data_chunk: DEFAULT_DATA_CHUNK,
        }
    }

    /// Set module address
    pub fn with_address(self, address: [u8; 4]) -> Self {
        self.session.set_address(address);
        self
    }

    /// Set the deadline for one exchange
    ///
    /// Applies to the transport's read deadline as well.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport.get_mut().set_read_timeout(timeout);
        self.timeout = timeout;
        self
    }

    /// Set how replies are checked
    pub fn with_reply_policy(mut self, policy: ReplyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the data packet size used for downloads
    ///
    /// Must match the module's packet size setting
    /// ([`BasicParameters::packet_size_bytes`]).
    pub fn with_data_chunk(mut self, bytes: usize) -> Self {
        self.data_chunk = bytes;
        self
    }

    /// Address frames are currently sent to
    pub fn address(&self) -> [u8; 4] {
        self.session.address()
    }

    /// Check if the handshake password has been verified
    pub fn is_verified(&self) -> bool {
        self.session.is_verified()
    }

    /// Open the transport if it is not open yet
    pub async fn open(&self) -> Result<()> {
        let mut transport = self.transport.lock().await;
        if !transport.is_open() {
            transport
                .open()
                .await
                .map_err(|e| Error::transport("open", e))?;
            info!("Opened {}", transport.name());
        }
        self.session.reopen();
        Ok(())
    }

    /// Close the transport and the session
    pub async fn close(&self) -> Result<()> {
        let mut transport = self.transport.lock().await;
        transport
            .close()
            .await
            .map_err(|e| Error::transport("close", e))?;
        self.session.close();

        info!("Closed {}", transport.name());
        Ok(())
    }

    // ---------------------------------------------------------------------
    // System commands
    // ---------------------------------------------------------------------

    /// Verify the handshake password
    ///
    /// A wrong password is `Ok(false)`, not an error.
    pub async fn verify_password(&self, password: [u8; 4]) -> Result<bool> {
        let (operation, status) = self.status_of(Request::VerifyPassword { password }).await?;

        if status.is_ok() {
            self.session
                .verify()
                .map_err(|e| Error::frame(operation, e))?;
            info!("Password verified");
            Ok(true)
        } else {
            self.session.unverify();
            debug!(%status, "Password not accepted");
            Ok(false)
        }
    }

    /// Set a new handshake password
    pub async fn set_password(&self, password: [u8; 4]) -> Result<()> {
        self.simple(Request::SetPassword { password }).await
    }

    /// Assign a new module address
    ///
    /// The module answers from its new address right away, so later requests
    /// go there.
    pub async fn set_module_address(&self, address: [u8; 4]) -> Result<()> {
        self.simple(Request::SetAddress { address }).await?;
        self.session.set_address(address);

        info!(address = %hex::encode_upper(address), "Module address changed");
        Ok(())
    }

    /// Write one basic parameter register
    ///
    /// An unknown register is rejected with
    /// [`Status::WrongRegisterNumber`]; see [`Error::is_wrong_register`].
    pub async fn set_system_parameter(&self, number: u8, content: u8) -> Result<()> {
        self.simple(Request::SetSystemParameter { number, content }).await
    }

    /// Turn the UART port on (`1`) or off (`0`)
    pub async fn set_port(&self, code: u8) -> Result<()> {
        self.simple(Request::PortControl { code }).await
    }

    /// Read the basic parameter block
    pub async fn read_system_parameters(&self) -> Result<BasicParameters> {
        let operation = Instruction::ReadSystemParameters.name();
        let reply = self.exchange(Request::ReadSystemParameters).await?;
        require_ok(operation, reply_status(operation, &reply)?)?;

        let parameters = BasicParameters::parse(reply.as_bytes())?;
        debug!(%parameters, "Read system parameters");
        Ok(parameters)
    }

    /// Number of templates stored in the library
    pub async fn get_template_count(&self) -> Result<u16> {
        let operation = Instruction::TemplateCount.name();
        let reply = self.exchange(Request::TemplateCount).await?;
        require_ok(operation, reply_status(operation, &reply)?)?;

        reply
            .read_u16(offsets::DATA)
            .map_err(|e| Error::frame(operation, e))
    }

    /// Random number generated by the module
    pub async fn get_random_code(&self) -> Result<u32> {
        let operation = Instruction::GetRandomCode.name();
        let reply = self.exchange(Request::GetRandomCode).await?;
        require_ok(operation, reply_status(operation, &reply)?)?;

        reply
            .read_u32(offsets::DATA)
            .map_err(|e| Error::frame(operation, e))
    }

    /// Write a 32-byte notepad page (0..=15)
    pub async fn write_notepad(&self, page: u8, content: [u8; NOTEPAD_PAGE_SIZE]) -> Result<()> {
        self.simple(Request::WriteNotepad { page, content }).await
    }

    /// Read a 32-byte notepad page (0..=15)
    pub async fn read_notepad(&self, page: u8) -> Result<[u8; NOTEPAD_PAGE_SIZE]> {
        let operation = Instruction::ReadNotepad.name();
        let reply = self.exchange(Request::ReadNotepad { page }).await?;
        require_ok(operation, reply_status(operation, &reply)?)?;

        let mut content = [0u8; NOTEPAD_PAGE_SIZE];
        content.copy_from_slice(
            reply
                .payload_bytes(offsets::DATA, NOTEPAD_PAGE_SIZE)
                .map_err(|e| Error::frame(operation, e))?,
        );
        Ok(content)
    }

    // ---------------------------------------------------------------------
    // Fingerprint processing
    // ---------------------------------------------------------------------

    /// Capture a finger image into the image buffer
    ///
    /// Returns the device status as-is: [`Status::NoFinger`] and the image
    /// quality codes are outcomes here, not errors.
    pub async fn capture_image(&self) -> Result<Status> {
        let (_, status) = self.status_of(Request::GenerateImage).await?;
        debug!(%status, "Captured image");
        Ok(status)
    }

    /// Extract a character file from the image buffer into `buffer`
    pub async fn image_to_character(&self, buffer: BufferId) -> Result<()> {
        self.simple(Request::ImageToCharacter { buffer }).await
    }

    /// Merge the two character buffers into a template
    pub async fn generate_template(&self) -> Result<()> {
        self.simple(Request::RegisterModel).await
    }

    /// Store the template in `buffer` at library page `page`
    pub async fn store_template(&self, buffer: BufferId, page: u16) -> Result<()> {
        self.simple(Request::Store { buffer, page }).await?;
        info!(page, "Template stored");
        Ok(())
    }

    /// Load the template at library page `page` into `buffer`
    pub async fn load_template(&self, buffer: BufferId, page: u16) -> Result<()> {
        self.simple(Request::LoadCharacter { buffer, page }).await
    }

    /// Delete `count` templates starting at `start`
    ///
    /// Returns `true` once the module confirms; a refusal such as
    /// [`Status::DeleteError`] is [`Error::DeviceRejected`].
    pub async fn delete_template(&self, start: u16, count: u16) -> Result<bool> {
        self.simple(Request::Delete { start, count }).await?;
        info!(start, count, "Templates deleted");
        Ok(true)
    }

    /// Delete every template in the library
    pub async fn empty_database(&self) -> Result<()> {
        self.simple(Request::Empty).await?;
        info!("Library emptied");
        Ok(())
    }

    /// Clear the image and character buffers
    pub async fn reset_buffers(&self) -> Result<()> {
        self.simple(Request::Reset).await
    }

    /// Search `count` library pages from `start` for the template in `buffer`
    pub async fn search(&self, buffer: BufferId, start: u16, count: u16) -> Result<SearchResult> {
        self.search_with(Request::Search { buffer, start, count }).await
    }

    /// Like [`Sensor::search`], using the module's high-speed search
    pub async fn high_speed_search(
        &self,
        buffer: BufferId,
        start: u16,
        count: u16,
    ) -> Result<SearchResult> {
        self.search_with(Request::HighSpeedSearch { buffer, start, count })
            .await
    }

    /// Compare the character files in buffers 1 and 2
    pub async fn match_buffers(&self) -> Result<MatchResult> {
        let operation = Instruction::Match.name();
        let reply = self.exchange(Request::Match).await?;

        match reply_status(operation, &reply)? {
            Status::Ok => {
                let score = reply
                    .read_u16(offsets::DATA)
                    .map_err(|e| Error::frame(operation, e))?;
                Ok(MatchResult::Match { score })
            }
            Status::NoMatch => Ok(MatchResult::NoMatch),
            status => Err(rejected(operation, status)),
        }
    }

    // ---------------------------------------------------------------------
    // Transfers
    // ---------------------------------------------------------------------

    /// Upload the character file in `buffer`
    ///
    /// Returns the data packets that follow the acknowledge, as received.
    pub async fn get_character_buffer(&self, buffer: BufferId) -> Result<Bytes> {
        self.upload(Request::UploadCharacter { buffer }).await
    }

    /// Upload the image buffer
    ///
    /// Returns the data packets that follow the acknowledge, as received.
    pub async fn upload_image_buffer(&self) -> Result<Bytes> {
        self.upload(Request::UploadImage).await
    }

    /// Download a character file into `buffer`
    ///
    /// The data packets are written without waiting for an answer.
    pub async fn insert_character_buffer(&self, buffer: BufferId, data: &[u8]) -> Result<()> {
        let operation = Instruction::DownloadCharacter.name();
        let mut transport = self.transport.lock().await;

        let packets = self
            .announce(&mut **transport, Request::DownloadCharacter { buffer }, data)
            .await?;
        self.bounded(operation, transport.write(&packets)).await?;

        debug!(bytes = data.len(), "Character data written");
        Ok(())
    }

    /// Download an image into the image buffer
    pub async fn insert_image_buffer(&self, data: &[u8]) -> Result<()> {
        let operation = Instruction::DownloadImage.name();
        let mut transport = self.transport.lock().await;

        let packets = self
            .announce(&mut **transport, Request::DownloadImage, data)
            .await?;
        let raw = self.bounded(operation, transport.send(&packets)).await?;
        let reply = self.decode(operation, raw)?;

        let status = reply_status(operation, &reply)?;
        if !status.is_ok() {
            warn!(%status, "Image data refused");
            return Err(Error::ReceiveRejected {
                operation,
                phase: InsertPhase::Data,
                status,
            });
        }

        debug!(bytes = data.len(), "Image data accepted");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Exchange plumbing
    // ---------------------------------------------------------------------

    /// First phase of a download: send the command, then pack the payload
    async fn announce(
        &self,
        transport: &mut dyn Transport,
        request: Request,
        data: &[u8],
    ) -> Result<BytesMut> {
        let operation = request.instruction().name();

        let reply = self.exchange_locked(transport, &request).await?;
        let status = reply_status(operation, &reply)?;
        if !status.is_ok() {
            warn!(operation, %status, "Download refused");
            return Err(Error::ReceiveRejected {
                operation,
                phase: InsertPhase::Command,
                status,
            });
        }

        frame::data_frames(self.session.address(), data, self.data_chunk)
            .map_err(|e| Error::frame(operation, e))
    }

    async fn upload(&self, request: Request) -> Result<Bytes> {
        let operation = request.instruction().name();
        let reply = self.exchange(request).await?;
        require_ok(operation, reply_status(operation, &reply)?)?;

        let data = reply.tail(offsets::ACK_PREFIX_LEN);
        debug!(operation, bytes = data.len(), "Upload received");
        Ok(data)
    }

    async fn search_with(&self, request: Request) -> Result<SearchResult> {
        let operation = request.instruction().name();
        let reply = self.exchange(request).await?;

        match reply_status(operation, &reply)? {
            Status::Ok => {
                let page_id = reply
                    .read_u16(offsets::DATA)
                    .map_err(|e| Error::frame(operation, e))?;
                let score = reply
                    .read_u16(offsets::DATA + 2)
                    .map_err(|e| Error::frame(operation, e))?;

                debug!(page_id, score, "Search matched");
                Ok(SearchResult::Match { page_id, score })
            }
            Status::NotFound => {
                debug!("Search found no match");
                Ok(SearchResult::NoMatch)
            }
            status => Err(rejected(operation, status)),
        }
    }

    /// Exchange a request that only reports a status
    async fn simple(&self, request: Request) -> Result<()> {
        let (operation, status) = self.status_of(request).await?;
        require_ok(operation, status)
    }

    async fn status_of(&self, request: Request) -> Result<(&'static str, Status)> {
        let operation = request.instruction().name();
        let reply = self.exchange(request).await?;
        Ok((operation, reply_status(operation, &reply)?))
    }

    async fn exchange(&self, request: Request) -> Result<Frame> {
        let mut transport = self.transport.lock().await;
        self.exchange_locked(&mut **transport, &request).await
    }

    async fn exchange_locked(&self, transport: &mut dyn Transport, request: &Request) -> Result<Frame> {
        let operation = request.instruction().name();
        let frame = request
            .encode(self.session.address())
            .map_err(|e| Error::frame(operation, e))?;

        let exchange = self.session.next_exchange();
        debug!(exchange, operation, "Sending request");

        let raw = self.bounded(operation, transport.send(frame.as_bytes())).await?;
        self.decode(operation, raw)
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        io: impl Future<Output = fingerlink_transport::Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, io).await {
            Ok(Err(fingerlink_transport::Error::ReadTimeout)) | Err(_) => {
                warn!(operation, "No reply within {:?}", self.timeout);
                Err(Error::Timeout {
                    operation,
                    seconds: self.timeout.as_secs(),
                })
            }
            Ok(result) => result.map_err(|e| Error::transport(operation, e)),
        }
    }

    fn decode(&self, operation: &'static str, raw: BytesMut) -> Result<Frame> {
        trace!(operation, bytes = %hex::encode_upper(&raw[..raw.len().min(32)]), "Reply");

        let reply = Frame::from_raw(raw).map_err(|e| Error::frame(operation, e))?;
        if self.policy == ReplyPolicy::Verify {
            reply.verify().map_err(|e| {
                warn!(operation, error = %e, "Corrupt reply");
                Error::frame(operation, e)
            })?;
        }
        Ok(reply)
    }
}

fn reply_status(operation: &'static str, reply: &Frame) -> Result<Status> {
    reply
        .status_byte()
        .map(Status::from)
        .map_err(|e| Error::frame(operation, e))
}

fn require_ok(operation: &'static str, status: Status) -> Result<()> {
    if status.is_ok() {
        Ok(())
    } else {
        Err(rejected(operation, status))
    }
}

fn rejected(operation: &'static str, status: Status) -> Error {
    warn!(operation, %status, "Request rejected");
    Error::DeviceRejected { operation, status }
}
