//! Wire protocol shared between the trivia server and client.
//!
//! Every message on the wire is one text frame:
//!
//! ```text
//! <code: 16 bytes, right-padded with spaces>|<length: 4 ASCII digits>|<payload>
//! ```
//!
//! The header is exactly [`HEADER_LEN`] bytes. The length field is the
//! payload byte length, decimal, zero-padded; the largest payload a frame
//! can carry is [`MAX_PAYLOAD_LEN`] bytes. Multi-value payloads join their
//! fields with `#` (e.g. `username#password`), but splitting those is the
//! caller's concern, not the codec's.
//!
//! Answer indices on the wire are 0-based, in `0..=3`.

use std::fmt;

/// Width of the command-code field, padded with [`CODE_PADDING`].
pub const CMD_FIELD_LEN: usize = 16;
/// Width of the payload-length field, zero-padded decimal.
pub const LENGTH_FIELD_LEN: usize = 4;
/// Total header size: code field, delimiter, length field, delimiter.
pub const HEADER_LEN: usize = CMD_FIELD_LEN + 1 + LENGTH_FIELD_LEN + 1;
/// Largest payload representable by the length field.
pub const MAX_PAYLOAD_LEN: usize = 9999;
/// Separates the header fields and terminates the header.
pub const FIELD_DELIMITER: u8 = b'|';
/// Separates sub-fields inside a payload.
pub const DATA_DELIMITER: char = '#';
/// Pads short command codes out to the full code field width.
pub const CODE_PADDING: char = ' ';

/// Why a frame could not be encoded or decoded.
///
/// Decoding never panics; every malformed input maps to one of these.
/// The server treats any of them (other than `UnknownCommand`, which it
/// answers with a generic error) as the peer having sent garbage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Input ended before a full header was available.
    TooShort(usize),
    /// A `|` delimiter was missing or misplaced.
    BadDelimiter,
    /// The length field contained something other than ASCII digits.
    BadLengthField(String),
    /// The declared payload length disagrees with the bytes present.
    LengthMismatch { declared: usize, actual: usize },
    /// The payload was not valid UTF-8.
    BadUtf8,
    /// The command code is not registered for the direction being parsed.
    UnknownCommand(String),
    /// Encode-side: the code does not fit the code field or contains `|`.
    BadCommandField(String),
    /// Encode-side: the payload exceeds the length field's capacity.
    PayloadTooLarge(usize),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::TooShort(len) => {
                write!(f, "frame too short: {} bytes, header needs {}", len, HEADER_LEN)
            }
            ProtocolError::BadDelimiter => write!(f, "missing or misplaced header delimiter"),
            ProtocolError::BadLengthField(field) => {
                write!(f, "length field is not numeric: {:?}", field)
            }
            ProtocolError::LengthMismatch { declared, actual } => {
                write!(f, "declared payload length {} but {} bytes follow", declared, actual)
            }
            ProtocolError::BadUtf8 => write!(f, "payload is not valid UTF-8"),
            ProtocolError::UnknownCommand(code) => write!(f, "unknown command code: {:?}", code),
            ProtocolError::BadCommandField(code) => {
                write!(f, "command code does not fit the code field: {:?}", code)
            }
            ProtocolError::PayloadTooLarge(len) => {
                write!(f, "payload of {} bytes exceeds the {}-byte limit", len, MAX_PAYLOAD_LEN)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Commands a client may send to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientCommand {
    Login,
    Logout,
    GetQuestion,
    SendAnswer,
    MyScore,
    Highscore,
    Logged,
}

impl ClientCommand {
    pub const ALL: [ClientCommand; 7] = [
        ClientCommand::Login,
        ClientCommand::Logout,
        ClientCommand::GetQuestion,
        ClientCommand::SendAnswer,
        ClientCommand::MyScore,
        ClientCommand::Highscore,
        ClientCommand::Logged,
    ];

    /// The wire code for this command, without padding.
    pub fn code(self) -> &'static str {
        match self {
            ClientCommand::Login => "LOGIN",
            ClientCommand::Logout => "LOGOUT",
            ClientCommand::GetQuestion => "GET_QUESTION",
            ClientCommand::SendAnswer => "SEND_ANSWER",
            ClientCommand::MyScore => "MY_SCORE",
            ClientCommand::Highscore => "HIGHSCORE",
            ClientCommand::Logged => "LOGGED",
        }
    }

    /// Looks up a trimmed wire code; `None` for codes not in this direction.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Encodes a full frame carrying this command.
    pub fn encode(self, payload: &str) -> Result<Vec<u8>, ProtocolError> {
        encode(self.code(), payload)
    }
}

/// Replies the server may send to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerReply {
    LoginOk,
    LoginFailed,
    Question,
    NoQuestions,
    Correct,
    Wrong,
    YourScore,
    AllScore,
    LoggedAnswer,
    Error,
}

impl ServerReply {
    pub const ALL: [ServerReply; 10] = [
        ServerReply::LoginOk,
        ServerReply::LoginFailed,
        ServerReply::Question,
        ServerReply::NoQuestions,
        ServerReply::Correct,
        ServerReply::Wrong,
        ServerReply::YourScore,
        ServerReply::AllScore,
        ServerReply::LoggedAnswer,
        ServerReply::Error,
    ];

    /// The wire code for this reply, without padding.
    pub fn code(self) -> &'static str {
        match self {
            ServerReply::LoginOk => "LOGIN_OK",
            ServerReply::LoginFailed => "LOGIN_FAILED",
            ServerReply::Question => "YOUR_QUESTION",
            ServerReply::NoQuestions => "NO_QUESTIONS",
            ServerReply::Correct => "CORRECT_ANSWER",
            ServerReply::Wrong => "WRONG_ANSWER",
            ServerReply::YourScore => "YOUR_SCORE",
            ServerReply::AllScore => "ALL_SCORE",
            ServerReply::LoggedAnswer => "LOGGED_ANSWER",
            ServerReply::Error => "ERROR",
        }
    }

    /// Looks up a trimmed wire code; `None` for codes not in this direction.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.code() == code)
    }

    /// Encodes a full frame carrying this reply.
    pub fn encode(self, payload: &str) -> Result<Vec<u8>, ProtocolError> {
        encode(self.code(), payload)
    }
}

/// Encodes one frame from a raw code and payload.
pub fn encode(code: &str, payload: &str) -> Result<Vec<u8>, ProtocolError> {
    if code.is_empty() || code.len() > CMD_FIELD_LEN || code.contains(FIELD_DELIMITER as char) {
        return Err(ProtocolError::BadCommandField(code.to_string()));
    }
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(code.as_bytes());
    frame.resize(CMD_FIELD_LEN, CODE_PADDING as u8);
    frame.push(FIELD_DELIMITER);
    frame
        .extend_from_slice(format!("{:0width$}", payload.len(), width = LENGTH_FIELD_LEN).as_bytes());
    frame.push(FIELD_DELIMITER);
    frame.extend_from_slice(payload.as_bytes());
    Ok(frame)
}

/// Decodes one complete frame into its trimmed code and payload.
///
/// The code comes back as a plain string; direction-specific validation is
/// done by [`ClientCommand::from_code`] / [`ServerReply::from_code`].
pub fn decode(buf: &[u8]) -> Result<(String, String), ProtocolError> {
    let declared = declared_payload_len(buf)?;
    let actual = buf.len() - HEADER_LEN;
    if declared != actual {
        return Err(ProtocolError::LengthMismatch { declared, actual });
    }

    let code = std::str::from_utf8(&buf[..CMD_FIELD_LEN])
        .map_err(|_| ProtocolError::BadUtf8)?
        .trim_end_matches(CODE_PADDING)
        .to_string();
    let payload = std::str::from_utf8(&buf[HEADER_LEN..])
        .map_err(|_| ProtocolError::BadUtf8)?
        .to_string();
    Ok((code, payload))
}

/// Validates a frame header and returns the declared payload length.
///
/// Used by streaming readers to know how many payload bytes to expect
/// before the full frame is in hand. `buf` must hold at least the header.
pub fn declared_payload_len(buf: &[u8]) -> Result<usize, ProtocolError> {
    if buf.len() < HEADER_LEN {
        return Err(ProtocolError::TooShort(buf.len()));
    }
    if buf[CMD_FIELD_LEN] != FIELD_DELIMITER || buf[HEADER_LEN - 1] != FIELD_DELIMITER {
        return Err(ProtocolError::BadDelimiter);
    }

    let field = &buf[CMD_FIELD_LEN + 1..CMD_FIELD_LEN + 1 + LENGTH_FIELD_LEN];
    if !field.iter().all(|b| b.is_ascii_digit()) {
        let shown = String::from_utf8_lossy(field).into_owned();
        return Err(ProtocolError::BadLengthField(shown));
    }

    // Four ASCII digits always fit in usize
    let text = std::str::from_utf8(field).map_err(|_| ProtocolError::BadUtf8)?;
    Ok(text.parse::<usize>().unwrap_or(0))
}
