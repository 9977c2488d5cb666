// Bench frame codec - Wire format spoken by the bench firmware
//
// Frame layout: [0xB3][command][payload..][crc8], where the CRC-8/AUTOSAR
// checksum covers the command byte and the payload.
use crate::domain::sample::{BenchState, CompletionStatus, RawSample};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use crc::{Crc, CRC_8_AUTOSAR};
use thiserror::Error;

pub const DELIMITER: u8 = 0xB3;

const CRC8_AUTOSAR: Crc<u8> = Crc::<u8>::new(&CRC_8_AUTOSAR);

/// Delimiter, command and checksum bytes around the payload.
const FRAME_OVERHEAD: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short: {0} bytes")]
    TooShort(usize),
    #[error("bad frame delimiter 0x{0:02X}")]
    BadDelimiter(u8),
    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },
    #[error("unknown command 0x{0:02X}")]
    UnknownCommand(u8),
    #[error("expected {expected:?} frame, got {actual:?}")]
    UnexpectedCommand { expected: Command, actual: Command },
    #[error("payload length {actual}, expected {expected}")]
    PayloadLength { expected: usize, actual: usize },
    #[error("unknown status code {0}")]
    UnknownStatus(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping = 0x00,
    AssignId = 0x01,
    RequestData = 0x02,
    SetCharge = 0x04,
    SetDischarge = 0x05,
    SetStandBy = 0x06,
    RequestCompletion = 0x07,
}

impl Command {
    pub fn id(&self) -> u8 {
        *self as u8
    }

    pub fn from_id(id: u8) -> Result<Self, FrameError> {
        match id {
            0x00 => Ok(Command::Ping),
            0x01 => Ok(Command::AssignId),
            0x02 => Ok(Command::RequestData),
            0x04 => Ok(Command::SetCharge),
            0x05 => Ok(Command::SetDischarge),
            0x06 => Ok(Command::SetStandBy),
            0x07 => Ok(Command::RequestCompletion),
            other => Err(FrameError::UnknownCommand(other)),
        }
    }

    /// Payload size of the bench's answer to this command.
    pub fn response_payload_len(&self) -> usize {
        match self {
            Command::RequestData => BenchReading::PAYLOAD_LEN,
            Command::Ping | Command::AssignId => 1,
            Command::RequestCompletion => 2,
            Command::SetCharge | Command::SetDischarge | Command::SetStandBy => 0,
        }
    }

    /// Request frame sent to a bench (no payload).
    pub fn encode(&self) -> Bytes {
        Frame::new(*self, Bytes::new()).encode()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(command: Command, payload: Bytes) -> Self {
        Self { command, payload }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.payload.len() + FRAME_OVERHEAD);
        buf.put_u8(DELIMITER);
        buf.put_u8(self.command.id());
        buf.put_slice(&self.payload);
        let crc = CRC8_AUTOSAR.checksum(&buf[1..]);
        buf.put_u8(crc);
        buf.freeze()
    }

    /// Decode exactly one frame occupying the whole of `packet`.
    pub fn decode(packet: &[u8]) -> Result<Self, FrameError> {
        if packet.len() < FRAME_OVERHEAD {
            return Err(FrameError::TooShort(packet.len()));
        }
        if packet[0] != DELIMITER {
            return Err(FrameError::BadDelimiter(packet[0]));
        }

        let body = &packet[1..packet.len() - 1];
        let received = packet[packet.len() - 1];
        let calculated = CRC8_AUTOSAR.checksum(body);
        if calculated != received {
            return Err(FrameError::ChecksumMismatch {
                expected: calculated,
                actual: received,
            });
        }

        let command = Command::from_id(body[0])?;
        Ok(Self::new(command, Bytes::copy_from_slice(&body[1..])))
    }

    /// Split a buffer of back-to-back response frames. Each frame's length is
    /// implied by its command.
    pub fn decode_responses(mut buf: &[u8]) -> Result<Vec<Self>, FrameError> {
        let mut frames = Vec::new();
        while !buf.is_empty() {
            if buf.len() < 2 {
                return Err(FrameError::TooShort(buf.len()));
            }
            if buf[0] != DELIMITER {
                return Err(FrameError::BadDelimiter(buf[0]));
            }

            let command = Command::from_id(buf[1])?;
            let len = command.response_payload_len() + FRAME_OVERHEAD;
            if buf.len() < len {
                return Err(FrameError::TooShort(buf.len()));
            }

            frames.push(Self::decode(&buf[..len])?);
            buf = &buf[len..];
        }
        Ok(frames)
    }
}

/// Measurements carried by a `RequestData` response, in hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchReading {
    pub battery_temperature: u16,
    pub bench_temperature: u16,
    pub load_temperature: u16,
    pub voltage: u16,
    pub current: u16,
}

impl BenchReading {
    pub const PAYLOAD_LEN: usize = 10;

    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        if frame.command != Command::RequestData {
            return Err(FrameError::UnexpectedCommand {
                expected: Command::RequestData,
                actual: frame.command,
            });
        }
        if frame.payload.len() != Self::PAYLOAD_LEN {
            return Err(FrameError::PayloadLength {
                expected: Self::PAYLOAD_LEN,
                actual: frame.payload.len(),
            });
        }

        let mut payload = frame.payload.clone();
        Ok(Self {
            battery_temperature: payload.get_u16(),
            bench_temperature: payload.get_u16(),
            load_temperature: payload.get_u16(),
            voltage: payload.get_u16(),
            current: payload.get_u16(),
        })
    }

    pub fn to_frame(&self) -> Frame {
        let mut payload = BytesMut::with_capacity(Self::PAYLOAD_LEN);
        payload.put_u16(self.battery_temperature);
        payload.put_u16(self.bench_temperature);
        payload.put_u16(self.load_temperature);
        payload.put_u16(self.voltage);
        payload.put_u16(self.current);
        Frame::new(Command::RequestData, payload.freeze())
    }

    /// Transport payload for this reading, stamped with the receive time.
    pub fn to_raw_sample(
        &self,
        port: &str,
        state: BenchState,
        status: CompletionStatus,
        received_at: DateTime<Utc>,
    ) -> RawSample {
        RawSample {
            id: None,
            port: Some(port.to_string()),
            temperature: Some(f64::from(self.bench_temperature)),
            battery_temperature: Some(f64::from(self.battery_temperature)),
            electronic_load_temperature: Some(f64::from(self.load_temperature)),
            voltage: Some(f64::from(self.voltage)),
            current: Some(f64::from(self.current)),
            state: Some(state),
            status: Some(status),
            start_date: Some(received_at),
            end_date: Some(received_at),
        }
    }
}

/// Bench state reported by `Ping`, plus the experiment status reported by
/// `RequestCompletion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub state: BenchState,
    pub status: Option<CompletionStatus>,
}

impl StatusReport {
    /// `None` for frames that carry no status.
    pub fn from_frame(frame: &Frame) -> Result<Option<Self>, FrameError> {
        let expected = match frame.command {
            Command::Ping | Command::RequestCompletion => frame.command.response_payload_len(),
            _ => return Ok(None),
        };
        if frame.payload.len() != expected {
            return Err(FrameError::PayloadLength {
                expected,
                actual: frame.payload.len(),
            });
        }

        let state_code = frame.payload[0];
        let state =
            BenchState::from_code(state_code).ok_or(FrameError::UnknownStatus(state_code))?;
        let status = match frame.payload.get(1) {
            Some(&code) => {
                Some(CompletionStatus::from_code(code).ok_or(FrameError::UnknownStatus(code))?)
            }
            None => None,
        };

        Ok(Some(Self { state, status }))
    }
}

/// Turn a sequence of bench responses into transport payloads for `port`.
///
/// Status frames update the state and status stamped on the readings that
/// follow them; `state` and `status` apply until the first status frame.
pub fn frames_to_samples(
    frames: &[Frame],
    port: &str,
    mut state: BenchState,
    mut status: CompletionStatus,
    received_at: DateTime<Utc>,
) -> Result<Vec<RawSample>, FrameError> {
    let mut samples = Vec::new();
    for frame in frames {
        if frame.command == Command::RequestData {
            let reading = BenchReading::from_frame(frame)?;
            samples.push(reading.to_raw_sample(port, state, status, received_at));
        } else if let Some(report) = StatusReport::from_frame(frame)? {
            state = report.state;
            status = report.status.unwrap_or(status);
        }
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::Sample;

    fn reading() -> BenchReading {
        BenchReading {
            battery_temperature: 2875,
            bench_temperature: 2410,
            load_temperature: 3990,
            voltage: 1250,
            current: 420,
        }
    }

    #[test]
    fn test_crc8_autosar_check_value() {
        assert_eq!(CRC8_AUTOSAR.checksum(b"123456789"), 0xDF);
    }

    #[test]
    fn test_request_frame_layout() {
        let encoded = Command::RequestData.encode();
        assert_eq!(encoded.len(), 3);
        assert_eq!(encoded[0], DELIMITER);
        assert_eq!(encoded[1], 0x02);
        assert_eq!(encoded[2], CRC8_AUTOSAR.checksum(&[0x02]));

        let decoded = Frame::decode(&encoded).unwrap();
        assert_eq!(decoded.command, Command::RequestData);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_reading_frame_decodes() {
        let encoded = reading().to_frame().encode();
        assert_eq!(encoded.len(), BenchReading::PAYLOAD_LEN + 3);
        // Big-endian voltage sits after three temperatures.
        assert_eq!(&encoded[8..10], &1250u16.to_be_bytes());

        let frame = Frame::decode(&encoded).unwrap();
        assert_eq!(BenchReading::from_frame(&frame).unwrap(), reading());
    }

    #[test]
    fn test_decode_rejects_bad_frames() {
        assert_eq!(Frame::decode(&[DELIMITER, 0x00]), Err(FrameError::TooShort(2)));
        assert_eq!(Frame::decode(&[0xAA, 0x00, 0x00]), Err(FrameError::BadDelimiter(0xAA)));

        let mut corrupted = reading().to_frame().encode().to_vec();
        corrupted[4] ^= 0xFF;
        assert!(matches!(
            Frame::decode(&corrupted),
            Err(FrameError::ChecksumMismatch { .. })
        ));

        let unknown = [DELIMITER, 0x03, CRC8_AUTOSAR.checksum(&[0x03])];
        assert_eq!(Frame::decode(&unknown), Err(FrameError::UnknownCommand(0x03)));
    }

    #[test]
    fn test_reading_requires_data_frame() {
        let ping = Frame::new(Command::Ping, Bytes::from_static(&[1]));
        assert_eq!(
            BenchReading::from_frame(&ping),
            Err(FrameError::UnexpectedCommand {
                expected: Command::RequestData,
                actual: Command::Ping,
            })
        );

        let short = Frame::new(Command::RequestData, Bytes::from_static(&[0, 1, 2]));
        assert_eq!(
            BenchReading::from_frame(&short),
            Err(FrameError::PayloadLength { expected: 10, actual: 3 })
        );
    }

    #[test]
    fn test_decode_back_to_back_responses() {
        let mut stream = BytesMut::new();
        stream.put(reading().to_frame().encode());
        stream.put(Frame::new(Command::Ping, Bytes::from_static(&[2])).encode());
        stream.put(reading().to_frame().encode());

        let frames = Frame::decode_responses(&stream).unwrap();
        let commands: Vec<Command> = frames.iter().map(|f| f.command).collect();
        assert_eq!(
            commands,
            vec![Command::RequestData, Command::Ping, Command::RequestData]
        );

        let truncated = &stream[..stream.len() - 1];
        assert!(matches!(
            Frame::decode_responses(truncated),
            Err(FrameError::TooShort(_))
        ));
    }

    #[test]
    fn test_reading_becomes_sample() {
        let at = Utc::now();
        let raw =
            reading().to_raw_sample("COM4", BenchState::Charge, CompletionStatus::InProgress, at);
        let sample = Sample::try_from(raw).unwrap();

        assert_eq!(sample.port, "COM4");
        assert_eq!(sample.temperature, 2410);
        assert_eq!(sample.battery_temperature, 2875);
        assert_eq!(sample.electronic_load_temperature, 3990);
        assert_eq!(sample.voltage, 1250);
        assert_eq!(sample.end_date, at);
    }

    #[test]
    fn test_status_frames_stamp_following_readings() {
        let frames = vec![
            reading().to_frame(),
            Frame::new(Command::Ping, Bytes::from_static(&[1])),
            reading().to_frame(),
            Frame::new(Command::RequestCompletion, Bytes::from_static(&[0, 0])),
            reading().to_frame(),
            Frame::new(Command::SetStandBy, Bytes::new()),
        ];
        let samples = frames_to_samples(
            &frames,
            "COM2",
            BenchState::Standby,
            CompletionStatus::InProgress,
            Utc::now(),
        )
        .unwrap();

        let stamped: Vec<(Option<BenchState>, Option<CompletionStatus>)> =
            samples.iter().map(|s| (s.state, s.status)).collect();
        assert_eq!(
            stamped,
            vec![
                (Some(BenchState::Standby), Some(CompletionStatus::InProgress)),
                (Some(BenchState::Charge), Some(CompletionStatus::InProgress)),
                (Some(BenchState::Standby), Some(CompletionStatus::Success)),
            ]
        );
    }

    #[test]
    fn test_unknown_status_code_rejected() {
        let ping = Frame::new(Command::Ping, Bytes::from_static(&[7]));
        assert_eq!(StatusReport::from_frame(&ping), Err(FrameError::UnknownStatus(7)));

        let data = reading().to_frame();
        assert_eq!(StatusReport::from_frame(&data), Ok(None));
    }
}
