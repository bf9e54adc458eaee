use tokio_util::bytes::Buf;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::crc;

/// Responses carry their payload length in a single byte, so a read of more
/// than 125 registers cannot be framed reliably. Stay within the classic
/// Modbus limit.
pub const MAX_SAFE_READ_COUNT: u16 = 125;

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub device_id: u8,
    /// Client-side correlation only. The wire protocol has no transaction
    /// identifiers; replies are paired with requests by order alone.
    pub transaction_id: u16,
    pub operation: Operation,
}

impl Request {
    /// How many bytes the controller will transmit in reply.
    ///
    /// Used to budget response deadlines: clocking the reply out over the
    /// serial line takes time on top of the controller's own processing
    /// allowance, proportional to the reply length.
    pub fn expected_response_length(&self) -> u16 {
        match self.operation {
            // device id, function code, byte count, data, two crc bytes.
            Operation::ReadRegisters { address: _, count } => 5 + count.saturating_mul(2),
            // device id, function code, register, value or quantity echo, crc.
            Operation::WriteRegister { .. } | Operation::WriteRegisters { .. } => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ReadRegisters { address: u16, count: u16 },
    WriteRegister { address: u16, value: u16 },
    WriteRegisters { address: u16, values: Vec<u16> },
}

#[derive(Debug, PartialEq)]
pub struct Response {
    pub device_id: u8,
    pub kind: ResponseKind,
}

impl Response {
    pub fn exception_code(&self) -> Option<u8> {
        match &self.kind {
            ResponseKind::ErrorCode(code) => Some(*code),
            ResponseKind::ReadRegisters { values: _ } => None,
            ResponseKind::WriteRegister { .. } => None,
            ResponseKind::WriteRegisters { .. } => None,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum ResponseKind {
    ErrorCode(u8),
    ReadRegisters { values: Vec<u8> },
    WriteRegister { address: u16, value: u16 },
    WriteRegisters { address: u16, count: u16 },
}

pub fn exception_description(code: u8) -> &'static str {
    match code {
        1 => "illegal function",
        2 => "illegal data address",
        3 => "illegal data value",
        4 => "device failure",
        5 => "acknowledge",
        6 => "device busy",
        7 => "negative acknowledge",
        8 => "memory parity error",
        _ => "unspecified exception",
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("response checksum mismatch (computed {computed:#06X}, received {received:#06X})")]
    Checksum { computed: u16, received: u16 },
    #[error("response carries function code {0:#04X} which this client never sends")]
    UnknownFunction(u8),
    #[error("cannot write {0} registers in a single frame")]
    TooManyRegisters(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct ModbusRTUCodec {}

impl Encoder<&Request> for ModbusRTUCodec {
    type Error = Error;
    fn encode(
        &mut self,
        req: &Request,
        dst: &mut tokio_util::bytes::BytesMut,
    ) -> Result<(), Self::Error> {
        let start = dst.len();
        dst.extend_from_slice(&[req.device_id]);
        match &req.operation {
            Operation::ReadRegisters { address, count } => {
                dst.extend_from_slice(&[0x03]);
                dst.extend_from_slice(&address.to_be_bytes());
                dst.extend_from_slice(&count.to_be_bytes());
            }
            Operation::WriteRegister { address, value } => {
                dst.extend_from_slice(&[0x06]);
                dst.extend_from_slice(&address.to_be_bytes());
                dst.extend_from_slice(&value.to_be_bytes());
            }
            Operation::WriteRegisters { address, values } => {
                let Ok(byte_count) = u8::try_from(values.len() * 2) else {
                    return Err(Error::TooManyRegisters(values.len()));
                };
                dst.extend_from_slice(&[0x10]);
                dst.extend_from_slice(&address.to_be_bytes());
                dst.extend_from_slice(&(values.len() as u16).to_be_bytes());
                dst.extend_from_slice(&[byte_count]);
                for value in values {
                    dst.extend_from_slice(&value.to_be_bytes());
                }
            }
        }
        let crc = crc::checksum(&dst[start..]);
        dst.extend_from_slice(&crc.to_le_bytes());
        trace!(message = "sending encoded", buffer = ?&dst[start..]);
        Ok(())
    }
}

impl Decoder for ModbusRTUCodec {
    type Item = Response;
    type Error = Error;
    fn decode(
        &mut self,
        src: &mut tokio_util::bytes::BytesMut,
    ) -> Result<Option<Self::Item>, Self::Error> {
        trace!(message = "attempt at decoding", buffer = ?src);
        let Some((header, _)) = src.split_first_chunk::<2>() else {
            return Ok(None);
        };
        let [device_id, function_code] = *header;
        // The reply length is implied by the echoed function code; only
        // read replies carry an explicit payload length.
        let frame_length = if function_code & 0x80 != 0 {
            5
        } else {
            match function_code {
                0x03 => match src.get(2) {
                    Some(&byte_count) => 5 + usize::from(byte_count),
                    None => return Ok(None),
                },
                0x06 | 0x10 => 8,
                other => return Err(Error::UnknownFunction(other)),
            }
        };
        let Some(frame) = src.get(..frame_length) else {
            return Ok(None);
        };
        if !crc::validate(frame) {
            let computed = crc::checksum(&frame[..frame_length - 2]);
            let received =
                u16::from_le_bytes([frame[frame_length - 2], frame[frame_length - 1]]);
            src.advance(frame_length);
            return Err(Error::Checksum { computed, received });
        }
        let kind = if function_code & 0x80 != 0 {
            ResponseKind::ErrorCode(frame[2])
        } else {
            match function_code {
                0x03 => ResponseKind::ReadRegisters {
                    values: frame[3..frame_length - 2].to_vec(),
                },
                0x06 => ResponseKind::WriteRegister {
                    address: u16::from_be_bytes([frame[2], frame[3]]),
                    value: u16::from_be_bytes([frame[4], frame[5]]),
                },
                0x10 => ResponseKind::WriteRegisters {
                    address: u16::from_be_bytes([frame[2], frame[3]]),
                    count: u16::from_be_bytes([frame[4], frame[5]]),
                },
                other => return Err(Error::UnknownFunction(other)),
            }
        };
        src.advance(frame_length);
        Ok(Some(Response { device_id, kind }))
    }
}

/// Picks one register's raw word out of a read response that may span many
/// registers.
pub fn extract_word(request_base: u16, address: u16, values: &[u8]) -> Option<u16> {
    let offset = 2 * usize::from(address.checked_sub(request_base)?);
    let word = values.get(offset..)?.first_chunk::<2>()?;
    Some(u16::from_be_bytes(*word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::bytes::BytesMut;

    fn encode(operation: Operation) -> Vec<u8> {
        let request = Request { device_id: 1, transaction_id: 0, operation };
        let mut buffer = BytesMut::new();
        ModbusRTUCodec {}.encode(&request, &mut buffer).unwrap();
        buffer.to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<Option<Response>, Error> {
        let mut buffer = BytesMut::from(bytes);
        let decoded = ModbusRTUCodec {}.decode(&mut buffer);
        if let Ok(Some(_)) = &decoded {
            assert!(buffer.is_empty(), "decoder left {buffer:x?} behind");
        }
        decoded
    }

    #[test]
    fn read_request_layout() {
        // Read register 61 (chamber temperature), from the manual.
        assert_eq!(
            encode(Operation::ReadRegisters { address: 61, count: 1 }),
            [0x01, 0x03, 0x00, 0x3D, 0x00, 0x01, 0x15, 0xC6],
        );
    }

    #[test]
    fn write_request_layout() {
        // Write 20.0 degrees to register 60 (temperature set point).
        assert_eq!(
            encode(Operation::WriteRegister { address: 60, value: 200 }),
            [0x01, 0x06, 0x00, 0x3C, 0x00, 0xC8, 0x48, 0x50],
        );
        // Chamber light on.
        assert_eq!(
            encode(Operation::WriteRegister { address: 21, value: 1 }),
            [0x01, 0x06, 0x00, 0x15, 0x00, 0x01, 0x59, 0xCE],
        );
    }

    #[test]
    fn write_multiple_layout() {
        let values = (0..15).collect::<Vec<u16>>();
        let frame = encode(Operation::WriteRegisters { address: 200, values });
        assert_eq!(frame.len(), 39);
        assert_eq!(&frame[..7], [0x01, 0x10, 0x00, 0xC8, 0x00, 0x0F, 0x1E]);
        assert_eq!(&frame[7..9], [0x00, 0x00]);
        assert_eq!(&frame[35..37], [0x00, 0x0E]);
        assert_eq!(&frame[37..], [0x1F, 0xB2]);
    }

    #[test]
    fn write_multiple_byte_count_limit() {
        let values = vec![0u16; 128];
        let request = Request {
            device_id: 1,
            transaction_id: 0,
            operation: Operation::WriteRegisters { address: 200, values },
        };
        let mut buffer = BytesMut::new();
        let result = ModbusRTUCodec {}.encode(&request, &mut buffer);
        assert!(matches!(result, Err(Error::TooManyRegisters(128))));
    }

    #[test]
    fn decode_read_response() {
        let response = decode(&[0x01, 0x03, 0x02, 0x00, 0xEC, 0xB9, 0xC9]).unwrap().unwrap();
        assert_eq!(response.device_id, 1);
        assert_eq!(response.kind, ResponseKind::ReadRegisters { values: vec![0x00, 0xEC] });
    }

    #[test]
    fn decode_write_echo() {
        let response = decode(&[0x01, 0x06, 0x00, 0x3C, 0x00, 0xC8, 0x48, 0x50]).unwrap().unwrap();
        assert_eq!(response.kind, ResponseKind::WriteRegister { address: 60, value: 200 });
    }

    #[test]
    fn decode_write_multiple_echo() {
        let response = decode(&[0x01, 0x10, 0x00, 0xC8, 0x00, 0x0F, 0x01, 0xF3]).unwrap().unwrap();
        assert_eq!(response.kind, ResponseKind::WriteRegisters { address: 200, count: 15 });
    }

    #[test]
    fn decode_device_exception() {
        let response = decode(&[0x01, 0x83, 0x02, 0xC0, 0xF1]).unwrap().unwrap();
        assert_eq!(response.kind, ResponseKind::ErrorCode(2));
        assert_eq!(response.exception_code(), Some(2));
        assert_eq!(exception_description(2), "illegal data address");
    }

    #[test]
    fn decode_waits_for_a_complete_frame() {
        let frame = [0x01, 0x03, 0x02, 0x00, 0xEC, 0xB9, 0xC9];
        for cut in 0..frame.len() {
            let mut buffer = BytesMut::from(&frame[..cut]);
            let decoded = ModbusRTUCodec {}.decode(&mut buffer).unwrap();
            assert!(decoded.is_none(), "cut {cut}");
            assert_eq!(buffer.len(), cut, "nothing may be consumed at cut {cut}");
        }
    }

    #[test]
    fn decode_checksum_mismatch() {
        let mut buffer = BytesMut::from(&[0x01, 0x03, 0x02, 0x00, 0xEC, 0xB9, 0xFF][..]);
        let result = ModbusRTUCodec {}.decode(&mut buffer);
        match result {
            Err(Error::Checksum { computed: 0xC9B9, received: 0xFFB9 }) => {}
            other => panic!("{other:?}"),
        }
        assert!(buffer.is_empty(), "the bad frame must still be consumed");
    }

    #[test]
    fn extract_word_mid_range() {
        let values = [0x00, 0xEC, 0x01, 0x90];
        assert_eq!(extract_word(60, 60, &values), Some(0x00EC));
        assert_eq!(extract_word(60, 61, &values), Some(0x0190));
        assert_eq!(extract_word(60, 62, &values), None);
        assert_eq!(extract_word(60, 59, &values), None);
    }
}
