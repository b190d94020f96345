use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
  #[error("input ended mid-instruction at byte {offset} ({decoded} bytes decoded)")]
  Truncated { offset: usize, decoded: usize },
  #[error("unrecognized opcode {byte:#04x} ({byte:08b}) at byte {offset}")]
  UnrecognizedOpcode { byte: u8, offset: usize },
  #[error("failed to write to output")]
  Sink(#[from] std::fmt::Error),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
