//! Disassembler for the 8086 `mov` family: register/memory to register,
//! immediate to register, and immediate to register/memory.

mod decode;
mod error;
mod operand;

pub use decode::{
  decode_instructions, decode_stream, disassemble, DecodeOptions, Instruction, MemoryOperand, Operand,
  UnknownOpcodePolicy,
};
pub use error::{DecodeError, Result};
