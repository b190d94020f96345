use std::fmt::{self, Write};

use log::{debug, trace, warn};

use crate::error::{DecodeError, Result};
use crate::operand::{address_base, register};

// opcode patterns, compared against the top 6, 7 and 4 bits of the first byte
const MOV_REG_RM: u8 = 0b_100010;
const MOV_IMM_RM: u8 = 0b_1100011;
const MOV_IMM_REG: u8 = 0b_1011;

const RM_DIRECT_ADDRESS: u8 = 0b_110;

/// What to do with a leading byte that matches no known opcode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownOpcodePolicy {
  /// Log the byte and carry on with the next one.
  #[default]
  Skip,
  /// Abort the pass with [`DecodeError::UnrecognizedOpcode`].
  Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
  pub unknown_opcodes: UnknownOpcodePolicy,
}

impl DecodeOptions {
  pub fn strict() -> Self {
    DecodeOptions { unknown_opcodes: UnknownOpcodePolicy::Reject }
  }
}

/// The `mod` field of a mod/reg/rm byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddressingMode {
  Memory,
  MemoryDisp8,
  MemoryDisp16,
  Register,
}

impl AddressingMode {
  fn from_bits(bits: u8) -> Self {
    match bits & 0b_11 {
      0b_00 => AddressingMode::Memory,
      0b_01 => AddressingMode::MemoryDisp8,
      0b_10 => AddressingMode::MemoryDisp16,
      _ => AddressingMode::Register,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryOperand {
  /// Sum of one or two base registers and an unsigned displacement.
  Based { base: &'static [&'static str], displacement: u16 },
  Direct(u16),
}

impl fmt::Display for MemoryOperand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MemoryOperand::Based { base, displacement } => {
        write!(f, "[{}", base.join(" + "))?;
        if *displacement != 0 {
          write!(f, " + {displacement}")?;
        }
        write!(f, "]")
      }
      MemoryOperand::Direct(address) => write!(f, "[{address}]"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
  Register(&'static str),
  Memory(MemoryOperand),
  Immediate(u16),
  /// An immediate stored to memory, which needs an explicit width.
  SizedImmediate { value: u16, wide: bool },
}

impl fmt::Display for Operand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Operand::Register(name) => f.write_str(name),
      Operand::Memory(memory) => fmt::Display::fmt(memory, f),
      Operand::Immediate(value) => write!(f, "{value}"),
      Operand::SizedImmediate { value, wide: true } => write!(f, "word {value}"),
      Operand::SizedImmediate { value, wide: false } => write!(f, "byte {value}"),
    }
  }
}

/// A decoded `mov`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
  pub dst: Operand,
  pub src: Operand,
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "mov {}, {}", self.dst, self.src)
  }
}

/// Forward-only cursor over the input. `start` is the offset of the
/// instruction being decoded, which is also the number of bytes that
/// belong to fully decoded (or skipped) instructions.
struct ByteStream<I> {
  bytes: I,
  position: usize,
  start: usize,
}

impl<I: Iterator<Item = u8>> ByteStream<I> {
  fn new(bytes: I) -> Self {
    ByteStream { bytes, position: 0, start: 0 }
  }

  /// First byte of an instruction; running out here ends the pass.
  fn next_opcode(&mut self) -> Option<u8> {
    self.start = self.position;
    let byte = self.bytes.next()?;
    self.position += 1;
    Some(byte)
  }

  /// A byte the current instruction requires.
  fn take(&mut self) -> Result<u8> {
    match self.bytes.next() {
      Some(byte) => {
        self.position += 1;
        Ok(byte)
      }
      None => Err(DecodeError::Truncated { offset: self.position, decoded: self.start }),
    }
  }

  fn take_u16(&mut self) -> Result<u16> {
    let lo = self.take()?;
    let hi = self.take()?;
    Ok(u16::from_le_bytes([lo, hi]))
  }

  fn take_data(&mut self, w_bit_set: bool) -> Result<u16> {
    if w_bit_set {
      self.take_u16()
    } else {
      self.take().map(u16::from)
    }
  }
}

/// Decodes `source` until it runs out, writing `bits 16` and then one
/// line per instruction to `sink`.
pub fn decode_stream<S, W>(source: S, sink: &mut W, options: DecodeOptions) -> Result<()>
where
  S: IntoIterator<Item = u8>,
  W: Write,
{
  let mut stream = ByteStream::new(source.into_iter());
  writeln!(sink, "bits 16")?;
  let mut count = 0;
  while let Some(instruction) = next_instruction(&mut stream, options)? {
    trace!("{:>6}: {instruction}", stream.start);
    writeln!(sink, "{instruction}")?;
    count += 1;
  }
  debug!("decoded {count} instructions from {} bytes", stream.position);
  Ok(())
}

/// Decodes `source` into instructions without rendering them.
pub fn decode_instructions<S>(source: S, options: DecodeOptions) -> Result<Vec<Instruction>>
where
  S: IntoIterator<Item = u8>,
{
  let mut stream = ByteStream::new(source.into_iter());
  let mut instructions = Vec::new();
  while let Some(instruction) = next_instruction(&mut stream, options)? {
    instructions.push(instruction);
  }
  Ok(instructions)
}

pub fn disassemble(instructions: &[u8]) -> Result<String> {
  let mut listing = String::new();
  decode_stream(instructions.iter().copied(), &mut listing, DecodeOptions::default())?;
  Ok(listing)
}

fn next_instruction<I>(stream: &mut ByteStream<I>, options: DecodeOptions) -> Result<Option<Instruction>>
where
  I: Iterator<Item = u8>,
{
  loop {
    let Some(b1) = stream.next_opcode() else {
      return Ok(None);
    };
    let instruction = if b1 >> 2 == MOV_REG_RM {
      mov_reg_rm(b1, stream)?
    } else if b1 >> 1 == MOV_IMM_RM {
      mov_imm_rm(b1, stream)?
    } else if b1 >> 4 == MOV_IMM_REG {
      mov_imm_reg(b1, stream)?
    } else {
      match options.unknown_opcodes {
        UnknownOpcodePolicy::Skip => {
          warn!("skipping byte {b1:#04x} ({b1:08b}) at {}", stream.start);
          continue;
        }
        UnknownOpcodePolicy::Reject => {
          return Err(DecodeError::UnrecognizedOpcode { byte: b1, offset: stream.start });
        }
      }
    };
    return Ok(Some(instruction));
  }
}

// 100010dw  mod reg rm  [disp-lo]  [disp-hi]
fn mov_reg_rm<I: Iterator<Item = u8>>(b1: u8, stream: &mut ByteStream<I>) -> Result<Instruction> {
  let b2 = stream.take()?;
  let d_bit_set = (b1 >> 1) & 0b_0000_0001 == 1;
  let w_bit_set = b1 & 0b_0000_0001 == 1;
  let reg = Operand::Register(register((b2 >> 3) & 0b0000_0111, w_bit_set));
  let rm = rm_operand(b2, w_bit_set, stream)?;
  // d set: reg is the destination
  Ok(if d_bit_set {
    Instruction { dst: reg, src: rm }
  } else {
    Instruction { dst: rm, src: reg }
  })
}

// 1100011w  mod 000 rm  [disp-lo]  [disp-hi]  data  [data if w]
fn mov_imm_rm<I: Iterator<Item = u8>>(b1: u8, stream: &mut ByteStream<I>) -> Result<Instruction> {
  let b2 = stream.take()?;
  let w_bit_set = b1 & 0b_0000_0001 == 1;
  let dst = rm_operand(b2, w_bit_set, stream)?;
  let value = stream.take_data(w_bit_set)?;
  let src = match &dst {
    Operand::Register(_) => Operand::Immediate(value),
    _ => Operand::SizedImmediate { value, wide: w_bit_set },
  };
  Ok(Instruction { dst, src })
}

// 1011wreg  data  [data if w]
fn mov_imm_reg<I: Iterator<Item = u8>>(b1: u8, stream: &mut ByteStream<I>) -> Result<Instruction> {
  let w_bit_set = (b1 >> 3) & 0b_0000_0001 == 1;
  let dst = Operand::Register(register(b1 & 0b0000_0111, w_bit_set));
  let value = stream.take_data(w_bit_set)?;
  Ok(Instruction { dst, src: Operand::Immediate(value) })
}

/// Resolves the `mod` and `rm` fields of `b2`, consuming any displacement.
fn rm_operand<I: Iterator<Item = u8>>(b2: u8, w_bit_set: bool, stream: &mut ByteStream<I>) -> Result<Operand> {
  let rm = b2 & 0b0000_0111;
  let displacement = match AddressingMode::from_bits(b2 >> 6) {
    AddressingMode::Register => return Ok(Operand::Register(register(rm, w_bit_set))),
    AddressingMode::Memory if rm == RM_DIRECT_ADDRESS => {
      return Ok(Operand::Memory(MemoryOperand::Direct(stream.take_u16()?)));
    }
    AddressingMode::Memory => 0,
    AddressingMode::MemoryDisp8 => u16::from(stream.take()?),
    AddressingMode::MemoryDisp16 => stream.take_u16()?,
  };
  Ok(Operand::Memory(MemoryOperand::Based { base: address_base(rm), displacement }))
}
