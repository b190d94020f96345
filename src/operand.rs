/// Register named by a 3-bit `reg`/`rm` selector. Only the low three bits
/// of `reg` are looked at, so every input has a name.
pub fn register(reg: u8, w_bit_set: bool) -> &'static str {
  match (reg & 0b_111, w_bit_set) {
    (0b_000, false) => "al",
    (0b_001, false) => "cl",
    (0b_010, false) => "dl",
    (0b_011, false) => "bl",
    (0b_100, false) => "ah",
    (0b_101, false) => "ch",
    (0b_110, false) => "dh",
    (_, false) => "bh",
    (0b_000, true) => "ax",
    (0b_001, true) => "cx",
    (0b_010, true) => "dx",
    (0b_011, true) => "bx",
    (0b_100, true) => "sp",
    (0b_101, true) => "bp",
    (0b_110, true) => "si",
    (_, true) => "di",
  }
}

/// Base registers summed by an effective address with the given `rm`
/// selector. For `rm == 0b110` this is `bp`, which only applies once a
/// displacement is present; with `mod == 00` that selector means a direct
/// address instead.
pub fn address_base(rm: u8) -> &'static [&'static str] {
  match rm & 0b_111 {
    0b_000 => &["bx", "si"],
    0b_001 => &["bx", "di"],
    0b_010 => &["bp", "si"],
    0b_011 => &["bp", "di"],
    0b_100 => &["si"],
    0b_101 => &["di"],
    0b_110 => &["bp"],
    _ => &["bx"],
  }
}
