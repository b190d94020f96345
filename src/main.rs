use anyhow::{bail, Context};
use dasm_8086::{decode_stream, DecodeOptions};

fn main() -> anyhow::Result<()> {
  env_logger::init();

  let mut options = DecodeOptions::default();
  let mut paths = Vec::new();
  for arg in std::env::args().skip(1) {
    if arg == "--strict" {
      options = DecodeOptions::strict();
    } else {
      paths.push(arg);
    }
  }
  let (input, output) = match paths.as_slice() {
    [input] => (input, None),
    [input, output] => (input, Some(output)),
    _ => bail!("Usage: dasm-8086 <filename> [output] [--strict]"),
  };

  let data = std::fs::read(input).with_context(|| format!("Error reading {input}"))?;
  log::info!("decoding {} bytes from {input}", data.len());

  let mut listing = String::new();
  decode_stream(data, &mut listing, options).with_context(|| format!("Error decoding {input}"))?;

  match output {
    Some(output) => std::fs::write(output, listing).with_context(|| format!("Error writing {output}"))?,
    None => print!("; src: `{input}`\n{listing}"),
  }
  Ok(())
}
