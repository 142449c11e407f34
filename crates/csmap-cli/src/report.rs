//! Report output: one `location<TAB>path` line per unique key

use std::io::Write;

/// Write keys one per line and flush
pub fn write_keys<W, I>(out: &mut W, keys: I) -> std::io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = String>,
{
    let mut lines = 0;
    for key in keys {
        writeln!(out, "{}", key)?;
        lines += 1;
    }
    out.flush()?;
    Ok(lines)
}
