//! Run file binary format constants and footer read/write helpers.
//!
//! A run file is its cases back to back followed by a 16-byte footer:
//!
//! ```text
//! [case_count: u64 LE][crc32 of case bytes: u32 LE][magic: u32 LE = 0x5255_4E31]
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Result as IoResult, Write};

/// Magic number identifying run files (ASCII "RUN1").
pub const RUN_MAGIC: u32 = 0x5255_4E31;

/// Size of the footer in bytes: 8 (`case_count`) + 4 (`crc`) + 4 (`magic`).
pub const FOOTER_BYTES: u64 = 8 + 4 + 4;

/// Decoded run file footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunFooter {
    pub case_count: u64,
    pub crc: u32,
    pub magic: u32,
}

/// Writes the run footer to `w`.
pub fn write_footer<W: Write>(w: &mut W, case_count: u64, crc: u32) -> IoResult<()> {
    w.write_u64::<LittleEndian>(case_count)?;
    w.write_u32::<LittleEndian>(crc)?;
    w.write_u32::<LittleEndian>(RUN_MAGIC)?;
    Ok(())
}

/// Reads a run footer from `r`, which must be positioned just past the last
/// case.
pub fn read_footer<R: Read>(r: &mut R) -> IoResult<RunFooter> {
    let case_count = r.read_u64::<LittleEndian>()?;
    let crc = r.read_u32::<LittleEndian>()?;
    let magic = r.read_u32::<LittleEndian>()?;
    Ok(RunFooter {
        case_count,
        crc,
        magic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn footer_layout() -> IoResult<()> {
        let mut buf = Vec::new();
        write_footer(&mut buf, 42, 0xDEAD_BEEF)?;
        assert_eq!(buf.len() as u64, FOOTER_BYTES);
        assert_eq!(&buf[12..], &RUN_MAGIC.to_le_bytes());

        let footer = read_footer(&mut Cursor::new(buf))?;
        assert_eq!(
            footer,
            RunFooter {
                case_count: 42,
                crc: 0xDEAD_BEEF,
                magic: RUN_MAGIC
            }
        );
        Ok(())
    }

    #[test]
    fn truncated_footer_errors() {
        let result = read_footer(&mut Cursor::new(vec![0u8; 10]));
        assert!(result.is_err());
    }
}
