//! Fixed-layout binary container for dumping tensors to disk.
//!
//! The on-disk layout is little-endian with a 72-byte header:
//!
//! ```text
//! offset  size  field
//!      0     4  magic "IEB0"
//!      4     2  format version (major, minor)
//!      6     1  precision tag
//!      7     1  rank (max 7)
//!      8    28  7 x u32 dimension sizes (unused slots zero)
//!     36     1  scaling axis (0xFF = no scaling section)
//!     37     3  reserved
//!     40     8  u64 data offset
//!     48     8  u64 data size
//!     56     8  u64 scaling data offset
//!     64     8  u64 scaling data size
//! ```
//!
//! Tensor bytes follow in plain row-major order.

use std::io::{Read, Seek, SeekFrom, Write};

use anyhow::{anyhow, bail, ensure, Context, Result};

use crate::element::ElementType;

const MAGIC: [u8; 4] = *b"IEB0";
const VERSION: (u8, u8) = (0, 1);
const MAX_RANK: usize = 7;
const HEADER_SIZE: u64 = 72;
const NO_SCALING: u8 = 0xFF;

/// Parsed dump header: element type, dimensions, optional scaling axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHeader {
    element: ElementType,
    dims: Vec<usize>,
    scaling_axis: Option<u8>,
}

impl BlobHeader {
    pub fn new(element: ElementType, dims: Vec<usize>) -> Result<Self> {
        ensure!(
            dims.len() <= MAX_RANK,
            "tensor rank {} exceeds the dump container maximum of {MAX_RANK}",
            dims.len()
        );
        ensure!(
            !element.is_dynamic(),
            "cannot dump a tensor with dynamic element type"
        );
        Ok(BlobHeader {
            element,
            dims,
            scaling_axis: None,
        })
    }

    pub fn with_scaling_axis(mut self, axis: u8) -> Self {
        self.scaling_axis = Some(axis);
        self
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn scaling_axis(&self) -> Option<u8> {
        self.scaling_axis
    }

    pub fn element_count(&self) -> usize {
        self.dims.iter().product()
    }

    fn expected_data_size(&self) -> Option<usize> {
        self.element
            .size_in_bytes()
            .map(|s| s * self.element_count())
    }
}

/// Writes a complete dump: header, tensor bytes, optional scaling bytes.
pub fn write_blob<W: Write>(
    w: &mut W,
    header: &BlobHeader,
    data: &[u8],
    scaling_data: Option<&[u8]>,
) -> Result<()> {
    if let Some(expected) = header.expected_data_size() {
        ensure!(
            expected == data.len(),
            "data size {} does not match shape, expected {expected}",
            data.len()
        );
    }
    ensure!(
        header.scaling_axis.is_some() == scaling_data.is_some(),
        "scaling data and scaling axis must be given together"
    );

    w.write_all(&MAGIC)?;
    w.write_all(&[VERSION.0, VERSION.1])?;
    w.write_all(&[header.element.tag(), header.dims.len() as u8])?;
    for slot in 0..MAX_RANK {
        let dim = header.dims.get(slot).copied().unwrap_or(0);
        let dim = u32::try_from(dim).context("dimension exceeds u32")?;
        w.write_all(&dim.to_le_bytes())?;
    }
    w.write_all(&[header.scaling_axis.unwrap_or(NO_SCALING)])?;
    w.write_all(&[0u8; 3])?;

    let scaling_len = scaling_data.map_or(0, <[u8]>::len) as u64;
    w.write_all(&HEADER_SIZE.to_le_bytes())?;
    w.write_all(&(data.len() as u64).to_le_bytes())?;
    let scaling_offset = if scaling_len == 0 {
        0u64
    } else {
        HEADER_SIZE + data.len() as u64
    };
    w.write_all(&scaling_offset.to_le_bytes())?;
    w.write_all(&scaling_len.to_le_bytes())?;

    w.write_all(data)?;
    if let Some(scaling) = scaling_data {
        w.write_all(scaling)?;
    }
    Ok(())
}

/// Reads a dump back: header, tensor bytes, optional scaling bytes.
pub fn read_blob<R: Read + Seek>(r: &mut R) -> Result<(BlobHeader, Vec<u8>, Option<Vec<u8>>)> {
    let magic: [u8; 4] = read_array(r).context("reading magic")?;
    ensure!(magic == MAGIC, "not a tensor dump file (bad magic)");
    let version: [u8; 2] = read_array(r)?;
    ensure!(
        version == [VERSION.0, VERSION.1],
        "unsupported dump version {}.{}",
        version[0],
        version[1]
    );

    let [precision, rank]: [u8; 2] = read_array(r)?;
    let element = ElementType::from_tag(precision)
        .ok_or_else(|| anyhow!("unknown precision tag {precision:#x}"))?;
    let rank = rank as usize;
    ensure!(rank <= MAX_RANK, "rank {rank} exceeds maximum {MAX_RANK}");

    let mut dims = Vec::with_capacity(rank);
    for slot in 0..MAX_RANK {
        let dim = read_u32(r)?;
        if slot < rank {
            dims.push(dim as usize);
        } else if dim != 0 {
            bail!("unused dimension slot {slot} is not zero");
        }
    }

    let [scaling_axis]: [u8; 1] = read_array(r)?;
    let _reserved: [u8; 3] = read_array(r)?;
    let data_offset = read_u64(r)?;
    let data_size = read_u64(r)?;
    let scaling_offset = read_u64(r)?;
    let scaling_size = read_u64(r)?;

    let mut header = BlobHeader::new(element, dims)?;
    if scaling_axis != NO_SCALING {
        header = header.with_scaling_axis(scaling_axis);
    }
    if let Some(expected) = header.expected_data_size() {
        ensure!(
            expected as u64 == data_size,
            "data section size {data_size} does not match shape, expected {expected}"
        );
    }

    r.seek(SeekFrom::Start(data_offset))
        .context("seeking to data section")?;
    let mut data = vec![0u8; usize::try_from(data_size).context("data section too large")?];
    r.read_exact(&mut data).context("reading data section")?;

    let scaling = if header.scaling_axis.is_some() {
        ensure!(scaling_size > 0, "scaling axis set but no scaling section");
        r.seek(SeekFrom::Start(scaling_offset))
            .context("seeking to scaling section")?;
        let mut bytes =
            vec![0u8; usize::try_from(scaling_size).context("scaling section too large")?];
        r.read_exact(&mut bytes).context("reading scaling section")?;
        Some(bytes)
    } else {
        None
    };

    Ok((header, data, scaling))
}

/// Writes a human-readable rendition: a summary line, then one value per
/// line in row-major order.
pub fn dump_as_text<W: Write>(w: &mut W, header: &BlobHeader, data: &[u8]) -> Result<()> {
    let dims: Vec<String> = header.dims.iter().map(ToString::to_string).collect();
    writeln!(
        w,
        "{} {}D shape: {} ({} items)",
        header.element.name(),
        header.dims.len(),
        dims.join(" "),
        header.element_count()
    )?;
    match header.element {
        ElementType::F32 => {
            for chunk in data.chunks_exact(4) {
                let bytes: [u8; 4] = chunk.try_into()?;
                writeln!(w, "{}", f32::from_le_bytes(bytes))?;
            }
        }
        ElementType::I32 => {
            for chunk in data.chunks_exact(4) {
                let bytes: [u8; 4] = chunk.try_into()?;
                writeln!(w, "{}", i32::from_le_bytes(bytes))?;
            }
        }
        ElementType::Boolean | ElementType::U8 => {
            for byte in data {
                writeln!(w, "{byte}")?;
            }
        }
        other => bail!("text dump not supported for {}", other.name()),
    }
    Ok(())
}

fn read_array<const N: usize, R: Read>(r: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    Ok(u32::from_le_bytes(read_array(r)?))
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    Ok(u64::from_le_bytes(read_array(r)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_round_trips() {
        let header = BlobHeader::new(ElementType::F32, vec![2, 3, 224, 224]).unwrap();
        let data = vec![0u8; 2 * 3 * 224 * 224 * 4];
        let mut buf = Cursor::new(Vec::new());
        write_blob(&mut buf, &header, &data, None).unwrap();

        buf.set_position(0);
        let (parsed, parsed_data, scaling) = read_blob(&mut buf).unwrap();
        assert_eq!(parsed.element(), ElementType::F32);
        assert_eq!(parsed.dims(), &[2, 3, 224, 224]);
        assert_eq!(parsed.scaling_axis(), None);
        assert_eq!(parsed_data.len(), data.len());
        assert!(scaling.is_none());
    }

    #[test]
    fn header_is_exactly_72_bytes() {
        let header = BlobHeader::new(ElementType::U8, vec![4]).unwrap();
        let mut buf = Cursor::new(Vec::new());
        write_blob(&mut buf, &header, &[1, 2, 3, 4], None).unwrap();
        assert_eq!(buf.get_ref().len(), 72 + 4);
    }

    #[test]
    fn scaling_section_round_trips() {
        let header = BlobHeader::new(ElementType::U8, vec![2, 2])
            .unwrap()
            .with_scaling_axis(1);
        let scales: Vec<u8> = 1.0f32
            .to_le_bytes()
            .iter()
            .chain(&0.5f32.to_le_bytes())
            .copied()
            .collect();
        let mut buf = Cursor::new(Vec::new());
        write_blob(&mut buf, &header, &[9, 8, 7, 6], Some(&scales)).unwrap();

        buf.set_position(0);
        let (parsed, data, scaling) = read_blob(&mut buf).unwrap();
        assert_eq!(parsed.scaling_axis(), Some(1));
        assert_eq!(data, vec![9, 8, 7, 6]);
        assert_eq!(scaling, Some(scales));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut buf = Cursor::new(vec![0u8; 72]);
        let err = read_blob(&mut buf).expect_err("zeroed file is not a dump");
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn mismatched_data_size_is_rejected() {
        let header = BlobHeader::new(ElementType::F32, vec![2, 2]).unwrap();
        let mut buf = Cursor::new(Vec::new());
        let err = write_blob(&mut buf, &header, &[0u8; 3], None)
            .expect_err("3 bytes cannot hold 4 f32 values");
        assert!(err.to_string().contains("does not match shape"));
    }

    #[test]
    fn text_dump_prints_summary_and_values() {
        let header = BlobHeader::new(ElementType::F32, vec![2]).unwrap();
        let mut data = Vec::new();
        data.extend_from_slice(&1.5f32.to_le_bytes());
        data.extend_from_slice(&(-2.0f32).to_le_bytes());
        let mut out = Vec::new();
        dump_as_text(&mut out, &header, &data).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("FP32 1D shape: 2 (2 items)\n"));
        assert!(text.contains("\n1.5\n"));
        assert!(text.contains("-2\n"));
    }
}
