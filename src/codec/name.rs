use std::collections::HashMap;

use super::{WireError, read_bytes, read_u8};

/// Parse a (possibly compressed) DNS name starting at `offset`.
///
/// Returns the dot-terminated name and leaves `offset` on the byte
/// following the encoded name. A compression pointer must reference a
/// strictly earlier position than the pointer it was reached from;
/// anything else aborts the parse so corrupt packets cannot loop
/// forever. After the first pointer is followed, the position right
/// behind it becomes the resume offset for sibling fields.
pub fn parse_name(packet: &[u8], offset: &mut usize) -> Result<Vec<u8>, WireError> {
    let mut name = Vec::new();
    let mut offset_end: Option<usize> = None;
    let mut offset_ptr = *offset;
    loop {
        let n_bytes = read_u8(packet, offset)?;
        if n_bytes == 0 {
            break;
        }
        match n_bytes & 0xc0 {
            0x00 => {
                let label = read_bytes(packet, offset, n_bytes as usize)?;
                name.extend_from_slice(label);
                name.push(b'.');
            }
            0xc0 => {
                let n_bytes2 = read_u8(packet, offset)?;
                let new_offset = (((n_bytes & 0x3f) as usize) << 8) | n_bytes2 as usize;
                if new_offset >= offset_ptr {
                    return Err(WireError::PointerLoop(*offset - 2));
                }
                offset_ptr = new_offset;
                if offset_end.is_none() {
                    offset_end = Some(*offset);
                }
                *offset = new_offset;
            }
            _ => return Err(WireError::BadLabelType(n_bytes)),
        }
    }
    if let Some(end) = offset_end {
        *offset = end;
    }
    Ok(name)
}

/// Append a DNS name to `packet`, compressing against names written
/// earlier in the same packet.
///
/// `name_map` records the offset of every name suffix already emitted;
/// when the remaining fragment has been written before, a pointer to
/// its first occurrence is emitted instead of the labels.
pub fn write_name(
    packet: &mut Vec<u8>,
    name: &[u8],
    name_map: &mut HashMap<Vec<u8>, u16>,
) -> Result<(), WireError> {
    let mut fragment = name;
    if fragment.ends_with(b".") {
        fragment = &fragment[..fragment.len() - 1];
    }
    while !fragment.is_empty() {
        if let Some(&target) = name_map.get(fragment) {
            packet.extend_from_slice(&(0xc000 | target).to_be_bytes());
            return Ok(());
        }
        let here = packet.len();
        if here > 0x3fff {
            return Err(WireError::NameOffsetTooLarge(here));
        }
        name_map.insert(fragment.to_vec(), here as u16);

        let label_len = fragment
            .iter()
            .position(|&b| b == b'.')
            .unwrap_or(fragment.len());
        if label_len > 63 {
            return Err(WireError::LabelTooLong);
        }
        packet.push(label_len as u8);
        packet.extend_from_slice(&fragment[..label_len]);
        fragment = if label_len < fragment.len() {
            &fragment[label_len + 1..]
        } else {
            &[]
        };
    }
    packet.push(0);
    Ok(())
}
