use std::collections::{BTreeMap, HashMap};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::bitmap::Bitmap;
use super::name::{parse_name, write_name};
use super::{
    CLASS_IN, CLASS_TOP_BIT, TYPE_A, TYPE_AAAA, TYPE_NSEC, TYPE_PTR, TYPE_SRV, TYPE_TXT,
    WireError, read_bytes, read_u8, read_u16, read_u32,
};

/// Typed RDATA payload of a resource record.
///
/// Record types outside the mDNS set are kept with their raw bytes so
/// they survive a round trip; the engine itself never interprets them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ptr {
        target: Vec<u8>,
    },
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: Vec<u8>,
    },
    Txt {
        attributes: BTreeMap<Vec<u8>, Vec<u8>>,
    },
    Nsec {
        next_domain: Vec<u8>,
        bitmap: Bitmap,
    },
    Other {
        rtype: u16,
        rdata: Vec<u8>,
    },
}

impl RecordData {
    pub fn rtype(&self) -> u16 {
        match self {
            RecordData::A(_) => TYPE_A,
            RecordData::Aaaa(_) => TYPE_AAAA,
            RecordData::Ptr { .. } => TYPE_PTR,
            RecordData::Srv { .. } => TYPE_SRV,
            RecordData::Txt { .. } => TYPE_TXT,
            RecordData::Nsec { .. } => TYPE_NSEC,
            RecordData::Other { rtype, .. } => *rtype,
        }
    }
}

/// A single resource record.
///
/// Equality is record identity: name, type and payload. TTL and the
/// cache-flush flag are deliberately excluded so a re-announced record
/// with a fresh TTL replaces its predecessor in the cache.
#[derive(Debug, Clone, Eq)]
pub struct Record {
    /// Fully-qualified, dot-terminated name, byte-exact.
    pub name: Vec<u8>,
    pub ttl: u32,
    pub flush_cache: bool,
    pub data: RecordData,
}

impl Record {
    pub fn new(name: impl Into<Vec<u8>>, ttl: u32, data: RecordData) -> Self {
        Record {
            name: name.into(),
            ttl,
            flush_cache: false,
            data,
        }
    }

    pub fn rtype(&self) -> u16 {
        self.data.rtype()
    }

    /// Identity comparison: (name, type, rdata), TTL excluded.
    pub fn matches(&self, other: &Record) -> bool {
        self.name == other.name && self.data == other.data
    }

    /// The address of an A or AAAA record.
    pub fn address(&self) -> Option<IpAddr> {
        match &self.data {
            RecordData::A(addr) => Some(IpAddr::V4(*addr)),
            RecordData::Aaaa(addr) => Some(IpAddr::V6(*addr)),
            _ => None,
        }
    }

    /// The target name of a PTR or SRV record.
    pub fn target(&self) -> Option<&[u8]> {
        match &self.data {
            RecordData::Ptr { target } => Some(target),
            RecordData::Srv { target, .. } => Some(target),
            _ => None,
        }
    }

    pub(crate) fn parse(packet: &[u8], offset: &mut usize) -> Result<Self, WireError> {
        let name = parse_name(packet, offset)?;
        let rtype = read_u16(packet, offset)?;
        let class = read_u16(packet, offset)?;
        let ttl = read_u32(packet, offset)?;
        let data_len = read_u16(packet, offset)? as usize;

        let data = match rtype {
            TYPE_A => {
                let raw = read_u32(packet, offset)?;
                RecordData::A(Ipv4Addr::from(raw))
            }
            TYPE_AAAA => {
                let raw = read_bytes(packet, offset, 16)?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(raw);
                RecordData::Aaaa(Ipv6Addr::from(octets))
            }
            TYPE_NSEC => {
                let next_domain = parse_name(packet, offset)?;
                let number = read_u8(packet, offset)?;
                if number != 0 {
                    return Err(WireError::BadNsecWindow(number));
                }
                let length = read_u8(packet, offset)?;
                if length > 32 {
                    return Err(WireError::BitmapTooLong);
                }
                let raw = read_bytes(packet, offset, length as usize)?;
                let mut bitmap = Bitmap::new();
                bitmap.set_data(raw);
                RecordData::Nsec {
                    next_domain,
                    bitmap,
                }
            }
            TYPE_PTR => {
                let target = parse_name(packet, offset)?;
                RecordData::Ptr { target }
            }
            TYPE_SRV => {
                let priority = read_u16(packet, offset)?;
                let weight = read_u16(packet, offset)?;
                let port = read_u16(packet, offset)?;
                let target = parse_name(packet, offset)?;
                RecordData::Srv {
                    priority,
                    weight,
                    port,
                    target,
                }
            }
            TYPE_TXT => {
                let mut attributes = BTreeMap::new();
                let start = *offset;
                while *offset < start + data_len {
                    let n_bytes = read_u8(packet, offset)? as usize;
                    if n_bytes == 0 {
                        // the placeholder an attribute-less TXT carries
                        continue;
                    }
                    let attr = read_bytes(packet, offset, n_bytes)?;
                    let split = attr
                        .iter()
                        .position(|&b| b == b'=')
                        .ok_or(WireError::MalformedTxt)?;
                    attributes.insert(attr[..split].to_vec(), attr[split + 1..].to_vec());
                }
                RecordData::Txt { attributes }
            }
            _ => {
                let rdata = read_bytes(packet, offset, data_len)?.to_vec();
                RecordData::Other { rtype, rdata }
            }
        };

        Ok(Record {
            name,
            ttl,
            flush_cache: class & CLASS_TOP_BIT != 0,
            data,
        })
    }

    pub(crate) fn write(
        &self,
        packet: &mut Vec<u8>,
        name_map: &mut HashMap<Vec<u8>, u16>,
    ) -> Result<(), WireError> {
        write_name(packet, &self.name, name_map)?;
        packet.extend_from_slice(&self.rtype().to_be_bytes());
        let class = if self.flush_cache {
            CLASS_IN | CLASS_TOP_BIT
        } else {
            CLASS_IN
        };
        packet.extend_from_slice(&class.to_be_bytes());
        packet.extend_from_slice(&self.ttl.to_be_bytes());

        // RDATA length is backpatched once the payload is written, so
        // names inside the payload can use real packet offsets for
        // compression.
        let len_at = packet.len();
        packet.extend_from_slice(&[0, 0]);

        match &self.data {
            RecordData::A(addr) => packet.extend_from_slice(&addr.octets()),
            RecordData::Aaaa(addr) => packet.extend_from_slice(&addr.octets()),
            RecordData::Ptr { target } => write_name(packet, target, name_map)?,
            RecordData::Srv {
                priority,
                weight,
                port,
                target,
            } => {
                packet.extend_from_slice(&priority.to_be_bytes());
                packet.extend_from_slice(&weight.to_be_bytes());
                packet.extend_from_slice(&port.to_be_bytes());
                write_name(packet, target, name_map)?;
            }
            RecordData::Txt { attributes } => {
                if attributes.is_empty() {
                    // TXT records must carry at least one string
                    packet.push(0);
                }
                for (key, value) in attributes {
                    let entry_len = key.len() + 1 + value.len();
                    if entry_len > 255 {
                        return Err(WireError::TxtTooLong);
                    }
                    packet.push(entry_len as u8);
                    packet.extend_from_slice(key);
                    packet.push(b'=');
                    packet.extend_from_slice(value);
                }
            }
            RecordData::Nsec {
                next_domain,
                bitmap,
            } => {
                write_name(packet, next_domain, name_map)?;
                packet.push(0);
                packet.push(bitmap.length());
                packet.extend_from_slice(bitmap.data());
            }
            RecordData::Other { rdata, .. } => packet.extend_from_slice(rdata),
        }

        let data_len = (packet.len() - len_at - 2) as u16;
        packet[len_at..len_at + 2].copy_from_slice(&data_len.to_be_bytes());
        Ok(())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}
