use std::collections::HashMap;

use super::name::{parse_name, write_name};
use super::{CLASS_IN, CLASS_TOP_BIT, WireError, read_u16};

/// A DNS question entry.
///
/// The class field's top bit carries the mDNS unicast-response request;
/// the low 15 bits are always the Internet class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Fully-qualified, dot-terminated name, byte-exact.
    pub name: Vec<u8>,
    pub rtype: u16,
    pub unicast_response: bool,
}

impl Query {
    pub fn new(name: impl Into<Vec<u8>>, rtype: u16) -> Self {
        Query {
            name: name.into(),
            rtype,
            unicast_response: false,
        }
    }

    pub(crate) fn parse(packet: &[u8], offset: &mut usize) -> Result<Self, WireError> {
        let name = parse_name(packet, offset)?;
        let rtype = read_u16(packet, offset)?;
        let class = read_u16(packet, offset)?;
        Ok(Query {
            name,
            rtype,
            unicast_response: class & CLASS_TOP_BIT != 0,
        })
    }

    pub(crate) fn write(
        &self,
        packet: &mut Vec<u8>,
        name_map: &mut HashMap<Vec<u8>, u16>,
    ) -> Result<(), WireError> {
        write_name(packet, &self.name, name_map)?;
        packet.extend_from_slice(&self.rtype.to_be_bytes());
        let class = if self.unicast_response {
            CLASS_IN | CLASS_TOP_BIT
        } else {
            CLASS_IN
        };
        packet.extend_from_slice(&class.to_be_bytes());
        Ok(())
    }
}
