use packed_struct::prelude::*;

use crate::reader::{
    ascii,
    text,
    DecodeError,
    Reader,
};

const FIXED_LEN: usize = 37;

/// Everything in a registration ahead of the VIN.
#[derive(Copy, Clone, Debug, PackedStruct)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "37")]
struct Fixed {
    #[packed_field(endian = "msb")]
    province:     u16,
    #[packed_field(endian = "msb")]
    city:         u16,
    manufacturer: [u8; 5],
    model:        [u8; 20],
    hardware_id:  [u8; 7],
    plate_color:  u8,
}

/// Terminal registration (0x0100).
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Registration {
    pub province:     u16,
    pub city:         u16,
    pub manufacturer: String,
    pub model:        String,
    /// The terminal's own hardware identifier, distinct from the BCD terminal ID in the header.
    pub hardware_id:  String,
    pub plate_color:  u8,
    pub vin:          Option<String>,
}

impl Registration {
    pub const FIXED_LEN: usize = FIXED_LEN;

    pub(crate) fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(body);
        let fixed = Fixed::unpack(&r.array::<FIXED_LEN>("registration")?)?;

        let vin = text(r.rest());
        let vin = vin.trim_matches(|c: char| c == '\0' || c.is_whitespace());

        Ok(Self {
            province:     fixed.province,
            city:         fixed.city,
            manufacturer: ascii(&fixed.manufacturer),
            model:        ascii(&fixed.model),
            hardware_id:  ascii(&fixed.hardware_id),
            plate_color:  fixed.plate_color,
            vin:          (!vin.is_empty()).then(|| vin.to_string()),
        })
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub fn body(vin: &str) -> Vec<u8> {
        let mut out = vec![0x00, 0x2c, 0x01, 0x2f];

        out.extend_from_slice(b"ITB01");
        out.extend_from_slice(b"TRACKER-X1\0\0\0\0\0\0\0\0\0\0");
        out.extend_from_slice(b"HW00042");
        out.push(0x02);
        out.extend_from_slice(vin.as_bytes());

        out
    }

    #[test]
    fn test_decode() -> eyre::Result<()> {
        let reg = Registration::decode(&body("LSVAU2180N2183294"))?;

        assert_eq!(reg, Registration {
            province:     44,
            city:         303,
            manufacturer: "ITB01".to_string(),
            model:        "TRACKER-X1".to_string(),
            hardware_id:  "HW00042".to_string(),
            plate_color:  2,
            vin:          Some("LSVAU2180N2183294".to_string()),
        });

        Ok(())
    }

    #[test]
    fn test_decode_without_vin() -> eyre::Result<()> {
        let data = body("");
        assert_eq!(data.len(), Registration::FIXED_LEN);
        assert_eq!(Registration::decode(&data)?.vin, None);

        Ok(())
    }

    #[test]
    fn test_truncated() {
        let data = body("");

        assert!(matches!(Registration::decode(&data[..20]), Err(DecodeError::Truncated {
            field: "registration",
            needed: 37,
            available: 20,
        })));
    }
}
