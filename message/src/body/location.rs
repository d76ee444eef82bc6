use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{
    DateTime,
    Utc,
};
use packed_struct::prelude::*;

use crate::{
    bcd,
    reader::{
        DecodeError,
        Reader,
    },
};

const STATUS_IGNITION: u32 = 1 << 0;
const STATUS_LOCATED: u32 = 1 << 1;
const STATUS_SOUTH: u32 = 1 << 2;
const STATUS_WEST: u32 = 1 << 3;

const HEADING_MASK: u16 = 0x01ff;

const COORDINATE_SCALE: f64 = 1e6;

const BASE_LEN: usize = 28;

/// The fixed-width head of every location report.
#[derive(Copy, Clone, Debug, PackedStruct)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "28")]
struct Base {
    #[packed_field(endian = "msb")]
    alarm:     u32,
    #[packed_field(endian = "msb")]
    status:    u32,
    #[packed_field(endian = "msb")]
    latitude:  u32,
    #[packed_field(endian = "msb")]
    longitude: u32,
    #[packed_field(endian = "msb")]
    altitude:  u16,
    #[packed_field(endian = "msb")]
    speed:     u16,
    #[packed_field(endian = "msb")]
    heading:   u16,
    time:      [u8; 6],
}

/// Location report (0x0200).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LocationReport {
    pub alarm:     u32,
    pub status:    u32,
    pub latitude:  f64,
    pub longitude: f64,
    pub altitude:  u16,
    /// km/h
    pub speed:     f64,
    pub heading:   u16,
    pub timestamp: DateTime<Utc>,

    pub extensions: Extensions,
}

impl LocationReport {
    pub const BASE_LEN: usize = BASE_LEN;

    /// `received` stands in for the report time when the terminal has not sent a usable one.
    pub(crate) fn decode(body: &[u8], received: DateTime<Utc>) -> Result<Self, DecodeError> {
        let mut r = Reader::new(body);
        let base = Base::unpack(&r.array::<BASE_LEN>("location report")?)?;

        let latitude = base.latitude as f64 / COORDINATE_SCALE;
        let longitude = base.longitude as f64 / COORDINATE_SCALE;

        let timestamp = bcd::decode_time(&base.time).unwrap_or_else(|| {
            tracing::debug!(time = %hex::encode(base.time), "unusable report time, using receive time");
            received
        });

        Ok(Self {
            alarm: base.alarm,
            status: base.status,
            latitude: if base.status & STATUS_SOUTH != 0 { -latitude } else { latitude },
            longitude: if base.status & STATUS_WEST != 0 { -longitude } else { longitude },
            altitude: base.altitude,
            speed: base.speed as f64 / 10.0,
            heading: base.heading & HEADING_MASK,
            timestamp,
            extensions: Extensions::parse(r.rest()),
        })
    }

    #[inline]
    pub fn ignition(&self) -> bool {
        self.status & STATUS_IGNITION != 0
    }

    #[inline]
    pub fn located(&self) -> bool {
        self.status & STATUS_LOCATED != 0
    }
}

/// Additional information items trailing a location report.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Extensions {
    /// km
    pub mileage:         Option<f64>,
    pub extended_status: Option<u32>,
    pub io_status:       Option<u16>,
    pub signal:          Option<u8>,
    pub satellites:      Option<u8>,
    /// V
    pub battery:         Option<f64>,

    /// Items with an ID this server does not interpret, or whose length does not match the one
    /// their ID calls for.
    pub other: BTreeMap<u8, Bytes>,
}

impl Extensions {
    pub const MILEAGE: u8 = 0x01;
    pub const EXTENDED_STATUS: u8 = 0x25;
    pub const IO_STATUS: u8 = 0x2a;
    pub const SIGNAL: u8 = 0x30;
    pub const SATELLITES: u8 = 0x31;
    pub const BATTERY: u8 = 0xe3;

    /// Parse `{id: u8, len: u8, content: [u8; len]}` items until the tail runs out. A trailing
    /// item shorter than its declared length ends parsing.
    pub fn parse(tail: &[u8]) -> Self {
        let mut out = Self::default();
        let mut rest = tail;

        while let [id, len, content @ ..] = rest {
            let len = *len as usize;

            let Some(item) = content.get(..len) else {
                tracing::debug!(
                    id = %format_args!("{:#04x}", id),
                    declared = len,
                    available = content.len(),
                    "truncated extension item"
                );
                break;
            };

            out.apply(*id, item);
            rest = &content[len..];
        }

        out
    }

    fn apply(&mut self, id: u8, item: &[u8]) {
        let mut r = Reader::new(item);

        let known = match (id, item.len()) {
            (Self::MILEAGE, 4) => {
                self.mileage = r.u32("mileage").ok().map(|v| v as f64 / 10.0);
                true
            },
            (Self::EXTENDED_STATUS, 4) => {
                self.extended_status = r.u32("extended status").ok();
                true
            },
            (Self::IO_STATUS, 2) => {
                self.io_status = r.u16("io status").ok();
                true
            },
            (Self::SIGNAL, 1) => {
                self.signal = r.u8("signal").ok();
                true
            },
            (Self::SATELLITES, 1) => {
                self.satellites = r.u8("satellites").ok();
                true
            },
            (Self::BATTERY, 2) => {
                self.battery = r.u16("battery").ok().map(|v| v as f64 * 0.001);
                true
            },
            _ => false,
        };

        if !known {
            self.other.insert(id, Bytes::copy_from_slice(item));
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use chrono::TimeZone;

    use super::*;

    pub fn body(status: u32, time: [u8; 6], tail: &[u8]) -> Vec<u8> {
        let mut out = vec![];

        out.extend_from_slice(&0x0000_0100u32.to_be_bytes());
        out.extend_from_slice(&status.to_be_bytes());
        out.extend_from_slice(&52_229_675u32.to_be_bytes());
        out.extend_from_slice(&21_012_230u32.to_be_bytes());
        out.extend_from_slice(&112u16.to_be_bytes());
        out.extend_from_slice(&655u16.to_be_bytes());
        out.extend_from_slice(&0xfe5au16.to_be_bytes());
        out.extend_from_slice(&time);
        out.extend_from_slice(tail);

        out
    }

    const TIME: [u8; 6] = [0x24, 0x05, 0x17, 0x08, 0x30, 0x00];

    #[test]
    fn test_decode_base() -> eyre::Result<()> {
        let received = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let report = LocationReport::decode(&body(0b0011, TIME, &[]), received)?;

        assert_eq!(report.alarm, 0x100);
        assert!((report.latitude - 52.229675).abs() < 1e-9);
        assert!((report.longitude - 21.01223).abs() < 1e-9);
        assert_eq!(report.altitude, 112);
        assert!((report.speed - 65.5).abs() < 1e-9);
        assert_eq!(report.heading, 0x005a);
        assert_eq!(report.timestamp, Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 0).unwrap());
        assert!(report.ignition());
        assert!(report.located());
        assert_eq!(report.extensions, Extensions::default());

        Ok(())
    }

    #[test]
    fn test_hemisphere_and_time_fallback() -> eyre::Result<()> {
        let received = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let report = LocationReport::decode(&body(0b1100, [0; 6], &[]), received)?;

        assert!(report.latitude < 0.0);
        assert!(report.longitude < 0.0);
        assert!(!report.ignition());
        assert_eq!(report.timestamp, received);

        Ok(())
    }

    #[test]
    fn test_short_body() {
        let data = body(0, TIME, &[]);

        assert_eq!(data.len(), LocationReport::BASE_LEN);
        assert!(matches!(LocationReport::decode(&data[..19], Utc::now()), Err(DecodeError::Truncated {
            field: "location report",
            needed: 28,
            available: 19,
        })));
    }

    #[test]
    fn test_extensions() {
        let tail = [
            0x01, 0x04, 0x00, 0x00, 0x30, 0x39, // mileage 12345 -> 1234.5 km
            0x25, 0x04, 0x00, 0x00, 0x00, 0x03, // extended status
            0x2a, 0x02, 0x00, 0x01, // io status
            0x30, 0x01, 0x1f, // signal
            0x31, 0x01, 0x0c, // satellites
            0xe3, 0x02, 0x30, 0xd4, // 12500 mV
            0x77, 0x03, 0xaa, 0xbb, 0xcc, // unknown, skipped by length
        ];

        let ext = Extensions::parse(&tail);

        assert_eq!(ext.mileage, Some(1234.5));
        assert_eq!(ext.extended_status, Some(3));
        assert_eq!(ext.io_status, Some(1));
        assert_eq!(ext.signal, Some(0x1f));
        assert_eq!(ext.satellites, Some(12));
        assert!((ext.battery.unwrap() - 12.5).abs() < 1e-9);
        assert_eq!(ext.other.get(&0x77).map(|b| &b[..]), Some(&[0xaa, 0xbb, 0xcc][..]));
    }

    #[test]
    fn test_truncated_extension_ends_parsing() {
        let ext = Extensions::parse(&[0x30, 0x01, 0x10, 0x01, 0x04, 0x00, 0x01]);

        assert_eq!(ext.signal, Some(0x10));
        assert_eq!(ext.mileage, None);
        assert!(ext.other.is_empty());
    }

    #[test]
    fn test_wrong_length_kept_raw() {
        let ext = Extensions::parse(&[0x31, 0x02, 0x00, 0x09]);

        assert_eq!(ext.satellites, None);
        assert_eq!(ext.other.get(&0x31).map(|b| b.to_vec()), Some(vec![0x00, 0x09]));
    }
}
