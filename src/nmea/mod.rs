//! NMEA-0183 sentence model.
//!
//! The NMEA dataset carries raw GPS sentences. Parsing is behind the
//! [`SentenceParser`] trait so a caller can substitute a fuller parser; the
//! bundled [`Nmea0183Parser`] understands the sentence types the codec caches.

mod parser;

pub use parser::{Nmea0183Parser, checksum};

use crate::Result;
use chrono::{NaiveDate, NaiveTime};

/// Knots to metres per second.
pub const KNOTS_TO_M_S: f64 = 0.51444444444444;

/// Turns one sentence into a typed message.
pub trait SentenceParser: Send + Sync {
    /// Parse a single sentence such as `$GPGGA,...*hh`.
    ///
    /// Returns `SentenceParse` for anything that is not a well-formed sentence.
    /// Well-formed sentences of unrecognized type come back as
    /// [`TalkerMessage::Other`].
    fn parse(&self, sentence: &str) -> Result<TalkerMessage>;
}

/// Sentence types cached by the NMEA dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentenceKind {
    Gga,
    Vtg,
    Rmc,
    Gll,
    Gsv,
    Gsa,
    Hdt,
    Hdg,
}

impl SentenceKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "GGA" => Some(SentenceKind::Gga),
            "VTG" => Some(SentenceKind::Vtg),
            "RMC" => Some(SentenceKind::Rmc),
            "GLL" => Some(SentenceKind::Gll),
            "GSV" => Some(SentenceKind::Gsv),
            "GSA" => Some(SentenceKind::Gsa),
            "HDT" => Some(SentenceKind::Hdt),
            "HDG" => Some(SentenceKind::Hdg),
            _ => None,
        }
    }
}

/// GPS fix data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gga {
    pub fix_time: Option<NaiveTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub fix_quality: Option<u8>,
    pub satellites: Option<u8>,
    pub hdop: Option<f64>,
    pub altitude: Option<f64>,
}

/// Track made good and ground speed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vtg {
    pub true_track: Option<f64>,
    pub magnetic_track: Option<f64>,
    pub speed_knots: Option<f64>,
    pub speed_kmh: Option<f64>,
}

/// Recommended minimum navigation data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rmc {
    pub fix_time: Option<NaiveTime>,
    pub valid: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_knots: Option<f64>,
    pub track: Option<f64>,
    pub date: Option<NaiveDate>,
}

/// Geographic position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gll {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub fix_time: Option<NaiveTime>,
    pub valid: bool,
}

/// Satellites in view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gsv {
    pub total_messages: Option<u8>,
    pub message_number: Option<u8>,
    pub satellites_in_view: Option<u8>,
}

/// DOP and active satellites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gsa {
    pub mode: Option<char>,
    pub fix_type: Option<u8>,
    pub satellite_ids: Vec<u8>,
    pub pdop: Option<f64>,
    pub hdop: Option<f64>,
    pub vdop: Option<f64>,
}

/// True heading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hdt {
    pub heading: Option<f64>,
}

/// Magnetic heading with deviation and variation (east positive).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hdg {
    pub heading: Option<f64>,
    pub deviation: Option<f64>,
    pub variation: Option<f64>,
}

/// A parsed sentence.
#[derive(Debug, Clone, PartialEq)]
pub enum TalkerMessage {
    Gga(Gga),
    Vtg(Vtg),
    Rmc(Rmc),
    Gll(Gll),
    Gsv(Gsv),
    Gsa(Gsa),
    Hdt(Hdt),
    Hdg(Hdg),
    /// Well-formed sentence of a type without a typed model.
    Other { talker: String, kind: String, fields: Vec<String> },
}

impl TalkerMessage {
    pub fn kind(&self) -> Option<SentenceKind> {
        match self {
            TalkerMessage::Gga(_) => Some(SentenceKind::Gga),
            TalkerMessage::Vtg(_) => Some(SentenceKind::Vtg),
            TalkerMessage::Rmc(_) => Some(SentenceKind::Rmc),
            TalkerMessage::Gll(_) => Some(SentenceKind::Gll),
            TalkerMessage::Gsv(_) => Some(SentenceKind::Gsv),
            TalkerMessage::Gsa(_) => Some(SentenceKind::Gsa),
            TalkerMessage::Hdt(_) => Some(SentenceKind::Hdt),
            TalkerMessage::Hdg(_) => Some(SentenceKind::Hdg),
            TalkerMessage::Other { .. } => None,
        }
    }
}
