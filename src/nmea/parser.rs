//! Minimal NMEA-0183 parser for the sentence types carried by the instrument.

use super::{
    Gga, Gll, Gsa, Gsv, Hdg, Hdt, Rmc, SentenceKind, SentenceParser, TalkerMessage, Vtg,
};
use crate::{Result, WaveError};
use chrono::{NaiveDate, NaiveTime};
use std::str::FromStr;

/// Parser for `$TTSSS,f1,f2,...*hh` sentences.
///
/// A checksum, when present, must match. Empty fields parse as `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nmea0183Parser {
    /// Reject sentences that carry no `*hh` checksum.
    pub require_checksum: bool,
}

impl Nmea0183Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self { require_checksum: true }
    }
}

/// XOR of every byte between `$` and `*`.
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0u8, |acc, b| acc ^ b)
}

impl SentenceParser for Nmea0183Parser {
    fn parse(&self, sentence: &str) -> Result<TalkerMessage> {
        let fail = |reason: &str| WaveError::sentence(sentence, reason);
        let trimmed = sentence.trim();

        let body = trimmed
            .strip_prefix('$')
            .or_else(|| trimmed.strip_prefix('!'))
            .ok_or_else(|| fail("missing '$' start delimiter"))?;

        let body = match body.split_once('*') {
            Some((body, sum)) => {
                let expected = u8::from_str_radix(sum, 16)
                    .map_err(|_| fail(&format!("checksum '{}' is not hex", sum)))?;
                let actual = checksum(body);
                if expected != actual {
                    return Err(fail(&format!(
                        "checksum mismatch: expected {:02X}, computed {:02X}",
                        expected, actual
                    )));
                }
                body
            }
            None if self.require_checksum => return Err(fail("missing checksum")),
            None => body,
        };

        let fields: Vec<&str> = body.split(',').collect();
        let address = fields[0];
        if address.len() < 5 || !address.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(fail(&format!("invalid address field '{}'", address)));
        }

        let talker = &address[..address.len() - 3];
        let kind = &address[address.len() - 3..];
        let f = Fields { fields: &fields, sentence };

        // proprietary sentences carry their own layout
        if talker.starts_with('P') {
            return Ok(other(talker, kind, &fields));
        }

        let Some(known) = SentenceKind::from_code(kind) else {
            return Ok(other(talker, kind, &fields));
        };
        let message = match known {
            SentenceKind::Gga => TalkerMessage::Gga(Gga {
                fix_time: f.time(1)?,
                latitude: f.coordinate(2, 3, 'S')?,
                longitude: f.coordinate(4, 5, 'W')?,
                fix_quality: f.number(6)?,
                satellites: f.number(7)?,
                hdop: f.number(8)?,
                altitude: f.number(9)?,
            }),
            SentenceKind::Vtg => TalkerMessage::Vtg(Vtg {
                true_track: f.number(1)?,
                magnetic_track: f.number(3)?,
                speed_knots: f.number(5)?,
                speed_kmh: f.number(7)?,
            }),
            SentenceKind::Rmc => TalkerMessage::Rmc(Rmc {
                fix_time: f.time(1)?,
                valid: f.text(2) == "A",
                latitude: f.coordinate(3, 4, 'S')?,
                longitude: f.coordinate(5, 6, 'W')?,
                speed_knots: f.number(7)?,
                track: f.number(8)?,
                date: f.date(9)?,
            }),
            SentenceKind::Gll => TalkerMessage::Gll(Gll {
                latitude: f.coordinate(1, 2, 'S')?,
                longitude: f.coordinate(3, 4, 'W')?,
                fix_time: f.time(5)?,
                valid: f.text(6) == "A",
            }),
            SentenceKind::Gsv => TalkerMessage::Gsv(Gsv {
                total_messages: f.number(1)?,
                message_number: f.number(2)?,
                satellites_in_view: f.number(3)?,
            }),
            SentenceKind::Gsa => TalkerMessage::Gsa(Gsa {
                mode: f.text(1).chars().next(),
                fix_type: f.number(2)?,
                satellite_ids: (3..15)
                    .map(|i| f.number(i))
                    .collect::<Result<Vec<_>>>()?
                    .into_iter()
                    .flatten()
                    .collect(),
                pdop: f.number(15)?,
                hdop: f.number(16)?,
                vdop: f.number(17)?,
            }),
            SentenceKind::Hdt => TalkerMessage::Hdt(Hdt { heading: f.number(1)? }),
            SentenceKind::Hdg => TalkerMessage::Hdg(Hdg {
                heading: f.number(1)?,
                deviation: f.signed(2, 3)?,
                variation: f.signed(4, 5)?,
            }),
        };
        Ok(message)
    }
}

fn other(talker: &str, kind: &str, fields: &[&str]) -> TalkerMessage {
    TalkerMessage::Other {
        talker: talker.to_string(),
        kind: kind.to_string(),
        fields: fields[1..].iter().map(|s| s.to_string()).collect(),
    }
}

/// Field accessors; a missing trailing field reads as empty.
struct Fields<'a> {
    fields: &'a [&'a str],
    sentence: &'a str,
}

impl Fields<'_> {
    fn text(&self, index: usize) -> &str {
        self.fields.get(index).copied().unwrap_or("").trim()
    }

    fn error(&self, index: usize, what: &str) -> WaveError {
        WaveError::sentence(
            self.sentence,
            format!("field {} '{}' is not a valid {}", index, self.text(index), what),
        )
    }

    fn number<T: FromStr>(&self, index: usize) -> Result<Option<T>> {
        let text = self.text(index);
        if text.is_empty() {
            return Ok(None);
        }
        text.parse().map(Some).map_err(|_| self.error(index, "number"))
    }

    /// Value followed by an `E`/`W` direction field, west negative.
    fn signed(&self, value: usize, direction: usize) -> Result<Option<f64>> {
        Ok(self.number::<f64>(value)?.map(|v| if self.text(direction) == "W" { -v } else { v }))
    }

    /// `ddmm.mmmm` / `dddmm.mmmm` plus hemisphere, converted to signed degrees.
    fn coordinate(&self, value: usize, hemisphere: usize, negative: char) -> Result<Option<f64>> {
        let Some(raw) = self.number::<f64>(value)? else {
            return Ok(None);
        };
        let degrees = (raw / 100.0).trunc();
        let minutes = raw - degrees * 100.0;
        if !(0.0..60.0).contains(&minutes) {
            return Err(self.error(value, "coordinate"));
        }
        let decimal = degrees + minutes / 60.0;
        let hemi = self.text(hemisphere);
        if hemi.starts_with(negative) { Ok(Some(-decimal)) } else { Ok(Some(decimal)) }
    }

    /// `hhmmss` with optional fractional seconds.
    fn time(&self, index: usize) -> Result<Option<NaiveTime>> {
        let text = self.text(index);
        if text.is_empty() {
            return Ok(None);
        }
        let format = if text.contains('.') { "%H%M%S%.f" } else { "%H%M%S" };
        NaiveTime::parse_from_str(text, format)
            .map(Some)
            .map_err(|_| self.error(index, "time"))
    }

    /// `ddmmyy`, years taken in the 2000s.
    fn date(&self, index: usize) -> Result<Option<NaiveDate>> {
        let text = self.text(index);
        if text.is_empty() {
            return Ok(None);
        }
        let parse = |range: std::ops::Range<usize>| -> Option<u32> {
            text.get(range).and_then(|s| s.parse().ok())
        };
        match (text.len(), parse(0..2), parse(2..4), parse(4..6)) {
            (6, Some(day), Some(month), Some(year)) => {
                NaiveDate::from_ymd_opt(2000 + year as i32, month, day)
                    .map(Some)
                    .ok_or_else(|| self.error(index, "date"))
            }
            _ => Err(self.error(index, "date")),
        }
    }
}
