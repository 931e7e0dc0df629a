//! NMEA dataset (`E000011`): raw GPS sentences carried as bytes.

use super::Dataset;
use super::format::{DatasetHeader, FieldCursor, ValueType};
use crate::nmea::{
    Gga, Gll, Gsa, Gsv, Hdg, Hdt, KNOTS_TO_M_S, Nmea0183Parser, Rmc, SentenceParser,
    TalkerMessage, Vtg,
};
use crate::{Result, WaveError};
use chrono::NaiveTime;
use tracing::{debug, trace};

/// Sentences of one ensemble plus the last message of each cached type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NmeaData {
    pub sentences: Vec<String>,
    pub gga: Option<Gga>,
    pub vtg: Option<Vtg>,
    pub rmc: Option<Rmc>,
    pub gll: Option<Gll>,
    pub gsv: Option<Gsv>,
    pub gsa: Option<Gsa>,
    pub hdt: Option<Hdt>,
    pub hdg: Option<Hdg>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_knots: f64,
    pub speed_m_s: f64,
    pub heading: f64,
    pub fix_time: Option<NaiveTime>,
}

impl NmeaData {
    /// Decode with a caller-supplied sentence parser.
    pub fn decode_with(data: &[u8], parser: &dyn SentenceParser) -> Result<Self> {
        let header = DatasetHeader::parse(data)?;
        let mut cursor = FieldCursor::new(data, &header, Self::LABEL);
        let payload = cursor.next_bytes(header.payload_len())?;
        let text = String::from_utf8_lossy(payload);

        let mut nmea = Self::default();
        let mut dropped = 0usize;
        for sentence in text.split(|c: char| c.is_whitespace() || c == '\0') {
            if sentence.is_empty() {
                continue;
            }
            if let Err(e) = nmea.add_sentence(sentence, parser) {
                dropped += 1;
                debug!("Dropping NMEA sentence: {}", e);
            }
        }

        trace!("NmeaData: kept {} sentences, dropped {}", nmea.sentences.len(), dropped);
        Ok(nmea)
    }

    /// Parse and cache one sentence. A sentence that fails to parse is not kept.
    pub fn add_sentence(&mut self, sentence: &str, parser: &dyn SentenceParser) -> Result<()> {
        let sentence = sentence.trim();
        let message = parser.parse(sentence)?;

        match message {
            TalkerMessage::Gga(gga) => {
                self.latitude = gga.latitude.unwrap_or(0.0);
                self.longitude = gga.longitude.unwrap_or(0.0);
                self.fix_time = gga.fix_time;
                self.gga = Some(gga);
            }
            TalkerMessage::Vtg(vtg) => {
                self.speed_knots = vtg.speed_knots.unwrap_or(0.0);
                self.speed_m_s = self.speed_knots * KNOTS_TO_M_S;
                self.vtg = Some(vtg);
            }
            TalkerMessage::Rmc(rmc) => self.rmc = Some(rmc),
            TalkerMessage::Gll(gll) => self.gll = Some(gll),
            TalkerMessage::Gsv(gsv) => self.gsv = Some(gsv),
            TalkerMessage::Gsa(gsa) => self.gsa = Some(gsa),
            TalkerMessage::Hdt(hdt) => {
                self.heading = hdt.heading.unwrap_or(0.0);
                self.hdt = Some(hdt);
            }
            TalkerMessage::Hdg(hdg) => self.hdg = Some(hdg),
            TalkerMessage::Other { .. } => {}
        }

        self.sentences.push(sentence.to_string());
        Ok(())
    }

    /// Sentences as written to the wire, each terminated by a newline.
    fn payload(&self) -> String {
        self.sentences.iter().map(|s| format!("{}\n", s)).collect()
    }
}

impl Dataset for NmeaData {
    const NAME: &'static str = "E000011\0";
    const LABEL: &'static str = "NmeaData";

    fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, &Nmea0183Parser::new())
    }

    fn encode(&self) -> Result<Vec<u8>> {
        if let Some(bad) = self.sentences.iter().find(|s| s.contains(char::is_whitespace)) {
            return Err(WaveError::encode(
                Self::LABEL,
                format!("sentence '{}' contains whitespace", bad),
            ));
        }
        let payload = self.payload();
        let mut out = DatasetHeader::generate(ValueType::Byte, payload.len(), 1, Self::NAME);
        out.extend_from_slice(payload.as_bytes());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_nmea, with_checksum};

    #[test]
    fn decode_caches_scalars() {
        let nmea = sample_nmea();
        let decoded = NmeaData::decode(&nmea.encode().unwrap()).unwrap();
        assert_eq!(decoded.sentences.len(), 3);
        assert!((decoded.latitude - 32.865).abs() < 1e-6);
        assert!((decoded.longitude + 117.26).abs() < 1e-6);
        assert!((decoded.speed_knots - 5.5).abs() < 1e-9);
        assert!((decoded.speed_m_s - 5.5 * KNOTS_TO_M_S).abs() < 1e-9);
        assert!((decoded.heading - 274.07).abs() < 1e-9);
        assert!(decoded.gga.is_some());
        assert!(decoded.rmc.is_none());
        assert_eq!(decoded, nmea);
    }

    #[test]
    fn malformed_sentences_are_skipped() {
        let good = with_checksum("HEHDT,90.0,T");
        let text = format!("$GPGGA,bad*00\n{}\nnot-a-sentence\n", good);
        let mut bytes = DatasetHeader::generate(ValueType::Byte, text.len(), 1, NmeaData::NAME);
        bytes.extend_from_slice(text.as_bytes());

        let decoded = NmeaData::decode(&bytes).unwrap();
        assert_eq!(decoded.sentences, vec![good]);
        assert_eq!(decoded.heading, 90.0);
        assert!(decoded.gga.is_none());
    }

    #[test]
    fn last_sentence_of_a_type_wins() {
        let mut nmea = NmeaData::default();
        let parser = Nmea0183Parser::new();
        nmea.add_sentence(&with_checksum("HEHDT,10.0,T"), &parser).unwrap();
        nmea.add_sentence(&with_checksum("HEHDT,20.0,T"), &parser).unwrap();
        assert_eq!(nmea.heading, 20.0);
        assert_eq!(nmea.sentences.len(), 2);
    }

    #[test]
    fn element_count_is_payload_length() {
        let nmea = sample_nmea();
        let bytes = nmea.encode().unwrap();
        let header = DatasetHeader::parse(&bytes).unwrap();
        let expected: usize = nmea.sentences.iter().map(|s| s.len() + 1).sum();
        assert_eq!(header.element_count, expected);
        assert_eq!(bytes.len(), 28 + expected);
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let bytes = sample_nmea().encode().unwrap();
        assert!(matches!(
            NmeaData::decode(&bytes[..bytes.len() - 5]),
            Err(WaveError::MalformedFrame { .. })
        ));
    }
}
