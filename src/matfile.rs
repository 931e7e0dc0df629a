//! MATLAB Level-4 matrix records.
//!
//! A burst file is a plain concatenation of records:
//!
//! ```text
//! [i32 type][i32 rows][i32 cols][i32 imaginary=0][i32 name_len][name + NUL][payload]
//! ```
//!
//! Type `0` is f64, `10` is f32 and `11` is text stored as one f32 character
//! code per column. Payload is column-major, so a single-row or single-column
//! matrix is laid out exactly as its values are listed.

use crate::{Result, WaveError};

/// Record element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatType {
    Double,
    Single,
    Text,
}

impl MatType {
    pub fn code(self) -> i32 {
        match self {
            MatType::Double => 0,
            MatType::Single => 10,
            MatType::Text => 11,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(MatType::Double),
            10 => Some(MatType::Single),
            11 => Some(MatType::Text),
            _ => None,
        }
    }

    fn width(self) -> usize {
        match self {
            MatType::Double => 8,
            MatType::Single | MatType::Text => 4,
        }
    }
}

/// One named matrix. Values are held column-major as f64 and narrowed to the
/// record type on write.
#[derive(Debug, Clone, PartialEq)]
pub struct MatVariable {
    pub name: String,
    pub mat_type: MatType,
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<f64>,
}

impl MatVariable {
    /// `1 x len` text record.
    pub fn text(name: &str, text: &str) -> Self {
        let values: Vec<f64> = text.chars().map(|c| f64::from(u32::from(c))).collect();
        let cols = values.len();
        Self { name: name.to_string(), mat_type: MatType::Text, rows: 1, cols, values }
    }

    /// `1 x 1` double.
    pub fn scalar(name: &str, value: f64) -> Self {
        let values = vec![value];
        Self { name: name.to_string(), mat_type: MatType::Double, rows: 1, cols: 1, values }
    }

    /// `1 x n` single-precision row.
    pub fn row(name: &str, values: &[f32]) -> Self {
        Self {
            name: name.to_string(),
            mat_type: MatType::Single,
            rows: 1,
            cols: values.len(),
            values: values.iter().map(|v| f64::from(*v)).collect(),
        }
    }

    /// `n x 1` single-precision column.
    pub fn column(name: &str, values: &[f32]) -> Self {
        Self { rows: values.len(), cols: 1, ..Self::row(name, values) }
    }

    /// Single-precision matrix from row-major input. All rows must share one width.
    pub fn matrix(name: &str, rows: &[Vec<f32>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
            return Err(WaveError::encode(
                name,
                format!("row {} has {} columns, expected {}", bad, rows[bad].len(), cols),
            ));
        }
        let mut values = Vec::with_capacity(rows.len() * cols);
        for col in 0..cols {
            values.extend(rows.iter().map(|r| f64::from(r[col])));
        }
        let name = name.to_string();
        Ok(Self { name, mat_type: MatType::Single, rows: rows.len(), cols, values })
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.values.get(col * self.rows + row).copied()
    }

    /// Decoded string of a text record.
    pub fn text_value(&self) -> Option<String> {
        if self.mat_type != MatType::Text {
            return None;
        }
        self.values.iter().map(|v| char::from_u32(*v as u32)).collect()
    }

    /// Append the serialized record to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        for word in [
            self.mat_type.code(),
            self.rows as i32,
            self.cols as i32,
            0,
            (self.name.len() + 1) as i32,
        ] {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out.extend_from_slice(self.name.as_bytes());
        out.push(0);
        for value in &self.values {
            match self.mat_type {
                MatType::Double => out.extend_from_slice(&value.to_le_bytes()),
                MatType::Single | MatType::Text => {
                    out.extend_from_slice(&(*value as f32).to_le_bytes())
                }
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }
}

/// Serialize a list of variables into one file image.
pub fn to_bytes(variables: &[MatVariable]) -> Vec<u8> {
    let mut out = Vec::new();
    for variable in variables {
        variable.write_to(&mut out);
    }
    out
}

/// Parse every record of a file image.
pub fn parse_all(data: &[u8]) -> Result<Vec<MatVariable>> {
    let mut variables = Vec::new();
    let mut offset = 0usize;
    while offset < data.len() {
        let (variable, len) = parse_one(&data[offset..], offset)?;
        variables.push(variable);
        offset += len;
    }
    Ok(variables)
}

fn parse_one(data: &[u8], at: usize) -> Result<(MatVariable, usize)> {
    let malformed = |details: String| WaveError::malformed("MatRecord", details);
    let word = |i: usize| -> Result<i32> {
        crate::ensemble::read_int32(i * 4, data)
            .map_err(|_| malformed(format!("record at {} has a truncated header", at)))
    };

    let code = word(0)?;
    let rows = word(1)?;
    let cols = word(2)?;
    let name_len = word(4)?;
    let mat_type = MatType::from_code(code)
        .ok_or_else(|| malformed(format!("record at {} has unknown type {}", at, code)))?;
    if rows < 0 || cols < 0 || name_len < 1 {
        return Err(malformed(format!("record at {} has a negative dimension", at)));
    }
    let (rows, cols, name_len) = (rows as usize, cols as usize, name_len as usize);

    let name_end = 20 + name_len;
    let name_bytes = data
        .get(20..name_end)
        .ok_or_else(|| malformed(format!("record at {} has a truncated name", at)))?;
    let name = crate::ensemble::format::extract_null_terminated_string(name_bytes);

    let count = rows.saturating_mul(cols);
    let payload_end = name_end.saturating_add(count.saturating_mul(mat_type.width()));
    let payload = data.get(name_end..payload_end).ok_or_else(|| {
        malformed(format!("record '{}' at {} has a truncated payload", name, at))
    })?;

    let values = match mat_type {
        MatType::Double => payload
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect(),
        MatType::Single | MatType::Text => payload
            .chunks_exact(4)
            .map(|c| f64::from(f32::from_le_bytes([c[0], c[1], c[2], c[3]])))
            .collect(),
    };

    Ok((MatVariable { name, mat_type, rows, cols, values }, payload_end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_record_layout() {
        let bytes = MatVariable::text("txt", "Hi").to_bytes();
        assert_eq!(&bytes[0..4], &11i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &1i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &2i32.to_le_bytes());
        assert_eq!(&bytes[12..16], &0i32.to_le_bytes());
        assert_eq!(&bytes[16..20], &4i32.to_le_bytes());
        assert_eq!(&bytes[20..24], b"txt\0");
        assert_eq!(&bytes[24..28], &72.0f32.to_le_bytes());
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn double_scalar_layout() {
        let bytes = MatVariable::scalar("lat", 32.865).to_bytes();
        assert_eq!(&bytes[0..4], &0i32.to_le_bytes());
        assert_eq!(&bytes[24..32], &32.865f64.to_le_bytes());
    }

    #[test]
    fn matrix_is_column_major() {
        let m = MatVariable::matrix("wus", &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!((m.rows, m.cols), (2, 3));
        assert_eq!(m.values, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(m.get(1, 2), Some(6.0));
        assert_eq!(m.get(2, 0), None);
    }

    #[test]
    fn ragged_matrix_is_rejected() {
        assert!(MatVariable::matrix("wus", &[vec![1.0, 2.0], vec![3.0]]).is_err());
    }

    #[test]
    fn parse_back_names_shapes_values() {
        let variables = vec![
            MatVariable::text("txt", "2019/06/01, Record No. 3"),
            MatVariable::scalar("wft", 737_577.5),
            MatVariable::row("whv", &[2.5, 3.0]),
            MatVariable::column("wps", &[12.0, 12.5, 13.0]),
            MatVariable::matrix("wb0", &[vec![0.1, 0.2], vec![0.3, 0.4]]).unwrap(),
        ];
        let parsed = parse_all(&to_bytes(&variables)).unwrap();
        assert_eq!(parsed.len(), 5);
        assert_eq!(parsed[0].text_value().as_deref(), Some("2019/06/01, Record No. 3"));
        assert_eq!(parsed[1].values, vec![737_577.5]);
        assert_eq!((parsed[3].rows, parsed[3].cols), (3, 1));
        assert_eq!(parsed[4].name, "wb0");
        assert!((parsed[4].get(1, 0).unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn truncated_record_is_malformed() {
        let bytes = MatVariable::column("wps", &[1.0, 2.0]).to_bytes();
        assert!(matches!(
            parse_all(&bytes[..bytes.len() - 1]),
            Err(WaveError::MalformedFrame { .. })
        ));
    }
}
