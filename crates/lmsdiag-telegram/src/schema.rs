use serde::ser::{Serialize, SerializeMap, Serializer};

/// Header fields of an `LMDscandata` telegram, in wire order.
pub const LMD_SCANDATA_FIELDS: &[&str] = &[
    "command_type",
    "command",
    "version_number",
    "device_number",
    "serial_number",
    "device_status1",
    "device_status2",
    "telegram_counter",
    "scan_counter",
    "time_since_startup",
    "time_of_transmission",
    "input_status1",
    "input_status2",
    "output_status1",
    "output_status2",
    "reserved_byte_A",
    "scanning_frequency",
    "measurement_frequency",
    "number_of_encoders",
    "number_16bit_channels",
];

/// Field name to raw token, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    /// Raw token for `name`, if the body was long enough to carry it.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(field, value)| (field.as_str(), value.as_str()))
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, value) in &self.entries {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

/// Label the leading tokens of `body` with `schema`.
///
/// Tokens are split on runs of whitespace and zipped with the schema,
/// stopping at whichever runs out first. Never fails: a short or empty body
/// yields a smaller map, surplus tokens are dropped.
pub fn decode<S: AsRef<str>>(body: &str, schema: &[S]) -> FieldMap {
    let entries = schema
        .iter()
        .zip(body.split_whitespace())
        .map(|(field, token)| (field.as_ref().to_string(), token.to_string()))
        .collect();
    FieldMap { entries }
}

/// [`decode`] with the `LMDscandata` header schema.
pub fn decode_scan_data(body: &str) -> FieldMap {
    decode(body, LMD_SCANDATA_FIELDS)
}
